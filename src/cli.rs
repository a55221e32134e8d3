//! Terminal front-end — renders the three-step wizard as a stdin/stderr
//! REPL.
//!
//! One event loop merges two sources: user input lines and wizard actions
//! produced by the session bootstrap. Forms prompt for their fields
//! line-by-line; if a bootstrap action arrives mid-form (an OAuth session
//! landing, a sign-out), the form is abandoned and the action applied.
//! Everything rendered here is decorative; the step controllers own the
//! contracts.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use crate::backend::Backend;
use crate::clipboard::Clipboard;
use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::wizard::{
    AuthStep, IntegrationMethod, IntegrationStep, OrganizationStep, SessionBootstrap,
    WizardAction, WizardState, WizardStep,
};

/// One turn of the event loop.
enum Event {
    Line(String),
    Action(WizardAction),
    Eof,
}

/// What a field prompt yielded.
enum FieldInput {
    Value(String),
    Interrupted(WizardAction),
    Eof,
}

struct Events {
    lines: mpsc::UnboundedReceiver<String>,
    actions: mpsc::UnboundedReceiver<WizardAction>,
}

impl Events {
    async fn next(&mut self) -> Event {
        tokio::select! {
            line = self.lines.recv() => match line {
                Some(line) => Event::Line(line),
                None => Event::Eof,
            },
            action = self.actions.recv() => match action {
                Some(action) => Event::Action(action),
                None => Event::Eof,
            },
        }
    }

    /// Prompt for one form field. A wizard action arriving mid-form wins
    /// over the field value.
    async fn read_field(&mut self, prompt: &str) -> FieldInput {
        eprint!("{prompt}: ");
        loop {
            match self.next().await {
                Event::Line(line) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        eprint!("{prompt}: ");
                        continue;
                    }
                    return FieldInput::Value(line);
                }
                Event::Action(action) => return FieldInput::Interrupted(action),
                Event::Eof => return FieldInput::Eof,
            }
        }
    }
}

/// Run the wizard until the user quits or stdin closes.
pub async fn run(
    config: AppConfig,
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    clipboard: Arc<dyn Clipboard>,
) -> crate::error::Result<()> {
    let (line_tx, line_rx) = mpsc::unbounded_channel();
    spawn_stdin_reader(line_tx);

    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let bootstrap = SessionBootstrap::start(Arc::clone(&backend), action_tx).await;

    let mut events = Events {
        lines: line_rx,
        actions: action_rx,
    };

    let auth = AuthStep::new(
        Arc::clone(&backend),
        Arc::clone(&notifier),
        config.oauth_redirect.clone(),
    );
    let organization = OrganizationStep::new(Arc::clone(&backend), Arc::clone(&notifier));

    let mut state = WizardState::default();
    let mut integration: Option<IntegrationStep> = None;
    let mut method: Option<IntegrationMethod> = None;

    render(&state);

    loop {
        let event = events.next().await;
        let action = match event {
            Event::Eof => break,
            Event::Action(action) => Some(action),
            Event::Line(line) => {
                let line = line.trim().to_string();
                if line == "/quit" {
                    break;
                }
                match state.step {
                    WizardStep::Auth => handle_auth(&line, &mut events, &auth).await,
                    WizardStep::Organization => {
                        handle_organization(&line, &mut events, &organization, &state).await
                    }
                    WizardStep::Integration => {
                        handle_integration(&line, integration.as_ref(), &mut method)
                    }
                }
            }
        };

        if let Some(action) = action {
            debug!(?action, "Applying wizard action");
            state = state.apply(action);
            if state.step != WizardStep::Integration {
                integration = None;
                method = None;
            } else if integration.is_none() {
                if let Some(org) = &state.organization {
                    integration = Some(IntegrationStep::new(
                        org.id.clone(),
                        config.widget_base.clone(),
                        Arc::clone(&notifier),
                        Arc::clone(&clipboard),
                    ));
                }
            }
            render(&state);
        }
    }

    bootstrap.stop().await;
    Ok(())
}

/// Read stdin line-by-line into the event loop.
fn spawn_stdin_reader(tx: mpsc::UnboundedSender<String>) {
    tokio::spawn(async move {
        let stdin = tokio::io::stdin();
        let reader = BufReader::new(stdin);
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break, // EOF
                Err(e) => {
                    tracing::error!("Error reading stdin: {}", e);
                    break;
                }
            }
        }
    });
}

fn render(state: &WizardState) {
    let steps = [
        WizardStep::Auth,
        WizardStep::Organization,
        WizardStep::Integration,
    ];
    eprintln!();
    let header: Vec<String> = steps
        .iter()
        .map(|s| {
            if s.index() <= state.step.index() {
                format!("[{}] {}", s.index() + 1, s.title())
            } else {
                format!(" {}  {}", s.index() + 1, s.title())
            }
        })
        .collect();
    eprintln!("{}", header.join("   "));
    eprintln!("Progress: {}%", state.step.progress_percent());
    eprintln!();

    match state.step {
        WizardStep::Auth => {
            eprintln!("Welcome");
            eprintln!("  1) Sign in");
            eprintln!("  2) Sign up  (password must be at least 6 characters)");
            eprintln!("  3) Sign in with Google");
            eprintln!("  /quit to exit");
        }
        WizardStep::Organization => {
            if let Some(user) = &state.user {
                eprintln!("Signed in as {}", user.email);
            }
            eprintln!("Setup Organization — press Enter to start the form");
        }
        WizardStep::Integration => {
            eprintln!("Chatbot Integration");
            eprintln!("  1) Copy-Paste Code   — add a simple script tag to your website");
            eprintln!("  2) Email Developer   — send installation instructions");
            eprintln!("  copy) Copy the code to the clipboard");
            eprintln!("  test) Test Integration");
            eprintln!("  /quit to exit");
        }
    }
    eprint!("> ");
}

async fn handle_auth(
    line: &str,
    events: &mut Events,
    auth: &AuthStep,
) -> Option<WizardAction> {
    match line {
        "1" | "signin" => {
            let (email, password) = match read_credentials(events).await {
                Ok(fields) => fields,
                Err(interrupt) => return interrupt,
            };
            match auth.sign_in(&email, &password).await {
                Ok(action) => action,
                Err(e) => {
                    eprintln!("❌ {e}");
                    None
                }
            }
        }
        "2" | "signup" => {
            let (email, password) = match read_credentials(events).await {
                Ok(fields) => fields,
                Err(interrupt) => return interrupt,
            };
            if let Err(e) = auth.sign_up(&email, &password).await {
                eprintln!("❌ {e}");
            }
            // Sign-up never advances the wizard; the user signs in next.
            None
        }
        "3" | "google" => {
            if let Some(url) = auth.oauth_sign_in() {
                eprintln!("Open this URL in your browser to continue:");
                eprintln!("  {url}");
            }
            None
        }
        _ => {
            eprintln!("Unknown choice: {line}");
            eprint!("> ");
            None
        }
    }
}

/// Read the email/password pair. An interrupting action (or EOF) aborts the
/// form and is handed back to the main loop.
async fn read_credentials(
    events: &mut Events,
) -> Result<(String, String), Option<WizardAction>> {
    let email = match events.read_field("Email").await {
        FieldInput::Value(value) => value,
        FieldInput::Interrupted(action) => return Err(Some(action)),
        FieldInput::Eof => return Err(None),
    };
    let password = match events.read_field("Password").await {
        FieldInput::Value(value) => value,
        FieldInput::Interrupted(action) => return Err(Some(action)),
        FieldInput::Eof => return Err(None),
    };
    Ok((email, password))
}

async fn handle_organization(
    _line: &str,
    events: &mut Events,
    organization: &OrganizationStep,
    state: &WizardState,
) -> Option<WizardAction> {
    let Some(user) = &state.user else {
        return None;
    };

    let mut fields = Vec::with_capacity(3);
    for prompt in ["Company Name", "Website URL", "Description"] {
        match events.read_field(prompt).await {
            FieldInput::Value(value) => fields.push(value),
            FieldInput::Interrupted(action) => return Some(action),
            FieldInput::Eof => return None,
        }
    }

    match organization
        .create(&fields[0], &fields[1], &fields[2], &user.id)
        .await
    {
        Ok(action) => action,
        Err(e) => {
            eprintln!("❌ {e}");
            eprint!("> ");
            None
        }
    }
}

fn handle_integration(
    line: &str,
    integration: Option<&IntegrationStep>,
    method: &mut Option<IntegrationMethod>,
) -> Option<WizardAction> {
    let Some(step) = integration else {
        return None;
    };
    match line {
        "1" | "code" => {
            *method = Some(IntegrationMethod::CopyPaste);
            eprintln!("Add this to your website:");
            eprintln!("  {}", step.snippet());
            eprint!("> ");
            None
        }
        "2" | "email" => {
            *method = Some(IntegrationMethod::EmailDeveloper);
            step.email_developer();
            eprint!("> ");
            None
        }
        "copy" => {
            if *method == Some(IntegrationMethod::CopyPaste) {
                step.copy_snippet();
            } else {
                eprintln!("Choose the Copy-Paste Code method first (1).");
            }
            eprint!("> ");
            None
        }
        "test" => {
            let report = step.test();
            if let Some(celebration) = report.celebration {
                spawn_celebration(celebration.duration);
            }
            Some(report.action())
        }
        _ => {
            eprintln!("Unknown choice: {line}");
            eprint!("> ");
            None
        }
    }
}

/// Print confetti frames for the celebration window without blocking the
/// event loop.
fn spawn_celebration(duration: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let frames = ["🎉", "✨", "🎊"];
        let started = tokio::time::Instant::now();
        let mut frame = 0;
        while started.elapsed() < duration {
            eprint!("\r{} ", frames[frame % frames.len()]);
            frame += 1;
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        eprintln!();
    })
}
