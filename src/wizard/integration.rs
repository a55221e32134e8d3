//! Integration step — widget snippet, simulated developer email, and the
//! simulated connectivity test.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::clipboard::Clipboard;
use crate::notify::{Notice, Notifier};
use crate::wizard::state::WizardAction;

const MSG_COPIED: &str = "Code copied to clipboard!";
const MSG_COPY_FAILED: &str = "Failed to copy code to clipboard.";
const MSG_EMAIL_SENT: &str = "Installation instructions sent to developer!";
const MSG_TEST_SUCCESS: &str = "Integration successful! Your chatbot is ready to use.";
const MSG_TEST_FAILURE: &str = "Integration failed. Please try again or contact support.";

/// How the user chooses to install the widget. The two methods are mutually
/// exclusive; the test action is available regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationMethod {
    CopyPaste,
    EmailDeveloper,
}

/// The decorative effect accompanying a successful test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Celebration {
    pub duration: Duration,
}

impl Celebration {
    pub const DURATION: Duration = Duration::from_secs(5);
}

/// Outcome of one run of the simulated connectivity test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestReport {
    pub success: bool,
    /// Present exactly when the test succeeded.
    pub celebration: Option<Celebration>,
}

impl TestReport {
    pub fn action(&self) -> WizardAction {
        WizardAction::IntegrationTested {
            success: self.success,
        }
    }
}

/// Controller for the terminal integration step.
pub struct IntegrationStep {
    organization_id: String,
    widget_base: String,
    notifier: Arc<dyn Notifier>,
    clipboard: Arc<dyn Clipboard>,
    rng: Mutex<StdRng>,
}

impl IntegrationStep {
    pub fn new(
        organization_id: impl Into<String>,
        widget_base: impl Into<String>,
        notifier: Arc<dyn Notifier>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            widget_base: widget_base.into(),
            notifier,
            clipboard,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the coin-flip RNG with a seeded one (tests).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    /// The fixed script tag, parameterized only by the organization id.
    pub fn snippet(&self) -> String {
        format!(
            r#"<script src="{}/{}"></script>"#,
            self.widget_base.trim_end_matches('/'),
            self.organization_id
        )
    }

    /// Place the snippet on the clipboard and confirm.
    pub fn copy_snippet(&self) {
        match self.clipboard.set_text(&self.snippet()) {
            Ok(()) => self.notifier.notify(Notice::success(MSG_COPIED)),
            Err(e) => {
                warn!(error = %e, "Clipboard write failed");
                self.notifier.notify(Notice::error(MSG_COPY_FAILED));
            }
        }
    }

    /// "Send" installation instructions. Explicitly simulated — no real
    /// delivery happens.
    pub fn email_developer(&self) {
        self.notifier.notify(Notice::success(MSG_EMAIL_SENT));
    }

    /// Simulated connectivity check: a fair coin flip. Each success carries
    /// exactly one five-second celebration.
    pub fn test(&self) -> TestReport {
        let success = self.rng.lock().unwrap().gen_bool(0.5);
        info!(org_id = %self.organization_id, success, "Integration test ran");
        if success {
            self.notifier.notify(Notice::success(MSG_TEST_SUCCESS));
            TestReport {
                success: true,
                celebration: Some(Celebration {
                    duration: Celebration::DURATION,
                }),
            }
        } else {
            self.notifier.notify(Notice::error(MSG_TEST_FAILURE));
            TestReport {
                success: false,
                celebration: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::CaptureClipboard;
    use crate::notify::{NoticeLevel, RecordingNotifier};

    fn step(
        notifier: Arc<RecordingNotifier>,
        clipboard: Arc<CaptureClipboard>,
    ) -> IntegrationStep {
        IntegrationStep::new(
            "org1",
            "https://chatbot.example.com/widget",
            notifier,
            clipboard,
        )
        .with_rng(StdRng::seed_from_u64(42))
    }

    #[test]
    fn snippet_is_parameterized_by_org_id_only() {
        let step = step(
            Arc::new(RecordingNotifier::new()),
            Arc::new(CaptureClipboard::new()),
        );
        assert_eq!(
            step.snippet(),
            r#"<script src="https://chatbot.example.com/widget/org1"></script>"#
        );
    }

    #[test]
    fn copy_places_snippet_on_clipboard() {
        let notifier = Arc::new(RecordingNotifier::new());
        let clipboard = Arc::new(CaptureClipboard::new());
        let step = step(notifier.clone(), clipboard.clone());

        step.copy_snippet();

        assert_eq!(clipboard.copied(), vec![step.snippet()]);
        assert_eq!(notifier.last().unwrap().text, MSG_COPIED);
    }

    #[test]
    fn email_developer_always_reports_success() {
        let notifier = Arc::new(RecordingNotifier::new());
        let step = step(notifier.clone(), Arc::new(CaptureClipboard::new()));

        step.email_developer();

        let last = notifier.last().unwrap();
        assert_eq!(last.level, NoticeLevel::Success);
        assert_eq!(last.text, MSG_EMAIL_SENT);
    }

    #[test]
    fn success_carries_exactly_one_celebration() {
        let step = step(
            Arc::new(RecordingNotifier::new()),
            Arc::new(CaptureClipboard::new()),
        );
        for _ in 0..20 {
            let report = step.test();
            if report.success {
                let celebration = report.celebration.expect("success without celebration");
                assert_eq!(celebration.duration, Duration::from_secs(5));
            } else {
                assert!(report.celebration.is_none());
            }
        }
    }
}
