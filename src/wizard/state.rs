//! Wizard state machine — one immutable value, advanced by explicit actions.

use serde::{Deserialize, Serialize};

use crate::backend::types::{AuthUser, Organization};

/// The three linear phases of the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Auth,
    Organization,
    Integration,
}

impl WizardStep {
    /// Zero-based position in the linear chain.
    pub fn index(&self) -> usize {
        match self {
            Self::Auth => 0,
            Self::Organization => 1,
            Self::Integration => 2,
        }
    }

    /// Progress shown in the header: 0% / 50% / 100%.
    pub fn progress_percent(&self) -> u8 {
        match self {
            Self::Auth => 0,
            Self::Organization => 50,
            Self::Integration => 100,
        }
    }

    /// Human-readable step title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Auth => "Authentication",
            Self::Organization => "Organization",
            Self::Integration => "Integration",
        }
    }

    /// Whether this is the terminal step (no further step exists).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Integration)
    }
}

impl Default for WizardStep {
    fn default() -> Self {
        Self::Auth
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Auth => "auth",
            Self::Organization => "organization",
            Self::Integration => "integration",
        };
        write!(f, "{s}")
    }
}

/// Transition actions. Produced by the step controllers and the session
/// bootstrap, applied through [`WizardState::apply`].
#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    /// An existing session was found (initial fetch or a change event).
    SessionEstablished { user: AuthUser },
    /// Credential sign-in completed on the auth step.
    AuthSucceeded { user: AuthUser },
    /// No session is present; reset to the auth step.
    SignedOut,
    /// The organization (plus its placeholder pages) was created.
    OrgCreated { organization: Organization },
    /// The simulated connectivity check ran.
    IntegrationTested { success: bool },
}

/// Immutable wizard state. `apply` returns the successor state; the caller
/// owns the current value and replaces it on each action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WizardState {
    pub step: WizardStep,
    pub user: Option<AuthUser>,
    pub organization: Option<Organization>,
    /// Outcome of the most recent integration test, if any.
    pub last_test: Option<bool>,
}

impl WizardState {
    /// Apply a transition action. Applying the same session-derived action
    /// twice yields the same state as applying it once.
    pub fn apply(&self, action: WizardAction) -> WizardState {
        let mut next = self.clone();
        match action {
            WizardAction::SessionEstablished { user } | WizardAction::AuthSucceeded { user } => {
                next.user = Some(user);
                // Advance only from the auth step; a session event must not
                // regress a wizard already past organization setup.
                if next.step == WizardStep::Auth {
                    next.step = WizardStep::Organization;
                }
            }
            WizardAction::SignedOut => {
                next = WizardState::default();
            }
            WizardAction::OrgCreated { organization } => {
                next.organization = Some(organization);
                next.step = WizardStep::Integration;
            }
            WizardAction::IntegrationTested { success } => {
                next.last_test = Some(success);
            }
        }
        next
    }
}
