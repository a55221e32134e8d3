//! The three-step wizard — state machine, session bootstrap, and step
//! controllers.

pub mod auth;
pub mod integration;
pub mod organization;
pub mod session;
pub mod state;

pub use auth::AuthStep;
pub use integration::{Celebration, IntegrationMethod, IntegrationStep, TestReport};
pub use organization::{OrganizationStep, placeholder_pages};
pub use session::{BootstrapHandle, SessionBootstrap};
pub use state::{WizardAction, WizardState, WizardStep};
