//! widget-onboard — three-step onboarding wizard (auth → organization →
//! widget integration) for a hosted chatbot platform.

pub mod backend;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod notify;
pub mod wizard;
