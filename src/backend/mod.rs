//! Remote backend boundary — auth and table calls against the hosted service.

pub mod events;
pub mod memory;
pub mod rest;
pub mod traits;
pub mod types;

pub use events::{AuthEvent, AuthEventHub, AuthSubscription};
pub use memory::MemoryBackend;
pub use rest::RestBackend;
pub use traits::Backend;
pub use types::{
    AuthUser, NewOrganization, NewWebPage, Organization, PageStatus, ProfileRow, Session, WebPage,
};
