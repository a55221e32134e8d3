//! Organization step — create the tenant row plus its three placeholder
//! page rows.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::backend::Backend;
use crate::backend::types::{NewOrganization, NewWebPage, PageStatus};
use crate::error::ValidationError;
use crate::notify::{Notice, Notifier};
use crate::wizard::state::WizardAction;

const MSG_ORG_CREATED: &str = "Organization created successfully!";
const MSG_ORG_FAILED: &str = "Failed to create organization. Please try again.";

/// The fixed batch of placeholder page rows inserted after every
/// organization creation. No real crawl happens; the URLs and statuses are
/// hard-coded, in this order.
pub fn placeholder_pages(website_url: &str, org_id: &str) -> Vec<NewWebPage> {
    let base = website_url.trim_end_matches('/');
    vec![
        NewWebPage {
            url: format!("{base}/home"),
            status: PageStatus::Scraped,
            meta_description: "Home page of the website".to_string(),
            org_id: org_id.to_string(),
        },
        NewWebPage {
            url: format!("{base}/about"),
            status: PageStatus::InProgress,
            meta_description: "About page".to_string(),
            org_id: org_id.to_string(),
        },
        NewWebPage {
            url: format!("{base}/contact"),
            status: PageStatus::Pending,
            meta_description: "Contact page".to_string(),
            org_id: org_id.to_string(),
        },
    ]
}

/// Controller for the organization step.
pub struct OrganizationStep {
    backend: Arc<dyn Backend>,
    notifier: Arc<dyn Notifier>,
    busy: AtomicBool,
}

impl OrganizationStep {
    pub fn new(backend: Arc<dyn Backend>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            notifier,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Create the organization and its placeholder pages. Returns the
    /// completion action on success, `None` on failure (reported through
    /// the notifier). If the organization insert succeeds but the page
    /// batch fails, the organization is left without page rows — an
    /// accepted inconsistency, not rolled back or retried.
    pub async fn create(
        &self,
        name: &str,
        website_url: &str,
        description: &str,
        user_id: &str,
    ) -> Result<Option<WizardAction>, ValidationError> {
        validate_form(name, website_url, description)?;
        if self.busy.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        let _guard = SettleGuard(&self.busy);

        let new = NewOrganization {
            name: name.to_string(),
            website_url: website_url.to_string(),
            description: description.to_string(),
            user_id: user_id.to_string(),
        };
        let organization = match self.backend.create_organization(new).await {
            Ok(org) => org,
            Err(e) => {
                warn!(error = %e, "Organization insert failed");
                self.notifier.notify(Notice::error(MSG_ORG_FAILED));
                return Ok(None);
            }
        };

        let pages = placeholder_pages(&organization.website_url, &organization.id);
        if let Err(e) = self.backend.insert_pages(pages).await {
            warn!(org_id = %organization.id, error = %e, "Page batch insert failed");
            self.notifier.notify(Notice::error(MSG_ORG_FAILED));
            return Ok(None);
        }

        info!(org_id = %organization.id, user_id, "Organization created");
        self.notifier.notify(Notice::success(MSG_ORG_CREATED));
        Ok(Some(WizardAction::OrgCreated { organization }))
    }
}

struct SettleGuard<'a>(&'a AtomicBool);

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn validate_form(
    name: &str,
    website_url: &str,
    description: &str,
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Required { field: "name" });
    }
    if description.trim().is_empty() {
        return Err(ValidationError::Required { field: "description" });
    }
    let url = url::Url::parse(website_url).map_err(|e| ValidationError::InvalidUrl {
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ValidationError::InvalidUrl {
            reason: format!("unsupported scheme: {}", url.scheme()),
        });
    }
    Ok(())
}
