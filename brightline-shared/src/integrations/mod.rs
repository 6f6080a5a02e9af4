/// External collaborators
///
/// Everything the intake pipeline talks to outside the database sits behind
/// an async trait, with an HTTP (or filesystem) implementation for production,
/// a no-op for unconfigured deployments, and an in-memory mock in [`mock`].
///
/// # Modules
///
/// - [`notifier`]: staff email notifications
/// - [`crm`]: CRM leads and contacts
/// - [`storage`]: upload object storage
/// - [`mock`]: recording mocks
///
/// The CAPTCHA verifier lives in [`crate::security::captcha`] and is bundled
/// here with the others.

pub mod crm;
pub mod mock;
pub mod notifier;
pub mod storage;

use std::sync::Arc;

use crate::security::captcha::CaptchaVerifier;
use crm::{CrmClient, NoopCrmClient};
use notifier::{NoopNotifier, Notifier};
use storage::ObjectStorage;

/// Set of collaborators handed to the intake pipeline
#[derive(Clone)]
pub struct Integrations {
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub notifier: Arc<dyn Notifier>,
    pub crm: Arc<dyn CrmClient>,
    pub storage: Arc<dyn ObjectStorage>,
}

impl Integrations {
    /// Collaborators with notifications and CRM switched off
    pub fn minimal(captcha: Arc<dyn CaptchaVerifier>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            captcha,
            notifier: Arc::new(NoopNotifier),
            crm: Arc::new(NoopCrmClient),
            storage,
        }
    }
}

impl std::fmt::Debug for Integrations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Integrations").finish_non_exhaustive()
    }
}
