/// In-process collaborators for tests and local demos
///
/// Each mock records what it was asked to do and can be switched into a
/// failing mode, so tests can drive every branch of the intake pipeline
/// without network access.
///
/// # Example
///
/// ```
/// use brightline_shared::integrations::mock::{CaptchaMode, MockCaptcha};
/// use brightline_shared::security::captcha::CaptchaVerifier;
///
/// # async fn example() {
/// let captcha = MockCaptcha::new(CaptchaMode::Accept);
/// assert!(captcha.verify("token", None).await.unwrap());
/// assert_eq!(captcha.tokens(), vec!["token".to_string()]);
/// # }
/// ```

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::crm::{CrmClient, CrmContact, CrmError, CrmLead};
use super::notifier::{Notification, Notifier, NotifyError};
use super::storage::{ObjectStorage, StorageError};
use crate::security::captcha::{CaptchaError, CaptchaVerifier};

/// How [`MockCaptcha`] answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptchaMode {
    /// Every token is valid
    Accept,
    /// Every token is invalid
    Reject,
    /// The provider is unreachable
    Unavailable,
}

/// CAPTCHA verifier with a fixed answer
#[derive(Debug)]
pub struct MockCaptcha {
    mode: Mutex<CaptchaMode>,
    tokens: Mutex<Vec<String>>,
}

impl MockCaptcha {
    pub fn new(mode: CaptchaMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: CaptchaMode) {
        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = mode;
    }

    /// Tokens seen so far, in order
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CaptchaVerifier for MockCaptcha {
    async fn verify(&self, token: &str, _remote_ip: Option<IpAddr>) -> Result<bool, CaptchaError> {
        self.tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(token.to_string());

        match *self.mode.lock().unwrap_or_else(|e| e.into_inner()) {
            CaptchaMode::Accept => Ok(true),
            CaptchaMode::Reject => Ok(false),
            CaptchaMode::Unavailable => Err(CaptchaError::Request("mock provider down".to_string())),
        }
    }
}

/// Notifier that keeps every message in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following delivery fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Rejected { status: 503 });
        }
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        Ok(())
    }
}

/// CRM that keeps leads and contacts in memory and hands out sequential ids
#[derive(Debug, Default)]
pub struct MockCrm {
    leads: Mutex<Vec<CrmLead>>,
    contacts: Mutex<Vec<CrmContact>>,
    fail: AtomicBool,
}

impl MockCrm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn leads(&self) -> Vec<CrmLead> {
        self.leads.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn contacts(&self) -> Vec<CrmContact> {
        self.contacts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl CrmClient for MockCrm {
    async fn create_lead(&self, lead: &CrmLead) -> Result<Option<String>, CrmError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CrmError::Request("mock CRM down".to_string()));
        }
        let mut leads = self.leads.lock().unwrap_or_else(|e| e.into_inner());
        leads.push(lead.clone());
        Ok(Some(format!("lead-{}", leads.len())))
    }

    async fn upsert_contact(&self, contact: &CrmContact) -> Result<Option<String>, CrmError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CrmError::Request("mock CRM down".to_string()));
        }
        let mut contacts = self.contacts.lock().unwrap_or_else(|e| e.into_inner());
        contacts.push(contact.clone());
        Ok(Some(format!("contact-{}", contacts.len())))
    }
}

/// Object storage held in a map
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Bytes>>,
    fail: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following write fail
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<(), StorageError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "mock storage failure",
            )));
        }
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}
