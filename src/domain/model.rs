use std::fmt;
use std::path::PathBuf;

/// The five credential strings a run needs. Loaded once at startup and passed
/// explicitly into both the retriever and the notifier.
#[derive(Clone)]
pub struct Credentials {
    pub portal_email: String,
    pub portal_password: String,
    pub sender: String,
    pub sender_password: String,
    pub recipient: String,
}

// Passwords must never reach the logs, including `{:?}` output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("portal_email", &self.portal_email)
            .field("portal_password", &"<redacted>")
            .field("sender", &self.sender)
            .field("sender_password", &"<redacted>")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// A downloaded invoice persisted to a uniquely named temp file.
/// Created by the retriever, consumed by the notifier, deleted by the engine.
#[derive(Debug, Clone)]
pub struct InvoiceFile {
    pub path: PathBuf,
    pub file_name: String,
}

/// Outcome of a retrieval run. "No invoice on the billing page" is an
/// informational result, not an error.
#[derive(Debug)]
pub enum RetrievalOutcome {
    Retrieved(InvoiceFile),
    NoInvoice,
}

/// Result of an email delivery attempt. Delivery failures are values; they
/// never abort the run or skip temp-file cleanup.
#[derive(Debug, Clone)]
pub struct EmailReport {
    pub delivered: bool,
    pub detail: Option<String>,
}

impl EmailReport {
    pub fn delivered(detail: String) -> Self {
        Self {
            delivered: true,
            detail: Some(detail),
        }
    }

    pub fn failed() -> Self {
        Self {
            delivered: false,
            detail: None,
        }
    }
}
