use crate::domain::model::{Credentials, RetrievalOutcome};
use crate::domain::ports::{Mailer, Retriever};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use std::path::Path;

/// Terminal state of a run. All of these end the process normally; only the
/// logs distinguish them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Delivered,
    DeliveryFailed,
    NoInvoice,
}

pub struct CourierEngine<R: Retriever, M: Mailer> {
    retriever: R,
    mailer: M,
}

impl<R: Retriever, M: Mailer> CourierEngine<R, M> {
    pub fn new(retriever: R, mailer: M) -> Self {
        Self { retriever, mailer }
    }

    /// One full run: validate credentials, retrieve, notify, clean up.
    /// Validation failure means zero browser or SMTP side effects.
    pub async fn run(&self, credentials: &Credentials) -> Result<RunOutcome> {
        credentials.validate()?;

        tracing::info!("Starting invoice fetch process");
        match self.retriever.retrieve(credentials).await? {
            RetrievalOutcome::NoInvoice => {
                tracing::info!("No invoice available this run");
                Ok(RunOutcome::NoInvoice)
            }
            RetrievalOutcome::Retrieved(invoice) => {
                tracing::info!("Invoice retrieved: {}", invoice.path.display());
                let report = self.mailer.send(&invoice, credentials).await;
                // The temp file never outlives the run, delivered or not.
                cleanup_temp_file(&invoice.path);

                if report.delivered {
                    Ok(RunOutcome::Delivered)
                } else {
                    Ok(RunOutcome::DeliveryFailed)
                }
            }
        }
    }
}

/// Removes the temp invoice file. Deleting an already-missing path is fine;
/// nothing here can fail the run.
pub fn cleanup_temp_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed temp file {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove temp file {}: {}", path.display(), e),
    }
}
