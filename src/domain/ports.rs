use crate::domain::model::{Credentials, EmailReport, InvoiceFile, RetrievalOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, credentials: &Credentials) -> Result<RetrievalOutcome>;
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, invoice: &InvoiceFile, credentials: &Credentials) -> EmailReport;
}
