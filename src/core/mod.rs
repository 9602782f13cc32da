pub mod engine;
pub mod heuristics;
pub mod notifier;
pub mod retriever;

pub use crate::domain::model::{Credentials, EmailReport, InvoiceFile, RetrievalOutcome};
pub use crate::domain::ports::{Mailer, Retriever};
pub use crate::utils::error::Result;
