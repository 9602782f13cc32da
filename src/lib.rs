pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::config::CliConfig;
pub use crate::core::engine::{cleanup_temp_file, CourierEngine, RunOutcome};
pub use crate::core::notifier::SmtpNotifier;
pub use crate::core::retriever::InvoiceRetriever;
pub use crate::domain::model::{Credentials, EmailReport, InvoiceFile, RetrievalOutcome};
pub use crate::domain::ports::{Mailer, Retriever};
pub use crate::utils::error::{CourierError, Result};
