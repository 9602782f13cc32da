//! Email delivery over authenticated STARTTLS SMTP.

use crate::domain::model::{Credentials, EmailReport, InvoiceFile};
use crate::domain::ports::Mailer;
use crate::utils::error::{CourierError, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

const BODY_TEXT: &str = "Please find attached your ChatGPT invoice.";

pub fn subject_line(date: NaiveDate) -> String {
    format!("ChatGPT Invoice - {}", date.format("%Y-%m-%d"))
}

pub fn attachment_name(date: NaiveDate) -> String {
    format!("ChatGPT_Invoice_{}.pdf", date.format("%Y-%m-%d"))
}

/// Builds the multipart message: plain-text body plus the invoice bytes as a
/// date-stamped binary attachment. Takes the date so tests can pin the stamp.
pub fn build_invoice_message(
    credentials: &Credentials,
    bytes: Vec<u8>,
    date: NaiveDate,
) -> Result<Message> {
    let from: Mailbox = credentials
        .sender
        .parse()
        .map_err(|e| CourierError::Delivery(format!("invalid sender address: {}", e)))?;
    let to: Mailbox = credentials
        .recipient
        .parse()
        .map_err(|e| CourierError::Delivery(format!("invalid recipient address: {}", e)))?;

    let content_type = ContentType::parse("application/octet-stream")
        .map_err(|e| CourierError::Delivery(format!("invalid content type: {}", e)))?;
    let attachment = Attachment::new(attachment_name(date)).body(bytes, content_type);

    Message::builder()
        .from(from)
        .to(to)
        .subject(subject_line(date))
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(BODY_TEXT.to_string()))
                .singlepart(attachment),
        )
        .map_err(|e| CourierError::Delivery(format!("failed to build message: {}", e)))
}

pub struct SmtpNotifier {
    host: String,
    port: u16,
}

impl SmtpNotifier {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    async fn deliver(&self, invoice: &InvoiceFile, credentials: &Credentials) -> Result<String> {
        let bytes = tokio::fs::read(&invoice.path).await?;
        let message = build_invoice_message(credentials, bytes, Local::now().date_naive())?;

        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)
                .map_err(|e| CourierError::Delivery(format!("SMTP relay error: {}", e)))?
                .port(self.port)
                .credentials(SmtpCredentials::new(
                    credentials.sender.clone(),
                    credentials.sender_password.clone(),
                ))
                .build();

        let response = mailer
            .send(message)
            .await
            .map_err(|e| CourierError::Delivery(format!("SMTP send failed: {}", e)))?;
        Ok(response.message().collect::<Vec<&str>>().join(" "))
    }
}

#[async_trait]
impl Mailer for SmtpNotifier {
    /// Any delivery failure is caught here; a failed email never aborts the
    /// run or skips temp-file cleanup.
    async fn send(&self, invoice: &InvoiceFile, credentials: &Credentials) -> EmailReport {
        match self.deliver(invoice, credentials).await {
            Ok(detail) => {
                tracing::info!("Email sent to {}: {}", credentials.recipient, detail);
                EmailReport::delivered(detail)
            }
            Err(e) => {
                tracing::error!("Failed to send email: {}", e);
                EmailReport::failed()
            }
        }
    }
}
