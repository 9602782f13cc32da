use clap::Parser;
use invoice_courier::utils::{logger, validation::Validate};
use invoice_courier::{
    CliConfig, CourierEngine, Credentials, InvoiceRetriever, RunOutcome, SmtpNotifier,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting invoice-courier");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        return Ok(());
    }

    // All five credentials must be present before any automation starts.
    let credentials = match Credentials::from_env() {
        Ok(credentials) => credentials,
        Err(e) => {
            tracing::error!("❌ {}", e);
            eprintln!("❌ {}", e);
            return Ok(());
        }
    };

    let retriever = InvoiceRetriever::new(config.clone());
    let notifier = SmtpNotifier::new(config.smtp_host.clone(), config.smtp_port);
    let engine = CourierEngine::new(retriever, notifier);

    // Every terminal condition ends the process normally; the logs carry the
    // distinction between them.
    match engine.run(&credentials).await {
        Ok(RunOutcome::Delivered) => {
            tracing::info!("✅ Invoice delivered successfully");
            println!("✅ Invoice delivered successfully");
        }
        Ok(RunOutcome::DeliveryFailed) => {
            tracing::warn!("⚠️ Invoice retrieved but email delivery failed");
        }
        Ok(RunOutcome::NoInvoice) => {
            tracing::info!("No invoice available");
            println!("No invoice available");
        }
        Err(e) => {
            tracing::error!("❌ Invoice run failed: {}", e);
            eprintln!("❌ {}", e);
        }
    }

    Ok(())
}
