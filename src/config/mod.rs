use crate::domain::model::Credentials;
use crate::utils::error::{CourierError, Result};
use crate::utils::validation::{validate_positive_number, validate_url, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const ENV_PORTAL_EMAIL: &str = "OPENAI_EMAIL";
pub const ENV_PORTAL_PASSWORD: &str = "OPENAI_PASSWORD";
pub const ENV_SENDER: &str = "EMAIL_SENDER";
pub const ENV_SENDER_PASSWORD: &str = "EMAIL_PASSWORD";
pub const ENV_RECIPIENT: &str = "EMAIL_RECIPIENT";

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "invoice-courier")]
#[command(about = "Fetches the latest ChatGPT invoice and emails it as an attachment")]
pub struct CliConfig {
    #[arg(long, default_value = "https://chat.openai.com/auth/login")]
    pub login_url: String,

    #[arg(
        long,
        default_value = "https://platform.openai.com/account/billing/payment-history"
    )]
    pub billing_url: String,

    #[arg(long, default_value = "https://platform.openai.com")]
    pub platform_origin: String,

    #[arg(long, default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    #[arg(long, default_value = "587")]
    pub smtp_port: u16,

    #[arg(long, default_value = ".", help = "Directory for diagnostic screenshots")]
    pub screenshot_dir: String,

    #[arg(long, default_value = "3", help = "Attempts for billing-page navigation")]
    pub nav_retries: usize,

    #[arg(long, default_value = "5")]
    pub nav_retry_delay_secs: u64,

    #[arg(
        long,
        default_value = "120",
        help = "Per-operation browser timeout in seconds"
    )]
    pub op_timeout_secs: u64,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("login_url", &self.login_url)?;
        validate_url("billing_url", &self.billing_url)?;
        validate_url("platform_origin", &self.platform_origin)?;
        validate_positive_number("nav_retries", self.nav_retries, 1)?;
        validate_positive_number("op_timeout_secs", self.op_timeout_secs as usize, 1)?;
        if self.smtp_port == 0 {
            return Err(CourierError::InvalidConfigValue {
                field: "smtp_port".to_string(),
                value: "0".to_string(),
                reason: "Port must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

impl Credentials {
    /// Reads all five credentials from the process environment. Every missing
    /// or blank variable is named in the returned error so the operator sees
    /// the full list at once.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Credentials::from_env`] but with an injectable lookup, so
    /// tests never have to mutate process-wide environment state.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut get = |name: &str| match lookup(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            Some(value) => value,
            None => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let credentials = Credentials {
            portal_email: get(ENV_PORTAL_EMAIL),
            portal_password: get(ENV_PORTAL_PASSWORD),
            sender: get(ENV_SENDER),
            sender_password: get(ENV_SENDER_PASSWORD),
            recipient: get(ENV_RECIPIENT),
        };

        if missing.is_empty() {
            Ok(credentials)
        } else {
            Err(CourierError::Config { missing })
        }
    }
}

impl Validate for Credentials {
    fn validate(&self) -> Result<()> {
        let fields = [
            (ENV_PORTAL_EMAIL, &self.portal_email),
            (ENV_PORTAL_PASSWORD, &self.portal_password),
            (ENV_SENDER, &self.sender),
            (ENV_SENDER_PASSWORD, &self.sender_password),
            (ENV_RECIPIENT, &self.recipient),
        ];

        let missing: Vec<String> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CourierError::Config { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn full_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            (ENV_PORTAL_EMAIL, "me@example.com"),
            (ENV_PORTAL_PASSWORD, "portal-pass"),
            (ENV_SENDER, "bot@example.com"),
            (ENV_SENDER_PASSWORD, "app-pass"),
            (ENV_RECIPIENT, "inbox@example.com"),
        ])
    }

    #[test]
    fn loads_all_five_credentials() {
        let env = full_env();
        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.portal_email, "me@example.com");
        assert_eq!(creds.recipient, "inbox@example.com");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn names_every_missing_variable() {
        let mut env = full_env();
        env.remove(ENV_PORTAL_PASSWORD);
        env.remove(ENV_RECIPIENT);

        let err = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        match err {
            CourierError::Config { missing } => {
                assert_eq!(missing, vec![ENV_PORTAL_PASSWORD, ENV_RECIPIENT]);
            }
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn blank_value_counts_as_missing() {
        let mut env = full_env();
        env.insert(ENV_SENDER, "   ");

        let err = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap_err();
        match err {
            CourierError::Config { missing } => assert_eq!(missing, vec![ENV_SENDER]),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn default_cli_config_is_valid() {
        let config = CliConfig::parse_from(["invoice-courier"]);
        assert!(config.validate().is_ok());
        assert_eq!(config.smtp_port, 587);
        assert_eq!(config.nav_retries, 3);
    }

    #[test]
    fn rejects_bad_urls_and_zero_retries() {
        let mut config = CliConfig::parse_from(["invoice-courier"]);
        config.login_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = CliConfig::parse_from(["invoice-courier"]);
        config.nav_retries = 0;
        assert!(config.validate().is_err());
    }
}
