use crate::{CoreError, CoreResult};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub session: SessionConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub default_region: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Capacity of the session event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_event_buffer() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    /// Trailing phone digits left visible when a destination is masked.
    #[serde(default = "default_visible_digits")]
    pub visible_phone_digits: usize,
}

fn default_visible_digits() -> usize {
    4
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            visible_phone_digits: default_visible_digits(),
        }
    }
}

/// Settings for the in-memory collaborators used by the demo binary.
#[derive(Debug, Deserialize, Clone)]
pub struct DemoConfig {
    pub phone_number: String,
    pub otp_code: String,
    #[serde(default)]
    pub decline_payments: bool,
    #[serde(default)]
    pub decline_message: Option<String>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            phone_number: "9876543210".to_string(),
            otp_code: "123456".to_string(),
            decline_payments: false,
            decline_message: None,
        }
    }
}

impl Config {
    pub fn load() -> CoreResult<Self> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let settings = ::config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(::config::File::with_name("config/default"))
            // Per-environment overrides, optional
            .add_source(::config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(::config::File::with_name("config/local").required(false))
            // Eg. `SEATCART__SESSION__DEFAULT_REGION=Bhopal`
            .add_source(::config::Environment::with_prefix("SEATCART").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an inline TOML document, without files or environment.
    pub fn from_toml_str(document: &str) -> CoreResult<Self> {
        let config: Config = ::config::Config::builder()
            .add_source(::config::File::from_str(document, ::config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.session.default_region.trim().is_empty() {
            return Err(CoreError::ValidationError("session.default_region must not be empty".into()));
        }
        if self.session.event_buffer == 0 {
            return Err(CoreError::ValidationError("session.event_buffer must be positive".into()));
        }
        if !(1..=10).contains(&self.verification.visible_phone_digits) {
            return Err(CoreError::ValidationError(
                "verification.visible_phone_digits must be between 1 and 10".into(),
            ));
        }
        let code = &self.demo.otp_code;
        if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::ValidationError("demo.otp_code must be six digits".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_in() {
        let config = Config::from_toml_str(
            r#"
            [session]
            default_region = "Jabalpur"
            "#,
        )
        .unwrap();

        assert_eq!(config.session.currency, "INR");
        assert_eq!(config.session.event_buffer, 100);
        assert_eq!(config.verification.visible_phone_digits, 4);
        assert_eq!(config.demo.otp_code, "123456");
        assert!(!config.demo.decline_payments);
    }

    #[test]
    fn test_validation() {
        let err = Config::from_toml_str(
            r#"
            [session]
            default_region = ""
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::ValidationError(_)));

        let err = Config::from_toml_str(
            r#"
            [session]
            default_region = "Jabalpur"
            [demo]
            phone_number = "9876543210"
            otp_code = "12ab56"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("six digits"));

        assert!(matches!(Config::from_toml_str("[session]"), Err(CoreError::ConfigError(_))));
    }
}
