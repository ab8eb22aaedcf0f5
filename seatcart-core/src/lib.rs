pub mod config;
pub mod service;
pub mod verification;
pub mod payment;

pub use config::Config;
pub use payment::{MockPaymentGateway, PaymentGateway, PaymentMethod, TransactionId};
pub use service::{Gate, ServiceError};
pub use verification::{MockVerificationService, VerificationService};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ::config::ConfigError),
}

pub type CoreResult<T> = Result<T, CoreError>;
