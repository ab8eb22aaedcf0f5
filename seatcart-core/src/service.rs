use std::sync::Arc;
use tokio::sync::Notify;

/// Failure reported by an external collaborator (verification or payment).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The service refused and said why. The message is meant for the user.
    #[error("{0}")]
    Rejected(String),

    /// The service refused without a usable message.
    #[error("Service rejected the request")]
    Unexplained,

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("No response before timeout")]
    Timeout,
}

impl ServiceError {
    /// Text to show the user: the service's own words when it sent some, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ServiceError::Rejected(message) if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Holds a mock response back until the test releases it.
#[derive(Clone, Default)]
pub struct Gate(Arc<Notify>);

impl Gate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let one waiting (or the next) response through.
    pub fn release(&self) {
        self.0.notify_one();
    }

    pub(crate) async fn wait(&self) {
        self.0.notified().await;
    }
}
