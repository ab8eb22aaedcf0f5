use crate::service::{Gate, ServiceError};
use async_trait::async_trait;
use seatcart_shared::MaskedPhone;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Phone verification (one-time codes). Delivery is the service's business.
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Send a fresh code to the user's registered phone.
    /// Returns the destination, usually already masked.
    async fn issue_code(&self) -> Result<String, ServiceError>;

    /// Check a code the user typed in.
    async fn verify_code(&self, code: &str) -> Result<(), ServiceError>;
}

/// In-memory verification service accepting a single fixed code.
pub struct MockVerificationService {
    phone: String,
    code: String,
    issue_failure: Mutex<Option<ServiceError>>,
    gate: Option<Gate>,
    issue_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl MockVerificationService {
    pub fn new(phone: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            code: code.into(),
            issue_failure: Mutex::new(None),
            gate: None,
            issue_calls: AtomicUsize::new(0),
            verify_calls: AtomicUsize::new(0),
        }
    }

    /// Every response waits for `gate` to be released.
    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_issue_failure(&self, failure: Option<ServiceError>) {
        *self.issue_failure.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = failure;
    }

    pub fn issue_calls(&self) -> usize {
        self.issue_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }

    async fn hold(&self) {
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
    }
}

#[async_trait]
impl VerificationService for MockVerificationService {
    async fn issue_code(&self) -> Result<String, ServiceError> {
        self.issue_calls.fetch_add(1, Ordering::SeqCst);
        self.hold().await;

        let failure = self
            .issue_failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(err) = failure {
            return Err(err);
        }

        let destination = MaskedPhone::mask(&self.phone, 4);
        tracing::info!("Issued verification code to {}", destination);
        Ok(destination.as_str().to_string())
    }

    async fn verify_code(&self, code: &str) -> Result<(), ServiceError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.hold().await;

        if code == self.code {
            Ok(())
        } else {
            Err(ServiceError::Rejected("Invalid OTP".to_string()))
        }
    }
}
