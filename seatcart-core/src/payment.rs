use crate::service::{Gate, ServiceError};
use async_trait::async_trait;
use seatcart_shared::Money;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Upi,
    NetBanking,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::Card, PaymentMethod::Upi, PaymentMethod::NetBanking];

    pub fn code(self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
            PaymentMethod::NetBanking => "netbanking",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::Card => "Credit/Debit Card",
            PaymentMethod::Upi => "UPI Payment",
            PaymentMethod::NetBanking => "Net Banking",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|m| m.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown payment method: {}", s))
    }
}

/// Identifier the gateway assigns to a settled charge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Black-box payment endpoint: takes a method and an amount, returns a transaction id.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn submit(&self, method: PaymentMethod, amount: Money) -> Result<TransactionId, ServiceError>;
}

/// In-memory gateway that records every charge it accepts.
pub struct MockPaymentGateway {
    failure: Mutex<Option<ServiceError>>,
    charges: Mutex<Vec<(PaymentMethod, Money)>>,
    gate: Option<Gate>,
    calls: AtomicUsize,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            failure: Mutex::new(None),
            charges: Mutex::new(Vec::new()),
            gate: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Make subsequent submissions fail (or succeed again with `None`).
    pub fn set_failure(&self, failure: Option<ServiceError>) {
        *self.failure.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = failure;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn charges(&self) -> Vec<(PaymentMethod, Money)> {
        self.charges
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn submit(&self, method: PaymentMethod, amount: Money) -> Result<TransactionId, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }

        let failure = self
            .failure
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        if let Some(err) = failure {
            tracing::warn!("Mock gateway declining {} payment of {}", method, amount);
            return Err(err);
        }

        self.charges
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((method, amount));

        Ok(TransactionId(format!("mock_txn_{}", Uuid::new_v4().simple())))
    }
}
