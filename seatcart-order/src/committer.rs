use crate::cart::CartAggregator;
use crate::flight::SingleFlight;
use crate::models::Receipt;
use chrono::Utc;
use seatcart_core::{PaymentGateway, PaymentMethod, VerificationService};
use seatcart_shared::{ErrorKind, Masked, MaskedPhone, MoneyError};
use std::sync::{Arc, Mutex, MutexGuard};

/// Digits in a one-time verification code.
pub const CODE_LENGTH: usize = 6;

const ISSUE_FALLBACK: &str = "Failed to send OTP";
const VERIFY_FALLBACK: &str = "Failed to verify OTP";
const PAYMENT_FALLBACK: &str = "Payment failed. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    #[error("Please enter a valid 6-digit OTP")]
    InvalidFormat,
    #[error("Request a verification code first")]
    NoCodeIssued,
    #[error("{0}")]
    IssueFailed(String),
    #[error("{0}")]
    VerificationFailed(String),
    #[error("Please verify your phone number first")]
    NotVerified,
    #[error("Please select a payment method")]
    NoMethodSelected,
    #[error("No courses selected. Please select courses before proceeding to payment.")]
    EmptyCart,
    #[error("{0}")]
    PaymentFailed(String),
    #[error("A request is already in progress")]
    RequestInFlight,
    #[error("Response arrived after the payment view was closed")]
    StaleResponse,
    #[error("Price calculation failed: {0}")]
    Pricing(#[from] MoneyError),
}

impl CommitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommitError::IssueFailed(_)
            | CommitError::VerificationFailed(_)
            | CommitError::PaymentFailed(_)
            | CommitError::StaleResponse => ErrorKind::External,
            _ => ErrorKind::Validation,
        }
    }
}

/// Where phone verification stands for the current payment view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Unverified,
    CodeIssued { destination: MaskedPhone },
    Verified { destination: MaskedPhone },
}

/// What a call to [`PaymentCommitter::verify_code`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    /// The phone was verified already; the code was not checked.
    AlreadyVerified,
}

/// A code as typed by the user, checked for shape before it goes anywhere.
#[derive(Debug, Clone)]
pub struct OtpCode(Masked<String>);

impl OtpCode {
    pub fn parse(raw: &str) -> Result<Self, CommitError> {
        let code = raw.trim();
        if code.len() != CODE_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CommitError::InvalidFormat);
        }
        Ok(Self(Masked(code.to_string())))
    }

    pub fn as_str(&self) -> &str {
        self.0.expose()
    }
}

/// Verifies the user's phone and turns the committed cart into a payment.
///
/// Only one external call runs at a time. `detach` is called when the user
/// leaves the payment view; responses to calls started before that are
/// discarded, except that a payment which settles anyway still clears what it
/// paid for.
pub struct PaymentCommitter {
    verifier: Arc<dyn VerificationService>,
    gateway: Arc<dyn PaymentGateway>,
    cart: Arc<CartAggregator>,
    state: Mutex<VerificationState>,
    flight: SingleFlight,
    visible_digits: usize,
}

impl PaymentCommitter {
    pub fn new(
        verifier: Arc<dyn VerificationService>,
        gateway: Arc<dyn PaymentGateway>,
        cart: Arc<CartAggregator>,
        visible_digits: usize,
    ) -> Self {
        Self {
            verifier,
            gateway,
            cart,
            state: Mutex::new(VerificationState::Unverified),
            flight: SingleFlight::new("payment-committer"),
            visible_digits,
        }
    }

    fn lock(&self) -> MutexGuard<'_, VerificationState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn state(&self) -> VerificationState {
        self.lock().clone()
    }

    pub fn is_verified(&self) -> bool {
        matches!(*self.lock(), VerificationState::Verified { .. })
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_busy()
    }

    /// Ask the verification service to send a code. Also used to resend.
    pub async fn issue_code(&self) -> Result<MaskedPhone, CommitError> {
        let permit = self.flight.try_begin().ok_or(CommitError::RequestInFlight)?;

        let outcome = self.verifier.issue_code().await;
        if !permit.is_current() {
            tracing::warn!("Discarding code issue response for a detached payment view");
            return Err(CommitError::StaleResponse);
        }

        match outcome {
            Ok(destination) => {
                let destination = MaskedPhone::from_destination(&destination, self.visible_digits);
                tracing::info!("Verification code sent to {}", destination);
                *self.lock() = VerificationState::CodeIssued {
                    destination: destination.clone(),
                };
                Ok(destination)
            }
            Err(e) => {
                tracing::error!("Failed to issue verification code: {}", e);
                Err(CommitError::IssueFailed(e.user_message(ISSUE_FALLBACK)))
            }
        }
    }

    pub async fn verify_code(&self, raw: &str) -> Result<VerifyOutcome, CommitError> {
        let code = OtpCode::parse(raw)?;

        let destination = match self.state() {
            VerificationState::Unverified => return Err(CommitError::NoCodeIssued),
            VerificationState::Verified { .. } => return Ok(VerifyOutcome::AlreadyVerified),
            VerificationState::CodeIssued { destination } => destination,
        };

        let permit = self.flight.try_begin().ok_or(CommitError::RequestInFlight)?;
        let outcome = self.verifier.verify_code(code.as_str()).await;
        if !permit.is_current() {
            tracing::warn!("Discarding verification response for a detached payment view");
            return Err(CommitError::StaleResponse);
        }

        match outcome {
            Ok(()) => {
                tracing::info!("Phone {} verified", destination);
                *self.lock() = VerificationState::Verified { destination };
                Ok(VerifyOutcome::Verified)
            }
            Err(e) => {
                tracing::warn!("Verification code rejected: {}", e);
                Err(CommitError::VerificationFailed(e.user_message(VERIFY_FALLBACK)))
            }
        }
    }

    /// Charge the committed cart. Verification, a method and a non-empty cart are required.
    pub async fn submit(&self, method: Option<PaymentMethod>) -> Result<Receipt, CommitError> {
        if !self.is_verified() {
            return Err(CommitError::NotVerified);
        }
        let method = method.ok_or(CommitError::NoMethodSelected)?;

        let cart = self.cart.snapshot();
        if cart.is_empty() {
            return Err(CommitError::EmptyCart);
        }
        let total = cart.total()?;

        let permit = self.flight.try_begin().ok_or(CommitError::RequestInFlight)?;
        tracing::info!("Submitting {} payment of {} for {} course(s)", method, total, cart.len());

        match self.gateway.submit(method, total).await {
            Ok(transaction_id) => {
                self.cart.clear_settled(&cart);
                *self.lock() = VerificationState::Unverified;
                if permit.is_current() {
                    tracing::info!("Payment {} settled", transaction_id);
                } else {
                    tracing::warn!("Payment {} settled after the payment view was left", transaction_id);
                }

                Ok(Receipt {
                    transaction_id,
                    method,
                    total,
                    entries: cart.entries().cloned().collect(),
                    settled_at: Utc::now(),
                })
            }
            Err(e) => {
                if !permit.is_current() {
                    tracing::warn!("Discarding payment failure for a detached payment view: {}", e);
                    return Err(CommitError::StaleResponse);
                }
                tracing::error!("Payment failed: {}", e);
                Err(CommitError::PaymentFailed(e.user_message(PAYMENT_FALLBACK)))
            }
        }
    }

    /// The user left the payment view: forget verification and disown running calls.
    pub fn detach(&self) {
        let epoch = self.flight.advance_epoch();
        *self.lock() = VerificationState::Unverified;
        tracing::debug!("Payment view detached (epoch {})", epoch);
    }
}
