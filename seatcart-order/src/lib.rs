pub mod models;
pub mod ledger;
pub mod guard;
pub mod cart;
pub mod flight;
pub mod committer;
pub mod session;

pub use models::{CommittedCartEntry, LedgerSnapshot, Receipt, SelectionEntry, SnapshotLine};
pub use ledger::{DirtyTracker, LedgerError, SeatAdjustment, SelectionLedger};
pub use guard::{
    ConfirmPrompt, GuardError, GuardState, NavigationDecision, NavigationGuard, NavigationIntent,
    NavigationRequest, Route,
};
pub use cart::{CartAggregator, CartError, CommittedCart};
pub use flight::SingleFlight;
pub use committer::{CommitError, OtpCode, PaymentCommitter, VerificationState, VerifyOutcome, CODE_LENGTH};
pub use session::{ReservationSession, SessionError};
