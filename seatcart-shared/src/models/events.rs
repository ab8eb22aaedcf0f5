use crate::money::Money;
use crate::pii::MaskedPhone;
use uuid::Uuid;

/// Everything observable that happens inside one reservation session.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationEvent {
    SelectionChanged {
        session_id: Uuid,
        offering_id: String,
        seats: Option<u32>,
        total: Money,
        timestamp: i64,
    },
    SelectionRejected {
        session_id: Uuid,
        offering_id: String,
        reason: String,
        timestamp: i64,
    },
    SelectionReset {
        session_id: Uuid,
        region: String,
        timestamp: i64,
    },
    NavigationBlocked {
        session_id: Uuid,
        target: String,
        timestamp: i64,
    },
    CartPromoted {
        session_id: Uuid,
        offering_ids: Vec<String>,
        total: Money,
        timestamp: i64,
    },
    CartCleared {
        session_id: Uuid,
        timestamp: i64,
    },
    CodeIssued {
        session_id: Uuid,
        destination: MaskedPhone,
        timestamp: i64,
    },
    PhoneVerified {
        session_id: Uuid,
        timestamp: i64,
    },
    PaymentSettled {
        session_id: Uuid,
        transaction_id: String,
        total: Money,
        timestamp: i64,
    },
    PaymentFailed {
        session_id: Uuid,
        message: String,
        timestamp: i64,
    },
}

impl ReservationEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            ReservationEvent::SelectionChanged { session_id, .. }
            | ReservationEvent::SelectionRejected { session_id, .. }
            | ReservationEvent::SelectionReset { session_id, .. }
            | ReservationEvent::NavigationBlocked { session_id, .. }
            | ReservationEvent::CartPromoted { session_id, .. }
            | ReservationEvent::CartCleared { session_id, .. }
            | ReservationEvent::CodeIssued { session_id, .. }
            | ReservationEvent::PhoneVerified { session_id, .. }
            | ReservationEvent::PaymentSettled { session_id, .. }
            | ReservationEvent::PaymentFailed { session_id, .. } => *session_id,
        }
    }
}
