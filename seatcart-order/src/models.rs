use chrono::{DateTime, Utc};
use seatcart_catalog::{Offering, OfferingId};
use seatcart_core::{PaymentMethod, TransactionId};
use seatcart_shared::{Money, MoneyError};
use serde::{Deserialize, Serialize};

/// Per-offering intent recorded by the selection ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionEntry {
    Unselected,
    /// Ticked, but no seat count yet.
    Pending,
    Selected { seats: u32, total: Money },
}

impl SelectionEntry {
    pub fn is_selected(&self) -> bool {
        !matches!(self, SelectionEntry::Unselected)
    }

    /// Seats asked for; `None` while the count is still missing.
    pub fn requested_seats(&self) -> Option<u32> {
        match self {
            SelectionEntry::Unselected => Some(0),
            SelectionEntry::Pending => None,
            SelectionEntry::Selected { seats, .. } => Some(*seats),
        }
    }

    pub fn total(&self) -> Money {
        match self {
            SelectionEntry::Selected { total, .. } => *total,
            _ => Money::ZERO,
        }
    }
}

/// One committed-ready line of a ledger snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotLine {
    pub offering_id: OfferingId,
    pub course_name: String,
    pub branch: String,
    pub region: String,
    pub institute_name: String,
    pub seats: u32,
    pub price_per_seat: Money,
    pub total: Money,
}

impl SnapshotLine {
    pub fn from_offering(offering: &Offering, seats: u32) -> Result<Self, MoneyError> {
        Ok(Self {
            offering_id: offering.id.clone(),
            course_name: offering.course_name.clone(),
            branch: offering.branch.clone(),
            region: offering.region.clone(),
            institute_name: offering.institute_name.clone(),
            seats,
            price_per_seat: offering.price_per_seat,
            total: offering.quote(seats)?,
        })
    }
}

/// Ordered view of the complete selections at one ledger revision.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub revision: u64,
    pub lines: Vec<SnapshotLine>,
}

impl LedgerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn total(&self) -> Result<Money, MoneyError> {
        Money::total(self.lines.iter().map(|line| line.total))
    }

    pub fn offering_ids(&self) -> Vec<String> {
        self.lines.iter().map(|line| line.offering_id.to_string()).collect()
    }
}

/// A selection locked in for payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommittedCartEntry {
    pub offering_id: OfferingId,
    pub seats: u32,
    pub price_per_seat: Money,
    pub total: Money,
    pub course_name: String,
    pub branch: String,
    pub region: String,
    pub institute_name: String,
    pub locked_at: DateTime<Utc>,
}

/// What the user gets back after a settled payment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_id: TransactionId,
    pub method: PaymentMethod,
    pub total: Money,
    pub entries: Vec<CommittedCartEntry>,
    pub settled_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_accessors() {
        assert_eq!(SelectionEntry::Unselected.requested_seats(), Some(0));
        assert_eq!(SelectionEntry::Pending.requested_seats(), None);
        assert!(SelectionEntry::Pending.is_selected());
        assert_eq!(SelectionEntry::Pending.total(), Money::ZERO);

        let entry = SelectionEntry::Selected {
            seats: 2,
            total: Money::from_minor(1000000),
        };
        assert_eq!(entry.requested_seats(), Some(2));
        assert_eq!(entry.total(), Money::from_minor(1000000));
    }

    #[test]
    fn test_entry_serialization() {
        let json = serde_json::to_value(SelectionEntry::Selected {
            seats: 3,
            total: Money::from_minor(1500000),
        })
        .unwrap();

        assert_eq!(json["state"], "SELECTED");
        assert_eq!(json["seats"], 3);
        assert_eq!(json["total"], "15000.00");
    }
}
