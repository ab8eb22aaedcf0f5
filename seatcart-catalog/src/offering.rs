use serde::{Deserialize, Serialize};
use seatcart_shared::{Money, MoneyError};
use std::fmt;

/// Identifier of a course offering as the backend hands it out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct OfferingId(String);

impl OfferingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfferingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OfferingId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OfferingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A purchasable block of seats for one course branch in one region.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Offering {
    pub id: OfferingId,
    pub region: String,
    pub course_name: String,
    pub branch: String,
    pub institute_name: String,
    pub price_per_seat: Money,
    pub total_seats: u32,
    pub remaining_seats: u32,
}

impl Offering {
    pub fn is_sold_out(&self) -> bool {
        self.remaining_seats == 0
    }

    /// Whether `seats` can still be requested against this offering.
    pub fn fits(&self, seats: u32) -> bool {
        seats <= self.remaining_seats
    }

    /// Total price of `seats` seats at the listed price.
    pub fn quote(&self, seats: u32) -> Result<Money, MoneyError> {
        self.price_per_seat.times(seats)
    }
}

const DEFAULT_INSTITUTE: &str = "JEC Jabalpur";
const DEFAULT_CITY: &str = "Jabalpur";

fn default_institute() -> String {
    DEFAULT_INSTITUTE.to_string()
}

fn default_city() -> String {
    DEFAULT_CITY.to_string()
}

/// Identifiers arrive as integers from the course service and as strings elsewhere.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Number(u64),
    Text(String),
}

/// Offering as it appears on the wire (`GET /courses`).
#[derive(Debug, Deserialize)]
pub(crate) struct OfferingRecord {
    id: RecordId,
    course_name: String,
    branch: String,
    total_seats: i64,
    left_seats: i64,
    price_per_seat: Money,
    #[serde(default = "default_institute")]
    institute_name: String,
    #[serde(default = "default_city")]
    city: String,
}

impl TryFrom<OfferingRecord> for Offering {
    type Error = String;

    fn try_from(record: OfferingRecord) -> Result<Self, Self::Error> {
        let id = match record.id {
            RecordId::Number(n) => OfferingId(n.to_string()),
            RecordId::Text(s) if !s.trim().is_empty() => OfferingId(s),
            RecordId::Text(_) => return Err("empty offering id".to_string()),
        };

        let total_seats = u32::try_from(record.total_seats)
            .map_err(|_| format!("{}: total_seats out of range ({})", id, record.total_seats))?;
        let remaining_seats = u32::try_from(record.left_seats)
            .map_err(|_| format!("{}: left_seats out of range ({})", id, record.left_seats))?;

        if remaining_seats > total_seats {
            return Err(format!(
                "{}: left_seats {} exceeds total_seats {}",
                id, remaining_seats, total_seats
            ));
        }
        if record.price_per_seat.is_negative() {
            return Err(format!("{}: negative price {}", id, record.price_per_seat));
        }

        Ok(Offering {
            id,
            region: record.city,
            course_name: record.course_name,
            branch: record.branch,
            institute_name: record.institute_name,
            price_per_seat: record.price_per_seat,
            total_seats,
            remaining_seats,
        })
    }
}
