use serde::{Deserialize, Serialize};

/// How a rejected operation should be treated by whoever triggered it.
///
/// None of these are fatal; they only decide the wording and whether a retry
/// makes sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Bad input or an operation attempted in the wrong state.
    Validation,
    /// Not enough seats; the previous valid value is kept.
    Capacity,
    /// A collaborator (catalog, verification, payment) failed; retry is allowed.
    External,
}
