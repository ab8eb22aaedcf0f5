use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// A wrapper for sensitive data that masks its value in Debug and Display output.
///
/// Serialization still writes the real value; the wrapper exists to keep codes
/// and phone numbers out of `tracing` fields formatted with `{:?}` or `{}`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Phone number reduced to its last few digits, safe to show and to log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaskedPhone(String);

const MASK_PREFIX: &str = "xxxxxx";

impl MaskedPhone {
    /// Mask a raw number as `xxxxxx` followed by its last `visible` digits.
    pub fn mask(raw: &str, visible: usize) -> Self {
        let digits: Vec<char> = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        let keep = visible.min(digits.len());
        let tail: String = digits[digits.len() - keep..].iter().collect();
        Self(format!("{}{}", MASK_PREFIX, tail))
    }

    /// Build from whatever the verification service reported as destination.
    /// Services that already mask (`xxxxxx1234`) are taken as-is.
    pub fn from_destination(destination: &str, visible: usize) -> Self {
        if destination.contains(['x', 'X', '*']) {
            Self(destination.trim().to_string())
        } else {
            Self::mask(destination, visible)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MaskedPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
