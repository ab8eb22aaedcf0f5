use crate::models::{CommittedCartEntry, LedgerSnapshot};
use chrono::Utc;
use seatcart_catalog::OfferingId;
use seatcart_shared::{ErrorKind, Money, MoneyError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Please select at least one course with seats")]
    EmptySelection,
    #[error("Price calculation failed: {0}")]
    Pricing(#[from] MoneyError),
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Cart entries grouped for display: course name (upper-cased), then region.
pub type GroupedCart<'a> = BTreeMap<String, BTreeMap<String, Vec<&'a CommittedCartEntry>>>;

/// Selections locked in for payment, keyed by offering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommittedCart {
    entries: BTreeMap<OfferingId, CommittedCartEntry>,
}

impl CommittedCart {
    pub fn entries(&self) -> impl Iterator<Item = &CommittedCartEntry> {
        self.entries.values()
    }

    pub fn get(&self, id: &OfferingId) -> Option<&CommittedCartEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> Result<Money, MoneyError> {
        Money::total(self.entries.values().map(|e| e.total))
    }

    pub fn grouped(&self) -> GroupedCart<'_> {
        let mut groups: GroupedCart<'_> = BTreeMap::new();
        for entry in self.entries.values() {
            groups
                .entry(entry.course_name.to_uppercase())
                .or_default()
                .entry(entry.region.clone())
                .or_default()
                .push(entry);
        }
        groups
    }

    pub fn offering_ids(&self) -> Vec<String> {
        self.entries.keys().map(|id| id.to_string()).collect()
    }
}

/// Owns the committed cart shared by the selection and payment screens.
pub struct CartAggregator {
    cart: Mutex<CommittedCart>,
}

impl CartAggregator {
    pub fn new() -> Self {
        Self {
            cart: Mutex::new(CommittedCart::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CommittedCart> {
        self.cart.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Replace the cart with the snapshot's lines, stamping each with the lock time.
    pub fn promote(&self, snapshot: &LedgerSnapshot) -> Result<CommittedCart, CartError> {
        if snapshot.is_empty() {
            return Err(CartError::EmptySelection);
        }

        let locked_at = Utc::now();
        let mut entries = BTreeMap::new();
        for line in &snapshot.lines {
            let entry = CommittedCartEntry {
                offering_id: line.offering_id.clone(),
                seats: line.seats,
                price_per_seat: line.price_per_seat,
                total: line.price_per_seat.times(line.seats)?,
                course_name: line.course_name.clone(),
                branch: line.branch.clone(),
                region: line.region.clone(),
                institute_name: line.institute_name.clone(),
                locked_at,
            };
            entries.insert(entry.offering_id.clone(), entry);
        }

        let cart = CommittedCart { entries };
        let total = cart.total()?;
        tracing::info!(
            "Promoted {} selection(s) to the cart, total {}",
            cart.len(),
            total
        );

        *self.lock() = cart.clone();
        Ok(cart)
    }

    /// Empty the cart. Returns how many entries were dropped.
    pub fn remove_all(&self) -> usize {
        let mut cart = self.lock();
        let removed = cart.len();
        cart.entries.clear();
        removed
    }

    /// Drop the entries a settled payment covered, leaving anything promoted since.
    pub fn clear_settled(&self, paid: &CommittedCart) -> usize {
        let mut cart = self.lock();
        let before = cart.len();
        cart.entries
            .retain(|id, entry| paid.entries.get(id) != Some(&*entry));
        let cleared = before - cart.len();
        if !cart.is_empty() {
            tracing::warn!(
                "Keeping {} cart entries promoted during payment",
                cart.len()
            );
        }
        cleared
    }

    pub fn snapshot(&self) -> CommittedCart {
        self.lock().clone()
    }

    pub fn total(&self) -> Result<Money, CartError> {
        Ok(self.lock().total()?)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for CartAggregator {
    fn default() -> Self {
        Self::new()
    }
}
