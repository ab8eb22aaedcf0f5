use crate::models::{LedgerSnapshot, SelectionEntry, SnapshotLine};
use seatcart_catalog::{CourseCatalog, OfferingId};
use seatcart_shared::{ErrorKind, Money, MoneyError};
use std::collections::HashMap;
use std::sync::Arc;

/// Remembers whether the ledger holds edits that have not reached the cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyTracker {
    dirty: bool,
}

impl DirtyTracker {
    pub fn mark(&mut self) {
        self.dirty = true;
    }

    pub fn clear(&mut self) {
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

/// A selection that was cut back because the offering lost seats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatAdjustment {
    pub offering_id: OfferingId,
    pub requested: u32,
    pub available: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Invalid course selection: {0}")]
    InvalidOffering(String),
    #[error("No seats available for this course")]
    NoCapacity(String),
    #[error("Maximum available seats: {remaining}")]
    CapacityExceeded {
        id: String,
        requested: u64,
        remaining: u32,
    },
    #[error("Number of seats cannot be negative")]
    NegativeSeats(String),
    #[error("Price calculation failed: {0}")]
    Pricing(#[from] MoneyError),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NoCapacity(_) | LedgerError::CapacityExceeded { .. } => ErrorKind::Capacity,
            LedgerError::InvalidOffering(_) | LedgerError::NegativeSeats(_) | LedgerError::Pricing(_) => {
                ErrorKind::Validation
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SeatInput {
    Count(u64),
    Negative,
}

/// Read a seat count the way a number field does: blank or garbled input is 0,
/// a minus sign in front of digits is negative, huge values saturate.
fn parse_seat_input(raw: &str) -> SeatInput {
    let trimmed = raw.trim();
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if let Some(digits) = trimmed.strip_prefix('-') {
        if all_digits(digits) && digits.bytes().any(|b| b != b'0') {
            return SeatInput::Negative;
        }
        return SeatInput::Count(0);
    }

    if all_digits(trimmed) {
        SeatInput::Count(trimmed.parse::<u64>().unwrap_or(u64::MAX))
    } else {
        SeatInput::Count(0)
    }
}

/// Working set of course selections for the region being browsed.
///
/// Every accepted edit bumps the revision and marks the ledger dirty. The
/// dirty flag is only cleared by a reset or by acknowledging a commit of the
/// current revision.
pub struct SelectionLedger {
    catalog: Arc<CourseCatalog>,
    entries: HashMap<OfferingId, SelectionEntry>,
    dirty: DirtyTracker,
    revision: u64,
}

impl SelectionLedger {
    pub fn new(catalog: Arc<CourseCatalog>) -> Self {
        Self {
            catalog,
            entries: HashMap::new(),
            dirty: DirtyTracker::default(),
            revision: 0,
        }
    }

    /// Tick or untick an offering. Ticking starts at one seat.
    pub fn toggle_select(&mut self, id: &OfferingId, selected: bool) -> Result<SelectionEntry, LedgerError> {
        let offering = self
            .catalog
            .get(id)
            .ok_or_else(|| LedgerError::InvalidOffering(id.to_string()))?;

        let entry = if selected {
            if offering.is_sold_out() {
                tracing::warn!("Rejected selection of sold-out offering {}", id);
                return Err(LedgerError::NoCapacity(id.to_string()));
            }
            SelectionEntry::Selected {
                seats: 1,
                total: offering.quote(1)?,
            }
        } else {
            SelectionEntry::Unselected
        };

        Ok(self.store(id, entry))
    }

    /// Apply seat input as typed by the user.
    pub fn set_seats(&mut self, id: &OfferingId, raw: &str) -> Result<SelectionEntry, LedgerError> {
        match parse_seat_input(raw) {
            SeatInput::Negative => {
                if self.catalog.get(id).is_none() {
                    return Err(LedgerError::InvalidOffering(id.to_string()));
                }
                Err(LedgerError::NegativeSeats(id.to_string()))
            }
            SeatInput::Count(requested) => self.apply_seats(id, requested),
        }
    }

    fn apply_seats(&mut self, id: &OfferingId, requested: u64) -> Result<SelectionEntry, LedgerError> {
        let offering = self
            .catalog
            .get(id)
            .ok_or_else(|| LedgerError::InvalidOffering(id.to_string()))?;

        let seats = u32::try_from(requested)
            .ok()
            .filter(|&seats| offering.fits(seats))
            .ok_or_else(|| {
                tracing::warn!(
                    "Rejected {} seats for {}, only {} left",
                    requested,
                    id,
                    offering.remaining_seats
                );
                LedgerError::CapacityExceeded {
                    id: id.to_string(),
                    requested,
                    remaining: offering.remaining_seats,
                }
            })?;

        let entry = if seats > 0 {
            SelectionEntry::Selected {
                seats,
                total: offering.quote(seats)?,
            }
        } else if self.entry(id).is_selected() {
            SelectionEntry::Pending
        } else {
            SelectionEntry::Unselected
        };

        Ok(self.store(id, entry))
    }

    fn store(&mut self, id: &OfferingId, entry: SelectionEntry) -> SelectionEntry {
        self.entries.insert(id.clone(), entry.clone());
        self.revision += 1;
        self.dirty.mark();
        tracing::debug!("Selection {} -> {:?} (revision {})", id, entry, self.revision);
        entry
    }

    /// Drop every selection and forget unsaved edits.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.revision += 1;
        self.dirty.clear();
    }

    /// Reset against the catalog of a newly entered region.
    pub fn start(&mut self, catalog: Arc<CourseCatalog>) {
        self.catalog = catalog;
        self.reset();
    }

    /// Swap in a refreshed catalog, repricing selections and cutting back any
    /// that now ask for more seats than remain. Selections of offerings that
    /// disappeared are dropped.
    pub fn replace_catalog(&mut self, catalog: Arc<CourseCatalog>) -> Result<Vec<SeatAdjustment>, LedgerError> {
        let mut updates = Vec::new();
        let mut adjustments = Vec::new();

        for (id, entry) in &self.entries {
            let SelectionEntry::Selected { seats, .. } = *entry else {
                continue;
            };
            let Some(offering) = catalog.get(id) else {
                adjustments.push(SeatAdjustment {
                    offering_id: id.clone(),
                    requested: seats,
                    available: 0,
                });
                updates.push((id.clone(), SelectionEntry::Unselected));
                continue;
            };

            let kept = seats.min(offering.remaining_seats);
            if kept < seats {
                adjustments.push(SeatAdjustment {
                    offering_id: id.clone(),
                    requested: seats,
                    available: offering.remaining_seats,
                });
            }

            let updated = if kept == 0 {
                SelectionEntry::Unselected
            } else {
                SelectionEntry::Selected {
                    seats: kept,
                    total: offering.quote(kept)?,
                }
            };
            updates.push((id.clone(), updated));
        }

        for (id, entry) in updates {
            self.entries.insert(id, entry);
        }
        self.catalog = catalog;

        if !adjustments.is_empty() {
            self.revision += 1;
            self.dirty.mark();
            tracing::info!("Catalog refresh cut back {} selection(s)", adjustments.len());
        }

        Ok(adjustments)
    }

    /// Complete selections in catalog display order.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let mut lines: Vec<(usize, SnapshotLine)> = self
            .entries
            .iter()
            .filter_map(|(id, entry)| {
                let SelectionEntry::Selected { seats, .. } = entry else {
                    return None;
                };
                let (Some(position), Some(offering)) = (self.catalog.position(id), self.catalog.get(id)) else {
                    tracing::debug!("Skipping selection {} with no catalog entry", id);
                    return None;
                };
                match SnapshotLine::from_offering(offering, *seats) {
                    Ok(line) => Some((position, line)),
                    Err(e) => {
                        tracing::warn!("Skipping selection {}: {}", id, e);
                        None
                    }
                }
            })
            .collect();

        lines.sort_by_key(|(position, _)| *position);

        LedgerSnapshot {
            revision: self.revision,
            lines: lines.into_iter().map(|(_, line)| line).collect(),
        }
    }

    /// Clear the dirty flag if nothing changed since `revision` was snapshotted.
    pub fn acknowledge_commit(&mut self, revision: u64) -> bool {
        if revision != self.revision {
            tracing::debug!(
                "Commit of revision {} is behind ledger revision {}",
                revision,
                self.revision
            );
            return false;
        }
        self.dirty.clear();
        true
    }

    pub fn entry(&self, id: &OfferingId) -> SelectionEntry {
        self.entries.get(id).cloned().unwrap_or(SelectionEntry::Unselected)
    }

    pub fn requested_seats(&self, id: &OfferingId) -> Option<u32> {
        self.entry(id).requested_seats()
    }

    /// Entries touched since the last reset, inert ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected_total(&self) -> Result<Money, LedgerError> {
        Ok(Money::total(self.entries.values().map(SelectionEntry::total))?)
    }

    pub fn selected_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_selected()).count()
    }

    pub fn catalog(&self) -> &Arc<CourseCatalog> {
        &self.catalog
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Default for SelectionLedger {
    fn default() -> Self {
        Self::new(Arc::new(CourseCatalog::default()))
    }
}
