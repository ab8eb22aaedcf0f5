use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Admits at most one outstanding external request per component.
///
/// A second caller is turned away rather than queued. The epoch lets a
/// component disown requests that were started before it was detached: their
/// permits report `is_current() == false` when the response finally lands.
pub struct SingleFlight {
    name: &'static str,
    busy: AtomicBool,
    epoch: AtomicU64,
}

impl SingleFlight {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            busy: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn try_begin(&self) -> Option<FlightPermit<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("[{}] request already in flight, rejecting", self.name);
            return None;
        }

        Some(FlightPermit {
            flight: self,
            epoch: self.epoch.load(Ordering::SeqCst),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Disown every request begun before this call.
    pub fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Proof that the holder owns the single slot; frees it on drop.
pub struct FlightPermit<'a> {
    flight: &'a SingleFlight,
    epoch: u64,
}

impl FlightPermit<'_> {
    /// False once the component advanced its epoch after this request began.
    pub fn is_current(&self) -> bool {
        self.flight.epoch.load(Ordering::SeqCst) == self.epoch
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.flight.busy.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_slot() {
        let flight = SingleFlight::new("test");

        let permit = flight.try_begin().unwrap();
        assert!(flight.is_busy());
        assert!(flight.try_begin().is_none());

        drop(permit);
        assert!(!flight.is_busy());
        assert!(flight.try_begin().is_some());
    }

    #[test]
    fn test_epoch_disowns_running_request() {
        let flight = SingleFlight::new("test");
        let permit = flight.try_begin().unwrap();
        assert!(permit.is_current());

        assert_eq!(flight.advance_epoch(), 1);
        assert!(!permit.is_current());
        // still occupying the slot until the response arrives
        assert!(flight.try_begin().is_none());
    }
}
