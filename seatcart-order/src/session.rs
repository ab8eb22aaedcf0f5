use crate::cart::{CartAggregator, CartError, CommittedCart};
use crate::committer::{CommitError, PaymentCommitter, VerifyOutcome};
use crate::guard::{GuardError, NavigationDecision, NavigationGuard, NavigationRequest, Route};
use crate::ledger::{LedgerError, SeatAdjustment, SelectionLedger};
use crate::models::{Receipt, SelectionEntry};
use chrono::Utc;
use seatcart_catalog::{load_region, CatalogError, CatalogSource, CourseCatalog, OfferingId};
use seatcart_core::{Config, PaymentGateway, PaymentMethod, VerificationService};
use seatcart_shared::{ErrorKind, MaskedPhone, ReservationEvent};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

const CATALOG_FALLBACK: &str = "Failed to load courses";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Navigation(#[from] GuardError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Payment(#[from] CommitError),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Catalog(e) => e.kind(),
            SessionError::Ledger(e) => e.kind(),
            SessionError::Navigation(e) => e.kind(),
            SessionError::Cart(e) => e.kind(),
            SessionError::Payment(e) => e.kind(),
        }
    }

    /// Text suitable for the error banner.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Catalog(e) if e.kind() == ErrorKind::External => CATALOG_FALLBACK.to_string(),
            other => other.to_string(),
        }
    }
}

/// One user's reservation flow: the selection ledger for the region being
/// browsed, the navigation guard in front of it, the committed cart and the
/// payment step. Every outcome is published as a [`ReservationEvent`].
pub struct ReservationSession {
    id: Uuid,
    location: Route,
    ledger: SelectionLedger,
    guard: NavigationGuard,
    cart: Arc<CartAggregator>,
    committer: Arc<PaymentCommitter>,
    events: broadcast::Sender<ReservationEvent>,
}

impl ReservationSession {
    pub fn new(
        config: &Config,
        verifier: Arc<dyn VerificationService>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.session.event_buffer);
        let cart = Arc::new(CartAggregator::new());
        let committer = Arc::new(PaymentCommitter::new(
            verifier,
            gateway,
            cart.clone(),
            config.verification.visible_phone_digits,
        ));
        let catalog = CourseCatalog::empty(config.session.default_region.clone());

        Self {
            id: Uuid::new_v4(),
            location: Route::Dashboard,
            ledger: SelectionLedger::new(Arc::new(catalog)),
            guard: NavigationGuard::new(),
            cart,
            committer,
            events,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn location(&self) -> &Route {
        &self.location
    }

    pub fn ledger(&self) -> &SelectionLedger {
        &self.ledger
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn cart(&self) -> CommittedCart {
        self.cart.snapshot()
    }

    /// Shared handle for work that outlives a borrow of the session.
    pub fn committer(&self) -> Arc<PaymentCommitter> {
        self.committer.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReservationEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: ReservationEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    fn now() -> i64 {
        Utc::now().timestamp()
    }

    /// Start over in `region`: the ledger is reset, then the course list is fetched.
    pub async fn enter_region(&mut self, source: &dyn CatalogSource, region: &str) -> Result<usize, SessionError> {
        self.ledger.start(Arc::new(CourseCatalog::empty(region)));
        self.publish(ReservationEvent::SelectionReset {
            session_id: self.id,
            region: region.to_string(),
            timestamp: Self::now(),
        });

        let catalog = load_region(source, region).await.map_err(|e| {
            tracing::error!("Failed to load courses for {}: {}", region, e);
            e
        })?;
        let count = catalog.len();
        self.ledger.replace_catalog(Arc::new(catalog))?;

        tracing::info!("Loaded {} offering(s) for {}", count, region);
        Ok(count)
    }

    /// Fetch the current region's course list again, keeping selections that still fit.
    pub async fn reload_catalog(&mut self, source: &dyn CatalogSource) -> Result<Vec<SeatAdjustment>, SessionError> {
        let region = self.ledger.catalog().region().to_string();
        let catalog = load_region(source, &region).await?;
        Ok(self.ledger.replace_catalog(Arc::new(catalog))?)
    }

    /// Someone else booked seats: lower an offering's remaining count.
    pub fn observe_remaining(&mut self, id: &OfferingId, remaining: u32) -> Result<Vec<SeatAdjustment>, SessionError> {
        let mut catalog = CourseCatalog::clone(self.ledger.catalog());
        catalog.record_remaining(id, remaining)?;
        Ok(self.ledger.replace_catalog(Arc::new(catalog))?)
    }

    pub fn toggle_select(&mut self, id: &OfferingId, selected: bool) -> Result<SelectionEntry, SessionError> {
        let outcome = self.ledger.toggle_select(id, selected);
        self.report_selection(id, outcome)
    }

    pub fn set_seats(&mut self, id: &OfferingId, raw: &str) -> Result<SelectionEntry, SessionError> {
        let outcome = self.ledger.set_seats(id, raw);
        self.report_selection(id, outcome)
    }

    fn report_selection(
        &self,
        id: &OfferingId,
        outcome: Result<SelectionEntry, LedgerError>,
    ) -> Result<SelectionEntry, SessionError> {
        match outcome {
            Ok(entry) => {
                self.publish(ReservationEvent::SelectionChanged {
                    session_id: self.id,
                    offering_id: id.to_string(),
                    seats: entry.requested_seats(),
                    total: entry.total(),
                    timestamp: Self::now(),
                });
                Ok(entry)
            }
            Err(e) => {
                self.publish(ReservationEvent::SelectionRejected {
                    session_id: self.id,
                    offering_id: id.to_string(),
                    reason: e.to_string(),
                    timestamp: Self::now(),
                });
                Err(e.into())
            }
        }
    }

    pub fn reset_selection(&mut self) {
        self.ledger.reset();
        self.publish(ReservationEvent::SelectionReset {
            session_id: self.id,
            region: self.ledger.catalog().region().to_string(),
            timestamp: Self::now(),
        });
    }

    /// Try to move to another screen. Unsaved selections turn this into a prompt.
    pub fn navigate(&mut self, request: NavigationRequest) -> Result<NavigationDecision, SessionError> {
        let dirty = self.location.is_selection_view() && self.ledger.is_dirty();
        let target = request.target.path();
        let decision = self.guard.attempt(&self.location, request, dirty)?;

        match &decision {
            NavigationDecision::Allow(route) => self.arrive(route.clone()),
            NavigationDecision::Deny(_) => self.publish(ReservationEvent::NavigationBlocked {
                session_id: self.id,
                target,
                timestamp: Self::now(),
            }),
        }
        Ok(decision)
    }

    /// Leave anyway. The ledger keeps its edits.
    pub fn confirm_navigation(&mut self) -> Result<Route, SessionError> {
        let target = self.guard.confirm()?;
        self.arrive(target.clone());
        Ok(target)
    }

    pub fn cancel_navigation(&mut self) -> Result<(), SessionError> {
        Ok(self.guard.cancel()?)
    }

    fn arrive(&mut self, target: Route) {
        if self.location == Route::Payment && target != Route::Payment {
            self.committer.detach();
        }
        tracing::debug!("Navigated from {} to {}", self.location, target);
        self.location = target;
        self.guard.settle();
    }

    /// Lock the current selections into the cart and head to payment.
    pub fn proceed_to_payment(&mut self) -> Result<CommittedCart, SessionError> {
        if self.guard.is_blocked() {
            return Err(GuardError::ConfirmationPending.into());
        }
        if !self.location.is_selection_view() {
            tracing::warn!("Refusing to promote selections from {}", self.location);
            return Err(GuardError::NotOnSelectionView.into());
        }

        let snapshot = self.ledger.snapshot();
        let cart = self.cart.promote(&snapshot)?;
        self.ledger.acknowledge_commit(snapshot.revision);
        self.publish(ReservationEvent::CartPromoted {
            session_id: self.id,
            offering_ids: snapshot.offering_ids(),
            total: cart.total().map_err(CartError::from)?,
            timestamp: Self::now(),
        });

        self.navigate(NavigationRequest::to(Route::Payment))?;
        Ok(cart)
    }

    pub fn clear_cart(&mut self) -> usize {
        let removed = self.cart.remove_all();
        self.publish(ReservationEvent::CartCleared {
            session_id: self.id,
            timestamp: Self::now(),
        });
        removed
    }

    pub async fn issue_code(&self) -> Result<MaskedPhone, SessionError> {
        let destination = self.committer.issue_code().await?;
        self.publish(ReservationEvent::CodeIssued {
            session_id: self.id,
            destination: destination.clone(),
            timestamp: Self::now(),
        });
        Ok(destination)
    }

    pub async fn verify_code(&self, code: &str) -> Result<VerifyOutcome, SessionError> {
        let outcome = self.committer.verify_code(code).await?;
        if outcome == VerifyOutcome::Verified {
            self.publish(ReservationEvent::PhoneVerified {
                session_id: self.id,
                timestamp: Self::now(),
            });
        }
        Ok(outcome)
    }

    /// Pay for the committed cart, then start over from the dashboard.
    pub async fn submit_payment(&mut self, method: Option<PaymentMethod>) -> Result<Receipt, SessionError> {
        let receipt = match self.committer.submit(method).await {
            Ok(receipt) => receipt,
            Err(e) => {
                if e.kind() == ErrorKind::External {
                    self.publish(ReservationEvent::PaymentFailed {
                        session_id: self.id,
                        message: e.to_string(),
                        timestamp: Self::now(),
                    });
                }
                return Err(e.into());
            }
        };

        self.publish(ReservationEvent::PaymentSettled {
            session_id: self.id,
            transaction_id: receipt.transaction_id.to_string(),
            total: receipt.total,
            timestamp: Self::now(),
        });

        self.reset_selection();
        if self.location == Route::Payment {
            self.navigate(NavigationRequest::to(Route::Dashboard))?;
        }
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{GuardState, NavigationIntent};
    use seatcart_catalog::StaticCatalogSource;
    use seatcart_core::{MockPaymentGateway, MockVerificationService};
    use seatcart_shared::Money;
    use serde_json::json;

    fn config() -> Config {
        Config::from_toml_str(
            r#"
            [session]
            default_region = "Jabalpur"
            "#,
        )
        .unwrap()
    }

    fn session() -> ReservationSession {
        ReservationSession::new(
            &config(),
            Arc::new(MockVerificationService::new("9876543210", "123456")),
            Arc::new(MockPaymentGateway::new()),
        )
    }

    fn one_course() -> StaticCatalogSource {
        StaticCatalogSource::new(json!([
            {"id": "C1", "course_name": "B.Tech", "branch": "Computer Science",
             "total_seats": 60, "left_seats": 5, "price_per_seat": "1000.00"}
        ]))
    }

    fn two_courses() -> StaticCatalogSource {
        StaticCatalogSource::new(json!([
            {"id": "C1", "course_name": "B.Tech", "branch": "Computer Science",
             "total_seats": 60, "left_seats": 5, "price_per_seat": "1000.00"},
            {"id": "C2", "course_name": "MBA", "branch": "Finance",
             "total_seats": 40, "left_seats": 10, "price_per_seat": "2000.00"}
        ]))
    }

    fn c1() -> OfferingId {
        OfferingId::from("C1")
    }

    async fn in_region(session: &mut ReservationSession) {
        session
            .navigate(NavigationRequest::to(Route::Region("Jabalpur".to_string())))
            .unwrap();
        session.enter_region(&one_course(), "Jabalpur").await.unwrap();
    }

    #[tokio::test]
    async fn test_seat_selection_to_cart() {
        let mut session = session();
        in_region(&mut session).await;

        let entry = session.toggle_select(&c1(), true).unwrap();
        assert_eq!(entry.total(), Money::from_minor(100000));

        let err = session.set_seats(&c1(), "7").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Capacity);
        assert_eq!(session.ledger().entry(&c1()).requested_seats(), Some(1));

        let entry = session.set_seats(&c1(), "5").unwrap();
        assert_eq!(entry.total(), Money::from_minor(500000));

        let cart = session.proceed_to_payment().unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(&c1()).unwrap().seats, 5);
        assert_eq!(cart.total().unwrap(), Money::from_minor(500000));
        assert!(!session.ledger().is_dirty());
        assert_eq!(session.location(), &Route::Payment);
    }

    #[tokio::test]
    async fn test_empty_selection_cannot_proceed() {
        let mut session = session();
        in_region(&mut session).await;

        let err = session.proceed_to_payment().unwrap_err();
        assert!(matches!(err, SessionError::Cart(CartError::EmptySelection)));
        assert!(session.cart().is_empty());
        assert!(session.location().is_selection_view());
    }

    #[tokio::test]
    async fn test_guard_cancel_and_confirm() {
        let mut session = session();
        in_region(&mut session).await;
        session.set_seats(&c1(), "2").unwrap();

        let decision = session.navigate(NavigationRequest::to(Route::Payment)).unwrap();
        assert_eq!(decision, NavigationDecision::Deny(NavigationIntent::ToPayment.prompt()));

        session.cancel_navigation().unwrap();
        assert_eq!(session.guard().state(), &GuardState::Idle);
        assert!(session.location().is_selection_view());
        assert!(session.ledger().is_dirty());

        session.navigate(NavigationRequest::to(Route::Payment)).unwrap();
        assert_eq!(session.confirm_navigation().unwrap(), Route::Payment);
        assert_eq!(session.location(), &Route::Payment);
        assert!(session.ledger().is_dirty());
        assert_eq!(session.guard().state(), &GuardState::Idle);

        // the ledger only guards its own screen
        let decision = session.navigate(NavigationRequest::to(Route::Dashboard)).unwrap();
        assert_eq!(decision, NavigationDecision::Allow(Route::Dashboard));
    }

    #[tokio::test]
    async fn test_blocked_navigation_rejects_other_moves() {
        let mut session = session();
        in_region(&mut session).await;
        session.toggle_select(&c1(), true).unwrap();

        session.navigate(NavigationRequest::to(Route::Profile)).unwrap();
        let err = session.navigate(NavigationRequest::to(Route::Dashboard)).unwrap_err();
        assert!(matches!(err, SessionError::Navigation(GuardError::ConfirmationPending)));
        assert!(matches!(
            session.proceed_to_payment(),
            Err(SessionError::Navigation(GuardError::ConfirmationPending))
        ));
    }

    #[tokio::test]
    async fn test_abandoned_edits_cannot_reach_cart() {
        let mut session = session();
        let region = Route::Region("Jabalpur".to_string());
        session.navigate(NavigationRequest::to(region.clone())).unwrap();
        session.enter_region(&two_courses(), "Jabalpur").await.unwrap();
        session.set_seats(&c1(), "2").unwrap();
        session.proceed_to_payment().unwrap();

        session.navigate(NavigationRequest::to(region)).unwrap();
        session.set_seats(&OfferingId::from("C2"), "3").unwrap();
        let decision = session.navigate(NavigationRequest::to(Route::Dashboard)).unwrap();
        assert!(matches!(decision, NavigationDecision::Deny(_)));
        session.confirm_navigation().unwrap();
        assert_eq!(session.location(), &Route::Dashboard);

        let err = session.proceed_to_payment().unwrap_err();
        assert!(matches!(err, SessionError::Navigation(GuardError::NotOnSelectionView)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(session.cart().offering_ids(), vec!["C1"]);
        assert_eq!(session.location(), &Route::Dashboard);
    }

    #[tokio::test]
    async fn test_enter_region_resets_selection() {
        let mut session = session();
        in_region(&mut session).await;
        session.set_seats(&c1(), "3").unwrap();

        session.enter_region(&one_course(), "Jabalpur").await.unwrap();
        assert!(!session.ledger().is_dirty());
        assert_eq!(session.ledger().selected_count(), 0);
    }

    #[tokio::test]
    async fn test_catalog_failure_message() {
        let mut session = session();
        let err = session
            .enter_region(&StaticCatalogSource::failing("connection refused"), "Jabalpur")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::External);
        assert_eq!(err.user_message(), "Failed to load courses");
        assert!(session.ledger().catalog().is_empty());
    }

    #[tokio::test]
    async fn test_observe_remaining_cuts_back() {
        let mut session = session();
        in_region(&mut session).await;
        session.set_seats(&c1(), "4").unwrap();

        let adjustments = session.observe_remaining(&c1(), 2).unwrap();
        assert_eq!(adjustments.len(), 1);
        assert_eq!(session.ledger().entry(&c1()).requested_seats(), Some(2));

        let err = session.observe_remaining(&c1(), 3).unwrap_err();
        assert!(matches!(err, SessionError::Catalog(CatalogError::RemainingIncreased { .. })));
    }

    #[tokio::test]
    async fn test_events_published() {
        let mut session = session();
        let mut events = session.subscribe();
        in_region(&mut session).await;
        session.toggle_select(&c1(), true).unwrap();
        let _ = session.set_seats(&c1(), "-1");

        assert!(matches!(events.recv().await.unwrap(), ReservationEvent::SelectionReset { .. }));
        assert!(matches!(
            events.recv().await.unwrap(),
            ReservationEvent::SelectionChanged { seats: Some(1), .. }
        ));
        match events.recv().await.unwrap() {
            ReservationEvent::SelectionRejected { reason, .. } => {
                assert_eq!(reason, "Number of seats cannot be negative")
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_full_payment_flow() {
        let mut session = session();
        in_region(&mut session).await;
        session.set_seats(&c1(), "2").unwrap();
        session.proceed_to_payment().unwrap();

        assert!(matches!(
            session.submit_payment(Some(PaymentMethod::Card)).await,
            Err(SessionError::Payment(CommitError::NotVerified))
        ));

        let destination = session.issue_code().await.unwrap();
        assert_eq!(destination.as_str(), "xxxxxx3210");
        session.verify_code("123456").await.unwrap();

        let mut events = session.subscribe();
        let receipt = session.submit_payment(Some(PaymentMethod::Card)).await.unwrap();
        assert_eq!(receipt.total, Money::from_minor(200000));
        assert!(session.cart().is_empty());
        assert_eq!(session.ledger().selected_count(), 0);
        assert_eq!(session.location(), &Route::Dashboard);

        assert!(matches!(events.recv().await.unwrap(), ReservationEvent::PaymentSettled { .. }));
        match events.recv().await.unwrap() {
            ReservationEvent::SelectionReset { region, .. } => assert_eq!(region, "Jabalpur"),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_leaving_payment_detaches_committer() {
        let mut session = session();
        in_region(&mut session).await;
        session.set_seats(&c1(), "1").unwrap();
        session.proceed_to_payment().unwrap();
        session.issue_code().await.unwrap();
        let mut events = session.subscribe();
        assert_eq!(session.verify_code("123456").await.unwrap(), VerifyOutcome::Verified);
        assert_eq!(session.verify_code("999999").await.unwrap(), VerifyOutcome::AlreadyVerified);
        assert!(matches!(events.try_recv(), Ok(ReservationEvent::PhoneVerified { .. })));
        assert!(events.try_recv().is_err());
        assert!(session.committer().is_verified());

        session.navigate(NavigationRequest::to(Route::Cart)).unwrap();
        assert!(!session.committer().is_verified());
        // cart survives navigation
        assert_eq!(session.cart().len(), 1);
    }
}
