use seatcart_shared::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screens the user can move between.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "screen", content = "region", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    Profile,
    CourseSelection,
    Region(String),
    Payment,
    Cart,
}

impl Route {
    /// Resolve a path such as `/dashboard/city/Jabalpur`. Unknown paths give `None`.
    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim().trim_end_matches('/');
        let route = match trimmed {
            "" => Route::Home,
            "/login" => Route::Login,
            "/register" => Route::Register,
            "/dashboard" => Route::Dashboard,
            "/dashboard/profile" => Route::Profile,
            "/dashboard/course-selection" => Route::CourseSelection,
            "/dashboard/payment" | "/payment" => Route::Payment,
            "/cart" => Route::Cart,
            other => {
                let region = other.strip_prefix("/dashboard/city/")?;
                if region.is_empty() || region.contains('/') {
                    return None;
                }
                Route::Region(region.to_string())
            }
        };
        Some(route)
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Register => "/register".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Profile => "/dashboard/profile".to_string(),
            Route::CourseSelection => "/dashboard/course-selection".to_string(),
            Route::Region(name) => format!("/dashboard/city/{}", name),
            Route::Payment => "/dashboard/payment".to_string(),
            Route::Cart => "/cart".to_string(),
        }
    }

    /// Default intent for navigating to this route.
    pub fn intent(&self) -> NavigationIntent {
        match self {
            Route::Payment | Route::Cart => NavigationIntent::ToPayment,
            _ => NavigationIntent::Generic,
        }
    }

    /// Whether this screen edits the selection ledger.
    pub fn is_selection_view(&self) -> bool {
        matches!(self, Route::Region(_))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavigationIntent {
    ToPayment,
    Generic,
}

impl NavigationIntent {
    pub fn prompt(self) -> ConfirmPrompt {
        match self {
            NavigationIntent::ToPayment => ConfirmPrompt {
                title: "Proceed to Payment?",
                message: "Your latest course selections have not been added to the cart. \
                          Continue to payment with the cart as it is?",
                confirm_label: "Continue",
                cancel_label: "Stay",
            },
            NavigationIntent::Generic => ConfirmPrompt {
                title: "Unsaved Changes",
                message: "You have unsaved course selections. Are you sure you want to leave? \
                          Your changes will be lost.",
                confirm_label: "Leave anyway",
                cancel_label: "Stay",
            },
        }
    }
}

/// Copy for the leave-or-stay dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPrompt {
    pub title: &'static str,
    pub message: &'static str,
    pub confirm_label: &'static str,
    pub cancel_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    pub target: Route,
    pub intent: NavigationIntent,
}

impl NavigationRequest {
    pub fn to(target: Route) -> Self {
        Self {
            intent: target.intent(),
            target,
        }
    }

    pub fn with_intent(mut self, intent: NavigationIntent) -> Self {
        self.intent = intent;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationDecision {
    Allow(Route),
    Deny(ConfirmPrompt),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    Idle,
    /// Waiting for the user to answer the prompt.
    Blocked { target: Route, intent: NavigationIntent },
    /// The user chose to leave; the move to `target` is under way.
    Resolved { target: Route },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("A navigation is already waiting for confirmation")]
    ConfirmationPending,
    #[error("No navigation is waiting for confirmation")]
    NotBlocked,
    #[error("Courses can only be added to the cart from the course list")]
    NotOnSelectionView,
}

impl GuardError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Intercepts navigation away from a ledger that holds uncommitted edits.
pub struct NavigationGuard {
    state: GuardState,
}

impl NavigationGuard {
    pub fn new() -> Self {
        Self { state: GuardState::Idle }
    }

    pub fn attempt(
        &mut self,
        current: &Route,
        request: NavigationRequest,
        dirty: bool,
    ) -> Result<NavigationDecision, GuardError> {
        match self.state {
            GuardState::Blocked { .. } => return Err(GuardError::ConfirmationPending),
            GuardState::Resolved { .. } => self.state = GuardState::Idle,
            GuardState::Idle => {}
        }

        if !dirty || request.target == *current {
            return Ok(NavigationDecision::Allow(request.target));
        }

        tracing::info!("Blocking navigation from {} to {}: unsaved selections", current, request.target);
        let prompt = request.intent.prompt();
        self.state = GuardState::Blocked {
            target: request.target,
            intent: request.intent,
        };
        Ok(NavigationDecision::Deny(prompt))
    }

    /// The user chose to leave. Returns where to go.
    pub fn confirm(&mut self) -> Result<Route, GuardError> {
        let GuardState::Blocked { target, .. } = &self.state else {
            return Err(GuardError::NotBlocked);
        };
        let target = target.clone();
        self.state = GuardState::Resolved { target: target.clone() };
        Ok(target)
    }

    /// The user chose to stay.
    pub fn cancel(&mut self) -> Result<(), GuardError> {
        if !matches!(self.state, GuardState::Blocked { .. }) {
            return Err(GuardError::NotBlocked);
        }
        self.state = GuardState::Idle;
        Ok(())
    }

    /// A confirmed move has landed.
    pub fn settle(&mut self) {
        if matches!(self.state, GuardState::Resolved { .. }) {
            self.state = GuardState::Idle;
        }
    }

    pub fn state(&self) -> &GuardState {
        &self.state
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.state, GuardState::Blocked { .. })
    }
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> Route {
        Route::Region("Jabalpur".to_string())
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::parse("/dashboard/city/Jabalpur"), Some(region()));
        assert_eq!(Route::parse("/payment"), Some(Route::Payment));
        assert_eq!(Route::parse("/dashboard/"), Some(Route::Dashboard));
        assert_eq!(Route::parse("/"), Some(Route::Home));
        assert_eq!(Route::parse("/dashboard/city/"), None);
        assert_eq!(Route::parse("/nowhere"), None);

        assert_eq!(region().path(), "/dashboard/city/Jabalpur");
        assert_eq!(Route::parse(&Route::Profile.path()), Some(Route::Profile));
        assert_eq!(Route::Payment.intent(), NavigationIntent::ToPayment);
        assert_eq!(Route::Cart.intent(), NavigationIntent::ToPayment);
        assert_eq!(Route::Profile.intent(), NavigationIntent::Generic);
        assert!(region().is_selection_view());
    }

    #[test]
    fn test_clean_ledger_passes() {
        let mut guard = NavigationGuard::new();
        let decision = guard
            .attempt(&region(), NavigationRequest::to(Route::Dashboard), false)
            .unwrap();

        assert_eq!(decision, NavigationDecision::Allow(Route::Dashboard));
        assert_eq!(guard.state(), &GuardState::Idle);
    }

    #[test]
    fn test_same_route_passes_when_dirty() {
        let mut guard = NavigationGuard::new();
        let decision = guard.attempt(&region(), NavigationRequest::to(region()), true).unwrap();
        assert_eq!(decision, NavigationDecision::Allow(region()));
    }

    #[test]
    fn test_dirty_ledger_blocks_then_confirm() {
        let mut guard = NavigationGuard::new();
        let decision = guard
            .attempt(&region(), NavigationRequest::to(Route::Dashboard), true)
            .unwrap();

        let NavigationDecision::Deny(prompt) = decision else {
            panic!("expected a prompt");
        };
        assert_eq!(prompt.title, "Unsaved Changes");
        assert_eq!(prompt.confirm_label, "Leave anyway");
        assert!(guard.is_blocked());

        assert_eq!(
            guard.attempt(&region(), NavigationRequest::to(Route::Profile), true),
            Err(GuardError::ConfirmationPending)
        );

        assert_eq!(guard.confirm().unwrap(), Route::Dashboard);
        assert_eq!(guard.state(), &GuardState::Resolved { target: Route::Dashboard });
        guard.settle();
        assert_eq!(guard.state(), &GuardState::Idle);
    }

    #[test]
    fn test_cancel_stays() {
        let mut guard = NavigationGuard::new();
        guard
            .attempt(&region(), NavigationRequest::to(Route::Payment), true)
            .unwrap();

        assert_eq!(guard.cancel(), Ok(()));
        assert_eq!(guard.state(), &GuardState::Idle);
        assert_eq!(guard.cancel(), Err(GuardError::NotBlocked));
        assert_eq!(guard.confirm(), Err(GuardError::NotBlocked));
    }

    #[test]
    fn test_payment_intent_uses_payment_prompt() {
        let mut guard = NavigationGuard::new();
        let decision = guard
            .attempt(&region(), NavigationRequest::to(Route::Payment), true)
            .unwrap();
        assert_eq!(decision, NavigationDecision::Deny(NavigationIntent::ToPayment.prompt()));

        guard.cancel().unwrap();
        let decision = guard
            .attempt(
                &region(),
                NavigationRequest::to(Route::Payment).with_intent(NavigationIntent::Generic),
                true,
            )
            .unwrap();
        assert_eq!(decision, NavigationDecision::Deny(NavigationIntent::Generic.prompt()));
    }

    #[test]
    fn test_resolved_state_clears_on_next_attempt() {
        let mut guard = NavigationGuard::new();
        guard
            .attempt(&region(), NavigationRequest::to(Route::Dashboard), true)
            .unwrap();
        guard.confirm().unwrap();

        let decision = guard
            .attempt(&Route::Dashboard, NavigationRequest::to(Route::Profile), false)
            .unwrap();
        assert_eq!(decision, NavigationDecision::Allow(Route::Profile));
        assert_eq!(guard.state(), &GuardState::Idle);
    }
}
