use crate::state::AppState;
use anyhow::Context;
use seatcart_catalog::summarize_by_region;
use seatcart_core::{Config, PaymentMethod};
use seatcart_order::{NavigationDecision, NavigationRequest, Receipt, Route, SessionError};
use seatcart_shared::{ErrorKind, Money, ReservationEvent};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// Scripted user input for one run.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Seat inputs, applied to the region's offerings in display order.
    pub seat_inputs: Vec<String>,
    pub method: PaymentMethod,
    pub code: String,
}

impl Plan {
    pub fn from_config(config: &Config) -> Self {
        Self {
            seat_inputs: vec!["2".to_string(), "1".to_string()],
            method: PaymentMethod::Card,
            code: config.demo.otp_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkthroughReport {
    pub region: String,
    pub offerings: usize,
    pub rejected: usize,
    pub committed: usize,
    pub cart_total: Money,
    pub blocked_prompt: Option<String>,
    pub receipt: Option<Receipt>,
    pub payment_failure: Option<String>,
    pub events: usize,
}

/// Log every session event until the session goes away. Yields how many were seen.
pub fn spawn_event_log(mut events: broadcast::Receiver<ReservationEvent>) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut seen = 0;
        loop {
            match events.recv().await {
                Ok(event) => {
                    seen += 1;
                    match serde_json::to_string(&event) {
                        Ok(json) => tracing::debug!("event {}", json),
                        Err(e) => tracing::warn!("Unserializable event {:?}: {}", event, e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event log fell behind, skipped {} event(s)", skipped);
                    seen += skipped as usize;
                }
                Err(RecvError::Closed) => break,
            }
        }
        seen
    })
}

/// Drive one session from region entry to payment.
pub async fn run(state: &AppState, plan: &Plan) -> anyhow::Result<WalkthroughReport> {
    let mut session = state.session();
    let event_log = spawn_event_log(session.subscribe());
    let region = state.config.session.default_region.clone();

    session.navigate(NavigationRequest::to(Route::Region(region.clone())))?;
    let offerings = session
        .enter_region(state.catalog.as_ref(), &region)
        .await
        .context("Failed to load courses")?;
    tracing::info!("Session {} browsing {} offering(s) in {}", session.id(), offerings, region);
    for (name, availability) in summarize_by_region(session.ledger().catalog().iter()) {
        tracing::info!(
            "{}: {}/{} seats open ({}% taken)",
            name,
            availability.available_seats,
            availability.total_seats,
            availability.utilization_percent()
        );
    }

    let ids: Vec<_> = session.ledger().catalog().iter().map(|o| o.id.clone()).collect();
    let mut rejected = 0;
    for (id, input) in ids.iter().zip(&plan.seat_inputs) {
        match session.set_seats(id, input) {
            Ok(entry) => tracing::info!("Offering {}: {:?}", id, entry),
            Err(e) if e.kind() != ErrorKind::External => {
                tracing::warn!("Offering {}: {}", id, e);
                rejected += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }

    // wander off with unsaved selections, then think better of it
    let blocked_prompt = match session.navigate(NavigationRequest::to(Route::Dashboard))? {
        NavigationDecision::Deny(prompt) => {
            tracing::info!("{}: {}", prompt.title, prompt.message);
            session.cancel_navigation()?;
            Some(prompt.title.to_string())
        }
        NavigationDecision::Allow(_) => None,
    };

    let cart = session.proceed_to_payment().context("Nothing to pay for")?;
    for (course, regions) in cart.grouped() {
        for (name, entries) in regions {
            for entry in entries {
                tracing::info!(
                    "{} / {} / {}: {} seat(s) at {} = {}",
                    course,
                    name,
                    entry.branch,
                    entry.seats,
                    entry.price_per_seat,
                    entry.total
                );
            }
        }
    }
    let cart_total = cart.total()?;

    let destination = session.issue_code().await?;
    tracing::info!("Enter the code sent to {}", destination);
    session
        .verify_code(&plan.code)
        .await
        .context("Phone verification failed")?;

    let (receipt, payment_failure) = match session.submit_payment(Some(plan.method)).await {
        Ok(receipt) => {
            tracing::info!("Paid {} with {} ({})", receipt.total, receipt.method.label(), receipt.transaction_id);
            (Some(receipt), None)
        }
        Err(SessionError::Payment(e)) if e.kind() == ErrorKind::External => {
            tracing::error!("Payment did not go through: {}", e);
            (None, Some(e.to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    drop(session);
    let events = event_log.await.unwrap_or_default();

    Ok(WalkthroughReport {
        region,
        offerings,
        rejected,
        committed: cart.len(),
        cart_total,
        blocked_prompt,
        receipt,
        payment_failure,
        events,
    })
}
