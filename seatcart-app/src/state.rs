use seatcart_catalog::{CatalogError, StaticCatalogSource};
use seatcart_core::{Config, MockPaymentGateway, MockVerificationService, ServiceError};
use seatcart_order::ReservationSession;
use std::sync::Arc;

/// Collaborators shared by every session the binary opens.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: Arc<StaticCatalogSource>,
    pub verifier: Arc<MockVerificationService>,
    pub gateway: Arc<MockPaymentGateway>,
}

impl AppState {
    pub fn from_config(config: Config) -> Result<Self, CatalogError> {
        let catalog = Arc::new(StaticCatalogSource::sample()?);
        let verifier = Arc::new(MockVerificationService::new(
            config.demo.phone_number.clone(),
            config.demo.otp_code.clone(),
        ));

        let gateway = Arc::new(MockPaymentGateway::new());
        if config.demo.decline_payments {
            let failure = match &config.demo.decline_message {
                Some(message) => ServiceError::Rejected(message.clone()),
                None => ServiceError::Unexplained,
            };
            gateway.set_failure(Some(failure));
        }

        Ok(Self {
            config,
            catalog,
            verifier,
            gateway,
        })
    }

    pub fn session(&self) -> ReservationSession {
        ReservationSession::new(&self.config, self.verifier.clone(), self.gateway.clone())
    }
}
