//! Clinic lifecycle service.
//!
//! Every operation takes the caller's [`Session`], authorizes it, validates
//! the request and then delegates persistence to the [`Store`] port and
//! payment calls to the [`PaymentGateway`] port.

pub mod appointments;
pub mod carts;
pub mod checkout;
pub mod dashboard;
pub mod orders;

use std::sync::Arc;

use crate::{
    app_error::AppError, config::ClinicConfig, gateway::PaymentGateway, middleware::Session,
    store::Store,
};

pub struct ClinicService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    clinic: ClinicConfig,
}

impl ClinicService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        clinic: ClinicConfig,
    ) -> Self {
        Self {
            store,
            gateway,
            clinic,
        }
    }
}

fn require_admin(session: &Session) -> Result<(), AppError> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "Administrator access is required".into(),
        ))
    }
}

/// Trims `value` and rejects it when nothing is left.
fn non_blank(value: Option<&str>, field: &str) -> Result<String, AppError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(format!("{field} is required")))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use chrono::{NaiveDate, NaiveTime};

    use super::ClinicService;
    use crate::{
        config::ClinicConfig,
        gateway::MockPaymentGateway,
        middleware::Session,
        models::AppointmentSlotEntity,
        status::Role,
        store::MemoryStore,
    };

    pub const ADMIN: Session = Session {
        user_id: 1,
        role: Role::Admin,
    };
    pub const ALICE: Session = Session {
        user_id: 10,
        role: Role::User,
    };
    pub const BOB: Session = Session {
        user_id: 20,
        role: Role::User,
    };

    pub struct Fixture {
        pub service: Arc<ClinicService>,
        pub store: Arc<MemoryStore>,
    }

    impl Fixture {
        /// Any gateway call fails the test.
        pub fn new() -> Self {
            Self::build(Arc::new(MemoryStore::new()), MockPaymentGateway::new())
        }

        /// Same store, with a gateway carrying the test's expectations.
        pub fn with_gateway(self, gateway: MockPaymentGateway) -> Self {
            Self::build(self.store, gateway)
        }

        fn build(store: Arc<MemoryStore>, gateway: MockPaymentGateway) -> Self {
            let service = Arc::new(ClinicService::new(
                store.clone(),
                Arc::new(gateway),
                ClinicConfig::default(),
            ));
            Self { service, store }
        }

        pub async fn slot(&self, capacity: i32) -> AppointmentSlotEntity {
            self.store
                .insert_slot(
                    NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    capacity,
                )
                .await
        }
    }
}
