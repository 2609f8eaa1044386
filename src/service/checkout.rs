//! Checkout sessions and payment reconciliation.
//!
//! Creating a session and verifying it never change local state. The signed
//! webhook is the only path that records payments, and it is idempotent on
//! the gateway transaction id.

use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    gateway::{
        CheckoutRequest, CompletedCheckout, GatewayEvent, LineItem, ORDER_DETAILS_KEY,
        ORDER_ID_KEY, OrderDetails,
    },
    middleware::Session,
    models::{CreatePaymentEntity, PaymentEntity},
    money::{from_minor_units, to_minor_units},
    service::{ClinicService, non_blank},
    status::{AppointmentStatus, PaymentStatus, PaymentType},
    store::ReconcileOutcome,
};

#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct CheckoutItemReq {
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub image: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReq {
    #[serde(default)]
    pub items: Vec<CheckoutItemReq>,
    pub order_id: Option<i32>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRes {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Serialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyCheckoutRes {
    pub session_id: String,
    pub status: PaymentStatus,
    pub payment: Option<PaymentEntity>,
}

#[derive(Serialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WebhookOutcome {
    #[serde(rename_all = "camelCase")]
    Recorded { transaction_id: String },
    #[serde(rename_all = "camelCase")]
    Duplicate { transaction_id: String },
    #[serde(rename_all = "camelCase")]
    Ignored { event_type: String },
}

fn line_item(item: CheckoutItemReq) -> Result<LineItem, AppError> {
    let name = non_blank(Some(&item.name), "item name")?;
    if !item.price.is_finite() || item.price < 0.0 {
        return Err(AppError::Validation(format!(
            "price of '{name}' must be a non-negative amount"
        )));
    }
    if item.quantity < 1 {
        return Err(AppError::Validation(format!(
            "quantity of '{name}' must be at least 1"
        )));
    }

    Ok(LineItem {
        name,
        unit_amount: to_minor_units(item.price),
        quantity: item.quantity as u64,
        image: item.image.filter(|i| !i.is_empty()),
    })
}

fn order_details_metadata(details: &OrderDetails) -> Result<HashMap<String, String>, AppError> {
    let encoded = serde_json::to_string(details).context("Failed to encode order details")?;
    Ok(HashMap::from([(ORDER_DETAILS_KEY.to_string(), encoded)]))
}

impl ClinicService {
    /// Opens a gateway checkout for arbitrary items, optionally tied to one
    /// of the caller's orders.
    pub async fn create_checkout(
        &self,
        session: Session,
        req: CheckoutReq,
    ) -> Result<CheckoutRes, AppError> {
        if req.items.is_empty() {
            return Err(AppError::Validation("items must not be empty".into()));
        }
        let line_items = req
            .items
            .into_iter()
            .map(line_item)
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(order_id) = req.order_id {
            self.get_order(session, order_id).await?;
        }

        let mut metadata = order_details_metadata(&OrderDetails::Product {
            user_id: session.user_id,
            order_id: req.order_id,
        })?;
        if let Some(order_id) = req.order_id {
            metadata.insert(ORDER_ID_KEY.to_string(), order_id.to_string());
        }

        let checkout = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                line_items,
                metadata,
                client_reference_id: Some(session.user_id.to_string()),
            })
            .await?;

        tracing::info!(session_id = %checkout.id, user_id = session.user_id, "Opened product checkout");

        Ok(CheckoutRes {
            session_id: checkout.id,
            url: checkout.url,
        })
    }

    /// Opens a gateway checkout for an unpaid appointment's fee.
    pub async fn create_appointment_checkout(
        &self,
        session: Session,
        appointment_id: i32,
    ) -> Result<CheckoutRes, AppError> {
        let appointment = self.store.find_appointment(appointment_id).await?;
        let patient = match &appointment {
            Some(appointment) => self.store.find_patient(appointment.patient_id).await?,
            None => None,
        };

        let (appointment, patient) = match (appointment, patient) {
            (Some(appointment), Some(patient))
                if session.is_admin() || patient.user_id == session.user_id =>
            {
                (appointment, patient)
            }
            (None, _) if session.is_admin() => {
                return Err(AppError::NotFound(format!(
                    "Appointment {appointment_id} not found"
                )));
            }
            (Some(_), None) if session.is_admin() => {
                return Err(AppError::NotFound("Patient not found".into()));
            }
            _ => {
                return Err(AppError::Authorization(
                    "You can only pay for your own appointments".into(),
                ));
            }
        };

        if appointment.payment_status == PaymentStatus::Paid {
            return Err(AppError::Conflict("Appointment is already paid".into()));
        }
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(AppError::Conflict("Appointment is cancelled".into()));
        }

        let metadata = order_details_metadata(&OrderDetails::Appointment {
            appointment_id: appointment.id,
            patient_id: patient.id,
            user_id: patient.user_id,
        })?;

        let checkout = self
            .gateway
            .create_checkout_session(CheckoutRequest {
                line_items: vec![LineItem {
                    name: format!(
                        "Physiotherapy session on {} at {}",
                        appointment.appointment_date,
                        appointment.start_time.format("%H:%M")
                    ),
                    unit_amount: to_minor_units(appointment.fee),
                    quantity: 1,
                    image: None,
                }],
                metadata,
                client_reference_id: Some(patient.user_id.to_string()),
            })
            .await?;

        tracing::info!(
            session_id = %checkout.id,
            appointment_id = appointment.id,
            "Opened appointment checkout"
        );

        Ok(CheckoutRes {
            session_id: checkout.id,
            url: checkout.url,
        })
    }

    /// Local read of what the webhook has recorded for `session_id`. The
    /// gateway is not consulted. Someone else's payment reads as pending.
    pub async fn verify_checkout(
        &self,
        session: Session,
        session_id: &str,
    ) -> Result<VerifyCheckoutRes, AppError> {
        let payment = self
            .store
            .find_payment_by_session(session_id)
            .await?
            .filter(|payment| session.is_admin() || payment.user_id == session.user_id);

        Ok(VerifyCheckoutRes {
            session_id: session_id.to_string(),
            status: payment
                .as_ref()
                .map_or(PaymentStatus::Pending, |p| p.status),
            payment,
        })
    }

    /// Authenticates a gateway event and reconciles it into local state.
    pub async fn handle_webhook(
        &self,
        payload: &str,
        signature: Option<&str>,
    ) -> Result<WebhookOutcome, AppError> {
        let signature = signature
            .ok_or_else(|| AppError::Authentication("Missing webhook signature".into()))?;

        let checkout = match self.gateway.construct_event(payload, signature)? {
            GatewayEvent::CheckoutCompleted(checkout) if checkout.paid => checkout,
            GatewayEvent::CheckoutCompleted(checkout) => {
                tracing::info!(session_id = %checkout.session_id, "Checkout completed but not paid yet");
                return Ok(WebhookOutcome::Ignored {
                    event_type: checkout.event_type,
                });
            }
            GatewayEvent::Ignored { event_type } => {
                tracing::debug!(event_type = %event_type, "Ignoring webhook event");
                return Ok(WebhookOutcome::Ignored { event_type });
            }
        };

        let payment = payment_from_checkout(checkout)?;
        let transaction_id = payment.transaction_id.clone();

        match self.store.record_payment(payment).await? {
            ReconcileOutcome::Recorded(payment) => {
                tracing::info!(
                    transaction_id = %payment.transaction_id,
                    payment_type = %payment.payment_type,
                    appointment_id = ?payment.appointment_id,
                    "Recorded payment"
                );
                Ok(WebhookOutcome::Recorded { transaction_id })
            }
            ReconcileOutcome::Duplicate(_) => {
                tracing::info!(transaction_id = %transaction_id, "Duplicate webhook delivery");
                Ok(WebhookOutcome::Duplicate { transaction_id })
            }
        }
    }
}

fn payment_from_checkout(checkout: CompletedCheckout) -> Result<CreatePaymentEntity, AppError> {
    let raw = checkout
        .metadata
        .get(ORDER_DETAILS_KEY)
        .ok_or_else(|| AppError::Validation("Checkout metadata has no order details".into()))?;
    let details: OrderDetails = serde_json::from_str(raw)
        .map_err(|err| AppError::Validation(format!("Malformed order details: {err}")))?;

    let (payment_type, appointment_id, patient_id, user_id) = match details {
        OrderDetails::Appointment {
            appointment_id,
            patient_id,
            user_id,
        } => (
            PaymentType::Appointment,
            Some(appointment_id),
            Some(patient_id),
            user_id,
        ),
        OrderDetails::Product { user_id, .. } => (PaymentType::Product, None, None, user_id),
    };

    Ok(CreatePaymentEntity {
        transaction_id: checkout.transaction_id,
        session_id: Some(checkout.session_id),
        amount: checkout.amount_total.map(from_minor_units).unwrap_or_default(),
        method: checkout.method,
        status: PaymentStatus::Paid,
        payment_type,
        appointment_id,
        patient_id,
        user_id,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use testresult::TestResult;

    use super::*;
    use crate::{
        gateway::{
            GatewayError, MockPaymentGateway,
            testing::{VALID_SIGNATURE, completed, expect_event, hosted},
        },
        models::AppointmentEntity,
        service::{
            appointments::BookAppointmentReq,
            orders::CreateOrderReq,
            testing::{ADMIN, ALICE, BOB, Fixture},
        },
        store::Store,
    };

    async fn booked(fx: &Fixture) -> AppointmentEntity {
        let patient = fx.store.insert_patient(ALICE.user_id, "Alice").await;
        let slot = fx
            .store
            .insert_slot(
                NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
                NaiveTime::from_hms_opt(14, 30, 0).unwrap(),
                1,
            )
            .await;
        fx.service
            .book_appointment(
                ALICE,
                BookAppointmentReq {
                    appointment_date: Some("2026-11-03".into()),
                    start_time: Some("14:30".into()),
                    patient_id: Some(patient.id),
                    slot_id: Some(slot.id),
                    fee: Some(45.5),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
    }

    fn appointment_details(appointment: &AppointmentEntity) -> OrderDetails {
        OrderDetails::Appointment {
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            user_id: ALICE.user_id,
        }
    }

    fn signed(fx: Fixture, payload: &str, event: GatewayEvent) -> Fixture {
        let mut gateway = MockPaymentGateway::new();
        expect_event(&mut gateway, payload, event);
        fx.with_gateway(gateway)
    }

    #[tokio::test]
    async fn appointment_checkout_carries_order_details() -> TestResult {
        let fx = Fixture::new();
        let appointment = booked(&fx).await;
        let expected = appointment_details(&appointment);

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout_session()
            .once()
            .withf(move |request| {
                let details = serde_json::from_str::<OrderDetails>(
                    &request.metadata[ORDER_DETAILS_KEY],
                );
                request.line_items.len() == 1
                    && request.line_items[0].unit_amount == 4550
                    && request.line_items[0].name == "Physiotherapy session on 2026-11-03 at 14:30"
                    && request.client_reference_id.as_deref() == Some("10")
                    && details.is_ok_and(|details| details == expected)
            })
            .return_once(|_| Ok(hosted("cs_test_1")));
        let fx = fx.with_gateway(gateway);

        let res = fx
            .service
            .create_appointment_checkout(ALICE, appointment.id)
            .await?;
        assert_eq!(res.session_id, "cs_test_1");
        assert_eq!(res.url.as_deref(), Some("https://checkout.test/cs_test_1"));
        Ok(())
    }

    #[tokio::test]
    async fn appointment_checkout_hides_which_ids_exist() -> TestResult {
        let fx = Fixture::new();
        let appointment = booked(&fx).await;

        let foreign = fx
            .service
            .create_appointment_checkout(BOB, appointment.id)
            .await
            .unwrap_err();
        let missing = fx
            .service
            .create_appointment_checkout(BOB, 999)
            .await
            .unwrap_err();
        assert!(matches!(foreign, AppError::Authorization(_)));
        assert!(matches!(missing, AppError::Authorization(_)));
        assert_eq!(foreign.to_string(), missing.to_string());

        let err = fx
            .service
            .create_appointment_checkout(ADMIN, 999)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    async fn generic_checkout_validates_items_and_order_ownership() -> TestResult {
        let fx = Fixture::new();
        fx.store.insert_product(7, "Foam roller", 25.0).await;
        let order = fx
            .service
            .create_order(
                ALICE,
                CreateOrderReq {
                    product_id: Some(7),
                    ..Default::default()
                },
            )
            .await?;
        let order_id = order.id;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout_session()
            .once()
            .withf(move |request| {
                request.metadata.get(ORDER_ID_KEY) == Some(&order_id.to_string())
                    && request.line_items[0].unit_amount == 2500
                    && request.line_items[0].quantity == 2
            })
            .return_once(|_| Ok(hosted("cs_test_2")));
        let fx = fx.with_gateway(gateway);

        let item = CheckoutItemReq {
            name: "Foam roller".into(),
            price: 25.0,
            quantity: 2,
            image: None,
        };

        let err = fx
            .service
            .create_checkout(ALICE, CheckoutReq::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = fx
            .service
            .create_checkout(
                BOB,
                CheckoutReq {
                    items: vec![item.clone()],
                    order_id: Some(order_id),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let res = fx
            .service
            .create_checkout(
                ALICE,
                CheckoutReq {
                    items: vec![item],
                    order_id: Some(order_id),
                },
            )
            .await?;
        assert_eq!(res.session_id, "cs_test_2");
        Ok(())
    }

    #[tokio::test]
    async fn gateway_timeouts_surface_as_retryable() -> TestResult {
        let fx = Fixture::new();
        let appointment = booked(&fx).await;

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_checkout_session()
            .returning(|_| Err(GatewayError::Timeout));
        let fx = fx.with_gateway(gateway);

        let err = fx
            .service
            .create_appointment_checkout(ALICE, appointment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
        Ok(())
    }

    #[tokio::test]
    async fn replayed_webhook_records_one_payment() -> TestResult {
        let fx = Fixture::new();
        let appointment = booked(&fx).await;
        let event = GatewayEvent::CheckoutCompleted(completed(
            "cs_test_9",
            "pi_123",
            4550,
            &appointment_details(&appointment),
        ));
        let fx = signed(fx, "evt_9", event);

        let first = fx
            .service
            .handle_webhook("evt_9", Some(VALID_SIGNATURE))
            .await?;
        let second = fx
            .service
            .handle_webhook("evt_9", Some(VALID_SIGNATURE))
            .await?;

        assert_eq!(
            first,
            WebhookOutcome::Recorded {
                transaction_id: "pi_123".into()
            }
        );
        assert_eq!(
            second,
            WebhookOutcome::Duplicate {
                transaction_id: "pi_123".into()
            }
        );

        let payments = fx.store.payments().await;
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, 45.5);
        assert_eq!(payments[0].appointment_id, Some(appointment.id));
        assert_eq!(payments[0].user_id, ALICE.user_id);

        let paid = fx.store.find_appointment(appointment.id).await?.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_id.as_deref(), Some("pi_123"));
        assert_eq!(paid.status, AppointmentStatus::Scheduled);

        let verified = fx.service.verify_checkout(ALICE, "cs_test_9").await?;
        assert_eq!(verified.status, PaymentStatus::Paid);

        let err = fx
            .service
            .create_appointment_checkout(ALICE, appointment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        Ok(())
    }

    #[tokio::test]
    async fn verify_only_shows_the_payers_own_payment() -> TestResult {
        let fx = Fixture::new();
        let event = GatewayEvent::CheckoutCompleted(completed(
            "cs_alice",
            "pi_alice",
            5000,
            &OrderDetails::Product {
                user_id: ALICE.user_id,
                order_id: None,
            },
        ));
        let fx = signed(fx, "evt_alice", event);
        fx.service
            .handle_webhook("evt_alice", Some(VALID_SIGNATURE))
            .await?;

        let theirs = fx.service.verify_checkout(BOB, "cs_alice").await?;
        assert_eq!(theirs.status, PaymentStatus::Pending);
        assert!(theirs.payment.is_none());

        let own = fx.service.verify_checkout(ALICE, "cs_alice").await?;
        assert_eq!(own.status, PaymentStatus::Paid);
        assert_eq!(
            own.payment.map(|p| p.transaction_id).as_deref(),
            Some("pi_alice")
        );

        let audited = fx.service.verify_checkout(ADMIN, "cs_alice").await?;
        assert_eq!(audited.status, PaymentStatus::Paid);
        Ok(())
    }

    #[tokio::test]
    async fn unsigned_or_forged_webhooks_change_nothing() -> TestResult {
        let fx = Fixture::new();
        let appointment = booked(&fx).await;
        let event = GatewayEvent::CheckoutCompleted(completed(
            "cs_1",
            "pi_1",
            4550,
            &appointment_details(&appointment),
        ));
        let fx = signed(fx, "evt_1", event);

        let err = fx.service.handle_webhook("evt_1", None).await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));

        let err = fx
            .service
            .handle_webhook("evt_1", Some("t=1,v1=forged"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));

        assert!(fx.store.payments().await.is_empty());
        assert_eq!(
            fx.service.verify_checkout(ALICE, "cs_1").await?.status,
            PaymentStatus::Pending
        );
        Ok(())
    }

    #[tokio::test]
    async fn webhook_for_unknown_appointment_rolls_back() -> TestResult {
        let event = GatewayEvent::CheckoutCompleted(completed(
            "cs_2",
            "pi_2",
            1000,
            &OrderDetails::Appointment {
                appointment_id: 404,
                patient_id: 1,
                user_id: ALICE.user_id,
            },
        ));
        let fx = signed(Fixture::new(), "evt_2", event);

        let err = fx
            .service
            .handle_webhook("evt_2", Some(VALID_SIGNATURE))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(fx.store.payments().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn product_payments_are_recorded_without_appointment() -> TestResult {
        let event = GatewayEvent::CheckoutCompleted(completed(
            "cs_3",
            "pi_3",
            5000,
            &OrderDetails::Product {
                user_id: ALICE.user_id,
                order_id: None,
            },
        ));
        let fx = signed(Fixture::new(), "evt_3", event);

        fx.service
            .handle_webhook("evt_3", Some(VALID_SIGNATURE))
            .await?;

        let payments = fx.store.payments().await;
        assert_eq!(payments[0].payment_type, PaymentType::Product);
        assert_eq!(payments[0].amount, 50.0);
        assert_eq!(fx.store.total_revenue().await?, 50.0);

        let stats = fx.service.dashboard_stats(ADMIN).await?;
        assert_eq!(stats.total_revenue, 50.0);
        Ok(())
    }

    #[tokio::test]
    async fn unpaid_completions_report_their_own_event_type() -> TestResult {
        let mut checkout = completed(
            "cs_4",
            "pi_4",
            5000,
            &OrderDetails::Product {
                user_id: ALICE.user_id,
                order_id: None,
            },
        );
        checkout.event_type = "checkout.session.async_payment_succeeded".into();
        checkout.paid = false;
        let fx = signed(
            Fixture::new(),
            "evt_4",
            GatewayEvent::CheckoutCompleted(checkout),
        );

        let outcome = fx
            .service
            .handle_webhook("evt_4", Some(VALID_SIGNATURE))
            .await?;
        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event_type: "checkout.session.async_payment_succeeded".into()
            }
        );
        assert!(fx.store.payments().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn other_events_are_acknowledged_and_ignored() -> TestResult {
        let fx = signed(
            Fixture::new(),
            "evt_5",
            GatewayEvent::Ignored {
                event_type: "invoice.paid".into(),
            },
        );

        let outcome = fx
            .service
            .handle_webhook("evt_5", Some(VALID_SIGNATURE))
            .await?;
        assert_eq!(
            outcome,
            WebhookOutcome::Ignored {
                event_type: "invoice.paid".into()
            }
        );
        Ok(())
    }
}
