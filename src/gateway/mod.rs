//! Payment gateway port.
//!
//! The service never talks to the provider directly: it creates hosted
//! checkout sessions and decodes authenticated webhook events through
//! [`PaymentGateway`].

pub mod stripe;
#[cfg(test)]
pub mod testing;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::stripe::StripeGateway;

/// Metadata key holding the serialized [`OrderDetails`].
pub const ORDER_DETAILS_KEY: &str = "orderDetails";
/// Metadata key holding the product order id, when the checkout pays for one.
pub const ORDER_ID_KEY: &str = "orderId";

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("payment gateway timed out")]
    Timeout,

    #[error("payment gateway request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub name: String,
    /// Price of one unit in minor currency units.
    pub unit_amount: i64,
    pub quantity: u64,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutRequest {
    pub line_items: Vec<LineItem>,
    pub metadata: HashMap<String, String>,
    pub client_reference_id: Option<String>,
}

/// A hosted checkout created at the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySession {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CompletedCheckout {
    /// Gateway event name, e.g. `checkout.session.async_payment_succeeded`.
    pub event_type: String,
    pub session_id: String,
    /// Payment intent id when the gateway reports one, else the session id.
    pub transaction_id: String,
    /// Amount charged in minor currency units.
    pub amount_total: Option<i64>,
    pub paid: bool,
    pub method: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayEvent {
    CheckoutCompleted(CompletedCheckout),
    Ignored { event_type: String },
}

/// What a checkout pays for. Travels through the gateway as JSON in the
/// session metadata and comes back on the completion event.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderDetails {
    #[serde(rename_all = "camelCase")]
    Appointment {
        appointment_id: i32,
        patient_id: i32,
        user_id: i32,
    },
    #[serde(rename_all = "camelCase")]
    Product {
        user_id: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order_id: Option<i32>,
    },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<GatewaySession, GatewayError>;

    /// Verifies the payload signature and decodes the event.
    fn construct_event(&self, payload: &str, signature: &str)
    -> Result<GatewayEvent, GatewayError>;
}
