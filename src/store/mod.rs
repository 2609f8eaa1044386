//! Persistence port.
//!
//! The lifecycle service only talks to storage through [`Store`]. Every method
//! that writes more than one row is atomic in every implementation: either
//! all of its writes land or none do.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    models::{
        AppointmentEntity, CartItemEntity, CreateAppointmentEntity, CreateCartItemEntity,
        CreatePaymentEntity, CreateProductOrderEntity, PatientEntity, PaymentEntity, ProductEntity,
        ProductOrderEntity,
    },
    status::{AppointmentStatus, OrderStatus},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("database call timed out")]
    Timeout,

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

/// Cart line as submitted by the client, before it is attached to a cart.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartItem {
    pub product_id: i32,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub image: Option<String>,
    pub option: Option<String>,
}

impl NewCartItem {
    pub fn into_entity(self, cart_id: i32) -> CreateCartItemEntity {
        CreateCartItemEntity {
            cart_id,
            product_id: self.product_id,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
            image: self.image,
            option: self.option,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderQuery {
    pub user_id: Option<i32>,
    pub status: Option<OrderStatus>,
    /// `(limit, offset)`; `None` returns every matching row.
    pub window: Option<(i64, i64)>,
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<ProductOrderEntity>,
    pub total: i64,
}

/// Compare-and-set status change: applied only while the order is still in
/// `expected`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTransition {
    pub order_id: i32,
    pub expected: OrderStatus,
    pub next: OrderStatus,
    pub notes: NotesUpdate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotesUpdate {
    Keep,
    Replace(String),
    Append(String),
}

impl NotesUpdate {
    pub fn apply(&self, current: Option<&str>) -> Option<String> {
        match self {
            NotesUpdate::Keep => current.map(str::to_string),
            NotesUpdate::Replace(notes) => Some(notes.clone()),
            NotesUpdate::Append(line) => match current {
                Some(existing) if !existing.is_empty() => Some(format!("{existing}\n{line}")),
                _ => Some(line.clone()),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The payment row was inserted and any linked appointment updated.
    Recorded(PaymentEntity),
    /// A payment with the same transaction id already existed; nothing changed.
    Duplicate(PaymentEntity),
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_patients: i64,
    pub total_appointments: i64,
    pub appointments_awaiting_payment: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub total_revenue: f64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_patient(&self, id: i32) -> Result<Option<PatientEntity>, StoreError>;

    async fn find_patient_by_user(&self, user_id: i32)
    -> Result<Option<PatientEntity>, StoreError>;

    async fn count_patients(&self) -> Result<i64, StoreError>;

    /// Claims one place in the slot and inserts the appointment. When the
    /// appointment arrives already paid, its payment row is written too.
    async fn book_appointment(
        &self,
        appointment: CreateAppointmentEntity,
    ) -> Result<AppointmentEntity, StoreError>;

    async fn find_appointment(&self, id: i32) -> Result<Option<AppointmentEntity>, StoreError>;

    async fn list_patient_appointments(
        &self,
        patient_id: i32,
    ) -> Result<Vec<AppointmentEntity>, StoreError>;

    /// Cancels the appointment if it is still in one of `from`, releasing
    /// its slot place.
    async fn cancel_appointment(
        &self,
        id: i32,
        from: &[AppointmentStatus],
    ) -> Result<AppointmentEntity, StoreError>;

    /// Returns `(total, awaiting payment)`.
    async fn count_appointments(&self) -> Result<(i64, i64), StoreError>;

    async fn find_product(&self, id: i32) -> Result<Option<ProductEntity>, StoreError>;

    async fn create_order(
        &self,
        order: CreateProductOrderEntity,
    ) -> Result<ProductOrderEntity, StoreError>;

    async fn find_order(&self, id: i32) -> Result<Option<ProductOrderEntity>, StoreError>;

    async fn list_orders(&self, query: OrderQuery) -> Result<OrderPage, StoreError>;

    async fn count_orders_by_status(&self) -> Result<Vec<(OrderStatus, i64)>, StoreError>;

    async fn transition_order(
        &self,
        transition: OrderTransition,
    ) -> Result<ProductOrderEntity, StoreError>;

    /// Current cart snapshot; empty when the user has no cart yet.
    async fn load_cart(&self, user_id: i32) -> Result<Vec<CartItemEntity>, StoreError>;

    /// Replaces the whole cart, creating the cart row on first use.
    async fn replace_cart(
        &self,
        user_id: i32,
        items: Vec<NewCartItem>,
    ) -> Result<Vec<CartItemEntity>, StoreError>;

    /// Inserts the payment unless its transaction id is already known, and
    /// marks the linked appointment paid in the same transaction.
    async fn record_payment(
        &self,
        payment: CreatePaymentEntity,
    ) -> Result<ReconcileOutcome, StoreError>;

    async fn find_payment_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentEntity>, StoreError>;

    async fn total_revenue(&self) -> Result<f64, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appending_notes_joins_with_newlines() {
        let update = NotesUpdate::Append("Cancellation requested: moved away".into());
        assert_eq!(
            update.apply(Some("Called customer")),
            Some("Called customer\nCancellation requested: moved away".into())
        );
        assert_eq!(
            update.apply(None),
            Some("Cancellation requested: moved away".into())
        );
        assert_eq!(NotesUpdate::Keep.apply(None), None);
    }
}
