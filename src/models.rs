use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::{
    Selectable,
    prelude::{Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::status::{AppointmentStatus, OrderStatus, PaymentStatus, PaymentType};

// Patients

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::patients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct PatientEntity {
    pub id: i32,
    pub user_id: i32,
    pub full_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub medical_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Appointments

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::appointment_slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSlotEntity {
    pub id: i32,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub capacity: i32,
    pub booked_count: i32,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct AppointmentEntity {
    pub id: i32,
    pub patient_id: i32,
    pub slot_id: i32,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration: i32,
    pub fee: f64,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::appointments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateAppointmentEntity {
    pub patient_id: i32,
    pub slot_id: i32,
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub duration: i32,
    pub fee: f64,
    pub reason: Option<String>,
    pub status: AppointmentStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
}

// Catalog

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ProductEntity {
    pub id: i32,
    pub name: String,
    pub price: f64,
    pub image: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

// Carts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartEntity {
    pub id: i32,
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line. Name, price and image are copied from the catalog when the
/// item is added and are not kept in sync afterwards.
#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemEntity {
    #[serde(skip)]
    pub id: i32,
    #[serde(skip)]
    pub cart_id: i32,
    #[serde(rename = "id")]
    pub product_id: i32,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub image: Option<String>,
    pub option: Option<String>,
    #[serde(skip)]
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct CreateCartItemEntity {
    pub cart_id: i32,
    pub product_id: i32,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub image: Option<String>,
    pub option: Option<String>,
}

// Orders

#[derive(Queryable, Serialize, Selectable, Identifiable, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::product_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct ProductOrderEntity {
    pub id: i32,
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub total_price: f64,
    #[schema(value_type = Object)]
    pub customizations: Value,
    pub status: OrderStatus,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::product_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreateProductOrderEntity {
    pub user_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub total_price: f64,
    pub customizations: Value,
    pub status: OrderStatus,
}

// Payments

#[derive(Queryable, Serialize, Selectable, Identifiable, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct PaymentEntity {
    pub id: i32,
    pub transaction_id: String,
    pub session_id: Option<String>,
    pub amount: f64,
    pub method: String,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    pub appointment_id: Option<i32>,
    pub patient_id: Option<i32>,
    /// The user the payment was made for.
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CreatePaymentEntity {
    pub transaction_id: String,
    pub session_id: Option<String>,
    pub amount: f64,
    pub method: String,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    pub appointment_id: Option<i32>,
    pub patient_id: Option<i32>,
    pub user_id: i32,
}
