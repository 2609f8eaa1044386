use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use tokio::sync::Mutex;

use crate::{
    models::{
        AppointmentEntity, AppointmentSlotEntity, CartEntity, CartItemEntity,
        CreateAppointmentEntity, CreatePaymentEntity, CreateProductOrderEntity, PatientEntity,
        PaymentEntity, ProductEntity, ProductOrderEntity,
    },
    status::{AppointmentStatus, OrderStatus, PaymentStatus, PaymentType},
    store::{
        NewCartItem, OrderPage, OrderQuery, OrderTransition, ReconcileOutcome, Store, StoreError,
    },
};

#[derive(Default, Debug)]
struct Tables {
    next_id: i32,
    patients: Vec<PatientEntity>,
    slots: HashMap<i32, AppointmentSlotEntity>,
    appointments: Vec<AppointmentEntity>,
    products: Vec<ProductEntity>,
    carts: Vec<CartEntity>,
    cart_items: Vec<CartItemEntity>,
    orders: Vec<ProductOrderEntity>,
    payments: Vec<PaymentEntity>,
}

impl Tables {
    fn id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// [`Store`] kept in process memory. A single lock guards all tables, so
/// every operation observes and leaves a consistent state.
#[derive(Default, Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_patient(&self, user_id: i32, full_name: &str) -> PatientEntity {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let patient = PatientEntity {
            id: tables.id(),
            user_id,
            full_name: full_name.to_string(),
            phone: None,
            date_of_birth: None,
            medical_notes: None,
            created_at: now,
            updated_at: now,
        };
        tables.patients.push(patient.clone());
        patient
    }

    pub async fn insert_slot(
        &self,
        slot_date: NaiveDate,
        start_time: NaiveTime,
        capacity: i32,
    ) -> AppointmentSlotEntity {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let slot = AppointmentSlotEntity {
            id: tables.id(),
            slot_date,
            start_time,
            end_time: start_time + chrono::Duration::hours(1),
            capacity,
            booked_count: 0,
            is_available: capacity > 0,
            created_at: now,
            updated_at: now,
        };
        tables.slots.insert(slot.id, slot.clone());
        slot
    }

    pub async fn insert_product(&self, id: i32, name: &str, price: f64) -> ProductEntity {
        let mut tables = self.tables.lock().await;
        let product = ProductEntity {
            id,
            name: name.to_string(),
            price,
            image: None,
            description: None,
            created_at: Utc::now(),
        };
        tables.products.push(product.clone());
        product
    }

    pub async fn slot(&self, id: i32) -> Option<AppointmentSlotEntity> {
        self.tables.lock().await.slots.get(&id).cloned()
    }

    pub async fn payments(&self) -> Vec<PaymentEntity> {
        self.tables.lock().await.payments.clone()
    }

    /// Forces an order into `status`, bypassing the transition rules.
    pub async fn set_order_status(&self, id: i32, status: OrderStatus) {
        let mut tables = self.tables.lock().await;
        if let Some(order) = tables.orders.iter_mut().find(|o| o.id == id) {
            order.status = status;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_patient(&self, id: i32) -> Result<Option<PatientEntity>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.patients.iter().find(|p| p.id == id).cloned())
    }

    async fn find_patient_by_user(
        &self,
        user_id: i32,
    ) -> Result<Option<PatientEntity>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.patients.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn count_patients(&self) -> Result<i64, StoreError> {
        Ok(self.tables.lock().await.patients.len() as i64)
    }

    async fn book_appointment(
        &self,
        appointment: CreateAppointmentEntity,
    ) -> Result<AppointmentEntity, StoreError> {
        let mut tables = self.tables.lock().await;

        if let Some(transaction_id) = &appointment.payment_id
            && tables
                .payments
                .iter()
                .any(|p| &p.transaction_id == transaction_id)
        {
            return Err(StoreError::Conflict(format!(
                "Payment {transaction_id} is already recorded"
            )));
        }

        let payer = match &appointment.payment_id {
            Some(_) => Some(
                tables
                    .patients
                    .iter()
                    .find(|p| p.id == appointment.patient_id)
                    .map(|p| p.user_id)
                    .ok_or(StoreError::NotFound("Patient"))?,
            ),
            None => None,
        };

        let slot = tables
            .slots
            .get_mut(&appointment.slot_id)
            .ok_or(StoreError::NotFound("Appointment slot"))?;

        if !slot.is_available || slot.booked_count >= slot.capacity {
            return Err(StoreError::Conflict(
                "Appointment slot is no longer available".into(),
            ));
        }

        let now = Utc::now();
        slot.booked_count += 1;
        slot.is_available = slot.booked_count < slot.capacity;
        slot.updated_at = now;

        let created = AppointmentEntity {
            id: tables.id(),
            patient_id: appointment.patient_id,
            slot_id: appointment.slot_id,
            appointment_date: appointment.appointment_date,
            start_time: appointment.start_time,
            duration: appointment.duration,
            fee: appointment.fee,
            reason: appointment.reason,
            status: appointment.status,
            payment_status: appointment.payment_status,
            payment_id: appointment.payment_id,
            created_at: now,
            updated_at: now,
        };

        if let (Some(transaction_id), Some(user_id)) = (created.payment_id.clone(), payer) {
            let payment = PaymentEntity {
                id: tables.id(),
                transaction_id,
                session_id: None,
                amount: created.fee,
                method: "external".into(),
                status: PaymentStatus::Paid,
                payment_type: PaymentType::Appointment,
                appointment_id: Some(created.id),
                patient_id: Some(created.patient_id),
                user_id,
                created_at: now,
            };
            tables.payments.push(payment);
        }

        tables.appointments.push(created.clone());
        Ok(created)
    }

    async fn find_appointment(&self, id: i32) -> Result<Option<AppointmentEntity>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.appointments.iter().find(|a| a.id == id).cloned())
    }

    async fn list_patient_appointments(
        &self,
        patient_id: i32,
    ) -> Result<Vec<AppointmentEntity>, StoreError> {
        let tables = self.tables.lock().await;
        let mut appointments: Vec<_> = tables
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by(|a, b| {
            (b.appointment_date, b.start_time).cmp(&(a.appointment_date, a.start_time))
        });
        Ok(appointments)
    }

    async fn cancel_appointment(
        &self,
        id: i32,
        from: &[AppointmentStatus],
    ) -> Result<AppointmentEntity, StoreError> {
        let mut tables = self.tables.lock().await;

        let appointment = tables
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound("Appointment"))?;

        if !from.contains(&appointment.status) {
            return Err(StoreError::Conflict(
                "Appointment can no longer be cancelled".into(),
            ));
        }

        let now = Utc::now();
        appointment.status = AppointmentStatus::Cancelled;
        appointment.updated_at = now;
        let cancelled = appointment.clone();

        if let Some(slot) = tables.slots.get_mut(&cancelled.slot_id)
            && slot.booked_count > 0
        {
            slot.booked_count -= 1;
            slot.is_available = true;
            slot.updated_at = now;
        }

        Ok(cancelled)
    }

    async fn count_appointments(&self) -> Result<(i64, i64), StoreError> {
        let tables = self.tables.lock().await;
        let awaiting = tables
            .appointments
            .iter()
            .filter(|a| {
                a.payment_status == PaymentStatus::Pending
                    && a.status != AppointmentStatus::Cancelled
            })
            .count();
        Ok((tables.appointments.len() as i64, awaiting as i64))
    }

    async fn find_product(&self, id: i32) -> Result<Option<ProductEntity>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn create_order(
        &self,
        order: CreateProductOrderEntity,
    ) -> Result<ProductOrderEntity, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let created = ProductOrderEntity {
            id: tables.id(),
            user_id: order.user_id,
            product_id: order.product_id,
            quantity: order.quantity,
            total_price: order.total_price,
            customizations: order.customizations,
            status: order.status,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };
        tables.orders.push(created.clone());
        Ok(created)
    }

    async fn find_order(&self, id: i32) -> Result<Option<ProductOrderEntity>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<OrderPage, StoreError> {
        let tables = self.tables.lock().await;

        let mut matching: Vec<ProductOrderEntity> = tables
            .orders
            .iter()
            .filter(|o| query.user_id.is_none_or(|user_id| o.user_id == user_id))
            .filter(|o| query.status.is_none_or(|status| o.status == status))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        let total = matching.len() as i64;
        let orders = match query.window {
            Some((limit, offset)) => matching
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect(),
            None => matching,
        };

        Ok(OrderPage { orders, total })
    }

    async fn count_orders_by_status(&self) -> Result<Vec<(OrderStatus, i64)>, StoreError> {
        let tables = self.tables.lock().await;
        let mut counts: HashMap<OrderStatus, i64> = HashMap::new();
        for order in &tables.orders {
            *counts.entry(order.status).or_default() += 1;
        }
        Ok(counts.into_iter().collect())
    }

    async fn transition_order(
        &self,
        transition: OrderTransition,
    ) -> Result<ProductOrderEntity, StoreError> {
        let mut tables = self.tables.lock().await;

        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == transition.order_id)
            .ok_or(StoreError::NotFound("Order"))?;

        if order.status != transition.expected {
            return Err(StoreError::Conflict(format!(
                "Order is now {} and cannot be moved to {}",
                order.status, transition.next
            )));
        }

        order.admin_notes = transition.notes.apply(order.admin_notes.as_deref());
        order.status = transition.next;
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    async fn load_cart(&self, user_id: i32) -> Result<Vec<CartItemEntity>, StoreError> {
        let tables = self.tables.lock().await;
        let Some(cart) = tables.carts.iter().find(|c| c.user_id == user_id) else {
            return Ok(Vec::new());
        };
        Ok(tables
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart.id)
            .cloned()
            .collect())
    }

    async fn replace_cart(
        &self,
        user_id: i32,
        items: Vec<NewCartItem>,
    ) -> Result<Vec<CartItemEntity>, StoreError> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();

        let cart_id = match tables.carts.iter_mut().find(|c| c.user_id == user_id) {
            Some(cart) => {
                cart.updated_at = now;
                cart.id
            }
            None => {
                let id = tables.id();
                tables.carts.push(CartEntity {
                    id,
                    user_id,
                    created_at: now,
                    updated_at: now,
                });
                id
            }
        };

        tables.cart_items.retain(|item| item.cart_id != cart_id);

        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            let row = item.into_entity(cart_id);
            let entity = CartItemEntity {
                id: tables.id(),
                cart_id: row.cart_id,
                product_id: row.product_id,
                name: row.name,
                price: row.price,
                quantity: row.quantity,
                image: row.image,
                option: row.option,
                created_at: now,
            };
            tables.cart_items.push(entity.clone());
            saved.push(entity);
        }

        Ok(saved)
    }

    async fn record_payment(
        &self,
        payment: CreatePaymentEntity,
    ) -> Result<ReconcileOutcome, StoreError> {
        let mut tables = self.tables.lock().await;

        if let Some(existing) = tables
            .payments
            .iter()
            .find(|p| p.transaction_id == payment.transaction_id)
        {
            return Ok(ReconcileOutcome::Duplicate(existing.clone()));
        }

        let now = Utc::now();

        if let Some(appointment_id) = payment.appointment_id {
            let appointment = tables
                .appointments
                .iter_mut()
                .find(|a| a.id == appointment_id)
                .ok_or(StoreError::NotFound("Appointment"))?;

            appointment.payment_status = PaymentStatus::Paid;
            appointment.payment_id = Some(payment.transaction_id.clone());
            appointment.updated_at = now;
            if appointment
                .status
                .can_transition_to(AppointmentStatus::Scheduled)
            {
                appointment.status = AppointmentStatus::Scheduled;
            }
        }

        let recorded = PaymentEntity {
            id: tables.id(),
            transaction_id: payment.transaction_id,
            session_id: payment.session_id,
            amount: payment.amount,
            method: payment.method,
            status: payment.status,
            payment_type: payment.payment_type,
            appointment_id: payment.appointment_id,
            patient_id: payment.patient_id,
            user_id: payment.user_id,
            created_at: now,
        };
        tables.payments.push(recorded.clone());

        Ok(ReconcileOutcome::Recorded(recorded))
    }

    async fn find_payment_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentEntity>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .iter()
            .find(|p| p.session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn total_revenue(&self) -> Result<f64, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Paid)
            .map(|p| p.amount)
            .sum())
    }
}
