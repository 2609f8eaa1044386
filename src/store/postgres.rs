use std::{future::Future, time::Duration};

use async_trait::async_trait;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, dsl::count_star};
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl, pooled_connection::bb8::PooledConnection,
};

use crate::{
    db::DbPool,
    models::{
        AppointmentEntity, CartEntity, CartItemEntity, CreateAppointmentEntity,
        CreatePaymentEntity, CreateProductOrderEntity, PatientEntity, PaymentEntity,
        ProductEntity, ProductOrderEntity,
    },
    schema::{
        appointment_slots, appointments, cart_items, carts, patients, payments, product_orders,
        products,
    },
    status::{AppointmentStatus, OrderStatus, PaymentStatus, PaymentType},
    store::{
        NewCartItem, OrderPage, OrderQuery, OrderTransition, ReconcileOutcome, Store, StoreError,
    },
};

/// [`Store`] backed by PostgreSQL through a bb8 pool of async diesel
/// connections. Every call is bounded by `timeout`, pool checkout included.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: DbPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn conn(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|err| StoreError::Pool(err.to_string()))
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout)?
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_patient(&self, id: i32) -> Result<Option<PatientEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let patient = patients::table
                .find(id)
                .select(PatientEntity::as_select())
                .get_result(conn)
                .await
                .optional()?;

            Ok(patient)
        })
        .await
    }

    async fn find_patient_by_user(
        &self,
        user_id: i32,
    ) -> Result<Option<PatientEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let patient = patients::table
                .filter(patients::user_id.eq(user_id))
                .select(PatientEntity::as_select())
                .get_result(conn)
                .await
                .optional()?;

            Ok(patient)
        })
        .await
    }

    async fn count_patients(&self) -> Result<i64, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;
            let total: i64 = patients::table.count().get_result(conn).await?;
            Ok(total)
        })
        .await
    }

    async fn book_appointment(
        &self,
        appointment: CreateAppointmentEntity,
    ) -> Result<AppointmentEntity, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            conn.transaction(move |conn| {
                Box::pin(async move {
                    let slot_id = appointment.slot_id;

                    let claimed = diesel::update(appointment_slots::table.find(slot_id))
                        .filter(appointment_slots::is_available.eq(true))
                        .filter(appointment_slots::booked_count.lt(appointment_slots::capacity))
                        .set((
                            appointment_slots::booked_count
                                .eq(appointment_slots::booked_count + 1),
                            appointment_slots::is_available
                                .eq((appointment_slots::booked_count + 1)
                                    .lt(appointment_slots::capacity)),
                            appointment_slots::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await?;

                    if claimed == 0 {
                        let exists: i64 = appointment_slots::table
                            .find(slot_id)
                            .count()
                            .get_result(conn)
                            .await?;

                        return Err(if exists == 0 {
                            StoreError::NotFound("Appointment slot")
                        } else {
                            StoreError::Conflict("Appointment slot is no longer available".into())
                        });
                    }

                    let created = diesel::insert_into(appointments::table)
                        .values(&appointment)
                        .returning(AppointmentEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    if let Some(transaction_id) = created.payment_id.clone() {
                        let user_id: i32 = patients::table
                            .find(created.patient_id)
                            .select(patients::user_id)
                            .get_result(conn)
                            .await?;

                        let inserted = diesel::insert_into(payments::table)
                            .values(CreatePaymentEntity {
                                transaction_id: transaction_id.clone(),
                                session_id: None,
                                amount: created.fee,
                                method: "external".into(),
                                status: PaymentStatus::Paid,
                                payment_type: PaymentType::Appointment,
                                appointment_id: Some(created.id),
                                patient_id: Some(created.patient_id),
                                user_id,
                            })
                            .on_conflict(payments::transaction_id)
                            .do_nothing()
                            .execute(conn)
                            .await?;

                        if inserted == 0 {
                            return Err(StoreError::Conflict(format!(
                                "Payment {transaction_id} is already recorded"
                            )));
                        }
                    }

                    Ok::<AppointmentEntity, StoreError>(created)
                })
            })
            .await
        })
        .await
    }

    async fn find_appointment(&self, id: i32) -> Result<Option<AppointmentEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let appointment = appointments::table
                .find(id)
                .select(AppointmentEntity::as_select())
                .get_result(conn)
                .await
                .optional()?;

            Ok(appointment)
        })
        .await
    }

    async fn list_patient_appointments(
        &self,
        patient_id: i32,
    ) -> Result<Vec<AppointmentEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let appointments = appointments::table
                .filter(appointments::patient_id.eq(patient_id))
                .order_by((
                    appointments::appointment_date.desc(),
                    appointments::start_time.desc(),
                ))
                .select(AppointmentEntity::as_select())
                .get_results(conn)
                .await?;

            Ok(appointments)
        })
        .await
    }

    async fn cancel_appointment(
        &self,
        id: i32,
        from: &[AppointmentStatus],
    ) -> Result<AppointmentEntity, StoreError> {
        let from = from.to_vec();

        self.bounded(async {
            let conn = &mut self.conn().await?;

            conn.transaction(move |conn| {
                Box::pin(async move {
                    let cancelled = diesel::update(appointments::table.find(id))
                        .filter(appointments::status.eq_any(from))
                        .set((
                            appointments::status.eq(AppointmentStatus::Cancelled),
                            appointments::updated_at.eq(diesel::dsl::now),
                        ))
                        .returning(AppointmentEntity::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;

                    let Some(cancelled) = cancelled else {
                        let exists: i64 =
                            appointments::table.find(id).count().get_result(conn).await?;

                        return Err(if exists == 0 {
                            StoreError::NotFound("Appointment")
                        } else {
                            StoreError::Conflict("Appointment can no longer be cancelled".into())
                        });
                    };

                    diesel::update(appointment_slots::table.find(cancelled.slot_id))
                        .filter(appointment_slots::booked_count.gt(0))
                        .set((
                            appointment_slots::booked_count
                                .eq(appointment_slots::booked_count - 1),
                            appointment_slots::is_available.eq(true),
                            appointment_slots::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)
                        .await?;

                    Ok::<AppointmentEntity, StoreError>(cancelled)
                })
            })
            .await
        })
        .await
    }

    async fn count_appointments(&self) -> Result<(i64, i64), StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let total: i64 = appointments::table.count().get_result(conn).await?;
            let awaiting_payment: i64 = appointments::table
                .filter(appointments::payment_status.eq(PaymentStatus::Pending))
                .filter(appointments::status.ne(AppointmentStatus::Cancelled))
                .count()
                .get_result(conn)
                .await?;

            Ok((total, awaiting_payment))
        })
        .await
    }

    async fn find_product(&self, id: i32) -> Result<Option<ProductEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let product = products::table
                .find(id)
                .select(ProductEntity::as_select())
                .get_result(conn)
                .await
                .optional()?;

            Ok(product)
        })
        .await
    }

    async fn create_order(
        &self,
        order: CreateProductOrderEntity,
    ) -> Result<ProductOrderEntity, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let order = diesel::insert_into(product_orders::table)
                .values(order)
                .returning(ProductOrderEntity::as_returning())
                .get_result(conn)
                .await?;

            Ok(order)
        })
        .await
    }

    async fn find_order(&self, id: i32) -> Result<Option<ProductOrderEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let order = product_orders::table
                .find(id)
                .select(ProductOrderEntity::as_select())
                .get_result(conn)
                .await
                .optional()?;

            Ok(order)
        })
        .await
    }

    async fn list_orders(&self, query: OrderQuery) -> Result<OrderPage, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let mut rows = product_orders::table
                .select(ProductOrderEntity::as_select())
                .into_boxed();
            let mut count = product_orders::table.select(count_star()).into_boxed();

            if let Some(user_id) = query.user_id {
                rows = rows.filter(product_orders::user_id.eq(user_id));
                count = count.filter(product_orders::user_id.eq(user_id));
            }

            if let Some(status) = query.status {
                rows = rows.filter(product_orders::status.eq(status));
                count = count.filter(product_orders::status.eq(status));
            }

            rows = rows.order_by((
                product_orders::created_at.desc(),
                product_orders::id.desc(),
            ));

            if let Some((limit, offset)) = query.window {
                rows = rows.limit(limit).offset(offset);
            }

            let orders = rows.get_results(conn).await?;
            let total: i64 = count.get_result(conn).await?;

            Ok(OrderPage { orders, total })
        })
        .await
    }

    async fn count_orders_by_status(&self) -> Result<Vec<(OrderStatus, i64)>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let counts: Vec<(OrderStatus, i64)> = product_orders::table
                .group_by(product_orders::status)
                .select((product_orders::status, count_star()))
                .get_results(conn)
                .await?;

            Ok(counts)
        })
        .await
    }

    async fn transition_order(
        &self,
        transition: OrderTransition,
    ) -> Result<ProductOrderEntity, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            conn.transaction(move |conn| {
                Box::pin(async move {
                    let id = transition.order_id;

                    let current: Option<ProductOrderEntity> = product_orders::table
                        .find(id)
                        .select(ProductOrderEntity::as_select())
                        .for_update()
                        .get_result(conn)
                        .await
                        .optional()?;

                    let Some(current) = current else {
                        return Err(StoreError::NotFound("Order"));
                    };

                    if current.status != transition.expected {
                        return Err(StoreError::Conflict(format!(
                            "Order is now {} and cannot be moved to {}",
                            current.status, transition.next
                        )));
                    }

                    let notes = transition.notes.apply(current.admin_notes.as_deref());

                    let updated = diesel::update(product_orders::table.find(id))
                        .filter(product_orders::status.eq(transition.expected))
                        .set((
                            product_orders::status.eq(transition.next),
                            product_orders::admin_notes.eq(notes),
                            product_orders::updated_at.eq(diesel::dsl::now),
                        ))
                        .returning(ProductOrderEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    Ok::<ProductOrderEntity, StoreError>(updated)
                })
            })
            .await
        })
        .await
    }

    async fn load_cart(&self, user_id: i32) -> Result<Vec<CartItemEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let items = cart_items::table
                .inner_join(carts::table)
                .filter(carts::user_id.eq(user_id))
                .order_by(cart_items::id.asc())
                .select(CartItemEntity::as_select())
                .get_results(conn)
                .await?;

            Ok(items)
        })
        .await
    }

    async fn replace_cart(
        &self,
        user_id: i32,
        items: Vec<NewCartItem>,
    ) -> Result<Vec<CartItemEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            conn.transaction(move |conn| {
                Box::pin(async move {
                    let cart: CartEntity = diesel::insert_into(carts::table)
                        .values(carts::user_id.eq(user_id))
                        .on_conflict(carts::user_id)
                        .do_update()
                        .set(carts::updated_at.eq(diesel::dsl::now))
                        .returning(CartEntity::as_returning())
                        .get_result(conn)
                        .await?;

                    diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                        .execute(conn)
                        .await?;

                    let mut saved = Vec::with_capacity(items.len());
                    for item in items {
                        let row = diesel::insert_into(cart_items::table)
                            .values(item.into_entity(cart.id))
                            .returning(CartItemEntity::as_returning())
                            .get_result(conn)
                            .await?;
                        saved.push(row);
                    }

                    Ok::<Vec<CartItemEntity>, StoreError>(saved)
                })
            })
            .await
        })
        .await
    }

    async fn record_payment(
        &self,
        payment: CreatePaymentEntity,
    ) -> Result<ReconcileOutcome, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            conn.transaction(move |conn| {
                Box::pin(async move {
                    let inserted: Option<PaymentEntity> = diesel::insert_into(payments::table)
                        .values(&payment)
                        .on_conflict(payments::transaction_id)
                        .do_nothing()
                        .returning(PaymentEntity::as_returning())
                        .get_result(conn)
                        .await
                        .optional()?;

                    let Some(inserted) = inserted else {
                        let existing = payments::table
                            .filter(payments::transaction_id.eq(&payment.transaction_id))
                            .select(PaymentEntity::as_select())
                            .get_result(conn)
                            .await?;

                        return Ok(ReconcileOutcome::Duplicate(existing));
                    };

                    if let Some(appointment_id) = inserted.appointment_id {
                        let updated = diesel::update(appointments::table.find(appointment_id))
                            .set((
                                appointments::payment_status.eq(PaymentStatus::Paid),
                                appointments::payment_id.eq(&inserted.transaction_id),
                                appointments::updated_at.eq(diesel::dsl::now),
                            ))
                            .execute(conn)
                            .await?;

                        if updated == 0 {
                            return Err(StoreError::NotFound("Appointment"));
                        }

                        diesel::update(appointments::table.find(appointment_id))
                            .filter(
                                appointments::status.eq_any(AppointmentStatus::sources_of(
                                    AppointmentStatus::Scheduled,
                                )),
                            )
                            .set(appointments::status.eq(AppointmentStatus::Scheduled))
                            .execute(conn)
                            .await?;
                    }

                    Ok::<ReconcileOutcome, StoreError>(ReconcileOutcome::Recorded(inserted))
                })
            })
            .await
        })
        .await
    }

    async fn find_payment_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<PaymentEntity>, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let payment = payments::table
                .filter(payments::session_id.eq(session_id))
                .order_by(payments::id.asc())
                .select(PaymentEntity::as_select())
                .first(conn)
                .await
                .optional()?;

            Ok(payment)
        })
        .await
    }

    async fn total_revenue(&self) -> Result<f64, StoreError> {
        self.bounded(async {
            let conn = &mut self.conn().await?;

            let revenue: Option<f64> = payments::table
                .filter(payments::status.eq(PaymentStatus::Paid))
                .select(diesel::dsl::sum(payments::amount))
                .get_result(conn)
                .await?;

            Ok(revenue.unwrap_or(0.0))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;
    use testresult::TestResult;

    use super::*;
    use crate::{store::NotesUpdate, test::TestDb};

    fn appointment(patient_id: i32, slot_id: i32) -> CreateAppointmentEntity {
        CreateAppointmentEntity {
            patient_id,
            slot_id,
            appointment_date: NaiveDate::from_ymd_opt(2026, 11, 3).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            duration: 60,
            fee: 45.5,
            reason: None,
            status: AppointmentStatus::Confirmed,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
        }
    }

    fn payment(
        transaction_id: &str,
        appointment: &AppointmentEntity,
        user_id: i32,
    ) -> CreatePaymentEntity {
        CreatePaymentEntity {
            transaction_id: transaction_id.into(),
            session_id: Some("cs_pg".into()),
            amount: appointment.fee,
            method: "stripe_checkout".into(),
            status: PaymentStatus::Paid,
            payment_type: PaymentType::Appointment,
            appointment_id: Some(appointment.id),
            patient_id: Some(appointment.patient_id),
            user_id,
        }
    }

    #[tokio::test]
    #[ignore = "starts a PostgreSQL container"]
    async fn concurrent_bookings_claim_the_last_place_once() -> TestResult {
        let db = TestDb::new().await;
        let user = db.user("alice@example.com").await;
        let patient = db.patient(user).await;
        let slot = db.slot(1).await;

        let (first, second) = tokio::join!(
            db.store.book_appointment(appointment(patient, slot)),
            db.store.book_appointment(appointment(patient, slot)),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(StoreError::Conflict(_))))
        );

        let state = db.slot_state(slot).await;
        assert_eq!(state.booked_count, 1);
        assert!(!state.is_available);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "starts a PostgreSQL container"]
    async fn slot_stays_available_until_full() -> TestResult {
        let db = TestDb::new().await;
        let patient = db.patient(db.user("alice@example.com").await).await;
        let slot = db.slot(2).await;

        db.store.book_appointment(appointment(patient, slot)).await?;
        let state = db.slot_state(slot).await;
        assert_eq!(state.booked_count, 1);
        assert!(state.is_available);

        db.store.book_appointment(appointment(patient, slot)).await?;
        let state = db.slot_state(slot).await;
        assert_eq!(state.booked_count, 2);
        assert!(!state.is_available);

        let err = db
            .store
            .book_appointment(appointment(patient, slot + 1000))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        Ok(())
    }

    #[tokio::test]
    #[ignore = "starts a PostgreSQL container"]
    async fn cancelling_releases_the_place() -> TestResult {
        let db = TestDb::new().await;
        let patient = db.patient(db.user("alice@example.com").await).await;
        let slot = db.slot(1).await;
        let booked = db.store.book_appointment(appointment(patient, slot)).await?;
        let cancellable = AppointmentStatus::sources_of(AppointmentStatus::Cancelled);

        let cancelled = db.store.cancel_appointment(booked.id, &cancellable).await?;
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let state = db.slot_state(slot).await;
        assert_eq!(state.booked_count, 0);
        assert!(state.is_available);

        let err = db
            .store
            .cancel_appointment(booked.id, &cancellable)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(db.slot_state(slot).await.booked_count, 0);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "starts a PostgreSQL container"]
    async fn replayed_payments_are_recorded_once() -> TestResult {
        let db = TestDb::new().await;
        let user = db.user("alice@example.com").await;
        let patient = db.patient(user).await;
        let slot = db.slot(1).await;
        let booked = db.store.book_appointment(appointment(patient, slot)).await?;

        let (first, second) = tokio::join!(
            db.store.record_payment(payment("pi_pg", &booked, user)),
            db.store.record_payment(payment("pi_pg", &booked, user)),
        );
        let outcomes = [first?, second?];
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, ReconcileOutcome::Recorded(_)))
                .count(),
            1
        );
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, ReconcileOutcome::Duplicate(_)))
                .count(),
            1
        );

        let replay = db
            .store
            .record_payment(payment("pi_pg", &booked, user))
            .await?;
        assert!(matches!(replay, ReconcileOutcome::Duplicate(p) if p.user_id == user));
        assert_eq!(db.payment_count().await, 1);

        let paid = db.store.find_appointment(booked.id).await?.unwrap();
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_id.as_deref(), Some("pi_pg"));
        assert_eq!(paid.status, AppointmentStatus::Scheduled);

        let found = db.store.find_payment_by_session("cs_pg").await?.unwrap();
        assert_eq!(found.transaction_id, "pi_pg");
        assert_eq!(db.store.total_revenue().await?, 45.5);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "starts a PostgreSQL container"]
    async fn prepaid_booking_writes_its_payment() -> TestResult {
        let db = TestDb::new().await;
        let user = db.user("alice@example.com").await;
        let patient = db.patient(user).await;
        let slot = db.slot(2).await;

        let mut prepaid = appointment(patient, slot);
        prepaid.payment_status = PaymentStatus::Paid;
        prepaid.payment_id = Some("pi_external".into());

        let booked = db.store.book_appointment(prepaid.clone()).await?;
        assert_eq!(booked.payment_id.as_deref(), Some("pi_external"));
        assert_eq!(db.payment_count().await, 1);

        let err = db.store.book_appointment(prepaid).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(db.payment_count().await, 1);
        assert_eq!(db.slot_state(slot).await.booked_count, 1);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "starts a PostgreSQL container"]
    async fn payment_for_missing_appointment_rolls_back() -> TestResult {
        let db = TestDb::new().await;
        let user = db.user("alice@example.com").await;
        let patient = db.patient(user).await;
        let slot = db.slot(1).await;
        let booked = db.store.book_appointment(appointment(patient, slot)).await?;

        let mut orphan = payment("pi_orphan", &booked, user);
        orphan.appointment_id = Some(booked.id + 1000);

        let err = db.store.record_payment(orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_) | StoreError::NotFound(_)));
        assert_eq!(db.payment_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "starts a PostgreSQL container"]
    async fn stale_order_transitions_are_refused() -> TestResult {
        let db = TestDb::new().await;
        let user = db.user("alice@example.com").await;
        let product = db.product(25.0).await;

        let order = db
            .store
            .create_order(CreateProductOrderEntity {
                user_id: user,
                product_id: product,
                quantity: 2,
                total_price: 50.0,
                customizations: json!({}),
                status: OrderStatus::Pending,
            })
            .await?;

        let approve = OrderTransition {
            order_id: order.id,
            expected: OrderStatus::Pending,
            next: OrderStatus::Approved,
            notes: NotesUpdate::Replace("Approved by clinic".into()),
        };

        let approved = db.store.transition_order(approve.clone()).await?;
        assert_eq!(approved.status, OrderStatus::Approved);
        assert_eq!(approved.admin_notes.as_deref(), Some("Approved by clinic"));

        let err = db.store.transition_order(approve).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let reloaded = db.store.find_order(order.id).await?.unwrap();
        assert_eq!(reloaded.status, OrderStatus::Approved);

        let err = db
            .store
            .transition_order(OrderTransition {
                order_id: order.id + 1000,
                expected: OrderStatus::Pending,
                next: OrderStatus::Approved,
                notes: NotesUpdate::Keep,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let page = db
            .store
            .list_orders(OrderQuery {
                user_id: Some(user),
                status: Some(OrderStatus::Approved),
                window: Some((10, 0)),
            })
            .await?;
        assert_eq!(page.total, 1);
        assert_eq!(page.orders.len(), 1);
        Ok(())
    }
}
