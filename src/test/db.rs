//! Postgres-backed test databases.
//!
//! One container is started per test binary and shared. Every [`TestDb`] gets
//! its own freshly migrated database inside it, so tests never see each
//! other's rows.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use testcontainers::{ContainerAsync, ImageExt, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{
    config::DatabaseConfig,
    db::{self, DbPool},
    models::AppointmentSlotEntity,
    schema::{appointment_slots, patients, payments, products, users},
    status::Role,
    store::PgStore,
};

const USER: &str = "clinic_test";
const PASSWORD: &str = "clinic_test_password";

/// The container and its mapped port. The port is read once so later tests
/// never go back to the Docker client from another runtime.
static POSTGRES: OnceCell<(ContainerAsync<Postgres>, u16)> = OnceCell::const_new();

async fn start_postgres() -> (ContainerAsync<Postgres>, u16) {
    let container = Postgres::default()
        .with_user(USER)
        .with_password(PASSWORD)
        .with_db_name("clinic_test")
        .with_tag("16-alpine")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get container port");

    (container, port)
}

pub struct TestDb {
    pub pool: DbPool,
    pub store: PgStore,
}

impl TestDb {
    pub async fn new() -> Self {
        let (_, port) = POSTGRES.get_or_init(start_postgres).await;
        let host = std::env::var("TESTCONTAINERS_HOST_OVERRIDE")
            .unwrap_or_else(|_| "localhost".to_string());
        let base_url = format!("postgres://{USER}:{PASSWORD}@{host}:{port}");
        let name = format!("clinic_{}", Uuid::new_v4().simple());

        let mut admin = AsyncPgConnection::establish(&format!("{base_url}/postgres"))
            .await
            .expect("Failed to connect to postgres database");
        diesel::sql_query(format!("CREATE DATABASE \"{name}\""))
            .execute(&mut admin)
            .await
            .expect("Failed to create test database");

        let config = DatabaseConfig {
            url: format!("{base_url}/{name}"),
            max_connections: 8,
            timeout: Duration::from_secs(10),
        };

        db::run_migrations_blocking(db::MIGRATIONS, &config.url)
            .await
            .expect("Failed to run migrations on database");

        let pool = db::create_pool(&config)
            .await
            .expect("Failed to create pool for database");

        Self {
            store: PgStore::new(pool.clone(), config.timeout),
            pool,
        }
    }

    pub async fn user(&self, email: &str) -> i32 {
        let conn = &mut self.pool.get().await.unwrap();

        diesel::insert_into(users::table)
            .values((
                users::email.eq(email),
                users::name.eq(email),
                users::role.eq(Role::User),
            ))
            .returning(users::id)
            .get_result(conn)
            .await
            .unwrap()
    }

    pub async fn patient(&self, user_id: i32) -> i32 {
        let conn = &mut self.pool.get().await.unwrap();

        diesel::insert_into(patients::table)
            .values((
                patients::user_id.eq(user_id),
                patients::full_name.eq("Test Patient"),
            ))
            .returning(patients::id)
            .get_result(conn)
            .await
            .unwrap()
    }

    pub async fn slot(&self, capacity: i32) -> i32 {
        let conn = &mut self.pool.get().await.unwrap();

        diesel::insert_into(appointment_slots::table)
            .values((
                appointment_slots::slot_date.eq(NaiveDate::from_ymd_opt(2026, 11, 3).unwrap()),
                appointment_slots::start_time.eq(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
                appointment_slots::end_time.eq(NaiveTime::from_hms_opt(10, 0, 0).unwrap()),
                appointment_slots::capacity.eq(capacity),
            ))
            .returning(appointment_slots::id)
            .get_result(conn)
            .await
            .unwrap()
    }

    pub async fn product(&self, price: f64) -> i32 {
        let conn = &mut self.pool.get().await.unwrap();

        diesel::insert_into(products::table)
            .values((products::name.eq("Foam roller"), products::price.eq(price)))
            .returning(products::id)
            .get_result(conn)
            .await
            .unwrap()
    }

    pub async fn slot_state(&self, id: i32) -> AppointmentSlotEntity {
        let conn = &mut self.pool.get().await.unwrap();

        appointment_slots::table
            .find(id)
            .select(AppointmentSlotEntity::as_select())
            .get_result(conn)
            .await
            .unwrap()
    }

    pub async fn payment_count(&self) -> i64 {
        let conn = &mut self.pool.get().await.unwrap();
        payments::table.count().get_result(conn).await.unwrap()
    }
}
