use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use physio_clinicservice::{
    app_state::AppState,
    bootstrap, config, db,
    gateway::StripeGateway,
    routes,
    service::ClinicService,
    store::PgStore,
    swagger,
};

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(db::MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let pool = db::create_pool(&config.database).await?;
    let store = PgStore::new(pool, config.database.timeout);
    let gateway = StripeGateway::new(&config.stripe)?;
    let service = ClinicService::new(
        Arc::new(store),
        Arc::new(gateway),
        config.clinic.clone(),
    );
    let state = AppState::new(service, &config.auth.session_secret);

    let routes = routes::routes_with_openapi(&state);

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Physio ClinicService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi);

    let app = Router::new()
        .merge(routes)
        .merge(swagger_ui)
        .with_state(state);

    tracing::info!("Bootstrapping...");
    bootstrap::serve("ClinicService", app, config.server.port).await?;
    Ok(())
}
