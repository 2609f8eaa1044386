use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    middleware::{self, Session},
    store::DashboardStats,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/dashboard",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_stats))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::session_authorization,
            )),
    )
}

#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Aggregate clinic figures", body = StdResponse<DashboardStats, String>),
        (status = 403, description = "Not an administrator")
    )
)]
async fn get_stats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state.service.dashboard_stats(session).await?;

    Ok(StdResponse {
        data: Some(stats),
        message: Some("Get dashboard stats successfully"),
    })
}
