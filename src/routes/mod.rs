pub mod dashboard;
pub mod orders;
pub mod patients;
pub mod payments;

use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

/// Every API route, with its OpenAPI description.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    patients::appointments::routes_with_openapi(state)
        .merge(patients::orders::routes_with_openapi(state))
        .merge(patients::carts::routes_with_openapi(state))
        .merge(orders::routes_with_openapi(state))
        .merge(dashboard::routes_with_openapi(state))
        .merge(payments::routes_with_openapi(state))
}
