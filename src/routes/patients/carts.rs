use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware::{self, Session},
    models::CartItemEntity,
    service::carts::ReplaceCartReq,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/patients/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart, replace_cart))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::session_authorization,
            )),
    )
}

/// Fetch the caller's cart. Empty when nothing was saved yet.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current cart", body = StdResponse<Vec<CartItemEntity>, String>)
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.service.get_cart(session).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Get cart successfully"),
    })
}

/// Replace the whole cart with the submitted items.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    request_body = ReplaceCartReq,
    responses(
        (status = 200, description = "Saved cart", body = StdResponse<Vec<CartItemEntity>, String>),
        (status = 400, description = "Cart is not an array of valid items")
    )
)]
async fn replace_cart(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(body): AppJson<ReplaceCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let cart = state.service.replace_cart(session, body).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Cart saved successfully"),
    })
}
