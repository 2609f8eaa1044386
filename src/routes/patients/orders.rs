use axum::{
    Extension,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware::{self, Session},
    models::ProductOrderEntity,
    service::orders::{CancelOrderReq, CreateOrderReq, OrderFilter},
};

/// Patient-facing order routes. Every route requires a session.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/patients/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_orders, create_order))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(cancel_order))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::session_authorization,
            )),
    )
}

/// Fetch the caller's orders, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(OrderFilter),
    responses(
        (status = 200, description = "List own orders", body = StdResponse<Vec<ProductOrderEntity>, String>),
        (status = 400, description = "Unknown status filter")
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(filter): Query<OrderFilter>,
) -> Result<impl IntoResponse, AppError> {
    let orders = state.service.list_my_orders(session, filter).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

/// Place a product order.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    request_body = CreateOrderReq,
    responses(
        (status = 201, description = "Created order successfully", body = StdResponse<ProductOrderEntity, String>),
        (status = 400, description = "Invalid order"),
        (status = 404, description = "Unknown product")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(body): AppJson<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.service.create_order(session, body).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(order),
            message: Some("Create order successfully"),
        },
    ))
}

/// Fetch one order owned by the caller.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<ProductOrderEntity, String>),
        (status = 403, description = "Order belongs to someone else")
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.service.get_order(session, id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

/// Request cancellation of a pending or approved order.
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tags = ["Orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to cancel")
    ),
    request_body = CancelOrderReq,
    responses(
        (status = 200, description = "Cancellation requested", body = StdResponse<ProductOrderEntity, String>),
        (status = 400, description = "Missing reason or order can no longer be cancelled"),
        (status = 403, description = "Order belongs to someone else")
    )
)]
async fn cancel_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(body): AppJson<CancelOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.service.cancel_order(session, id, body).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order cancellation requested"),
    })
}
