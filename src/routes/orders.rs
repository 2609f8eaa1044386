use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware::{self, Session},
    models::ProductOrderEntity,
    service::orders::{AdminOrderQuery, OrderCountRes, OrderListRes, UpdateOrderStatusReq},
};

/// Administrator order management. The service rejects non-admin sessions.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders))
            .routes(utoipa_axum::routes!(count_orders))
            .routes(utoipa_axum::routes!(update_order_status))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::session_authorization,
            )),
    )
}

/// Page through every order in the system.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(AdminOrderQuery),
    responses(
        (status = 200, description = "One page of orders", body = StdResponse<OrderListRes, String>),
        (status = 403, description = "Not an administrator")
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<AdminOrderQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.service.admin_list_orders(session, query).await?;

    Ok(StdResponse {
        data: Some(page),
        message: Some("Get orders successfully"),
    })
}

/// Number of orders in each status.
#[utoipa::path(
    get,
    path = "/count",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Order counts", body = StdResponse<OrderCountRes, String>),
        (status = 403, description = "Not an administrator")
    )
)]
async fn count_orders(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let counts = state.service.admin_count_orders(session).await?;

    Ok(StdResponse {
        data: Some(counts),
        message: Some("Count orders successfully"),
    })
}

/// Approve, reject or complete an order.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Order updated", body = StdResponse<ProductOrderEntity, String>),
        (status = 400, description = "Invalid target status or transition not allowed"),
        (status = 403, description = "Not an administrator"),
        (status = 404, description = "Unknown order")
    )
)]
async fn update_order_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(body): AppJson<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.service.update_order_status(session, id, body).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Order status updated successfully"),
    })
}
