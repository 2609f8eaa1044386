use axum::{
    Extension,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware::{self, Session},
    service::checkout::{CheckoutReq, CheckoutRes, VerifyCheckoutRes, WebhookOutcome},
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Checkout routes need a session; the webhook authenticates by signature.
pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_checkout))
            .routes(utoipa_axum::routes!(create_appointment_checkout))
            .routes(utoipa_axum::routes!(verify_checkout))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::session_authorization,
            ))
            .routes(utoipa_axum::routes!(webhook)),
    )
}

/// Open a hosted checkout for arbitrary items.
#[utoipa::path(
    post,
    path = "/checkout",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    request_body = CheckoutReq,
    responses(
        (status = 200, description = "Checkout session created", body = StdResponse<CheckoutRes, String>),
        (status = 503, description = "Payment gateway unavailable")
    )
)]
async fn create_checkout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(body): AppJson<CheckoutReq>,
) -> Result<impl IntoResponse, AppError> {
    let checkout = state.service.create_checkout(session, body).await?;

    Ok(StdResponse {
        data: Some(checkout),
        message: Some("Checkout session created"),
    })
}

/// Open a hosted checkout for an appointment fee.
#[utoipa::path(
    post,
    path = "/checkout/appointments/{id}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Appointment ID to pay for")
    ),
    responses(
        (status = 200, description = "Checkout session created", body = StdResponse<CheckoutRes, String>),
        (status = 400, description = "Appointment already paid or cancelled"),
        (status = 403, description = "Appointment belongs to someone else"),
        (status = 404, description = "Unknown appointment"),
        (status = 503, description = "Payment gateway unavailable")
    )
)]
async fn create_appointment_checkout(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let checkout = state
        .service
        .create_appointment_checkout(session, id)
        .await?;

    Ok(StdResponse {
        data: Some(checkout),
        message: Some("Checkout session created"),
    })
}

/// Whether the webhook has recorded a payment for the session yet.
#[utoipa::path(
    get,
    path = "/checkout/{session_id}",
    tags = ["Payments"],
    security(("bearerAuth" = [])),
    params(
        ("session_id" = String, Path, description = "Gateway checkout session ID")
    ),
    responses(
        (status = 200, description = "Local payment state", body = StdResponse<VerifyCheckoutRes, String>)
    )
)]
async fn verify_checkout(
    Path(session_id): Path<String>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let verified = state.service.verify_checkout(session, &session_id).await?;

    Ok(StdResponse {
        data: Some(verified),
        message: Some("Checkout session verified"),
    })
}

/// Gateway callback. The raw body is needed to check the signature.
#[utoipa::path(
    post,
    path = "/webhook",
    tags = ["Payments"],
    request_body(content = String, content_type = "application/json"),
    responses(
        (status = 200, description = "Event processed", body = StdResponse<WebhookOutcome, String>),
        (status = 400, description = "Event metadata malformed"),
        (status = 401, description = "Missing or invalid signature")
    )
)]
async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload = std::str::from_utf8(&body)
        .map_err(|_| AppError::Validation("Webhook payload is not UTF-8".into()))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = state.service.handle_webhook(payload, signature).await?;

    Ok(StdResponse {
        data: Some(outcome),
        message: Some("Webhook processed"),
    })
}
