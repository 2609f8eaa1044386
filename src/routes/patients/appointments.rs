use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, AppJson, StdResponse},
    app_state::AppState,
    middleware::{self, Session},
    models::AppointmentEntity,
    service::appointments::BookAppointmentReq,
};

pub fn routes_with_openapi(state: &AppState) -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/patients/appointments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(book_appointment))
            .routes(utoipa_axum::routes!(get_my_appointments))
            .routes(utoipa_axum::routes!(cancel_appointment))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                middleware::session_authorization,
            )),
    )
}

/// Book a place in an appointment slot.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Appointments"],
    security(("bearerAuth" = [])),
    request_body = BookAppointmentReq,
    responses(
        (status = 201, description = "Appointment booked", body = StdResponse<AppointmentEntity, String>),
        (status = 400, description = "Invalid request or slot no longer available"),
        (status = 403, description = "Patient profile belongs to someone else"),
        (status = 404, description = "Unknown slot or patient")
    )
)]
async fn book_appointment(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    AppJson(body): AppJson<BookAppointmentReq>,
) -> Result<impl IntoResponse, AppError> {
    let appointment = state.service.book_appointment(session, body).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(appointment),
            message: Some("Appointment booked successfully"),
        },
    ))
}

#[utoipa::path(
    get,
    path = "/my-appointments",
    tags = ["Appointments"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Own appointments, newest first", body = StdResponse<Vec<AppointmentEntity>, String>)
    )
)]
async fn get_my_appointments(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let appointments = state.service.list_my_appointments(session).await?;

    Ok(StdResponse {
        data: Some(appointments),
        message: Some("Get appointments successfully"),
    })
}

/// Cancel an appointment and release its slot.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Appointments"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Appointment ID to cancel")
    ),
    responses(
        (status = 200, description = "Appointment cancelled", body = StdResponse<AppointmentEntity, String>),
        (status = 400, description = "Appointment can no longer be cancelled"),
        (status = 403, description = "Appointment belongs to someone else")
    )
)]
async fn cancel_appointment(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let appointment = state.service.cancel_appointment(session, id).await?;

    Ok(StdResponse {
        data: Some(appointment),
        message: Some("Appointment cancelled successfully"),
    })
}
