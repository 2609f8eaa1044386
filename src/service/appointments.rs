use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    app_error::AppError,
    middleware::Session,
    models::{AppointmentEntity, CreateAppointmentEntity, PatientEntity},
    service::{ClinicService, non_blank},
    status::{AppointmentStatus, PaymentStatus},
};

#[derive(Deserialize, Debug, Clone, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentReq {
    /// `YYYY-MM-DD`
    pub appointment_date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`
    pub start_time: Option<String>,
    pub patient_id: Option<i32>,
    pub slot_id: Option<i32>,
    /// Minutes.
    pub duration: Option<i32>,
    pub fee: Option<f64>,
    pub reason: Option<String>,
    pub status: Option<String>,
    /// Transaction id of a payment settled outside the checkout flow.
    pub payment_id: Option<String>,
}

fn parse_date(value: Option<&str>) -> Result<NaiveDate, AppError> {
    let value = non_blank(value, "appointmentDate")?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("appointmentDate '{value}' is not a valid date")))
}

fn parse_time(value: Option<&str>) -> Result<NaiveTime, AppError> {
    let value = non_blank(value, "startTime")?;
    NaiveTime::parse_from_str(&value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&value, "%H:%M"))
        .map_err(|_| AppError::Validation(format!("startTime '{value}' is not a valid time")))
}

impl ClinicService {
    /// Books a place in a slot for a patient.
    ///
    /// A user may only book for their own patient profile. The slot claim and
    /// the insert are a single store operation, so two concurrent bookings of
    /// a full slot can never both succeed.
    pub async fn book_appointment(
        &self,
        session: Session,
        req: BookAppointmentReq,
    ) -> Result<AppointmentEntity, AppError> {
        let appointment_date = parse_date(req.appointment_date.as_deref())?;
        let start_time = parse_time(req.start_time.as_deref())?;
        let patient_id = req
            .patient_id
            .ok_or_else(|| AppError::Validation("patientId is required".into()))?;
        let slot_id = req
            .slot_id
            .ok_or_else(|| AppError::Validation("slotId is required".into()))?;

        let duration = req.duration.unwrap_or(self.clinic.default_duration);
        if duration <= 0 {
            return Err(AppError::Validation("duration must be positive".into()));
        }

        let fee = req.fee.unwrap_or(self.clinic.default_fee);
        if !fee.is_finite() || fee < 0.0 {
            return Err(AppError::Validation("fee must be a non-negative amount".into()));
        }

        let status = match req.status.as_deref() {
            None => AppointmentStatus::Confirmed,
            Some(raw) => raw
                .parse::<AppointmentStatus>()
                .ok()
                .filter(|s| AppointmentStatus::INITIAL.contains(s))
                .ok_or_else(|| {
                    AppError::Validation(format!("'{raw}' is not a valid initial status"))
                })?,
        };

        let payment_id = req
            .payment_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        let patient = self.authorize_patient(&session, patient_id).await?;

        let appointment = self
            .store
            .book_appointment(CreateAppointmentEntity {
                patient_id: patient.id,
                slot_id,
                appointment_date,
                start_time,
                duration,
                fee,
                reason: req.reason.filter(|r| !r.trim().is_empty()),
                status,
                payment_status: if payment_id.is_some() {
                    PaymentStatus::Paid
                } else {
                    PaymentStatus::Pending
                },
                payment_id,
            })
            .await?;

        tracing::info!(
            appointment_id = appointment.id,
            patient_id = appointment.patient_id,
            slot_id = appointment.slot_id,
            status = %appointment.status,
            "Booked appointment"
        );

        Ok(appointment)
    }

    /// Appointments of the caller's own patient profile, newest first.
    pub async fn list_my_appointments(
        &self,
        session: Session,
    ) -> Result<Vec<AppointmentEntity>, AppError> {
        match self.store.find_patient_by_user(session.user_id).await? {
            Some(patient) => Ok(self.store.list_patient_appointments(patient.id).await?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn cancel_appointment(
        &self,
        session: Session,
        id: i32,
    ) -> Result<AppointmentEntity, AppError> {
        let appointment = match self.store.find_appointment(id).await? {
            Some(appointment) => appointment,
            None if session.is_admin() => {
                return Err(AppError::NotFound("Appointment not found".into()));
            }
            None => return Err(forbidden_appointment()),
        };

        if !session.is_admin() {
            let patient = self.store.find_patient(appointment.patient_id).await?;
            if patient.is_none_or(|p| p.user_id != session.user_id) {
                return Err(forbidden_appointment());
            }
        }

        if !appointment
            .status
            .can_transition_to(AppointmentStatus::Cancelled)
        {
            return Err(AppError::Conflict(format!(
                "Appointment is {} and can no longer be cancelled",
                appointment.status
            )));
        }

        let cancelled = self
            .store
            .cancel_appointment(
                id,
                &AppointmentStatus::sources_of(AppointmentStatus::Cancelled),
            )
            .await?;

        tracing::info!(appointment_id = id, user_id = session.user_id, "Cancelled appointment");

        Ok(cancelled)
    }

    /// Resolves the patient a booking is for. Users only see their own
    /// profile; any other id is refused without revealing whether it exists.
    async fn authorize_patient(
        &self,
        session: &Session,
        patient_id: i32,
    ) -> Result<PatientEntity, AppError> {
        let patient = self.store.find_patient(patient_id).await?;

        match patient {
            Some(patient) if session.is_admin() || patient.user_id == session.user_id => {
                Ok(patient)
            }
            None if session.is_admin() => Err(AppError::NotFound("Patient not found".into())),
            _ => Err(AppError::Authorization(
                "You can only book appointments for your own patient profile".into(),
            )),
        }
    }
}

fn forbidden_appointment() -> AppError {
    AppError::Authorization("You can only manage your own appointments".into())
}
