// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;
use user_cell::models::UserError;

// ==============================================================================
// SCHEDULES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::Confirmed => "confirmed",
            ScheduleStatus::InProgress => "in_progress",
            ScheduleStatus::Completed => "completed",
            ScheduleStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduleStatus::Completed | ScheduleStatus::Cancelled)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
    #[serde(rename = "type")]
    pub schedule_type: String,
    pub notes: Option<String>,
    pub status: ScheduleStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateScheduleRequest {
    #[serde(alias = "patient_id")]
    pub user_id: Uuid,
    pub doctor_id: Uuid,
    pub date: String,
    pub time: String,
    #[serde(rename = "type")]
    pub schedule_type: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateScheduleRequest {
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub schedule_type: Option<String>,
    pub notes: Option<String>,
}

impl UpdateScheduleRequest {
    pub fn reschedules(&self) -> bool {
        self.date.is_some() || self.time.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

/// Accepts a plain ISO date or a full RFC 3339 timestamp.
pub fn parse_schedule_date(raw: &str) -> Result<NaiveDate, AppointmentError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| AppointmentError::InvalidDate(raw.to_string()))
}

/// Normalizes `H:MM`/`HH:MM[:SS]` to `HH:MM`.
pub fn parse_schedule_time(raw: &str) -> Result<String, AppointmentError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map(|time| time.format("%H:%M").to_string())
        .map_err(|_| AppointmentError::InvalidTime(raw.to_string()))
}

// ==============================================================================
// ATTENDANCES
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::InProgress => "in_progress",
            AttendanceStatus::Completed => "completed",
            AttendanceStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttendanceStatus::InProgress)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attendance {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub observations: Option<String>,
    pub status: AttendanceStatus,
    pub cancellation_reason: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Vital signs captured when the encounter opens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitialVitalSigns {
    pub temperature: Option<f64>,
    pub blood_pressure: Option<String>,
    pub heart_rate: Option<i32>,
    pub respiratory_rate: Option<i32>,
    pub oxygen_saturation: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartAttendanceRequest {
    pub schedule_id: Uuid,
    pub symptoms: Option<String>,
    pub vital_signs: Option<InitialVitalSigns>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAttendanceRequest {
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub observations: Option<String>,
}

impl UpdateAttendanceRequest {
    pub fn is_empty(&self) -> bool {
        self.symptoms.is_none()
            && self.diagnosis.is_none()
            && self.prescription.is_none()
            && self.observations.is_none()
    }
}

/// An attendance with every clinical record written during it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceSummary {
    #[serde(flatten)]
    pub attendance: Attendance,
    #[serde(default)]
    pub vital_signs: Vec<Value>,
    #[serde(default)]
    pub clinical_notes: Vec<Value>,
    #[serde(default)]
    pub medications: Vec<Value>,
    #[serde(default)]
    pub medical_exams: Vec<Value>,
    #[serde(default)]
    pub medical_certificates: Vec<Value>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Schedule not found")]
    ScheduleNotFound,

    #[error("Attendance not found")]
    AttendanceNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("User {0} is inactive")]
    InactiveUser(Uuid),

    #[error("Selected professional is not a doctor")]
    NotADoctor,

    #[error("Doctor already has an appointment at this date and time")]
    SlotTaken,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Cannot change schedule status from {from} to {to}")]
    InvalidStatusTransition { from: ScheduleStatus, to: ScheduleStatus },

    #[error("Cannot change attendance status from {from} to {to}")]
    InvalidAttendanceTransition { from: AttendanceStatus, to: AttendanceStatus },

    #[error("Schedule is {0} and cannot start an attendance")]
    ScheduleNotStartable(ScheduleStatus),

    #[error("An attendance already exists for this schedule")]
    AttendanceAlreadyStarted,

    #[error("Schedule has no attendance in progress")]
    NoActiveAttendance,

    #[error("Attendance is {0} and can no longer be edited")]
    AttendanceClosed(AttendanceStatus),

    #[error("{0} was modified concurrently, reload and retry")]
    ConcurrentModification(&'static str),

    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::ScheduleNotFound
            | AppointmentError::AttendanceNotFound
            | AppointmentError::PatientNotFound
            | AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::SlotTaken
            | AppointmentError::AttendanceAlreadyStarted
            | AppointmentError::ConcurrentModification(_) => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidDate(_)
            | AppointmentError::InvalidTime(_)
            | AppointmentError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            AppointmentError::InactiveUser(_)
            | AppointmentError::NotADoctor
            | AppointmentError::InvalidStatusTransition { .. }
            | AppointmentError::InvalidAttendanceTransition { .. }
            | AppointmentError::ScheduleNotStartable(_)
            | AppointmentError::NoActiveAttendance
            | AppointmentError::AttendanceClosed(_) => AppError::BadRequest(err.to_string()),
            AppointmentError::User(user) => user.into(),
            AppointmentError::Database(db) => db.into(),
        }
    }
}
