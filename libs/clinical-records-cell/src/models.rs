// libs/clinical-records-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_database::DbError;
use shared_models::error::AppError;

/// A per-patient clinical record stored in its own table. Every record kind
/// shares the same create/list/get/update/delete surface.
pub trait ClinicalRecord: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TABLE: &'static str;
    const LABEL: &'static str;
    /// Whether create must first confirm the patient account exists.
    const REQUIRES_EXISTING_USER: bool = false;

    type Create: DeserializeOwned + Send + 'static;
    type Update: Serialize + DeserializeOwned + Send + 'static;

    fn id(&self) -> Uuid;
    fn owner_id(&self) -> Uuid;

    fn owner_of(request: &Self::Create) -> Uuid;

    /// Validates a create request and builds the row to insert.
    fn into_row(request: Self::Create) -> Result<Value, RecordError>;

    fn check_update(&self, _update: &Self::Update) -> Result<(), RecordError> {
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), RecordError> {
    if value.trim().is_empty() {
        return Err(RecordError::ValidationError(format!("{} is required", field)));
    }
    Ok(())
}

fn reject_blank(field: &str, value: &Option<String>) -> Result<(), RecordError> {
    match value {
        Some(text) => require_text(field, text),
        None => Ok(()),
    }
}

fn to_row<T: Serialize>(value: &T) -> Result<Value, RecordError> {
    serde_json::to_value(value).map_err(|e| RecordError::ValidationError(e.to_string()))
}

// ==============================================================================
// VITAL SIGNS
// ==============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalMeasurements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiratory_rate: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl VitalMeasurements {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Rejects readings no instrument would produce.
    pub fn validate(&self) -> Result<(), RecordError> {
        fn check(ok: bool, message: &str) -> Result<(), RecordError> {
            if ok {
                Ok(())
            } else {
                Err(RecordError::ValidationError(message.to_string()))
            }
        }

        if let Some(t) = self.temperature {
            check((25.0..=45.0).contains(&t), "Temperature must be between 25 and 45 °C")?;
        }
        if let Some(hr) = self.heart_rate {
            check((1..=300).contains(&hr), "Heart rate must be between 1 and 300 bpm")?;
        }
        if let Some(rr) = self.respiratory_rate {
            check((1..=100).contains(&rr), "Respiratory rate must be between 1 and 100")?;
        }
        if let Some(spo2) = self.oxygen_saturation {
            check((0.0..=100.0).contains(&spo2), "Oxygen saturation must be between 0 and 100")?;
        }
        if let Some(w) = self.weight {
            check(w > 0.0, "Weight must be positive")?;
        }
        if let Some(h) = self.height {
            check(h > 0.0, "Height must be positive")?;
        }
        reject_blank("Blood pressure", &self.blood_pressure)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalSigns {
    pub id: Uuid,
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    #[serde(flatten)]
    pub measurements: VitalMeasurements,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVitalSignsRequest {
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    #[serde(flatten)]
    pub measurements: VitalMeasurements,
}

impl ClinicalRecord for VitalSigns {
    const TABLE: &'static str = "vital_signs";
    const LABEL: &'static str = "Vital signs record";

    type Create = CreateVitalSignsRequest;
    type Update = VitalMeasurements;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn owner_of(request: &Self::Create) -> Uuid {
        request.user_id
    }

    fn into_row(request: Self::Create) -> Result<Value, RecordError> {
        if request.measurements.is_empty() {
            return Err(RecordError::ValidationError(
                "At least one measurement is required".to_string(),
            ));
        }
        request.measurements.validate()?;
        to_row(&request)
    }

    fn check_update(&self, update: &Self::Update) -> Result<(), RecordError> {
        update.validate()
    }
}

// ==============================================================================
// ALLERGIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allergy {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub attendance_id: Option<Uuid>,
    pub allergen: String,
    pub severity: String,
    pub reactions: String,
    pub diagnosed: Option<NaiveDate>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAllergyRequest {
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    pub allergen: String,
    pub severity: String,
    pub reactions: String,
    pub diagnosed: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAllergyRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reactions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosed: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ClinicalRecord for Allergy {
    const TABLE: &'static str = "allergies";
    const LABEL: &'static str = "Allergy";

    type Create = CreateAllergyRequest;
    type Update = UpdateAllergyRequest;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn owner_of(request: &Self::Create) -> Uuid {
        request.user_id
    }

    fn into_row(request: Self::Create) -> Result<Value, RecordError> {
        require_text("Allergen", &request.allergen)?;
        require_text("Severity", &request.severity)?;
        require_text("Reactions", &request.reactions)?;

        Ok(json!({
            "user_id": request.user_id,
            "attendance_id": request.attendance_id,
            "allergen": request.allergen.trim(),
            "severity": request.severity.trim(),
            "reactions": request.reactions,
            "diagnosed": request.diagnosed,
            "notes": request.notes,
            "active": true
        }))
    }

    fn check_update(&self, update: &Self::Update) -> Result<(), RecordError> {
        reject_blank("Allergen", &update.allergen)?;
        reject_blank("Severity", &update.severity)?;
        reject_blank("Reactions", &update.reactions)
    }
}

// ==============================================================================
// MEDICATIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Medication {
    /// Active and not past its end date.
    pub fn is_current(&self, today: NaiveDate) -> bool {
        self.active && self.end_date.map_or(true, |end| end > today)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicationRequest {
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: Option<String>,
    pub instructions: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicationRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dosage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

fn check_period(start: NaiveDate, end: Option<NaiveDate>) -> Result<(), RecordError> {
    match end {
        Some(end) if end < start => Err(RecordError::ValidationError(
            "End date cannot be before start date".to_string(),
        )),
        _ => Ok(()),
    }
}

impl ClinicalRecord for Medication {
    const TABLE: &'static str = "medications";
    const LABEL: &'static str = "Medication";

    type Create = CreateMedicationRequest;
    type Update = UpdateMedicationRequest;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn owner_of(request: &Self::Create) -> Uuid {
        request.user_id
    }

    fn into_row(request: Self::Create) -> Result<Value, RecordError> {
        require_text("Medication name", &request.name)?;
        require_text("Dosage", &request.dosage)?;
        require_text("Frequency", &request.frequency)?;

        let start_date = request.start_date.unwrap_or_else(|| Utc::now().date_naive());
        check_period(start_date, request.end_date)?;

        Ok(json!({
            "user_id": request.user_id,
            "attendance_id": request.attendance_id,
            "name": request.name.trim(),
            "dosage": request.dosage,
            "frequency": request.frequency,
            "duration": request.duration,
            "instructions": request.instructions,
            "start_date": start_date,
            "end_date": request.end_date,
            "active": true
        }))
    }

    fn check_update(&self, update: &Self::Update) -> Result<(), RecordError> {
        reject_blank("Medication name", &update.name)?;
        reject_blank("Dosage", &update.dosage)?;
        reject_blank("Frequency", &update.frequency)?;
        check_period(
            update.start_date.unwrap_or(self.start_date),
            update.end_date.or(self.end_date),
        )
    }
}

// ==============================================================================
// CLINICAL NOTES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicalNote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    pub note_type: String,
    pub content: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateClinicalNoteRequest {
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    pub note_type: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateClinicalNoteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ClinicalRecord for ClinicalNote {
    const TABLE: &'static str = "clinical_notes";
    const LABEL: &'static str = "Clinical note";

    type Create = CreateClinicalNoteRequest;
    type Update = UpdateClinicalNoteRequest;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn owner_of(request: &Self::Create) -> Uuid {
        request.user_id
    }

    fn into_row(request: Self::Create) -> Result<Value, RecordError> {
        require_text("Note type", &request.note_type)?;
        require_text("Content", &request.content)?;

        Ok(json!({
            "user_id": request.user_id,
            "attendance_id": request.attendance_id,
            "note_type": request.note_type.trim(),
            "content": request.content
        }))
    }

    fn check_update(&self, update: &Self::Update) -> Result<(), RecordError> {
        reject_blank("Note type", &update.note_type)?;
        reject_blank("Content", &update.content)
    }
}

// ==============================================================================
// MEDICAL EXAMS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExamStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Pending => "pending",
            ExamStatus::Scheduled => "scheduled",
            ExamStatus::Completed => "completed",
            ExamStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: ExamStatus) -> bool {
        matches!(
            (self, next),
            (ExamStatus::Pending, ExamStatus::Scheduled)
                | (ExamStatus::Pending, ExamStatus::Completed)
                | (ExamStatus::Pending, ExamStatus::Cancelled)
                | (ExamStatus::Scheduled, ExamStatus::Completed)
                | (ExamStatus::Scheduled, ExamStatus::Cancelled)
        )
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalExam {
    pub id: Uuid,
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    pub exam_type: String,
    pub request_date: NaiveDate,
    pub laboratory: Option<String>,
    pub observations: Option<String>,
    pub status: ExamStatus,
    pub result: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicalExamRequest {
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    pub exam_type: String,
    pub request_date: NaiveDate,
    pub laboratory: Option<String>,
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicalExamRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub laboratory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateExamStatusRequest {
    pub status: ExamStatus,
    pub result: Option<String>,
}

impl ClinicalRecord for MedicalExam {
    const TABLE: &'static str = "medical_exams";
    const LABEL: &'static str = "Medical exam";

    type Create = CreateMedicalExamRequest;
    type Update = UpdateMedicalExamRequest;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn owner_of(request: &Self::Create) -> Uuid {
        request.user_id
    }

    fn into_row(request: Self::Create) -> Result<Value, RecordError> {
        require_text("Exam type", &request.exam_type)?;

        Ok(json!({
            "user_id": request.user_id,
            "attendance_id": request.attendance_id,
            "exam_type": request.exam_type.trim(),
            "request_date": request.request_date,
            "laboratory": request.laboratory,
            "observations": request.observations,
            "status": ExamStatus::Pending
        }))
    }

    fn check_update(&self, update: &Self::Update) -> Result<(), RecordError> {
        reject_blank("Exam type", &update.exam_type)
    }
}

// ==============================================================================
// MEDICAL CERTIFICATES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalCertificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub certificate_type: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub cid: Option<String>,
    pub description: String,
    pub days_off: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMedicalCertificateRequest {
    pub user_id: Uuid,
    pub attendance_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub certificate_type: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub cid: Option<String>,
    pub description: String,
    pub days_off: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateMedicalCertificateRequest {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub certificate_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_off: Option<i32>,
}

fn check_days_off(days_off: Option<i32>) -> Result<(), RecordError> {
    match days_off {
        Some(days) if days < 0 => Err(RecordError::ValidationError(
            "Days off cannot be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

impl ClinicalRecord for MedicalCertificate {
    const TABLE: &'static str = "medical_certificates";
    const LABEL: &'static str = "Medical certificate";
    const REQUIRES_EXISTING_USER: bool = true;

    type Create = CreateMedicalCertificateRequest;
    type Update = UpdateMedicalCertificateRequest;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Uuid {
        self.user_id
    }

    fn owner_of(request: &Self::Create) -> Uuid {
        request.user_id
    }

    fn into_row(request: Self::Create) -> Result<Value, RecordError> {
        require_text("Certificate type", &request.certificate_type)?;
        require_text("Description", &request.description)?;
        check_period(request.start_date, request.end_date)?;
        check_days_off(request.days_off)?;

        Ok(json!({
            "user_id": request.user_id,
            "attendance_id": request.attendance_id,
            "type": request.certificate_type.trim(),
            "start_date": request.start_date,
            "end_date": request.end_date,
            "cid": request.cid,
            "description": request.description,
            "days_off": request.days_off
        }))
    }

    fn check_update(&self, update: &Self::Update) -> Result<(), RecordError> {
        reject_blank("Certificate type", &update.certificate_type)?;
        reject_blank("Description", &update.description)?;
        check_days_off(update.days_off)?;
        check_period(
            update.start_date.unwrap_or(self.start_date),
            update.end_date.or(self.end_date),
        )
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("User not found")]
    UserNotFound,

    #[error("No vital signs recorded for this user")]
    NoVitalSigns,

    #[error("Cannot change exam status from {from} to {to}")]
    InvalidExamTransition { from: ExamStatus, to: ExamStatus },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

impl From<RecordError> for AppError {
    fn from(err: RecordError) -> Self {
        match err {
            RecordError::NotFound(_) | RecordError::UserNotFound | RecordError::NoVitalSigns => {
                AppError::NotFound(err.to_string())
            }
            RecordError::InvalidExamTransition { .. } => AppError::BadRequest(err.to_string()),
            RecordError::ValidationError(_) => AppError::ValidationError(err.to_string()),
            RecordError::Database(db) => db.into(),
        }
    }
}
