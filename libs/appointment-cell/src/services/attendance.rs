// libs/appointment-cell/src/services/attendance.rs
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{DbError, SupabaseClient};

use crate::models::{
    AppointmentError, Attendance, AttendanceStatus, AttendanceSummary, ScheduleStatus,
    StartAttendanceRequest, UpdateAttendanceRequest,
};
use crate::services::lifecycle::AppointmentLifecycleService;

const SUMMARY_SELECT: &str = "*,vital_signs(*),clinical_notes(*),medications(*),medical_exams(*),medical_certificates(*)";

pub struct AttendanceService {
    db: Arc<SupabaseClient>,
    lifecycle: AppointmentLifecycleService,
}

impl AttendanceService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self {
            db,
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    /// Opens the encounter for a schedule. The attendance row, the schedule
    /// flip to `in_progress` and the initial vitals commit together.
    pub async fn start_attendance(&self, request: StartAttendanceRequest) -> Result<Attendance, AppointmentError> {
        let schedule: Value = self
            .db
            .select_one(&format!("schedules?select=id,status&id=eq.{}", request.schedule_id))
            .await?
            .ok_or(AppointmentError::ScheduleNotFound)?;

        if self.find_by_schedule(request.schedule_id).await?.is_some() {
            warn!("Attendance already exists for schedule {}", request.schedule_id);
            return Err(AppointmentError::AttendanceAlreadyStarted);
        }

        let status: ScheduleStatus = serde_json::from_value(schedule["status"].clone())
            .map_err(|e| AppointmentError::ValidationError(format!("Unreadable schedule status: {}", e)))?;
        if !self.lifecycle.can_start_attendance(status) {
            return Err(AppointmentError::ScheduleNotStartable(status));
        }

        let args = json!({
            "p_schedule_id": request.schedule_id,
            "p_symptoms": request.symptoms,
            "p_vital_signs": request.vital_signs,
        });

        let attendance: Attendance = self
            .db
            .rpc("start_attendance", &args)
            .await
            .map_err(|e| match e {
                // unique(schedule_id) lost a race with a concurrent start
                DbError::UniqueViolation(_) => AppointmentError::AttendanceAlreadyStarted,
                other => other.into(),
            })?;

        info!(
            "Started attendance {} for schedule {}",
            attendance.id, attendance.schedule_id
        );
        Ok(attendance)
    }

    pub async fn list_attendances(&self) -> Result<Vec<Attendance>, AppointmentError> {
        debug!("Listing attendances");
        Ok(self.db.select("attendances?select=*&order=created_at.desc").await?)
    }

    pub async fn find_by_id(&self, attendance_id: Uuid) -> Result<Option<Attendance>, AppointmentError> {
        let query = format!("attendances?select=*&id=eq.{}", attendance_id);
        Ok(self.db.select_one(&query).await?)
    }

    pub async fn get_attendance(&self, attendance_id: Uuid) -> Result<Attendance, AppointmentError> {
        self.find_by_id(attendance_id)
            .await?
            .ok_or(AppointmentError::AttendanceNotFound)
    }

    pub async fn find_by_schedule(&self, schedule_id: Uuid) -> Result<Option<Attendance>, AppointmentError> {
        let query = format!("attendances?select=*&schedule_id=eq.{}", schedule_id);
        Ok(self.db.select_one(&query).await?)
    }

    pub async fn find_by_patient(&self, patient_id: Uuid) -> Result<Vec<Attendance>, AppointmentError> {
        debug!("Listing attendances of patient {}", patient_id);
        let query = format!(
            "attendances?select=*&patient_id=eq.{}&order=created_at.desc",
            patient_id
        );
        Ok(self.db.select(&query).await?)
    }

    pub async fn get_summary(&self, attendance_id: Uuid) -> Result<AttendanceSummary, AppointmentError> {
        let query = format!("attendances?select={}&id=eq.{}", SUMMARY_SELECT, attendance_id);
        self.db
            .select_one(&query)
            .await?
            .ok_or(AppointmentError::AttendanceNotFound)
    }

    pub async fn update_attendance(
        &self,
        attendance_id: Uuid,
        request: UpdateAttendanceRequest,
    ) -> Result<Attendance, AppointmentError> {
        let current = self.get_attendance(attendance_id).await?;
        if current.status.is_terminal() {
            return Err(AppointmentError::AttendanceClosed(current.status));
        }
        if request.is_empty() {
            return Ok(current);
        }

        let mut changes = Map::new();
        if let Some(symptoms) = request.symptoms {
            changes.insert("symptoms".to_string(), json!(symptoms));
        }
        if let Some(diagnosis) = request.diagnosis {
            changes.insert("diagnosis".to_string(), json!(diagnosis));
        }
        if let Some(prescription) = request.prescription {
            changes.insert("prescription".to_string(), json!(prescription));
        }
        if let Some(observations) = request.observations {
            changes.insert("observations".to_string(), json!(observations));
        }
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let query = format!(
            "attendances?id=eq.{}&status=eq.{}&select=*",
            attendance_id,
            AttendanceStatus::InProgress
        );
        let updated: Vec<Attendance> = self.db.update(&query, &Value::Object(changes)).await?;

        match updated.into_iter().next() {
            Some(attendance) => {
                debug!("Updated clinical fields of attendance {}", attendance_id);
                Ok(attendance)
            }
            None => {
                let latest = self.get_attendance(attendance_id).await?;
                Err(AppointmentError::AttendanceClosed(latest.status))
            }
        }
    }

    /// Closes the attendance and its schedule as `completed`.
    pub async fn complete_attendance(&self, attendance_id: Uuid) -> Result<Attendance, AppointmentError> {
        let current = self.get_attendance(attendance_id).await?;
        self.lifecycle
            .validate_attendance_transition(current.status, AttendanceStatus::Completed)?;

        let attendance: Attendance = self
            .db
            .rpc("complete_attendance", &json!({ "p_attendance_id": attendance_id }))
            .await?;

        info!(
            "Completed attendance {} and schedule {}",
            attendance.id, attendance.schedule_id
        );
        Ok(attendance)
    }

    /// Closes the attendance and its schedule as `cancelled`.
    pub async fn cancel_attendance(
        &self,
        attendance_id: Uuid,
        reason: Option<String>,
    ) -> Result<Attendance, AppointmentError> {
        let current = self.get_attendance(attendance_id).await?;
        self.lifecycle
            .validate_attendance_transition(current.status, AttendanceStatus::Cancelled)?;

        let args = json!({
            "p_attendance_id": attendance_id,
            "p_reason": reason,
        });
        let attendance: Attendance = self.db.rpc("cancel_attendance", &args).await?;

        info!(
            "Cancelled attendance {} and schedule {}",
            attendance.id, attendance.schedule_id
        );
        Ok(attendance)
    }
}
