// libs/appointment-cell/src/services/schedule.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::{filter_value, DbError, SupabaseClient};
use shared_models::auth::Role;
use user_cell::services::UserService;

use crate::models::{
    parse_schedule_date, parse_schedule_time, AppointmentError, AttendanceStatus,
    CreateScheduleRequest, Schedule, ScheduleStatus, UpdateScheduleRequest,
};
use crate::services::attendance::AttendanceService;
use crate::services::lifecycle::AppointmentLifecycleService;

pub const SCHEDULE_SELECT: &str = "*,patient:users!schedules_user_id_fkey(id,name,email),doctor:users!schedules_doctor_id_fkey(id,name,email)";

pub struct ScheduleService {
    db: Arc<SupabaseClient>,
    users: UserService,
    lifecycle: AppointmentLifecycleService,
}

impl ScheduleService {
    pub fn new(db: Arc<SupabaseClient>) -> Self {
        Self {
            users: UserService::new(db.clone()),
            lifecycle: AppointmentLifecycleService::new(),
            db,
        }
    }

    pub async fn list_schedules(&self) -> Result<Vec<Schedule>, AppointmentError> {
        debug!("Listing schedules");
        let query = format!("schedules?select={}&order=date.asc,time.asc", SCHEDULE_SELECT);
        Ok(self.db.select(&query).await?)
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Schedule>, AppointmentError> {
        debug!("Listing schedules of patient {}", user_id);
        let query = format!(
            "schedules?select={}&user_id=eq.{}&order=date.desc,time.desc",
            SCHEDULE_SELECT, user_id
        );
        Ok(self.db.select(&query).await?)
    }

    pub async fn find_by_doctor(&self, doctor_id: Uuid) -> Result<Vec<Schedule>, AppointmentError> {
        debug!("Listing schedules of doctor {}", doctor_id);
        let query = format!(
            "schedules?select={}&doctor_id=eq.{}&order=date.asc,time.asc",
            SCHEDULE_SELECT, doctor_id
        );
        Ok(self.db.select(&query).await?)
    }

    pub async fn find_by_id(&self, schedule_id: Uuid) -> Result<Option<Schedule>, AppointmentError> {
        let query = format!("schedules?select={}&id=eq.{}", SCHEDULE_SELECT, schedule_id);
        Ok(self.db.select_one(&query).await?)
    }

    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<Schedule, AppointmentError> {
        self.find_by_id(schedule_id)
            .await?
            .ok_or(AppointmentError::ScheduleNotFound)
    }

    async fn ensure_slot_free(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        time: &str,
        except: Option<Uuid>,
    ) -> Result<(), AppointmentError> {
        let mut query = format!(
            "schedules?select=id&doctor_id=eq.{}&date=eq.{}&time=eq.{}&status=neq.{}",
            doctor_id,
            date,
            filter_value(time),
            ScheduleStatus::Cancelled
        );
        if let Some(id) = except {
            query.push_str(&format!("&id=neq.{}", id));
        }

        let taken: Vec<Value> = self.db.select(&query).await?;
        if !taken.is_empty() {
            warn!("Doctor {} already booked on {} at {}", doctor_id, date, time);
            return Err(AppointmentError::SlotTaken);
        }
        Ok(())
    }

    pub async fn create_schedule(&self, request: CreateScheduleRequest) -> Result<Schedule, AppointmentError> {
        let schedule_type = request.schedule_type.trim().to_string();
        if schedule_type.is_empty() {
            return Err(AppointmentError::ValidationError("Appointment type is required".to_string()));
        }
        let date = parse_schedule_date(&request.date)?;
        let time = parse_schedule_time(&request.time)?;

        debug!(
            "Booking patient {} with doctor {} on {} at {}",
            request.user_id, request.doctor_id, date, time
        );

        let patient = self
            .users
            .find_by_id(request.user_id)
            .await?
            .ok_or(AppointmentError::PatientNotFound)?;
        if !patient.is_active {
            return Err(AppointmentError::InactiveUser(patient.id));
        }

        let doctor = self
            .users
            .find_by_id(request.doctor_id)
            .await?
            .ok_or(AppointmentError::DoctorNotFound)?;
        if !doctor.is_active {
            return Err(AppointmentError::InactiveUser(doctor.id));
        }
        if doctor.role_name() != Role::Medico {
            return Err(AppointmentError::NotADoctor);
        }

        self.ensure_slot_free(doctor.id, date, &time, None).await?;

        let now = Utc::now().to_rfc3339();
        let row = json!({
            "user_id": patient.id,
            "doctor_id": doctor.id,
            "date": date,
            "time": time,
            "type": schedule_type,
            "notes": request.notes,
            "status": ScheduleStatus::Pending,
            "created_at": now,
            "updated_at": now
        });

        let schedule: Schedule = self
            .db
            .insert(&format!("schedules?select={}", SCHEDULE_SELECT), &row)
            .await
            .map_err(|e| match e {
                // Partial unique index on live bookings closes the check-then-insert race.
                DbError::UniqueViolation(_) => AppointmentError::SlotTaken,
                other => other.into(),
            })?;

        info!("Created schedule {} for patient {}", schedule.id, schedule.user_id);
        Ok(schedule)
    }

    pub async fn update_schedule(
        &self,
        schedule_id: Uuid,
        request: UpdateScheduleRequest,
    ) -> Result<Schedule, AppointmentError> {
        let current = self.get_schedule(schedule_id).await?;

        if request.reschedules() && current.status.is_terminal() {
            return Err(AppointmentError::ValidationError(format!(
                "Cannot reschedule a {} schedule",
                current.status
            )));
        }

        let mut changes = Map::new();

        let date = match request.date.as_deref() {
            Some(raw) => parse_schedule_date(raw)?,
            None => current.date,
        };
        let time = match request.time.as_deref() {
            Some(raw) => parse_schedule_time(raw)?,
            None => current.time.clone(),
        };

        if request.reschedules() {
            if date != current.date || time != current.time {
                self.ensure_slot_free(current.doctor_id, date, &time, Some(schedule_id)).await?;
            }
            changes.insert("date".to_string(), json!(date));
            changes.insert("time".to_string(), json!(time));
        }
        if let Some(schedule_type) = request.schedule_type {
            let schedule_type = schedule_type.trim().to_string();
            if schedule_type.is_empty() {
                return Err(AppointmentError::ValidationError("Appointment type cannot be empty".to_string()));
            }
            changes.insert("type".to_string(), json!(schedule_type));
        }
        if let Some(notes) = request.notes {
            changes.insert("notes".to_string(), json!(notes));
        }

        if changes.is_empty() {
            return Ok(current);
        }

        debug!("Updating schedule {}", schedule_id);
        self.conditional_update(schedule_id, current.status, changes).await
    }

    pub async fn confirm_schedule(&self, schedule_id: Uuid) -> Result<Schedule, AppointmentError> {
        self.transition(schedule_id, ScheduleStatus::Confirmed).await
    }

    /// Cancels the schedule; an attendance in progress is cancelled with it.
    pub async fn cancel_schedule(
        &self,
        schedule_id: Uuid,
        reason: Option<String>,
    ) -> Result<Schedule, AppointmentError> {
        let current = self.get_schedule(schedule_id).await?;
        self.lifecycle
            .validate_status_transition(current.status, ScheduleStatus::Cancelled)?;

        if current.status == ScheduleStatus::InProgress {
            let attendances = AttendanceService::new(self.db.clone());
            let attendance = attendances
                .find_by_schedule(schedule_id)
                .await?
                .ok_or(AppointmentError::NoActiveAttendance)?;
            attendances.cancel_attendance(attendance.id, reason).await?;
            return self.get_schedule(schedule_id).await;
        }

        let mut changes = Map::new();
        changes.insert("status".to_string(), json!(ScheduleStatus::Cancelled));
        let schedule = self.conditional_update(schedule_id, current.status, changes).await?;
        info!("Cancelled schedule {}", schedule_id);
        Ok(schedule)
    }

    /// Completes the schedule together with its attendance in progress.
    pub async fn complete_schedule(&self, schedule_id: Uuid) -> Result<Schedule, AppointmentError> {
        let current = self.get_schedule(schedule_id).await?;
        self.lifecycle
            .validate_status_transition(current.status, ScheduleStatus::Completed)?;

        let attendances = AttendanceService::new(self.db.clone());
        let attendance = attendances
            .find_by_schedule(schedule_id)
            .await?
            .filter(|a| a.status == AttendanceStatus::InProgress)
            .ok_or(AppointmentError::NoActiveAttendance)?;

        attendances.complete_attendance(attendance.id).await?;
        self.get_schedule(schedule_id).await
    }

    async fn transition(
        &self,
        schedule_id: Uuid,
        target: ScheduleStatus,
    ) -> Result<Schedule, AppointmentError> {
        let current = self.get_schedule(schedule_id).await?;
        self.lifecycle.validate_status_transition(current.status, target)?;

        let mut changes = Map::new();
        changes.insert("status".to_string(), json!(target));
        let schedule = self.conditional_update(schedule_id, current.status, changes).await?;

        info!("Schedule {} moved {} -> {}", schedule_id, current.status, target);
        Ok(schedule)
    }

    /// PATCH guarded by the status the caller observed. An empty result
    /// means the row vanished or another request moved it first.
    async fn conditional_update(
        &self,
        schedule_id: Uuid,
        expected: ScheduleStatus,
        mut changes: Map<String, Value>,
    ) -> Result<Schedule, AppointmentError> {
        changes.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let query = format!(
            "schedules?id=eq.{}&status=eq.{}&select={}",
            schedule_id, expected, SCHEDULE_SELECT
        );
        let updated: Vec<Schedule> = self.db.update(&query, &Value::Object(changes)).await?;

        match updated.into_iter().next() {
            Some(schedule) => Ok(schedule),
            None => match self.find_by_id(schedule_id).await? {
                None => Err(AppointmentError::ScheduleNotFound),
                Some(_) => Err(AppointmentError::ConcurrentModification("Schedule")),
            },
        }
    }
}
