// libs/appointment-cell/src/services/lifecycle.rs
use tracing::{debug, warn};

use crate::models::{AppointmentError, AttendanceStatus, ScheduleStatus};

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a schedule status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: ScheduleStatus,
        new_status: ScheduleStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating schedule transition {} -> {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid schedule transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    /// Get all valid next statuses for a given schedule status
    pub fn get_valid_transitions(&self, current_status: ScheduleStatus) -> Vec<ScheduleStatus> {
        match current_status {
            ScheduleStatus::Pending => vec![
                ScheduleStatus::Confirmed,
                ScheduleStatus::InProgress,
                ScheduleStatus::Cancelled,
            ],
            ScheduleStatus::Confirmed => vec![
                ScheduleStatus::InProgress,
                ScheduleStatus::Cancelled,
            ],
            ScheduleStatus::InProgress => vec![
                ScheduleStatus::Completed,
                ScheduleStatus::Cancelled,
            ],
            // Terminal states
            ScheduleStatus::Completed => vec![],
            ScheduleStatus::Cancelled => vec![],
        }
    }

    /// Statuses an attendance may be opened from.
    pub fn can_start_attendance(&self, current_status: ScheduleStatus) -> bool {
        self.get_valid_transitions(current_status)
            .contains(&ScheduleStatus::InProgress)
    }

    pub fn validate_attendance_transition(
        &self,
        current_status: AttendanceStatus,
        new_status: AttendanceStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating attendance transition {} -> {}", current_status, new_status);

        let allowed = matches!(
            (current_status, new_status),
            (AttendanceStatus::InProgress, AttendanceStatus::Completed)
                | (AttendanceStatus::InProgress, AttendanceStatus::Cancelled)
        );

        if !allowed {
            warn!("Invalid attendance transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidAttendanceTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }
}
