// libs/appointment-cell/src/services/mod.rs
pub mod attendance;
pub mod lifecycle;
pub mod schedule;

pub use attendance::AttendanceService;
pub use lifecycle::AppointmentLifecycleService;
pub use schedule::ScheduleService;
