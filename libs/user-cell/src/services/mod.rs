pub mod password;
pub mod role;
pub mod specialty;
pub mod user;

pub use role::RoleService;
pub use specialty::SpecialtyService;
pub use user::UserService;
