pub mod auth;
pub mod google;

pub use auth::AuthService;
pub use google::GoogleTokenVerifier;
