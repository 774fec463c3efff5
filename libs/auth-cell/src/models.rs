use serde::{Deserialize, Serialize};

use shared_models::error::AppError;
use shared_utils::jwt::TokenError;
use user_cell::models::{UserError, UserSummary};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleLoginRequest {
    #[serde(alias = "credential", alias = "id_token")]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

/// Claims Google places in a sign-in ID token.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleClaims {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleJwk {
    pub kid: String,
    pub n: String,
    pub e: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleJwks {
    pub keys: Vec<GoogleJwk>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Covers unknown email, missing hash, inactive account and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email and password are required")]
    MissingCredentials,

    #[error("Google sign-in is not configured")]
    GoogleNotConfigured,

    #[error("Invalid Google token: {0}")]
    InvalidGoogleToken(String),

    #[error("Google account email is not verified")]
    EmailNotVerified,

    #[error("Account is inactive")]
    InactiveAccount,

    #[error("Failed to fetch Google signing keys: {0}")]
    CertsUnavailable(String),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    User(#[from] UserError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Auth(INVALID_CREDENTIALS.to_string()),
            AuthError::MissingCredentials => AppError::BadRequest(err.to_string()),
            AuthError::GoogleNotConfigured => AppError::Internal(err.to_string()),
            AuthError::InvalidGoogleToken(_)
            | AuthError::EmailNotVerified
            | AuthError::InactiveAccount => AppError::Auth(err.to_string()),
            AuthError::CertsUnavailable(_) => AppError::ExternalService(err.to_string()),
            AuthError::Token(TokenError::MissingSecret) | AuthError::Token(TokenError::Signing) => {
                AppError::Internal(err.to_string())
            }
            AuthError::Token(token_err) => AppError::Auth(token_err.to_string()),
            AuthError::User(user_err) => user_err.into(),
        }
    }
}
