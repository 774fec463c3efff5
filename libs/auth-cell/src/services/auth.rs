use std::sync::Arc;

use tracing::{debug, error, info, warn};

use shared_config::AppConfig;
use shared_database::SupabaseClient;
use shared_utils::jwt::issue_token;
use user_cell::models::{User, UserSummary};
use user_cell::services::password::{verify_against_decoy, verify_password};
use user_cell::services::UserService;

use crate::models::{AuthError, AuthResponse, LoginRequest};
use crate::services::google::GoogleTokenVerifier;

/// bcrypt runs on the blocking pool; without a stored hash it compares
/// against a decoy instead.
async fn check_password(password: String, stored_hash: Option<String>) -> bool {
    let outcome = tokio::task::spawn_blocking(move || match stored_hash {
        Some(stored_hash) => verify_password(&password, &stored_hash),
        None => verify_against_decoy(&password),
    })
    .await;

    outcome.unwrap_or_else(|e| {
        error!("Password check task failed: {}", e);
        false
    })
}

pub struct AuthService {
    config: Arc<AppConfig>,
    users: UserService,
}

impl AuthService {
    pub fn new(config: Arc<AppConfig>, db: Arc<SupabaseClient>) -> Self {
        Self {
            config,
            users: UserService::new(db),
        }
    }

    fn issue_for(&self, user: &User) -> Result<AuthResponse, AuthError> {
        let role = user.role_name();
        let token = issue_token(
            user.id,
            &user.email,
            role,
            &self.config.jwt_secret,
            self.config.jwt_expiration_hours,
        )?;

        Ok(AuthResponse {
            token,
            user: UserSummary::from(user),
        })
    }

    pub async fn login_with_credentials(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }

        debug!("Password login attempt");

        let user = self.users.find_by_email(&request.email).await?;

        // Every rejection pays for one bcrypt comparison.
        let usable_hash = user
            .as_ref()
            .filter(|user| user.is_active)
            .and_then(|user| user.password_hash.clone());
        let password_matches = check_password(request.password, usable_hash).await;

        let Some(user) = user else {
            warn!("Login failed: unknown account");
            return Err(AuthError::InvalidCredentials);
        };

        if user.password_hash.is_none() {
            warn!("Login failed: account {} has no password", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            warn!("Login failed: account {} is inactive", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        if !password_matches {
            warn!("Login failed: wrong password for account {}", user.id);
            return Err(AuthError::InvalidCredentials);
        }

        info!("User {} logged in with password", user.id);
        self.issue_for(&user)
    }

    /// Exchanges a Google ID token for a session token, provisioning a
    /// patient account on first sign-in.
    pub async fn login_with_google(&self, id_token: &str) -> Result<AuthResponse, AuthError> {
        let verifier = GoogleTokenVerifier::new(&self.config);
        let profile = verifier.verify(id_token).await?;

        let user = match self.users.find_by_email(&profile.email).await? {
            Some(existing) => {
                if !existing.is_active {
                    warn!("Google sign-in rejected for inactive account {}", existing.id);
                    return Err(AuthError::InactiveAccount);
                }
                self.users.sync_google_profile(existing, &profile).await?
            }
            None => self.users.provision_google_user(&profile).await?,
        };

        info!("User {} logged in with Google", user.id);
        self.issue_for(&user)
    }
}
