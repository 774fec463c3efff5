use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use user_cell::models::GoogleProfile;

use crate::models::{AuthError, GoogleClaims, GoogleJwk, GoogleJwks};

pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Verifies Google sign-in ID tokens against the published signing keys.
pub struct GoogleTokenVerifier {
    client: Client,
    certs_url: String,
    client_id: String,
}

impl GoogleTokenVerifier {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            certs_url: config.google_certs_url.clone(),
            client_id: config.google_client_id.clone(),
        }
    }

    async fn fetch_keys(&self) -> Result<GoogleJwks, AuthError> {
        debug!("Fetching Google signing keys from {}", self.certs_url);

        let response = self
            .client
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| AuthError::CertsUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            error!("Google certs endpoint answered {}", response.status());
            return Err(AuthError::CertsUnavailable(format!("status {}", response.status())));
        }

        response
            .json::<GoogleJwks>()
            .await
            .map_err(|e| AuthError::CertsUnavailable(e.to_string()))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.client_id.as_str()]);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation
    }

    fn decode_with_key(&self, id_token: &str, jwk: &GoogleJwk) -> Result<GoogleClaims, AuthError> {
        let key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| AuthError::InvalidGoogleToken(e.to_string()))?;

        decode::<GoogleClaims>(id_token, &key, &self.validation())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidGoogleToken(e.to_string()))
    }

    /// Checks signature, audience, issuer, expiry and `email_verified`.
    pub async fn verify(&self, id_token: &str) -> Result<GoogleProfile, AuthError> {
        if self.client_id.is_empty() {
            return Err(AuthError::GoogleNotConfigured);
        }

        let header = decode_header(id_token).map_err(|e| AuthError::InvalidGoogleToken(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AuthError::InvalidGoogleToken("unexpected algorithm".to_string()));
        }

        let jwks = self.fetch_keys().await?;

        let claims = match header.kid.as_deref() {
            Some(kid) => {
                let jwk = jwks
                    .keys
                    .iter()
                    .find(|k| k.kid == kid)
                    .ok_or_else(|| AuthError::InvalidGoogleToken(format!("unknown key id {}", kid)))?;
                self.decode_with_key(id_token, jwk)?
            }
            // Key rotation leaves several candidates; the first that verifies wins.
            None => {
                let mut last_error = AuthError::InvalidGoogleToken("no signing keys published".to_string());
                let mut verified = None;
                for jwk in &jwks.keys {
                    match self.decode_with_key(id_token, jwk) {
                        Ok(claims) => {
                            verified = Some(claims);
                            break;
                        }
                        Err(e) => last_error = e,
                    }
                }
                verified.ok_or(last_error)?
            }
        };

        if !claims.email_verified {
            warn!("Google sign-in rejected for unverified email {}", claims.email);
            return Err(AuthError::EmailNotVerified);
        }

        let name = claims
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| claims.email.split('@').next().unwrap_or_default().to_string());

        Ok(GoogleProfile {
            google_id: claims.sub,
            email: claims.email,
            name,
            picture: claims.picture,
        })
    }
}
