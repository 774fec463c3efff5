use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::router::auth_routes;
use shared_config::AppConfig;
use shared_database::AppState;
use shared_models::auth::Role;
use shared_utils::jwt::validate_token;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const GOOGLE_KEY_PEM: &[u8] = include_bytes!("fixtures/google_test_key.pem");
const GOOGLE_KEY_ID: &str = "test-signing-key";
const GOOGLE_KEY_N: &str = "wuchGOJ_ZVmsu1Map0WNFWMaRJou0xi-mhFtIAAVYpALv3ch4_D2J8SZb4tfSJWXmSSc4del9Z3ocRHSEe45bf092fe05AkumlFbx4fuC7slCY3UPmY2FgMARNjEha0sj4_uZzYjZpipzabGePQ-a3VmJ9MVx3M2TKbyo-2R38komhyyjI2mp7EmnB48nnbz-0gNJVhWNI9HAyGOVmaOtMq-vJ_69Avf3R9UPnW0fyMYfmsVOjr2zAG-Nf2r3nf3MEfv052CARlNvai3Op2uFr0vHrsnAJwqInaer3mpkV0UFqgioR_ABS_uHxAcQstp9t-8MvPxEXZ4LZZzbykNxw";
const GOOGLE_KEY_E: &str = "AQAB";

fn create_test_app(config: AppConfig) -> Router {
    auth_routes(Arc::new(AppState::new(config)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mount_account(mock_server: &MockServer, account: Value) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([account])))
        .mount(mock_server)
        .await;
}

fn google_id_token(config: &AppConfig, overrides: Value) -> String {
    let now = Utc::now().timestamp();
    let mut claims = json!({
        "iss": "accounts.google.com",
        "aud": config.google_client_id,
        "sub": "google-user-123",
        "email": "maria@gmail.com",
        "email_verified": true,
        "name": "Maria Souza",
        "picture": "https://lh3.googleusercontent.com/a/maria",
        "iat": now,
        "exp": now + 3600
    });
    if let (Some(target), Some(patch)) = (claims.as_object_mut(), overrides.as_object()) {
        for (key, value) in patch {
            target.insert(key.clone(), value.clone());
        }
    }

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(GOOGLE_KEY_ID.to_string());
    let key = EncodingKey::from_rsa_pem(GOOGLE_KEY_PEM).unwrap();
    encode(&header, &claims, &key).unwrap()
}

async fn mount_google_certs(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/oauth2/v3/certs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "keys": [{
                "kid": GOOGLE_KEY_ID,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": GOOGLE_KEY_N,
                "e": GOOGLE_KEY_E
            }]
        })))
        .mount(mock_server)
        .await;
}

// ==============================================================================
// PASSWORD LOGIN
// ==============================================================================

#[tokio::test]
async fn test_login_issues_token_with_role() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri());
    let user_id = Uuid::new_v4();
    let hash = bcrypt::hash("senha-correta", 4).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.doc@clinic.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_with_password(user_id, "doc@clinic.test", Role::Medico, &hash)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(config.clone());
    let response = app
        .oneshot(json_request(
            "POST",
            "/login",
            json!({ "email": "Doc@Clinic.test", "password": "senha-correta" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], json!(user_id));
    assert_eq!(body["user"]["role"], "MEDICO");

    let claims = validate_token(body["token"].as_str().unwrap(), &config.jwt_secret).unwrap();
    assert_eq!(claims.id, user_id);
    assert_eq!(claims.role, Role::Medico);
}

#[tokio::test]
async fn test_wrong_password_is_generic_unauthorized() {
    let mock_server = MockServer::start().await;
    let hash = bcrypt::hash("senha-correta", 4).unwrap();
    mount_account(
        &mock_server,
        MockSupabaseResponses::user_with_password(Uuid::new_v4(), "doc@clinic.test", Role::Medico, &hash),
    )
    .await;

    let app = create_test_app(TestConfig::with_mock_server(&mock_server.uri()));
    let response = app
        .oneshot(json_request(
            "POST",
            "/login",
            json!({ "email": "doc@clinic.test", "password": "senha-errada" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_unknown_email_matches_wrong_password_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(TestConfig::with_mock_server(&mock_server.uri()));
    let response = app
        .oneshot(json_request(
            "POST",
            "/login",
            json!({ "email": "ghost@clinic.test", "password": "whatever" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid email or password");
}

#[tokio::test]
async fn test_unknown_account_rejection_costs_a_full_hash_comparison() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(TestConfig::with_mock_server(&mock_server.uri()));
    let login = || {
        json_request(
            "POST",
            "/login",
            json!({ "email": "ghost@clinic.test", "password": "whatever" }),
        )
    };

    // First attempt also builds the decoy hash.
    let response = app.clone().oneshot(login()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let stored = bcrypt::hash("senha-correta", bcrypt::DEFAULT_COST).unwrap();
    let started = Instant::now();
    assert!(!bcrypt::verify("whatever", &stored).unwrap());
    let one_comparison = started.elapsed();

    let started = Instant::now();
    let response = app.oneshot(login()).await.unwrap();
    let rejection = started.elapsed();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        rejection >= one_comparison / 2,
        "unknown account rejected in {:?}, a comparison takes {:?}",
        rejection,
        one_comparison
    );
}

#[tokio::test]
async fn test_inactive_and_passwordless_accounts_cannot_log_in() {
    let mock_server = MockServer::start().await;
    let hash = bcrypt::hash("senha-correta", 4).unwrap();
    let mut inactive =
        MockSupabaseResponses::user_with_password(Uuid::new_v4(), "old@clinic.test", Role::Paciente, &hash);
    inactive["is_active"] = json!(false);

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.old@clinic.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([inactive])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.google@clinic.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(Uuid::new_v4(), "G", "google@clinic.test", Role::Paciente, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(TestConfig::with_mock_server(&mock_server.uri()));

    for email in ["old@clinic.test", "google@clinic.test"] {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/login",
                json!({ "email": email, "password": "senha-correta" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", email);
        assert_eq!(body_json(response).await["error"], "Invalid email or password");
    }
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(TestConfig::with_mock_server(&mock_server.uri()));

    let response = app
        .oneshot(json_request("POST", "/login", json!({ "email": "", "password": "" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==============================================================================
// TOKEN VERIFICATION
// ==============================================================================

#[tokio::test]
async fn test_verify_returns_claims() {
    let config = TestConfig::default().to_app_config();
    let user = TestUser::secretary("sec@clinic.test");
    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, Some(1));

    let response = create_test_app(config)
        .oneshot(
            Request::builder()
                .uri("/verify")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user_id"], json!(user.id));
    assert_eq!(body["email"], "sec@clinic.test");
    assert_eq!(body["role"], "SECRETARIA");
}

#[tokio::test]
async fn test_verify_rejects_missing_expired_and_malformed_tokens() {
    let config = TestConfig::default().to_app_config();
    let user = TestUser::default();
    let expired = JwtTestUtils::create_expired_token(&user, &config.jwt_secret);
    let forged = JwtTestUtils::create_invalid_signature_token(&user);
    let app = create_test_app(config);

    let missing = app
        .clone()
        .oneshot(Request::builder().uri("/verify").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    for token in [expired, forged, JwtTestUtils::create_malformed_token()] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/verify")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_me_returns_current_account() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri());
    let user = TestUser::patient("paula@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(user.id, "Paula", "paula@clinic.test", Role::Paciente, true)
        ])))
        .mount(&mock_server)
        .await;

    let token = JwtTestUtils::create_test_token(&user, &config.jwt_secret, None);
    let response = create_test_app(config)
        .oneshot(
            Request::builder()
                .uri("/me")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Paula");
    assert_eq!(body["role"]["name"], "PACIENTE");
}

// ==============================================================================
// GOOGLE SIGN-IN
// ==============================================================================

#[tokio::test]
async fn test_google_first_login_provisions_patient() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri());
    let new_id = Uuid::new_v4();
    mount_google_certs(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/roles"))
        .and(query_param("name", "eq.PACIENTE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::role_response(Role::Paciente)
        ])))
        .mount(&mock_server)
        .await;

    let mut created = MockSupabaseResponses::user_response(new_id, "Maria Souza", "maria@gmail.com", Role::Paciente, true);
    created["google_id"] = json!("google-user-123");

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({ "email": "maria@gmail.com", "google_id": "google-user-123" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([created])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let id_token = google_id_token(&config, json!({}));
    let response = create_test_app(config.clone())
        .oneshot(json_request("POST", "/google", json!({ "token": id_token })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], json!(new_id));
    assert_eq!(body["user"]["role"], "PACIENTE");

    let claims = validate_token(body["token"].as_str().unwrap(), &config.jwt_secret).unwrap();
    assert_eq!(claims.role, Role::Paciente);
}

#[tokio::test]
async fn test_google_login_refreshes_changed_profile() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri());
    let user_id = Uuid::new_v4();
    mount_google_certs(&mock_server).await;

    mount_account(
        &mock_server,
        MockSupabaseResponses::user_response(user_id, "Maria", "maria@gmail.com", Role::Medico, true),
    )
    .await;

    let mut refreshed = MockSupabaseResponses::user_response(user_id, "Maria Souza", "maria@gmail.com", Role::Medico, true);
    refreshed["google_id"] = json!("google-user-123");

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", user_id)))
        .and(body_partial_json(json!({ "name": "Maria Souza", "google_id": "google-user-123" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([refreshed])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let id_token = google_id_token(&config, json!({}));
    let response = create_test_app(config)
        .oneshot(json_request("POST", "/google", json!({ "credential": id_token })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["user"]["name"], "Maria Souza");
    assert_eq!(body["user"]["role"], "MEDICO");
}

#[tokio::test]
async fn test_google_token_for_other_audience_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri());
    mount_google_certs(&mock_server).await;

    let id_token = google_id_token(&config, json!({ "aud": "someone-else.apps.googleusercontent.com" }));
    let response = create_test_app(config)
        .oneshot(json_request("POST", "/google", json!({ "token": id_token })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_google_unverified_email_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri());
    mount_google_certs(&mock_server).await;

    let id_token = google_id_token(&config, json!({ "email_verified": false }));
    let response = create_test_app(config)
        .oneshot(json_request("POST", "/google", json!({ "token": id_token })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Google account email is not verified");
}

#[tokio::test]
async fn test_google_login_rejects_inactive_account() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_mock_server(&mock_server.uri());
    mount_google_certs(&mock_server).await;
    mount_account(
        &mock_server,
        MockSupabaseResponses::user_response(Uuid::new_v4(), "Maria Souza", "maria@gmail.com", Role::Paciente, false),
    )
    .await;

    let id_token = google_id_token(&config, json!({}));
    let response = create_test_app(config)
        .oneshot(json_request("POST", "/google", json!({ "token": id_token })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
