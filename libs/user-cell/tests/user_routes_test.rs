use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_database::AppState;
use shared_models::auth::Role;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};
use user_cell::router::{role_routes, specialty_routes, user_routes};

struct TestApp {
    users: Router,
    roles: Router,
    specialties: Router,
    jwt_secret: String,
}

fn create_test_app(mock_uri: &str) -> TestApp {
    let config = TestConfig::with_mock_server(mock_uri);
    let jwt_secret = config.jwt_secret.clone();
    let state = Arc::new(AppState::new(config));

    TestApp {
        users: user_routes(state.clone()),
        roles: role_routes(state.clone()),
        specialties: specialty_routes(state),
        jwt_secret,
    }
}

fn request(method: &str, uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token));

    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server.uri());

    let response = app
        .users
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_staff_lists_users_without_password_hashes() {
    let mock_server = MockServer::start().await;
    let secretary = TestUser::secretary("sec@clinic.test");
    let listed_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_with_password(listed_id, "ana@clinic.test", Role::Paciente, "$2b$12$hash")
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&secretary, &app.jwt_secret, None);

    let response = app.users.oneshot(request("GET", "/", &token, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["id"], json!(listed_id));
    assert!(body[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_patient_cannot_list_users() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("p@clinic.test");
    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&patient, &app.jwt_secret, None);

    let response = app.users.oneshot(request("GET", "/", &token, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_patient_reads_only_own_account() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("p@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", patient.id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(patient.id, "Paula", "p@clinic.test", Role::Paciente, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&patient, &app.jwt_secret, None);

    let own = app
        .users
        .clone()
        .oneshot(request("GET", &format!("/{}", patient.id), &token, None))
        .await
        .unwrap();
    assert_eq!(own.status(), StatusCode::OK);
    assert_eq!(body_json(own).await["name"], "Paula");

    let other = app
        .users
        .oneshot(request("GET", &format!("/{}", Uuid::new_v4()), &token, None))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_creates_user_with_hashed_password() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");
    let created_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("email", "eq.novo@clinic.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/roles"))
        .and(query_param("name", "eq.MEDICO"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::role_response(Role::Medico)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .and(body_partial_json(json!({ "email": "novo@clinic.test", "is_active": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::user_with_password(created_id, "novo@clinic.test", Role::Medico, "$2b$12$stored")
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &app.jwt_secret, None);

    let response = app
        .users
        .oneshot(request(
            "POST",
            "/",
            &token,
            Some(json!({
                "name": "Dr. Novo",
                "email": " Novo@Clinic.test ",
                "password": "senha-forte",
                "role": "Médico"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["id"], json!(created_id));
    assert_eq!(body["role"]["name"], "MEDICO");
    assert!(body.get("password_hash").is_none());

    let requests = mock_server.received_requests().await.unwrap();
    let insert = requests.iter().find(|r| r.method.as_str() == "POST").unwrap();
    let sent: Value = serde_json::from_slice(&insert.body).unwrap();
    let stored_hash = sent["password_hash"].as_str().unwrap();
    assert_ne!(stored_hash, "senha-forte");
    assert!(bcrypt::verify("senha-forte", stored_hash).unwrap());
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(Uuid::new_v4(), "Ana", "ana@clinic.test", Role::Paciente, true)
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &app.jwt_secret, None);

    let response = app
        .users
        .oneshot(request(
            "POST",
            "/",
            &token,
            Some(json!({ "name": "Ana", "email": "ana@clinic.test" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_patient_cannot_change_own_role() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("p@clinic.test");
    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&patient, &app.jwt_secret, None);

    let response = app
        .users
        .oneshot(request(
            "PUT",
            &format!("/{}", patient.id),
            &token,
            Some(json!({ "role": "ADMIN" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deactivate_sets_inactive() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");
    let target = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", format!("eq.{}", target)))
        .and(body_partial_json(json!({ "is_active": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::user_response(target, "Ana", "ana@clinic.test", Role::Paciente, false)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &app.jwt_secret, None);

    let response = app
        .users
        .oneshot(request("PATCH", &format!("/{}/deactivate", target), &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["is_active"], false);
}

#[tokio::test]
async fn test_delete_unknown_user_is_not_found() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &app.jwt_secret, None);

    let response = app
        .users
        .oneshot(request("DELETE", &format!("/{}", Uuid::new_v4()), &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_only_admin_creates_specialties() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@clinic.test");
    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&doctor, &app.jwt_secret, None);

    let response = app
        .specialties
        .oneshot(request(
            "POST",
            "/",
            &token,
            Some(json!({ "name": "Cardiologia", "description": "Coração" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_assign_specialties_runs_in_one_call() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");
    let doctor_id = Uuid::new_v4();
    let specialty_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/assign_specialties"))
        .and(body_partial_json(json!({ "p_user_id": doctor_id, "p_specialty_ids": [specialty_id] })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": doctor_id,
            "name": "Dr. Lima",
            "email": "lima@clinic.test",
            "is_active": true,
            "role": { "id": Uuid::new_v4(), "name": "MEDICO", "description": "Médico" },
            "specialties": [{ "id": specialty_id, "name": "Cardiologia", "description": "Coração" }]
        }])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &app.jwt_secret, None);

    let response = app
        .specialties
        .oneshot(request(
            "POST",
            "/assign",
            &token,
            Some(json!({ "user_id": doctor_id, "specialties": [specialty_id] })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["specialties"][0]["name"], "Cardiologia");
}

#[tokio::test]
async fn test_role_fetched_by_id() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("p@clinic.test");
    let mut role_row = MockSupabaseResponses::role_response(Role::Secretaria);
    let role_id = Uuid::new_v4();
    role_row["id"] = json!(role_id);

    Mock::given(method("GET"))
        .and(path("/rest/v1/roles"))
        .and(query_param("id", format!("eq.{}", role_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([role_row])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/roles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&patient, &app.jwt_secret, None);

    let response = app
        .roles
        .clone()
        .oneshot(request("GET", &format!("/{}", role_id), &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], role_id.to_string());
    assert_eq!(body["name"], "SECRETARIA");

    let response = app
        .roles
        .clone()
        .oneshot(request("GET", &format!("/{}", Uuid::new_v4()), &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .roles
        .oneshot(request(
            "GET",
            &format!("/{}", role_id),
            &JwtTestUtils::create_malformed_token(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
