use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use inventory_cell::router::{manufacturer_routes, medicine_routes};
use shared_database::AppState;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

fn test_state(mock_uri: &str) -> (Arc<AppState>, String) {
    let config = TestConfig::with_mock_server(mock_uri);
    let jwt_secret = config.jwt_secret.clone();
    (Arc::new(AppState::new(config)), jwt_secret)
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

async fn mount_medicine(mock_server: &MockServer, medicine_id: Uuid, row: Value, times: u64) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("id", format!("eq.{}", medicine_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .up_to_n_times(times)
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_secretary_registers_medicine() {
    let mock_server = MockServer::start().await;
    let secretary = TestUser::secretary("sec@clinic.test");
    let manufacturer_id = Uuid::new_v4();
    let medicine_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/manufacturers"))
        .and(query_param("id", format!("eq.{}", manufacturer_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": manufacturer_id }])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/medicines"))
        .and(body_partial_json(json!({ "batch": "L2024-001", "active": true })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::medicine_response(medicine_id, manufacturer_id, 40, 10)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&secretary, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request(
            "POST",
            "/",
            &token,
            Some(json!({
                "commercial_name": "Dipirona 500mg",
                "manufacturer_id": manufacturer_id,
                "batch": "L2024-001",
                "quantity_in_stock": 40,
                "minimum_quantity": 10,
                "expiry_date": "2030-12-31"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["quantity_in_stock"], 40);
}

#[tokio::test]
async fn test_medicine_with_past_expiry_is_rejected() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");

    Mock::given(method("POST"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &secret, None);
    let yesterday = Utc::now().date_naive() - Duration::days(1);

    let response = medicine_routes(state)
        .oneshot(request(
            "POST",
            "/",
            &token,
            Some(json!({
                "commercial_name": "Dipirona 500mg",
                "manufacturer_id": Uuid::new_v4(),
                "batch": "L1",
                "quantity_in_stock": 5,
                "expiry_date": yesterday
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_medicine_requires_known_manufacturer() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/manufacturers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request(
            "POST",
            "/",
            &token,
            Some(json!({
                "commercial_name": "Dipirona 500mg",
                "manufacturer_id": Uuid::new_v4(),
                "batch": "L1",
                "expiry_date": "2030-12-31"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patient_cannot_reach_inventory() {
    let mock_server = MockServer::start().await;
    let patient = TestUser::patient("p@clinic.test");

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&patient, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request("GET", "/", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_stock_withdrawal_updates_quantity() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@clinic.test");
    let medicine_id = Uuid::new_v4();
    let manufacturer_id = Uuid::new_v4();

    mount_medicine(
        &mock_server,
        medicine_id,
        MockSupabaseResponses::medicine_response(medicine_id, manufacturer_id, 20, 5),
        1,
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("quantity_in_stock", "eq.20"))
        .and(body_partial_json(json!({ "quantity_in_stock": 14 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medicine_response(medicine_id, manufacturer_id, 14, 5)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&doctor, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request(
            "PUT",
            &format!("/{}/estoque", medicine_id),
            &token,
            Some(json!({ "quantidade": -6 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["quantity_in_stock"], 14);
}

#[tokio::test]
async fn test_stock_cannot_go_negative() {
    let mock_server = MockServer::start().await;
    let secretary = TestUser::secretary("sec@clinic.test");
    let medicine_id = Uuid::new_v4();

    mount_medicine(
        &mock_server,
        medicine_id,
        MockSupabaseResponses::medicine_response(medicine_id, Uuid::new_v4(), 2, 5),
        1,
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&secretary, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request(
            "PUT",
            &format!("/{}/estoque", medicine_id),
            &token,
            Some(json!({ "quantity": -5 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stock_retry_after_concurrent_change() {
    let mock_server = MockServer::start().await;
    let secretary = TestUser::secretary("sec@clinic.test");
    let medicine_id = Uuid::new_v4();
    let manufacturer_id = Uuid::new_v4();

    // First read sees 10, a concurrent withdrawal leaves 8 for the retry.
    mount_medicine(
        &mock_server,
        medicine_id,
        MockSupabaseResponses::medicine_response(medicine_id, manufacturer_id, 10, 0),
        1,
    )
    .await;
    mount_medicine(
        &mock_server,
        medicine_id,
        MockSupabaseResponses::medicine_response(medicine_id, manufacturer_id, 8, 0),
        1,
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("quantity_in_stock", "eq.10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("quantity_in_stock", "eq.8"))
        .and(body_partial_json(json!({ "quantity_in_stock": 11 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medicine_response(medicine_id, manufacturer_id, 11, 0)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&secretary, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request(
            "PUT",
            &format!("/{}/estoque", medicine_id),
            &token,
            Some(json!({ "quantity": 3 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["quantity_in_stock"], 11);
}

#[tokio::test]
async fn test_stock_contention_gives_up_with_conflict() {
    let mock_server = MockServer::start().await;
    let secretary = TestUser::secretary("sec@clinic.test");
    let medicine_id = Uuid::new_v4();

    mount_medicine(
        &mock_server,
        medicine_id,
        MockSupabaseResponses::medicine_response(medicine_id, Uuid::new_v4(), 10, 0),
        u64::MAX,
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(3)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&secretary, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request(
            "PUT",
            &format!("/{}/estoque", medicine_id),
            &token,
            Some(json!({ "quantity": 1 })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_search_by_name_is_case_insensitive() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@clinic.test");
    let medicine_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("commercial_name", "ilike.*dipi*"))
        .and(query_param("active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medicine_response(medicine_id, Uuid::new_v4(), 40, 10)
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&doctor, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request("GET", "/nome?nome=dipi", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_expiring_defaults_to_thirty_days() {
    let mock_server = MockServer::start().await;
    let doctor = TestUser::doctor("doc@clinic.test");
    let today = Utc::now().date_naive();
    let horizon = today + Duration::days(30);

    let mut expiring = MockSupabaseResponses::medicine_response(Uuid::new_v4(), Uuid::new_v4(), 40, 10);
    expiring["expiry_date"] = json!(today + Duration::days(10));

    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("expiry_date", format!("gte.{}", today)))
        .and(query_param("expiry_date", format!("lte.{}", horizon)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([expiring])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&doctor, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request("GET", "/vencimento", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_low_stock_and_report() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");
    let manufacturer_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("active", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::medicine_response(Uuid::new_v4(), manufacturer_id, 100, 10),
            MockSupabaseResponses::medicine_response(Uuid::new_v4(), manufacturer_id, 10, 10),
            MockSupabaseResponses::medicine_response(Uuid::new_v4(), manufacturer_id, 2, 10),
        ])))
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &secret, None);
    let app = medicine_routes(state);

    let response = app
        .clone()
        .oneshot(request("GET", "/estoque-baixo", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 2);

    let response = app
        .oneshot(request("GET", "/relatorio", &token, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["total_medicines"], 3);
    assert_eq!(report["total_units"], 112);
    assert_eq!(report["low_stock"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_medicine_is_soft() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");
    let medicine_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/medicines"))
        .and(query_param("id", format!("eq.{}", medicine_id)))
        .and(body_partial_json(json!({ "active": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": medicine_id }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/medicines"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &secret, None);

    let response = medicine_routes(state)
        .oneshot(request("DELETE", &format!("/{}", medicine_id), &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_manufacturers_listed_by_name() {
    let mock_server = MockServer::start().await;
    let secretary = TestUser::secretary("sec@clinic.test");

    Mock::given(method("GET"))
        .and(path("/rest/v1/manufacturers"))
        .and(query_param("order", "name.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::manufacturer_response(Uuid::new_v4(), "EMS"),
            MockSupabaseResponses::manufacturer_response(Uuid::new_v4(), "Medley"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&secretary, &secret, None);

    let response = manufacturer_routes(state)
        .oneshot(request("GET", "/", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body[0]["name"], "EMS");
}

#[tokio::test]
async fn test_only_admin_registers_manufacturers() {
    let mock_server = MockServer::start().await;
    let secretary = TestUser::secretary("sec@clinic.test");

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&secretary, &secret, None);

    let response = manufacturer_routes(state)
        .oneshot(request("POST", "/", &token, Some(json!({ "name": "EMS" }))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_manufacturer_in_use_cannot_be_deleted() {
    let mock_server = MockServer::start().await;
    let admin = TestUser::admin("admin@clinic.test");
    let manufacturer_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/manufacturers"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "23503",
            "update or delete on table \"manufacturers\" violates foreign key constraint",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (state, secret) = test_state(&mock_server.uri());
    let token = JwtTestUtils::create_test_token(&admin, &secret, None);

    let response = manufacturer_routes(state)
        .oneshot(request("DELETE", &format!("/{}", manufacturer_id), &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
