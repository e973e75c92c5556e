use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use ride_scheduler::api::rest::router;
use ride_scheduler::config::Config;
use ride_scheduler::state::AppState;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(Config::default())))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn ride_payload(minutes_ahead: i64) -> Value {
    json!({
        "rider_id": "00000000-0000-0000-0000-000000000042",
        "rider_phone": "+15550100",
        "pickup_address": "1 Main St",
        "dropoff_address": "9 Elm St",
        "vehicle_type": "sedan",
        "scheduled_for": (Utc::now() + Duration::minutes(minutes_ahead)).to_rfc3339()
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rides"], 0);
    assert_eq!(body["drivers"], 0);
    assert_eq!(body["available_drivers"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("available_drivers"));
}

#[tokio::test]
async fn create_driver_returns_driver() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({
                "name": "Alice",
                "phone": "+15550200",
                "gender": "female",
                "vehicle_type": "sedan",
                "rating": 4.5
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["vehicle_type"], "sedan");
    assert_eq!(body["rating"], 4.5);
    assert_eq!(body["is_available"], true);
    assert!(!body["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn create_driver_empty_name_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({
                "name": "  ",
                "phone": "+15550200",
                "gender": "male",
                "vehicle_type": "suv",
                "rating": 4.5
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_driver_rating_clamped_to_5() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({
                "name": "Max",
                "phone": "+15550200",
                "gender": "other",
                "vehicle_type": "luxury",
                "rating": 9.9
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["rating"], 5.0);
}

#[tokio::test]
async fn create_scheduled_ride_returns_scheduled() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/rides", ride_payload(90)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "scheduled");
    assert_eq!(body["is_scheduled"], true);
    assert_eq!(body["reminder_sent"], false);
    assert!(body["driver"].is_null());
    assert_eq!(body["otp"].as_str().unwrap().len(), 4);
}

#[tokio::test]
async fn create_ride_without_time_enters_searching() {
    let app = setup();
    let mut payload = ride_payload(0);
    payload.as_object_mut().unwrap().remove("scheduled_for");

    let response = app
        .oneshot(json_request("POST", "/rides", payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "searching");
    assert_eq!(body["is_scheduled"], false);
}

#[tokio::test]
async fn create_ride_short_lead_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/rides", ride_payload(10)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_nonexistent_ride_returns_404() {
    let app = setup();
    let fake_id = "00000000-0000-0000-0000-000000000000";
    let response = app
        .oneshot(get_request(&format!("/rides/{fake_id}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reschedule_and_cancel_round_trip() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/rides", ride_payload(90)))
        .await
        .unwrap();
    let ride = body_json(response).await;
    let id = ride["id"].as_str().unwrap().to_string();

    let new_time = (Utc::now() + Duration::minutes(240)).to_rfc3339();
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{id}/reschedule"),
            json!({ "scheduled_for": new_time }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let rescheduled = body_json(response).await;
    assert_eq!(rescheduled["status"], "scheduled");
    assert_eq!(rescheduled["reminder_sent"], false);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/rides/{id}/cancel"),
            json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cancelled = body_json(response).await;
    assert_eq!(cancelled["status"], "cancelled");
    assert!(!cancelled["cancelled_at"].is_null());

    // Cancelling again is a no-op, not an error.
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/rides/{id}/cancel"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reschedule_short_lead_returns_400() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/rides", ride_payload(90)))
        .await
        .unwrap();
    let ride = body_json(response).await;
    let id = ride["id"].as_str().unwrap().to_string();

    let too_soon = (Utc::now() + Duration::minutes(5)).to_rfc3339();
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/rides/{id}/reschedule"),
            json!({ "scheduled_for": too_soon }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_driver_availability() {
    let app = setup();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/drivers",
            json!({
                "name": "Eve",
                "phone": "+15550300",
                "gender": "female",
                "vehicle_type": "auto",
                "rating": 4.0
            }),
        ))
        .await
        .unwrap();
    let driver = body_json(response).await;
    let id = driver["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/drivers/{id}/availability"),
            json!({ "is_available": false }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["is_available"], false);

    // Setting the same state again reports it unchanged.
    let response = app
        .oneshot(json_request(
            "PATCH",
            &format!("/drivers/{id}/availability"),
            json!({ "is_available": false }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["is_available"], false);
}
