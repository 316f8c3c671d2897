use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;
use wayfarer_api::{app, AppState};
use wayfarer_store::app_config::BookingRules;
use wayfarer_store::MemoryStore;

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let rules = BookingRules {
            admission_max_attempts: 3,
            admission_backoff_ms: 1,
            reference_prefix: "WF".to_string(),
        };
        let state = AppState::in_memory(store.clone(), &rules, 32);
        Self {
            router: app(state),
            store,
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn destination(&self, name: &str, country: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/v1/destinations",
                Some(json!({
                    "name": name,
                    "country": country,
                    "city": name,
                    "price_amount": 100_000,
                    "is_featured": true
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }

    async fn package(&self, destination_id: &str, name: &str, price: i64, max: u32) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/v1/packages",
                Some(json!({
                    "name": name,
                    "destination_id": destination_id,
                    "start_date": "2026-08-01",
                    "end_date": "2026-08-08",
                    "unit_price_amount": price,
                    "max_participants": max,
                    "package_type": "LUXURY"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }

    async fn book(&self, package_id: &str, user_id: Uuid, participants: u32) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/v1/bookings",
            Some(json!({
                "user_id": user_id,
                "package_id": package_id,
                "participants": participants,
                "special_requests": "Window seats"
            })),
        )
        .await
    }
}

fn id(value: &Value) -> String {
    value["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = TestApp::new();
    let user = app.store.add_user().await;
    let destination = app.destination("Santorini", "Greece").await;
    let package = app.package(&id(&destination), "Caldera Sunsets", 200, 5).await;
    let package_id = id(&package);

    let (status, booking) = app.book(&package_id, user, 3).await;
    assert_eq!(status, StatusCode::CREATED, "{}", booking);
    assert_eq!(booking["total_price_amount"], 600);
    assert_eq!(booking["booking_status"], "PENDING");
    assert_eq!(booking["payment_status"], "PENDING");
    let reference = booking["booking_reference"].as_str().unwrap().to_string();
    assert!(reference.starts_with("WF-"));
    let booking_id = id(&booking);

    let (status, found) = app
        .send(Method::GET, &format!("/v1/bookings/reference/{}", reference), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(id(&found), booking_id);

    let (status, availability) = app
        .send(Method::GET, &format!("/v1/packages/{}/availability", package_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(availability["committed_participants"], 3);
    assert_eq!(availability["available_participants"], 2);

    // Over capacity
    let (status, body) = app.book(&package_id, user, 3).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Not enough space"));

    // Paying confirms
    let (status, paid) = app
        .send(
            Method::PATCH,
            &format!("/v1/bookings/{}/payment-status", booking_id),
            Some(json!({ "status": "paid" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["payment_status"], "PAID");
    assert_eq!(paid["booking_status"], "CONFIRMED");

    let (status, confirmed) = app
        .send(Method::GET, &format!("/v1/bookings/user/{}/confirmed", user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed.as_array().unwrap().len(), 1);

    // Cancel releases, a second cancel conflicts
    let (status, cancelled) = app
        .send(Method::PATCH, &format!("/v1/bookings/{}/cancel", booking_id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["booking_status"], "CANCELLED");

    let (status, _) = app
        .send(Method::PATCH, &format!("/v1/bookings/{}/cancel", booking_id), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, availability) = app
        .send(Method::GET, &format!("/v1/packages/{}/availability", package_id), None)
        .await;
    assert_eq!(availability["available_participants"], 5);
}

#[tokio::test]
async fn test_status_errors() {
    let app = TestApp::new();
    let user = app.store.add_user().await;
    let destination = app.destination("Cape Town", "South Africa").await;
    let package = app.package(&id(&destination), "Winelands", 100, 4).await;
    let (_, booking) = app.book(&id(&package), user, 1).await;
    let booking_id = id(&booking);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/v1/bookings/{}/status", booking_id),
            Some(json!({ "status": "LOST" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/v1/bookings/{}/status", booking_id),
            Some(json!({ "status": "COMPLETED" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .send(Method::GET, &format!("/v1/bookings/{}", Uuid::new_v4()), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.book(&id(&package), Uuid::new_v4(), 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.book(&id(&package), user, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_booking_participants() {
    let app = TestApp::new();
    let user = app.store.add_user().await;
    let destination = app.destination("Hanoi", "Vietnam").await;
    let package = app.package(&id(&destination), "Ha Long Bay", 250, 4).await;
    let (_, booking) = app.book(&id(&package), user, 2).await;

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/v1/bookings/{}", id(&booking)),
            Some(json!({ "participants": 4 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["participants"], 4);
    assert_eq!(updated["total_price_amount"], 1000);
    assert_eq!(updated["special_requests"], "Window seats");

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/v1/bookings/{}", id(&booking)),
            Some(json!({ "participants": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_package_delete_cascades_to_bookings() {
    let app = TestApp::new();
    let user = app.store.add_user().await;
    let destination = app.destination("Banff", "Canada").await;
    let package = app.package(&id(&destination), "Rockies Rail", 300, 10).await;
    let (_, booking) = app.book(&id(&package), user, 2).await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/v1/packages/{}", id(&package)), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, &format!("/v1/bookings/{}", id(&booking)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::DELETE, &format!("/v1/destinations/{}", id(&destination)), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_catalog_listing() {
    let app = TestApp::new();
    let user = app.store.add_user().await;
    let lima = app.destination("Lima", "Peru").await;
    let oslo = app.destination("Oslo", "Norway").await;
    let ceviche = app.package(&id(&lima), "Ceviche Tour", 80, 2).await;
    app.package(&id(&oslo), "Fjord Cruise", 900, 6).await;

    let (status, found) = app.send(Method::GET, "/v1/packages?q=peru", None).await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "Ceviche Tour");

    let (_, cheap) = app.send(Method::GET, "/v1/packages?max_price=100", None).await;
    assert_eq!(cheap.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(Method::GET, "/v1/packages?package_type=CRUISE", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.book(&id(&ceviche), user, 2).await;
    let (_, open) = app.send(Method::GET, "/v1/packages/with-space", None).await;
    let open = open.as_array().unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0]["name"], "Fjord Cruise");
    assert_eq!(open[0]["available_participants"], 6);

    let (_, norway) = app
        .send(Method::GET, "/v1/destinations?country=norway", None)
        .await;
    assert_eq!(norway.as_array().unwrap().len(), 1);

    let (status, toggled) = app
        .send(Method::PATCH, &format!("/v1/destinations/{}/toggle-status", id(&oslo)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["is_active"], false);

    let (_, featured) = app.send(Method::GET, "/v1/destinations?featured=true", None).await;
    assert_eq!(featured.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_date_range_query() {
    let app = TestApp::new();
    let user = app.store.add_user().await;
    let destination = app.destination("Tbilisi", "Georgia").await;
    let package = app.package(&id(&destination), "Caucasus Wine", 120, 8).await;
    app.book(&id(&package), user, 1).await;

    let (status, all) = app
        .send(
            Method::GET,
            "/v1/bookings/date-range?start=2000-01-01T00:00:00Z&end=2999-01-01T00:00:00Z",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::GET,
            "/v1/bookings/date-range?start=2999-01-01T00:00:00Z&end=2000-01-01T00:00:00Z",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
