use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use alphabots_server::auth::issue_token;
use alphabots_server::config::Config;
use alphabots_server::db::{InMemoryStore, Store};
use alphabots_server::models::{Event, NewEvent, PaymentStatus, Role, User};
use alphabots_server::routes::create_routes;
use alphabots_server::state::AppState;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "JWT_SECRET" => Some(SECRET.to_string()),
            _ => None,
        })
        .unwrap();
        let store = Arc::new(InMemoryStore::new());
        let router = create_routes(AppState::new(config, store.clone()));
        Self { router, store }
    }

    async fn user(&self, name: &str, role: Role) -> (Uuid, String) {
        let id = Uuid::new_v4();
        self.store
            .add_user(User {
                id,
                name: name.to_string(),
                email: format!("{}@example.org", name.to_lowercase()),
                role,
                created_at: Utc::now(),
            })
            .await;
        (id, issue_token(id, SECRET, Duration::hours(1)).unwrap())
    }

    async fn event(&self, price: Decimal, max_attendees: Option<i32>) -> Event {
        self.store
            .insert_event(
                &NewEvent {
                    title: "Robotics Workshop".to_string(),
                    description: "Build your first robot".to_string(),
                    date: Utc::now() + Duration::days(1),
                    location: "STEM Lab".to_string(),
                    price,
                    max_attendees,
                    image: Some("robot".to_string()),
                },
                None,
            )
            .await
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

#[tokio::test]
async fn paid_event_with_single_seat() {
    let app = TestApp::new();
    let (user_a, token_a) = app.user("Ada", Role::User).await;
    let (_, token_b) = app.user("Ben", Role::User).await;
    let event = app.event(Decimal::new(2500, 2), Some(1)).await;
    let rsvp_uri = format!("/events/{}/rsvp", event.id);

    let (status, body) = app.send(Method::POST, &rsvp_uri, Some(&token_a), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["userId"], json!(user_a.to_string()));

    let (status, body) = app.send(Method::POST, &rsvp_uri, Some(&token_b), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CAPACITY_EXCEEDED");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/events/{}/payment", event.id),
            Some(&token_a),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment"]["status"], "pending");
    let payment_id = body["data"]["payment"]["id"].as_str().unwrap().to_string();
    assert!(body["data"]["paymentUrl"]
        .as_str()
        .unwrap()
        .ends_with(&format!("?payment={payment_id}")));

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/payments/{payment_id}/complete"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Payment completed");
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = app
        .send(Method::GET, &format!("/events?userId={user_a}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = &body["data"][0];
    assert_eq!(listed["id"], json!(event.id.to_string()));
    assert_eq!(listed["attendeeCount"], 1);
    assert_eq!(listed["userRSVP"], true);
    assert_eq!(listed["userPaid"], true);
    assert_eq!(listed["userInterested"], false);
    let fields = listed.as_object().unwrap();
    for raw in ["rsvps", "payments", "interests"] {
        assert!(!fields.contains_key(raw), "{raw} leaked into the listing");
    }

    let (status, _) = app.send(Method::DELETE, &rsvp_uri, Some(&token_a), None).await;
    assert_eq!(status, StatusCode::OK);
    let payment = app.store.get_payment(user_a, event.id).await.unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(app.store.get_rsvp(user_a, event.id).await.unwrap().is_none());
}

#[tokio::test]
async fn free_event_payment_is_rejected() {
    let app = TestApp::new();
    let (_, token) = app.user("Ada", Role::User).await;
    let event = app.event(Decimal::ZERO, None).await;

    let (status, _) = app
        .send(Method::POST, &format!("/events/{}/rsvp", event.id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(Method::POST, &format!("/events/{}/payment", event.id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATE");
    assert_eq!(body["error"]["message"], "This is a free event");
}

#[tokio::test]
async fn anonymous_listing_has_counts_but_no_flags() {
    let app = TestApp::new();
    let (_, token) = app.user("Ada", Role::User).await;
    let event = app.event(Decimal::ZERO, None).await;
    app.send(Method::POST, &format!("/events/{}/interest", event.id), Some(&token), None)
        .await;

    let (status, body) = app.send(Method::GET, "/events", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = &body["data"][0];
    assert_eq!(listed["interestedCount"], 1);
    assert_eq!(listed["userInterested"], false);
    assert_eq!(listed["userRSVP"], false);

    let (status, body) = app.send(Method::GET, "/events?userId=nope", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn identity_is_required_for_reservations() {
    let app = TestApp::new();
    let event = app.event(Decimal::ZERO, None).await;
    let uri = format!("/events/{}/rsvp", event.id);

    let (status, body) = app.send(Method::POST, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = app.send(Method::POST, &uri, Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Valid signature, but the account does not exist here.
    let stranger = issue_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();
    let (status, _) = app.send(Method::POST, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn interest_listing_and_admin_gate() {
    let app = TestApp::new();
    let (_, admin_token) = app.user("Grace", Role::Admin).await;
    let (_, ada) = app.user("Ada", Role::User).await;
    let (_, ben) = app.user("Ben", Role::User).await;
    let event = app.event(Decimal::ZERO, None).await;
    let interest_uri = format!("/events/{}/interest", event.id);
    let interested_uri = format!("/events/{}/interested", event.id);

    for token in [&ada, &ben] {
        let (status, _) = app.send(Method::POST, &interest_uri, Some(token), None).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = app.send(Method::POST, &interest_uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = app.send(Method::GET, &interested_uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::GET, &interested_uri, Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["name"], "Ben");
    assert_eq!(listed[1]["email"], "ada@example.org");
    assert!(listed[0]["createdAt"].is_string());

    let (status, _) = app.send(Method::DELETE, &interest_uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.send(Method::DELETE, &interest_uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["message"], "Interest not found");
}

#[tokio::test]
async fn admin_creates_and_seeds_events() {
    let app = TestApp::new();
    let (admin_id, admin_token) = app.user("Grace", Role::Admin).await;
    let (_, member_token) = app.user("Ada", Role::User).await;

    let payload = json!({
        "title": "Build Night",
        "description": "Open lab for all teams",
        "date": (Utc::now() + Duration::days(7)).to_rfc3339(),
        "location": "STEM Lab",
        "price": 10,
        "maxAttendees": 12
    });

    let (status, _) = app
        .send(Method::POST, "/events", Some(&member_token), Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::POST, "/events", Some(&admin_token), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["maxAttendees"], 12);
    assert_eq!(body["data"]["createdBy"], json!(admin_id.to_string()));

    let (status, body) = app
        .send(Method::POST, "/events/samples", Some(&admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Sample events created successfully");

    let (_, body) = app
        .send(Method::POST, "/events/samples", Some(&admin_token), None)
        .await;
    assert_eq!(body["message"], "Sample event already exists");

    let (_, body) = app.send(Method::GET, "/events", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["title"], "Build Night");
}

#[tokio::test]
async fn profile_and_health() {
    let app = TestApp::new();
    let (user_id, token) = app.user("Ada", Role::User).await;

    let (status, body) = app.send(Method::GET, "/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(user_id.to_string()));
    assert_eq!(body["data"]["role"], "user");

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn unknown_payment_completion_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/payments/{}/complete", Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn malformed_path_ids_use_the_error_envelope() {
    let app = TestApp::new();
    let (_, token) = app.user("Ada", Role::User).await;

    let (status, body) = app
        .send(Method::POST, "/payments/not-a-uuid/complete", None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "Payment not found");

    let (status, body) = app
        .send(Method::POST, "/events/abc/rsvp", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "Event not found");

    // The auth gate still runs first.
    let (status, body) = app.send(Method::POST, "/events/abc/rsvp", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn malformed_bodies_and_queries_are_validation_errors() {
    let app = TestApp::new();
    let (_, admin_token) = app.user("Root", Role::Admin).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/events")
        .header(header::AUTHORIZATION, format!("Bearer {admin_token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    // Missing required fields.
    let (status, body) = app
        .send(
            Method::POST,
            "/events",
            Some(&admin_token),
            Some(json!({ "title": "No date" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(Method::GET, "/events?userId=a&userId=b", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}
