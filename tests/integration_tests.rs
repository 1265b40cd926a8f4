use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use tower::ServiceExt;

use voicebook::config::AppConfig;
use voicebook::handlers;
use voicebook::models::{BookingOutcome, BookingRequest, Slot};
use voicebook::services::booking_flow::BookingFlowController;
use voicebook::services::scheduling::SchedulingGateway;
use voicebook::services::session_store::InMemorySessionStore;
use voicebook::state::AppState;

// ── Mock Gateway ──

struct MockGateway {
    slots: Vec<Slot>,
    bookings: Arc<AtomicUsize>,
}

#[async_trait]
impl SchedulingGateway for MockGateway {
    async fn get_available_slots(
        &self,
        _date_from: Option<NaiveDate>,
        _date_to: Option<NaiveDate>,
    ) -> Vec<Slot> {
        self.slots.clone()
    }

    async fn create_booking(&self, _request: &BookingRequest) -> BookingOutcome {
        self.bookings.fetch_add(1, Ordering::SeqCst);
        BookingOutcome::booked(Some("1001".to_string()), Some("https://cal.com/video/1001".to_string()))
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        cal_com_api_key: "".to_string(),
        cal_com_event_type_id: "".to_string(),
        cal_com_base_url: "http://localhost:9".to_string(),
        meeting_duration_minutes: 30,
        gateway_timeout_seconds: 1,
        session_ttl_minutes: 30,
        session_sweep_seconds: 60,
        email_hints: vec![],
        booking_note: "Meeting booked via voice AI assistant".to_string(),
    }
}

fn test_state_with_slots(slots: &[&str]) -> (Arc<AppState>, Arc<AtomicUsize>) {
    let bookings = Arc::new(AtomicUsize::new(0));
    let gateway = MockGateway {
        slots: slots.iter().map(|s| Slot::new(*s)).collect(),
        bookings: Arc::clone(&bookings),
    };
    let state = Arc::new(AppState {
        config: test_config(),
        booking: BookingFlowController::new(
            Arc::new(gateway),
            Arc::new(InMemorySessionStore::new()),
        ),
    });
    (state, bookings)
}

fn test_state() -> (Arc<AppState>, Arc<AtomicUsize>) {
    test_state_with_slots(&["2025-06-16T09:00:00.000Z", "2025-06-16T09:30:00.000Z"])
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn message_request(session_id: &str, message: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/booking/message")
        .header("Content-Type", "application/json")
        .body(Body::from(
            serde_json::json!({ "session_id": session_id, "message": message }).to_string(),
        ))
        .unwrap()
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, session_id: &str, message: &str) -> serde_json::Value {
    let res = app
        .clone()
        .oneshot(message_request(session_id, message))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await
}

// ── Tests ──

#[tokio::test]
async fn test_health() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["status"], "ok");
}

#[tokio::test]
async fn test_booking_conversation_over_http() {
    let (state, bookings) = test_state();
    let app = test_app(state);

    let json = send(&app, "room-1", "Can I schedule a consultation?").await;
    assert_eq!(json["handled"], true);
    assert_eq!(json["stage"], "show_times");
    assert!(json["reply"].as_str().unwrap().contains("On Monday, June 16"));

    let json = send(&app, "room-1", "sounds good").await;
    assert_eq!(json["stage"], "collect_info");

    let json = send(&app, "room-1", "My name is Francis and my email is thinkout98@gmail.com").await;
    assert_eq!(json["stage"], "confirm_booking");
    let spoken = json["spoken"].as_str().unwrap();
    assert!(spoken.contains("thinkout98 at gmail.com"));
    assert!(!spoken.contains('@'));

    let json = send(&app, "room-1", "yes, book it").await;
    assert_eq!(json["stage"], "completed");
    assert!(json["reply"].as_str().unwrap().contains("successfully booked"));

    let json = send(&app, "room-1", "yes").await;
    assert_eq!(json["handled"], false);
    assert!(json.get("reply").is_none());
    assert_eq!(bookings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unrelated_utterance_not_handled() {
    let (state, _) = test_state();
    let app = test_app(state);

    let json = send(&app, "room-2", "What frameworks do you use?").await;
    assert_eq!(json["handled"], false);
    assert_eq!(json["stage"], "initial");

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/booking/sessions/room-2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_missing_session_id_is_generated() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/booking/message")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"message":"book a call"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    let session_id = json["session_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(session_id).is_ok());
    assert_eq!(json["stage"], "show_times");
}

#[tokio::test]
async fn test_empty_message_rejected() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app.oneshot(message_request("room-3", "   ")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(res).await["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn test_no_slots_apology() {
    let (state, bookings) = test_state_with_slots(&[]);
    let app = test_app(state);

    let json = send(&app, "room-4", "I want to book a meeting").await;
    assert!(json["reply"].as_str().unwrap().contains("don't see any available slots"));

    send(&app, "room-4", "ok").await;
    send(&app, "room-4", "My name is Francis and my email is thinkout98@gmail.com").await;

    let json = send(&app, "room-4", "yes").await;
    assert_eq!(json["stage"], "confirm_booking");
    assert!(json["reply"].as_str().unwrap().contains("I'm sorry"));
    assert_eq!(bookings.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_session_snapshot_and_reset() {
    let (state, _) = test_state();
    let app = test_app(state);

    send(&app, "room-5", "let's talk about a project").await;
    send(&app, "room-5", "sure").await;
    send(&app, "room-5", "j").await;

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/booking/sessions/room-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["stage"], "collect_info");
    assert_eq!(json["email_fragments"], serde_json::json!(["j"]));

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/booking/sessions/room-5/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(res).await["reset"], true);

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/booking/sessions/room-5")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_available_times_endpoint() {
    let (state, _) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(
            Request::builder()
                .uri("/api/booking/times")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let times = body_json(res).await["times"].as_str().unwrap().to_string();
    assert!(times.contains("09:00 AM, 09:30 AM"));
}

fn book_request(session_id: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/booking/sessions/{session_id}/book"))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_direct_booking_endpoint_books_once() {
    let (state, bookings) = test_state();
    let app = test_app(state);
    let body = serde_json::json!({
        "name": "Francis",
        "email": "thinkout98@gmail.com",
        "preferred_time": "2025-06-16T09:30:00Z"
    });

    let res = app.clone().oneshot(book_request("room-6", body.clone())).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["stage"], "completed");
    assert!(json["reply"].as_str().unwrap().contains("successfully booked"));
    assert!(json["spoken"].as_str().unwrap().contains("thinkout98 at gmail.com"));

    let res = app.clone().oneshot(book_request("room-6", body)).await.unwrap();
    assert!(body_json(res).await["reply"].as_str().unwrap().contains("already booked"));

    let json = send(&app, "room-6", "yes").await;
    assert_eq!(json["handled"], false);
    assert_eq!(bookings.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_direct_booking_requires_contact() {
    let (state, bookings) = test_state();
    let app = test_app(state);

    let res = app
        .oneshot(book_request("room-7", serde_json::json!({"name": "", "email": "a@b.com"})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(bookings.load(Ordering::SeqCst), 0);
}
