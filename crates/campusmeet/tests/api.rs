use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use campusmeet::config::AppConfig;
use campusmeet::db::Database;
use campusmeet::notify::{DiscordClient, MemoryMailer, Notifier};
use campusmeet::server::create_router;
use campusmeet::types::AppState;

struct TestApp {
    router: Router,
    mailer: Arc<MemoryMailer>,
}

impl TestApp {
    fn new() -> Self {
        let mailer = Arc::new(MemoryMailer::default());
        let notifier = Notifier::new(DiscordClient::new().unwrap(), mailer.clone());
        let db = Database::open_in_memory().unwrap();
        let state = Arc::new(AppState::new(AppConfig::for_tests(), db, notifier));
        Self {
            router: create_router(state),
            mailer,
        }
    }

    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Waits for the background delivery of the `nth` email and returns its code.
    async fn mailed_code(&self, nth: usize) -> String {
        for _ in 0..100 {
            if let Some(message) = self.mailer.sent().get(nth) {
                let (_, rest) = message.body.split_once(" is ").unwrap();
                return rest.split('.').next().unwrap().to_string();
            }
            tokio::task::yield_now().await;
        }
        panic!("email {nth} was never delivered");
    }

    /// Signs up, verifies and logs in. Returns the access token.
    async fn login(&self, email: &str, name: &str) -> String {
        let before = self.mailer.sent().len();
        let (status, _) = self
            .call(
                "POST",
                "/api/auth/signup",
                None,
                Some(json!({"email": email, "name": name, "school": "NTU"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let code = self.mailed_code(before).await;
        let (status, _) = self
            .call(
                "POST",
                "/api/auth/verify-email",
                None,
                Some(json!({"email": email, "code": code})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = self
            .call("POST", "/api/auth/request-login-otp", None, Some(json!({"email": email})))
            .await;
        assert_eq!(status, StatusCode::OK);

        let otp = self.mailed_code(before + 1).await;
        let (status, tokens) = self
            .call("POST", "/api/auth/login", None, Some(json!({"email": email, "code": otp})))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tokens["token_type"], "bearer");
        tokens["access_token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_and_root() {
    let app = TestApp::new();

    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.call("GET", "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "CampusMeet API");
}

#[tokio::test]
async fn test_login_then_free_slots() {
    let app = TestApp::new();
    let token = app.login("ann@campus.edu", "Ann").await;

    let (status, me) = app.call("GET", "/api/users/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ann@campus.edu");
    assert_eq!(me["email_verified"], true);

    let (status, _) = app
        .call(
            "POST",
            "/api/timetable",
            Some(&token),
            Some(json!({"data": {"monday": [{"period": "1", "course": "Calculus"}]}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, free) = app
        .call("GET", "/api/timetable/free-slots?weekday=monday", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(free["weekday"], "monday");
    let slots = free["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 7);
    assert_eq!(slots[0]["start"], "09:10");
}

#[tokio::test]
async fn test_auth_errors_share_one_body_shape() {
    let app = TestApp::new();

    let (status, body) = app.call("GET", "/api/rooms", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert!(body["context"].is_string());

    let (status, _) = app.call("GET", "/api/users/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // browsing public events needs no token
    let (status, body) = app.call("GET", "/api/events/public", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let token = app.login("bob@campus.edu", "Bob").await;
    let (status, body) = app.call("GET", "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_room_invite_and_vote() {
    let app = TestApp::new();
    let owner = app.login("owner@campus.edu", "Olive").await;
    let guest = app.login("guest@campus.edu", "Gus").await;

    let (status, room) = app
        .call("POST", "/api/rooms", Some(&owner), Some(json!({"name": "Study group"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(room["role"], "owner");
    assert_eq!(room["school"], "NTU");
    let room_id = room["id"].as_str().unwrap().to_string();
    let code = room["invite_code"].as_str().unwrap().to_lowercase();

    let (status, joined) = app
        .call("POST", "/api/rooms/join", Some(&guest), Some(json!({"invite_code": code})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(joined["id"], room_id.as_str());
    assert!(joined.get("invite_code").is_none());

    let (status, _) = app
        .call("POST", "/api/rooms/join", Some(&guest), Some(json!({"invite_code": code})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, event) = app
        .call(
            "POST",
            &format!("/api/rooms/{room_id}/events"),
            Some(&owner),
            Some(json!({
                "title": "Review session",
                "proposed_times": [
                    {"start": "2030-03-04T10:00:00Z", "end": "2030-03-04T11:00:00Z"},
                    {"start": "2030-03-05T10:00:00Z", "end": "2030-03-05T11:00:00Z"}
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_str().unwrap().to_string();
    let vote_uri = format!("/api/rooms/{room_id}/events/{event_id}/vote");

    let (status, tally) = app
        .call("POST", &vote_uri, Some(&guest), Some(json!({"time_index": 1, "vote": "yes"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tally["candidates"][1]["yes"], 1);
    assert_eq!(tally["candidates"][0]["yes"], 0);

    let (status, _) = app
        .call("POST", &vote_uri, Some(&guest), Some(json!({"time_index": 5, "vote": "yes"})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // the owner cannot leave their own room
    let (status, _) = app
        .call("POST", &format!("/api/rooms/{room_id}/leave"), Some(&owner), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call("POST", &format!("/api/rooms/{room_id}/leave"), Some(&guest), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call("GET", &format!("/api/rooms/{room_id}/events"), Some(&guest), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_public_event_lifecycle() {
    let app = TestApp::new();
    let host = app.login("host@campus.edu", "Hana").await;
    let visitor = app.login("visitor@campus.edu", "Vic").await;

    let (status, event) = app
        .call(
            "POST",
            "/api/events/public",
            Some(&host),
            Some(json!({
                "title": "Board games",
                "category": "social",
                "start_time": "2030-05-01T18:00:00Z",
                "end_time": "2030-05-01T21:00:00Z"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = event["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call("POST", &format!("/api/events/{event_id}/join"), Some(&visitor), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, listed) = app
        .call("GET", "/api/events/public?category=social", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed[0]["attendee_count"], 1);

    let (status, attendees) = app
        .call("GET", &format!("/api/events/{event_id}/attendees"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(attendees[0]["name"], "Vic");

    let (status, _) = app
        .call("DELETE", &format!("/api/events/{event_id}"), Some(&visitor), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call("DELETE", &format!("/api/events/{event_id}"), Some(&host), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call("GET", &format!("/api/events/{event_id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_calendar_endpoints_report_not_connected() {
    let app = TestApp::new();
    let token = app.login("cal@campus.edu", "Cal").await;

    let (status, body) = app
        .call("GET", "/api/calendar/google/status", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"google_connected": false, "apple_connected": false}));

    // no Google client id in the test configuration
    let (status, _) = app
        .call("GET", "/api/calendar/google/auth", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = app
        .call("POST", "/api/calendar/apple/connect", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_malformed_input_answers_with_error_body() {
    let app = TestApp::new();
    let token = app.login("ida@campus.edu", "Ida").await;

    let (status, body) = app
        .call("POST", "/api/timetable", Some(&token), Some(json!({"data": {"mon": []}})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");
    assert!(body["context"].is_string());

    let (status, body) = app.call("GET", "/api/timetable/free-slots", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");

    let (status, body) = app.call("GET", "/api/events/public?sort=bogus", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request");

    let (status, room) = app
        .call("POST", "/api/rooms", Some(&token), Some(json!({"name": "Solo"})))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let room_id = room["id"].as_str().unwrap().to_string();
    let (status, event) = app
        .call(
            "POST",
            &format!("/api/rooms/{room_id}/events"),
            Some(&token),
            Some(json!({
                "title": "Sync",
                "proposed_times": [{"start": "2030-03-04T10:00:00Z", "end": "2030-03-04T11:00:00Z"}]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let vote_uri = format!("/api/rooms/{room_id}/events/{}/vote", event["id"].as_str().unwrap());

    for bad in [json!({"time_index": 0, "vote": 5}), json!({"vote": "yes"})] {
        let (status, body) = app.call("POST", &vote_uri, Some(&token), Some(bad)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid request");
        assert!(body["context"].is_string());
    }

    let vote = json!({"time_index": 0, "vote": "yes"});
    let (status, body) = app
        .call("POST", "/api/rooms/nope/events/none/vote", Some(&token), Some(vote))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["context"].is_string());
}
