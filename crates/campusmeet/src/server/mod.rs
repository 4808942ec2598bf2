use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::{middleware as mw, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::server::endpoints::{admin, auth, calendar, events, rooms, status, timetable, users, webhooks};
use crate::server::middleware::auth::{require_admin, require_user};
use crate::types::AppState;

mod endpoints;
mod middleware;
mod types;

/// Builds the CORS layer from the configured origins. `*` allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let auth_router = Router::new()
        .route("/signup", post(auth::post_signup))
        .route("/verify-email", post(auth::post_verify_email))
        .route("/request-login-otp", post(auth::post_request_login_otp))
        .route("/login", post(auth::post_login))
        .route("/refresh", post(auth::post_refresh));

    let users_router = Router::new()
        .route("/me", get(users::get_me))
        .route_layer(mw::from_fn_with_state(app_state.clone(), require_user));

    // require_user is added last so it runs before require_admin
    let admin_router = Router::new()
        .route("/users", get(admin::get_users))
        .route(
            "/users/:user_id",
            get(admin::get_user).put(admin::put_user).delete(admin::delete_user),
        )
        .route("/templates", post(admin::post_template))
        .route("/templates/pending", get(admin::get_pending_templates))
        .route("/templates/:template_id/review", post(admin::post_review_template))
        .route_layer(mw::from_fn(require_admin))
        .route_layer(mw::from_fn_with_state(app_state.clone(), require_user));

    let timetable_router = Router::new()
        .route("/", get(timetable::get_timetable).post(timetable::post_timetable))
        .route("/templates/submit", post(timetable::post_submit_template))
        .route("/free-slots", get(timetable::get_free_slots))
        .route_layer(mw::from_fn_with_state(app_state.clone(), require_user))
        .route("/templates", get(timetable::get_templates));

    let rooms_router = Router::new()
        .route("/", get(rooms::get_rooms).post(rooms::post_room))
        .route("/join", post(rooms::post_join))
        .route("/:room_id", get(rooms::get_room).delete(rooms::delete_room))
        .route("/:room_id/invite", post(rooms::post_invite))
        .route("/:room_id/invite-code", get(rooms::get_invite_code))
        .route(
            "/:room_id/invite-code/regenerate",
            post(rooms::post_regenerate_invite_code),
        )
        .route("/:room_id/leave", post(rooms::post_leave))
        .route("/:room_id/members/free-slots", get(rooms::get_members_free_slots))
        .route(
            "/:room_id/events",
            get(rooms::get_room_events).post(rooms::post_room_event),
        )
        .route("/:room_id/events/:event_id/vote", post(rooms::post_vote))
        .route(
            "/:room_id/webhooks",
            get(webhooks::get_webhooks).post(webhooks::post_webhook),
        )
        .route(
            "/:room_id/webhooks/:webhook_id",
            delete(webhooks::delete_webhook),
        )
        .route_layer(mw::from_fn_with_state(app_state.clone(), require_user));

    // Browsing public events needs no token; everything else does. Merging joins the
    // method routers that share a path.
    let public_events_router = Router::new()
        .route("/public", get(events::get_public_events))
        .route("/:event_id", get(events::get_event))
        .route("/:event_id/attendees", get(events::get_attendees));

    let events_router = Router::new()
        .route("/public", post(events::post_public_event))
        .route("/:event_id", delete(events::delete_event))
        .route("/:event_id/join", post(events::post_join))
        .route("/:event_id/leave", post(events::post_leave))
        .route_layer(mw::from_fn_with_state(app_state.clone(), require_user))
        .merge(public_events_router);

    let calendar_router = Router::new()
        .route("/google/auth", get(calendar::get_google_auth))
        .route("/google/callback", get(calendar::get_google_callback))
        .route("/google/status", get(calendar::get_status))
        .route("/apple/status", get(calendar::get_status))
        .route("/apple/connect", post(calendar::post_apple_connect))
        .route_layer(mw::from_fn_with_state(app_state.clone(), require_user));

    Router::new()
        .route("/", get(status::get_root))
        .route("/health", get(status::get_health))
        .nest("/api/auth", auth_router)
        .nest("/api/users", users_router)
        .nest("/api/admin", admin_router)
        .nest("/api/timetable", timetable_router)
        .nest("/api/rooms", rooms_router)
        .nest("/api/events", events_router)
        .nest("/api/calendar", calendar_router)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&app_state.config.cors_origins))
        .with_state(app_state)
}
