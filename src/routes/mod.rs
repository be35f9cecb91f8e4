use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info_span};
use uuid::Uuid;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{admin, health_check, public};
use crate::session::{FlashLevel, Session};
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags every request with a fresh UUID unless the caller sent one.
#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

async fn require_admin(mut session: Session, request: Request, next: Next) -> Response {
    if session.is_admin() {
        return next.run(request).await;
    }

    debug!(path = %request.uri().path(), "Admin route hit without a session");
    session.flash(FlashLevel::Warning, "Please log in to continue");
    (session, Redirect::to("/admin/login")).into_response()
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    let guarded = Router::new()
        .route("/logout", get(admin::logout))
        .route("/dashboard", get(admin::dashboard))
        .route("/dashboard/events", get(admin::events_dashboard))
        .route("/dashboard/registrations", get(admin::registrations_dashboard))
        .route("/dashboard/feedback", get(admin::feedback_dashboard))
        .route("/students", get(admin::list_students))
        .route("/events", get(admin::manage_events))
        .route("/events/delete/:id", post(admin::delete_event))
        .route("/event/:id/registrations", get(admin::event_registrations))
        .route("/event/:id/feedback", get(admin::event_feedback))
        .route("/export/registrations", get(admin::export_registrations))
        .route("/export/feedback", get(admin::export_feedback))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/", get(admin::root))
        .route("/login", get(admin::login_form).post(admin::login))
        .merge(guarded)
}

pub fn create_routes(state: AppState) -> Router {
    let production = state.config.production;
    let cors = create_cors_layer(state.config.cors_allowed_origins.as_deref());

    let request_tracing = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id
            )
        }))
        .layer(PropagateRequestIdLayer::x_request_id());

    Router::new()
        .route("/", get(public::home))
        .route("/events", get(public::list_events))
        .route("/register", get(public::register_form).post(public::register))
        .route("/feedback", get(public::feedback_form).post(public::submit_feedback))
        .route("/health", get(health_check))
        .nest("/admin", admin_routes(&state))
        .with_state(state)
        .layer(request_tracing)
        .layer(create_security_headers_layer(production))
        .layer(cors)
}
