use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

use crate::db;
use crate::session::Session;
use crate::state::AppState;
use crate::templates::Page;
use crate::utils::error::AppError;
use crate::utils::response::json;

pub mod admin;
pub mod public;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
    database: &'static str,
}

/// Liveness plus a round trip to the database.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let mut conn = match db::acquire(&state.pool).await {
        Ok(conn) => conn,
        Err(e) => return e.into_response(),
    };

    match sqlx::query("SELECT 1").execute(&mut *conn).await {
        Ok(_) => json(
            StatusCode::OK,
            HealthPayload {
                status: "ok",
                service: "event-portal",
                database: "up",
            },
            "Health check successful",
        ),
        Err(e) => AppError::DatabaseUnavailable(e).into_response(),
    }
}

/// Renders a page, handing it the flashes queued so far. Anything queued
/// after this point waits for the next request.
pub(crate) fn render_page<T: Serialize>(
    state: &AppState,
    mut session: Session,
    status: StatusCode,
    template: &str,
    title: &str,
    body: T,
) -> Response {
    let flashes = session.take_flashes();
    let admin = session.admin_username();
    let page = Page::new(title, &flashes, admin.as_deref(), body);

    match state.templates.render(template, &page) {
        Ok(html) => (status, session, Html(html)).into_response(),
        // logged by the error's own response conversion
        Err(e) => (session, AppError::from(e)).into_response(),
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// The generic error page. The error is logged here, once.
pub(crate) fn error_page(state: &AppState, session: Session, err: AppError) -> Response {
    err.log();
    render_page(
        state,
        session,
        err.status_code(),
        "error",
        "Error",
        ErrorBody {
            message: err.public_message(),
        },
    )
}
