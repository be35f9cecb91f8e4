use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::events::TableCounts;
use crate::db::{self, events, feedback, registrations, students, DbConnection};
use crate::export::{csv_download, to_csv, CsvRecord};
use crate::handlers::{error_page, render_page};
use crate::models::{EventSummary, FeedbackView, RatingFilter, RegistrationView, Student};
use crate::session::{FlashLevel, Session};
use crate::state::AppState;
use crate::stats::{self, EventCard, EventsOverview, FeedbackStats, RegistrationStats, HIGHLIGHT_COUNT};
use crate::utils::error::AppError;

const LOGIN_PATH: &str = "/admin/login";
const DASHBOARD_PATH: &str = "/admin/dashboard";
const EVENTS_PATH: &str = "/admin/events";

/// Dashboards still render without a database, empty and with a notice.
async fn connect_or_flash(state: &AppState, session: &mut Session, notice: &str) -> Option<DbConnection> {
    match db::acquire(&state.pool).await {
        Ok(conn) => Some(conn),
        Err(e) => {
            e.log();
            session.flash(FlashLevel::Danger, notice);
            None
        }
    }
}

pub async fn root(session: Session) -> Response {
    let target = if session.is_admin() { DASHBOARD_PATH } else { LOGIN_PATH };
    (session, Redirect::to(target)).into_response()
}

#[derive(Serialize, Default)]
struct LoginPage {
    username: String,
}

pub async fn login_form(State(state): State<AppState>, session: Session) -> Response {
    if session.is_admin() {
        return (session, Redirect::to(DASHBOARD_PATH)).into_response();
    }
    render_page(&state, session, StatusCode::OK, "admin/login", "Admin login", LoginPage::default())
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    let password = form.password.trim();

    if state.config.admin.matches(username, password) {
        info!(username, "Admin logged in");
        session.login(username);
        session.flash(FlashLevel::Success, "Welcome back!");
        return (session, Redirect::to(DASHBOARD_PATH)).into_response();
    }

    AppError::AuthError("Invalid credentials".to_string()).log();
    session.flash(FlashLevel::Danger, "Invalid credentials");
    render_page(
        &state,
        session,
        StatusCode::UNAUTHORIZED,
        "admin/login",
        "Admin login",
        LoginPage {
            username: username.to_string(),
        },
    )
}

pub async fn logout(mut session: Session) -> Response {
    if let Some(username) = session.admin_username() {
        info!(%username, "Admin logged out");
    }
    session.clear();
    session.flash(FlashLevel::Info, "Logged out successfully");
    (session, Redirect::to(LOGIN_PATH)).into_response()
}

#[derive(Serialize)]
struct DashboardPage {
    stats: TableCounts,
}

pub async fn dashboard(State(state): State<AppState>, mut session: Session) -> Response {
    let mut stats = TableCounts::default();

    if let Some(mut conn) = connect_or_flash(&state, &mut session, "Could not connect to the database").await {
        match events::table_counts(&mut conn).await {
            Ok(counts) => stats = counts,
            Err(e) => return error_page(&state, session, e.into()),
        }
    }

    render_page(&state, session, StatusCode::OK, "admin/dashboard", "Dashboard", DashboardPage { stats })
}

#[derive(Serialize, Default)]
struct EventsDashboardPage {
    stats: EventsOverview,
    highlights: Vec<EventCard>,
    events: Vec<EventCard>,
}

pub async fn events_dashboard(State(state): State<AppState>, mut session: Session) -> Response {
    let mut page = EventsDashboardPage::default();

    if let Some(mut conn) = connect_or_flash(&state, &mut session, "Database unavailable").await {
        match events::list(&mut conn).await {
            Ok(rows) => {
                let cards = stats::event_cards(rows);
                page = EventsDashboardPage {
                    stats: stats::events_overview(&cards, Local::now().date_naive()),
                    highlights: stats::highlights(&cards, HIGHLIGHT_COUNT),
                    events: cards,
                };
            }
            Err(e) => return error_page(&state, session, e.into()),
        }
    }

    render_page(&state, session, StatusCode::OK, "admin/events_dashboard", "Events dashboard", page)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Serialize)]
struct RegistrationsDashboardPage {
    query: String,
    stats: RegistrationStats,
    registrations: Vec<RegistrationView>,
}

pub async fn registrations_dashboard(
    State(state): State<AppState>,
    mut session: Session,
    Query(search): Query<SearchQuery>,
) -> Response {
    let query = search.q.trim().to_string();
    let mut rows = Vec::new();

    if let Some(mut conn) = connect_or_flash(&state, &mut session, "Database unavailable").await {
        match registrations::search(&mut conn, &query).await {
            Ok(found) => rows = found,
            Err(e) => return error_page(&state, session, e.into()),
        }
    }

    let page = RegistrationsDashboardPage {
        query,
        stats: stats::registration_stats(&rows),
        registrations: rows,
    };
    render_page(&state, session, StatusCode::OK, "admin/registrations_dashboard", "Registrations", page)
}

#[derive(Debug, Default, Deserialize)]
pub struct RatingQuery {
    #[serde(default)]
    rating: String,
}

#[derive(Serialize)]
struct FeedbackDashboardPage {
    rating_filter: RatingFilter,
    stats: FeedbackStats,
    feedback: Vec<FeedbackView>,
}

pub async fn feedback_dashboard(
    State(state): State<AppState>,
    mut session: Session,
    Query(filter): Query<RatingQuery>,
) -> Response {
    let rating_filter = RatingFilter::parse(&filter.rating);
    let mut rows = Vec::new();

    if let Some(mut conn) = connect_or_flash(&state, &mut session, "Database unavailable").await {
        match feedback::list(&mut conn, rating_filter).await {
            Ok(found) => rows = found,
            Err(e) => return error_page(&state, session, e.into()),
        }
    }

    let page = FeedbackDashboardPage {
        rating_filter,
        stats: stats::feedback_stats(&rows),
        feedback: rows,
    };
    render_page(&state, session, StatusCode::OK, "admin/feedback_dashboard", "Feedback", page)
}

#[derive(Serialize)]
struct StudentsPage {
    query: String,
    students: Vec<Student>,
}

pub async fn list_students(
    State(state): State<AppState>,
    mut session: Session,
    Query(search): Query<SearchQuery>,
) -> Response {
    let query = search.q.trim().to_string();
    let mut found = Vec::new();

    if let Some(mut conn) = connect_or_flash(&state, &mut session, "Database unavailable").await {
        match students::search(&mut conn, &query).await {
            Ok(rows) => found = rows,
            Err(e) => return error_page(&state, session, e.into()),
        }
    }

    render_page(
        &state,
        session,
        StatusCode::OK,
        "admin/students",
        "Students",
        StudentsPage {
            query,
            students: found,
        },
    )
}

#[derive(Serialize)]
struct ManageEventsPage {
    events: Vec<EventCard>,
}

pub async fn manage_events(State(state): State<AppState>, mut session: Session) -> Response {
    let mut cards = Vec::new();

    if let Some(mut conn) = connect_or_flash(&state, &mut session, "Database unavailable").await {
        match events::list(&mut conn).await {
            Ok(rows) => cards = stats::event_cards(rows),
            Err(e) => return error_page(&state, session, e.into()),
        }
    }

    render_page(&state, session, StatusCode::OK, "admin/events", "Manage events", ManageEventsPage { events: cards })
}

pub async fn delete_event(
    State(state): State<AppState>,
    mut session: Session,
    Path(event_id): Path<i32>,
) -> Response {
    let outcome = match db::acquire(&state.pool).await {
        Ok(mut conn) => events::delete(&mut conn, event_id).await.map_err(AppError::from),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(true) => {
            info!(event_id, "Event deleted");
            session.flash(FlashLevel::Success, "Event deleted");
        }
        Ok(false) => session.flash(FlashLevel::Warning, "Event not found"),
        Err(e) => {
            e.log();
            session.flash(FlashLevel::Danger, format!("Failed to delete event: {e}"));
        }
    }

    (session, Redirect::to(EVENTS_PATH)).into_response()
}

#[derive(Serialize)]
struct EventRegistrationsPage {
    event: EventSummary,
    registrations: Vec<RegistrationView>,
}

#[derive(Serialize)]
struct EventFeedbackPage {
    event: EventSummary,
    feedback: Vec<FeedbackView>,
}

/// Looks up the event for a per-event page. `Err` carries the response to
/// send instead.
async fn event_or_redirect(
    state: &AppState,
    mut session: Session,
    conn: &mut DbConnection,
    event_id: i32,
) -> Result<(EventSummary, Session), Response> {
    match events::find_summary(conn, event_id).await {
        Ok(Some(event)) => Ok((event, session)),
        Ok(None) => {
            let err = AppError::NotFound("Event not found".to_string());
            err.log();
            session.flash(FlashLevel::Warning, err.public_message());
            Err((session, Redirect::to(EVENTS_PATH)).into_response())
        }
        Err(e) => Err(error_page(state, session, e.into())),
    }
}

pub async fn event_registrations(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<i32>,
) -> Response {
    let mut conn = match db::acquire(&state.pool).await {
        Ok(conn) => conn,
        Err(e) => return error_page(&state, session, e),
    };
    let (event, session) = match event_or_redirect(&state, session, &mut conn, event_id).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    match registrations::for_event(&mut conn, event_id).await {
        Ok(rows) => {
            let title = format!("Registrations: {}", event.name);
            render_page(
                &state,
                session,
                StatusCode::OK,
                "admin/registrations",
                &title,
                EventRegistrationsPage {
                    event,
                    registrations: rows,
                },
            )
        }
        Err(e) => error_page(&state, session, e.into()),
    }
}

pub async fn event_feedback(
    State(state): State<AppState>,
    session: Session,
    Path(event_id): Path<i32>,
) -> Response {
    let mut conn = match db::acquire(&state.pool).await {
        Ok(conn) => conn,
        Err(e) => return error_page(&state, session, e),
    };
    let (event, session) = match event_or_redirect(&state, session, &mut conn, event_id).await {
        Ok(found) => found,
        Err(response) => return response,
    };

    match feedback::for_event(&mut conn, event_id).await {
        Ok(rows) => {
            let title = format!("Feedback: {}", event.name);
            render_page(
                &state,
                session,
                StatusCode::OK,
                "admin/feedback",
                &title,
                EventFeedbackPage {
                    event,
                    feedback: rows,
                },
            )
        }
        Err(e) => error_page(&state, session, e.into()),
    }
}

/// Turns fetched rows into a CSV download, or back to the dashboard with a
/// notice when anything fails.
fn export_response<T: CsvRecord>(
    state: &AppState,
    mut session: Session,
    rows: Result<Vec<T>, AppError>,
) -> Response {
    let payload = rows.and_then(|rows| to_csv(&rows).map_err(AppError::from));
    match payload {
        Ok(payload) => {
            info!(file = T::FILENAME, bytes = payload.len(), "CSV export generated");
            (session, csv_download::<T>(payload)).into_response()
        }
        Err(e @ AppError::DatabaseUnavailable(_)) => {
            e.log();
            session.flash(FlashLevel::Danger, "Database unavailable");
            (session, Redirect::to(DASHBOARD_PATH)).into_response()
        }
        Err(e) => error_page(state, session, e),
    }
}

pub async fn export_registrations(State(state): State<AppState>, session: Session) -> Response {
    let rows = match db::acquire(&state.pool).await {
        Ok(mut conn) => registrations::search(&mut conn, "").await.map_err(AppError::from),
        Err(e) => Err(e),
    };
    export_response(&state, session, rows)
}

pub async fn export_feedback(State(state): State<AppState>, session: Session) -> Response {
    let rows = match db::acquire(&state.pool).await {
        Ok(mut conn) => feedback::list(&mut conn, RatingFilter::All).await.map_err(AppError::from),
        Err(e) => Err(e),
    };
    export_response(&state, session, rows)
}
