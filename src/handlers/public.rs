use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Form;
use serde::Serialize;
use sqlx::PgConnection;
use tracing::debug;

use crate::db::{self, events, feedback, registrations};
use crate::handlers::{error_page, render_page};
use crate::models::{FeedbackForm, RegistrationForm};
use crate::session::{FlashLevel, Session};
use crate::state::AppState;
use crate::stats::{self, EventCard, PublicEventStats};
use crate::utils::error::AppError;

#[derive(Serialize, Default)]
struct HomeStats {
    total_events: i64,
    upcoming: i64,
    total_registrations: i64,
    average_rating: Option<String>,
}

#[derive(Serialize)]
struct HomePage {
    stats: HomeStats,
}

/// Zeroed stats when the database is unreachable; the page still renders.
pub async fn home(State(state): State<AppState>, session: Session) -> Response {
    let mut stats = HomeStats::default();

    match db::acquire(&state.pool).await {
        Ok(mut conn) => match events::home_counts(&mut conn).await {
            Ok(counts) => {
                stats = HomeStats {
                    total_events: counts.total_events,
                    upcoming: counts.upcoming,
                    total_registrations: counts.total_registrations,
                    average_rating: counts.average_rating.map(|avg| format!("{avg}/5")),
                };
            }
            Err(e) => AppError::from(e).log(),
        },
        Err(e) => e.log(),
    }

    render_page(&state, session, StatusCode::OK, "index", "Home", HomePage { stats })
}

#[derive(Serialize)]
struct EventsPage {
    events: Vec<EventCard>,
    stats: PublicEventStats,
}

pub async fn list_events(State(state): State<AppState>, session: Session) -> Response {
    let mut conn = match db::acquire(&state.pool).await {
        Ok(conn) => conn,
        Err(e) => return error_page(&state, session, e),
    };

    match events::list(&mut conn).await {
        Ok(rows) => {
            let cards = stats::event_cards(rows);
            let stats = stats::public_event_stats(&cards);
            render_page(
                &state,
                session,
                StatusCode::OK,
                "events",
                "Events",
                EventsPage {
                    events: cards,
                    stats,
                },
            )
        }
        Err(e) => error_page(&state, session, e.into()),
    }
}

/// Dropdown options. A failed lookup only empties the dropdown.
async fn event_options(conn: &mut PgConnection) -> Vec<EventCard> {
    match events::list(conn).await {
        Ok(rows) => stats::event_cards(rows),
        Err(e) => {
            AppError::from(e).log();
            Vec::new()
        }
    }
}

async fn pooled_event_options(state: &AppState) -> Vec<EventCard> {
    match db::acquire(&state.pool).await {
        Ok(mut conn) => event_options(&mut conn).await,
        Err(e) => {
            e.log();
            Vec::new()
        }
    }
}

#[derive(Serialize)]
struct FormPage<F> {
    events: Vec<EventCard>,
    form: F,
}

#[derive(Serialize)]
struct SuccessPage {
    message: &'static str,
    link_text: &'static str,
    link_url: &'static str,
}

fn success_page(state: &AppState, session: Session, message: &'static str) -> Response {
    render_page(
        state,
        session,
        StatusCode::OK,
        "success",
        "Done",
        SuccessPage {
            message,
            link_text: "View Events",
            link_url: "/events",
        },
    )
}

/// Re-renders a form after a rejected submission, keeping what was typed.
async fn rejected_form<F: Serialize>(
    state: &AppState,
    mut session: Session,
    template: &str,
    title: &str,
    form: F,
    message: String,
) -> Response {
    debug!(template, message = %message, "Form submission rejected");
    session.flash(FlashLevel::Error, message);
    let events = pooled_event_options(state).await;
    render_page(
        state,
        session,
        StatusCode::BAD_REQUEST,
        template,
        title,
        FormPage { events, form },
    )
}

pub async fn register_form(State(state): State<AppState>, session: Session) -> Response {
    let mut conn = match db::acquire(&state.pool).await {
        Ok(conn) => conn,
        Err(e) => return error_page(&state, session, e),
    };
    let events = event_options(&mut conn).await;
    render_page(
        &state,
        session,
        StatusCode::OK,
        "register",
        "Register",
        FormPage {
            events,
            form: RegistrationForm::default(),
        },
    )
}

pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegistrationForm>,
) -> Response {
    let form = form.trimmed();
    let outcome = match form.validate(state.config.usn_policy) {
        Ok(new) => match db::acquire(&state.pool).await {
            Ok(mut conn) => registrations::register(&mut conn, &new).await,
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => success_page(&state, session, "Registration Successful!"),
        Err(AppError::ValidationError(message)) => {
            rejected_form(&state, session, "register", "Register", form, message).await
        }
        Err(e) => error_page(&state, session, e),
    }
}

pub async fn feedback_form(State(state): State<AppState>, session: Session) -> Response {
    let mut conn = match db::acquire(&state.pool).await {
        Ok(conn) => conn,
        Err(e) => return error_page(&state, session, e),
    };
    let events = event_options(&mut conn).await;
    render_page(
        &state,
        session,
        StatusCode::OK,
        "feedback",
        "Feedback",
        FormPage {
            events,
            form: FeedbackForm::default(),
        },
    )
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<FeedbackForm>,
) -> Response {
    let form = form.trimmed();
    let outcome = match form.validate(state.config.usn_policy) {
        Ok(new) => match db::acquire(&state.pool).await {
            Ok(mut conn) => feedback::submit(&mut conn, &new).await.map(|_| ()),
            Err(e) => Err(e),
        },
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => success_page(&state, session, "Feedback Submitted Successfully!"),
        Err(AppError::ValidationError(message)) => {
            rejected_form(&state, session, "feedback", "Feedback", form, message).await
        }
        Err(e) => error_page(&state, session, e),
    }
}
