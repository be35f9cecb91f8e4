use serde::Serialize;
use sqlx::{FromRow, PgConnection};

use crate::models::{Event, EventSummary};

const EVENT_COLUMNS: &str = r#"
    SELECT e.event_id, e.name, e.description, e.date, e.time, e.venue,
           e.organizer, e.max_seats,
           (SELECT COUNT(*) FROM registration r WHERE r.event_id = e.event_id) AS registered,
           (SELECT ROUND(AVG(f.rating), 1) FROM feedback f WHERE f.event_id = e.event_id) AS avg_rating
    FROM event e
"#;

/// Every event with its live registration count, soonest first. Undated
/// events sort last.
pub async fn list(conn: &mut PgConnection) -> Result<Vec<Event>, sqlx::Error> {
    let sql = format!("{EVENT_COLUMNS} ORDER BY e.date ASC NULLS LAST, e.time ASC NULLS LAST, e.event_id");
    sqlx::query_as::<_, Event>(&sql).fetch_all(conn).await
}

pub async fn find_summary(
    conn: &mut PgConnection,
    event_id: i32,
) -> Result<Option<EventSummary>, sqlx::Error> {
    sqlx::query_as::<_, EventSummary>("SELECT event_id, name FROM event WHERE event_id = $1")
        .bind(event_id)
        .fetch_optional(conn)
        .await
}

/// Returns whether a row was removed. Registrations and feedback for the
/// event go with it.
pub async fn delete(conn: &mut PgConnection, event_id: i32) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM event WHERE event_id = $1")
        .bind(event_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct HomeCounts {
    pub total_events: i64,
    pub upcoming: i64,
    pub total_registrations: i64,
    pub average_rating: Option<rust_decimal::Decimal>,
}

pub async fn home_counts(conn: &mut PgConnection) -> Result<HomeCounts, sqlx::Error> {
    sqlx::query_as::<_, HomeCounts>(
        r#"
        SELECT (SELECT COUNT(*) FROM event) AS total_events,
               (SELECT COUNT(*) FROM event WHERE date IS NULL OR date >= CURRENT_DATE) AS upcoming,
               (SELECT COUNT(*) FROM registration) AS total_registrations,
               (SELECT ROUND(AVG(rating), 1) FROM feedback) AS average_rating
        "#,
    )
    .fetch_one(conn)
    .await
}

#[derive(Debug, Clone, Default, Serialize, FromRow)]
pub struct TableCounts {
    pub students: i64,
    pub events: i64,
    pub registrations: i64,
    pub feedback: i64,
}

pub async fn table_counts(conn: &mut PgConnection) -> Result<TableCounts, sqlx::Error> {
    sqlx::query_as::<_, TableCounts>(
        r#"
        SELECT (SELECT COUNT(*) FROM student) AS students,
               (SELECT COUNT(*) FROM event) AS events,
               (SELECT COUNT(*) FROM registration) AS registrations,
               (SELECT COUNT(*) FROM feedback) AS feedback
        "#,
    )
    .fetch_one(conn)
    .await
}
