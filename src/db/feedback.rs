use sqlx::{Connection, PgConnection};
use tracing::info;

use crate::db::students;
use crate::models::{FeedbackView, NewFeedback, RatingFilter};
use crate::utils::error::AppError;

pub const STUDENT_NOT_FOUND: &str = "Student not found. Please register the student first.";
pub const EVENT_NOT_FOUND: &str = "Event not found.";

const VIEW_COLUMNS: &str = r#"
    SELECT f.feedback_id, f.rating, f.comment, f.submitted_at,
           e.event_id, e.name AS event_name,
           s.usn, s.name AS student_name
    FROM feedback f
    JOIN event e ON e.event_id = f.event_id
    JOIN student s ON s.usn = f.usn
"#;

const NEWEST_FIRST: &str = "ORDER BY f.submitted_at DESC, f.feedback_id DESC";

pub async fn submit(conn: &mut PgConnection, new: &NewFeedback) -> Result<i32, AppError> {
    let mut tx = conn.begin().await?;

    if !students::exists(&mut *tx, &new.usn).await? {
        return Err(AppError::ValidationError(STUDENT_NOT_FOUND.into()));
    }

    let event_exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM event WHERE event_id = $1)")
            .bind(new.event_id)
            .fetch_one(&mut *tx)
            .await?;
    if !event_exists {
        return Err(AppError::ValidationError(EVENT_NOT_FOUND.into()));
    }

    let feedback_id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO feedback (event_id, usn, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING feedback_id
        "#,
    )
    .bind(new.event_id)
    .bind(&new.usn)
    .bind(new.rating)
    .bind(new.comment.as_deref())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(feedback_id, event_id = new.event_id, "Feedback committed");
    Ok(feedback_id)
}

/// Feedback joined with event and student, newest first.
pub async fn list(
    conn: &mut PgConnection,
    filter: RatingFilter,
) -> Result<Vec<FeedbackView>, sqlx::Error> {
    let sql = match filter.sql_clause() {
        Some(clause) => format!("{VIEW_COLUMNS} WHERE {clause} {NEWEST_FIRST}"),
        None => format!("{VIEW_COLUMNS} {NEWEST_FIRST}"),
    };
    sqlx::query_as::<_, FeedbackView>(&sql).fetch_all(conn).await
}

pub async fn for_event(
    conn: &mut PgConnection,
    event_id: i32,
) -> Result<Vec<FeedbackView>, sqlx::Error> {
    let sql = format!("{VIEW_COLUMNS} WHERE f.event_id = $1 {NEWEST_FIRST}");
    sqlx::query_as::<_, FeedbackView>(&sql)
        .bind(event_id)
        .fetch_all(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::PgPool;

    use crate::export::to_csv;

    const ASHA: &str = "1MS21CS001";

    async fn seed(pool: &PgPool) {
        sqlx::query("INSERT INTO student (usn, name, department) VALUES ($1, 'Asha', 'CSE')")
            .bind(ASHA)
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO event (event_id, name) VALUES (1, 'Hackathon'), (2, 'Quiz')")
            .execute(pool)
            .await
            .unwrap();
    }

    async fn count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM feedback")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn new(event_id: i32, usn: &str, rating: i16, comment: Option<&str>) -> NewFeedback {
        NewFeedback {
            event_id,
            usn: usn.to_string(),
            rating,
            comment: comment.map(str::to_string),
        }
    }

    #[sqlx::test]
    async fn test_submit_stores_missing_comment_as_null(pool: PgPool) {
        seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        let id = submit(&mut conn, &new(1, ASHA, 4, None)).await.unwrap();
        let rows = for_event(&mut conn, 1).await.unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].feedback_id, id);
        assert_eq!(rows[0].rating, 4);
        assert_eq!(rows[0].comment, None);
        assert_eq!(rows[0].student_name, "Asha");
    }

    #[sqlx::test]
    async fn test_unknown_student_and_event_add_nothing(pool: PgPool) {
        seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();

        match submit(&mut conn, &new(1, "1MS21CS999", 5, Some("great"))).await {
            Err(AppError::ValidationError(message)) => assert_eq!(message, STUDENT_NOT_FOUND),
            other => panic!("unexpected {other:?}"),
        }
        match submit(&mut conn, &new(99, ASHA, 5, Some("great"))).await {
            Err(AppError::ValidationError(message)) => assert_eq!(message, EVENT_NOT_FOUND),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(count(&pool).await, 0);
    }

    #[sqlx::test]
    async fn test_rating_filters_and_export(pool: PgPool) {
        seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        for (event_id, rating) in [(1, 5), (1, 4), (2, 3), (2, 2), (1, 1)] {
            submit(&mut conn, &new(event_id, ASHA, rating, Some("ok"))).await.unwrap();
        }

        let all = list(&mut conn, RatingFilter::All).await.unwrap();
        assert_eq!(all.len() as i64, count(&pool).await);
        assert_eq!(all[0].rating, 1);

        let good = list(&mut conn, RatingFilter::Good).await.unwrap();
        assert!(good.iter().all(|row| row.rating >= 4));
        assert_eq!(good.len(), 2);
        assert_eq!(list(&mut conn, RatingFilter::Average).await.unwrap().len(), 1);
        assert_eq!(list(&mut conn, RatingFilter::Poor).await.unwrap().len(), 2);

        let text = String::from_utf8(to_csv(&all).unwrap()).unwrap();
        assert_eq!(text.lines().count(), all.len() + 1);
    }
}
