use sqlx::{Connection, PgConnection};
use tracing::info;

use crate::db::{like_pattern, students};
use crate::models::{NewRegistration, RegistrationView};
use crate::utils::error::AppError;

pub const STUDENT_NOT_FOUND: &str = "Student not found. Please verify the USN.";
pub const EVENT_NOT_FOUND: &str = "Selected event does not exist.";
pub const EVENT_FULL: &str = "Event is already at capacity.";
pub const DUPLICATE_REG_ID: &str = "Registration ID already exists.";
pub const ALREADY_REGISTERED: &str = "Student already registered for this event.";

const REG_ID_CONSTRAINT: &str = "registration_pkey";

const VIEW_COLUMNS: &str = r#"
    SELECT r.reg_id, r.registration_date, e.event_id, e.name AS event_name,
           s.usn, s.name AS student_name, s.department
    FROM registration r
    JOIN event e ON e.event_id = r.event_id
    JOIN student s ON s.usn = r.usn
"#;

/// Inserts a registration after checking, in order: the student exists, the
/// event exists, the event has a free seat, the registration id is unused and
/// the student is not already registered.
///
/// The event row stays locked until commit, so two concurrent registrations
/// for the same event cannot both take the last seat. The unique constraints
/// on the table catch whatever slips past the lookups.
pub async fn register(conn: &mut PgConnection, new: &NewRegistration) -> Result<(), AppError> {
    let mut tx = conn.begin().await?;

    if !students::exists(&mut *tx, &new.usn).await? {
        return Err(AppError::ValidationError(STUDENT_NOT_FOUND.into()));
    }

    let max_seats: Option<Option<i32>> =
        sqlx::query_scalar("SELECT max_seats FROM event WHERE event_id = $1 FOR UPDATE")
            .bind(new.event_id)
            .fetch_optional(&mut *tx)
            .await?;
    let Some(max_seats) = max_seats else {
        return Err(AppError::ValidationError(EVENT_NOT_FOUND.into()));
    };

    if let Some(seats) = max_seats {
        let registered: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM registration WHERE event_id = $1")
                .bind(new.event_id)
                .fetch_one(&mut *tx)
                .await?;
        if registered >= i64::from(seats) {
            return Err(AppError::ValidationError(EVENT_FULL.into()));
        }
    }

    let reg_id_taken: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM registration WHERE reg_id = $1)")
            .bind(new.reg_id)
            .fetch_one(&mut *tx)
            .await?;
    if reg_id_taken {
        return Err(AppError::ValidationError(DUPLICATE_REG_ID.into()));
    }

    let already_registered: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM registration WHERE event_id = $1 AND usn = $2)",
    )
    .bind(new.event_id)
    .bind(&new.usn)
    .fetch_one(&mut *tx)
    .await?;
    if already_registered {
        return Err(AppError::ValidationError(ALREADY_REGISTERED.into()));
    }

    sqlx::query("INSERT INTO registration (reg_id, event_id, usn) VALUES ($1, $2, $3)")
        .bind(new.reg_id)
        .bind(new.event_id)
        .bind(&new.usn)
        .execute(&mut *tx)
        .await
        .map_err(unique_violation_message)?;

    tx.commit().await?;
    info!(reg_id = new.reg_id, event_id = new.event_id, "Registration committed");
    Ok(())
}

/// A raced insert that trips a unique constraint is still the user's
/// mistake, not a server fault.
fn unique_violation_message(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let message = if db_err.constraint() == Some(REG_ID_CONSTRAINT) {
                DUPLICATE_REG_ID
            } else {
                ALREADY_REGISTERED
            };
            return AppError::ValidationError(message.into());
        }
    }
    AppError::DatabaseError(err)
}

/// Registrations joined with event and student, newest first. A non-empty
/// query matches event name, student name, USN or department.
pub async fn search(
    conn: &mut PgConnection,
    query: &str,
) -> Result<Vec<RegistrationView>, sqlx::Error> {
    if query.is_empty() {
        let sql = format!("{VIEW_COLUMNS} ORDER BY r.registration_date DESC, r.reg_id DESC");
        return sqlx::query_as::<_, RegistrationView>(&sql).fetch_all(conn).await;
    }

    let sql = format!(
        "{VIEW_COLUMNS} WHERE e.name ILIKE $1 OR s.name ILIKE $1 OR s.usn ILIKE $1 OR s.department ILIKE $1 \
         ORDER BY r.registration_date DESC, r.reg_id DESC"
    );
    sqlx::query_as::<_, RegistrationView>(&sql)
        .bind(like_pattern(query))
        .fetch_all(conn)
        .await
}

pub async fn for_event(
    conn: &mut PgConnection,
    event_id: i32,
) -> Result<Vec<RegistrationView>, sqlx::Error> {
    let sql = format!(
        "{VIEW_COLUMNS} WHERE r.event_id = $1 ORDER BY r.registration_date DESC, r.reg_id DESC"
    );
    sqlx::query_as::<_, RegistrationView>(&sql)
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
    const RAVI: &str = "1MS21CS002";

    async fn seed(pool: &PgPool) {
        sqlx::query(
            "INSERT INTO student (usn, name, department) VALUES ($1, 'Asha', 'CSE'), ($2, 'Ravi', NULL)",
        )
        .bind(ASHA)
        .bind(RAVI)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO event (event_id, name, max_seats) VALUES (1, 'Hackathon', 50), (2, 'Open Mic', NULL)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn count(pool: &PgPool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM registration")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    fn new(reg_id: i32, event_id: i32, usn: &str) -> NewRegistration {
        NewRegistration {
            reg_id,
            event_id,
            usn: usn.to_string(),
        }
    }

    async fn rejection(pool: &PgPool, registration: NewRegistration) -> String {
        let mut conn = pool.acquire().await.unwrap();
        match register(&mut conn, &registration).await {
            Err(AppError::ValidationError(message)) => message,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[sqlx::test]
    async fn test_duplicates_are_rejected_without_new_rows(pool: PgPool) {
        seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        register(&mut conn, &new(1, 1, ASHA)).await.unwrap();
        drop(conn);
        assert_eq!(count(&pool).await, 1);

        assert_eq!(rejection(&pool, new(1, 2, RAVI)).await, DUPLICATE_REG_ID);
        assert_eq!(count(&pool).await, 1);

        assert_eq!(rejection(&pool, new(2, 1, ASHA)).await, ALREADY_REGISTERED);
        assert_eq!(count(&pool).await, 1);
    }

    #[sqlx::test]
    async fn test_unknown_student_and_event(pool: PgPool) {
        seed(&pool).await;

        assert_eq!(rejection(&pool, new(1, 1, "1MS21CS999")).await, STUDENT_NOT_FOUND);
        assert_eq!(rejection(&pool, new(1, 99, ASHA)).await, EVENT_NOT_FOUND);
        assert_eq!(count(&pool).await, 0);
    }

    #[sqlx::test]
    async fn test_full_event_keeps_its_count(pool: PgPool) {
        seed(&pool).await;
        sqlx::query(
            r#"
            INSERT INTO student (usn, name)
            SELECT 'BULK' || lpad(g::text, 6, '0'), 'Student ' || g FROM generate_series(1, 50) g
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO registration (reg_id, event_id, usn)
            SELECT 1000 + g, 1, 'BULK' || lpad(g::text, 6, '0') FROM generate_series(1, 50) g
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        assert_eq!(rejection(&pool, new(1, 1, ASHA)).await, EVENT_FULL);
        assert_eq!(count(&pool).await, 50);

        // capacity wins over a reused id
        assert_eq!(rejection(&pool, new(1001, 1, ASHA)).await, EVENT_FULL);

        let mut conn = pool.acquire().await.unwrap();
        register(&mut conn, &new(1, 2, ASHA)).await.unwrap();
        assert_eq!(count(&pool).await, 51);
    }

    #[sqlx::test]
    async fn test_raced_unique_violations_become_user_messages(pool: PgPool) {
        seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        register(&mut conn, &new(1, 1, ASHA)).await.unwrap();

        let same_id = sqlx::query("INSERT INTO registration (reg_id, event_id, usn) VALUES (1, 2, $1)")
            .bind(RAVI)
            .execute(&pool)
            .await
            .unwrap_err();
        match unique_violation_message(same_id) {
            AppError::ValidationError(message) => assert_eq!(message, DUPLICATE_REG_ID),
            other => panic!("unexpected {other:?}"),
        }

        let same_pair = sqlx::query("INSERT INTO registration (reg_id, event_id, usn) VALUES (2, 1, $1)")
            .bind(ASHA)
            .execute(&pool)
            .await
            .unwrap_err();
        match unique_violation_message(same_pair) {
            AppError::ValidationError(message) => assert_eq!(message, ALREADY_REGISTERED),
            other => panic!("unexpected {other:?}"),
        }

        let missing_event = sqlx::query("INSERT INTO registration (reg_id, event_id, usn) VALUES (3, 99, $1)")
            .bind(ASHA)
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(matches!(
            unique_violation_message(missing_event),
            AppError::DatabaseError(_)
        ));
    }

    #[sqlx::test]
    async fn test_search_and_export_cover_every_row(pool: PgPool) {
        seed(&pool).await;
        let mut conn = pool.acquire().await.unwrap();
        register(&mut conn, &new(1, 1, ASHA)).await.unwrap();
        register(&mut conn, &new(2, 2, ASHA)).await.unwrap();
        register(&mut conn, &new(3, 1, RAVI)).await.unwrap();

        let rows = search(&mut conn, "").await.unwrap();
        assert_eq!(rows.len() as i64, count(&pool).await);
        assert_eq!(rows[0].reg_id, 3);

        let payload = to_csv(&rows).unwrap();
        let text = String::from_utf8(payload).unwrap();
        assert_eq!(text.lines().count(), rows.len() + 1);

        let matches = search(&mut conn, "HACK").await.unwrap();
        assert_eq!(matches.len(), 2);
        let matches = search(&mut conn, "ravi").await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].department, None);

        let for_open_mic = for_event(&mut conn, 2).await.unwrap();
        assert_eq!(for_open_mic.len(), 1);
        assert_eq!(for_open_mic[0].usn, ASHA);
    }
}
