use sqlx::PgConnection;

use crate::db::like_pattern;
use crate::models::Student;

/// Students ordered by name, optionally narrowed to a USN or name match.
pub async fn search(conn: &mut PgConnection, query: &str) -> Result<Vec<Student>, sqlx::Error> {
    if query.is_empty() {
        return sqlx::query_as::<_, Student>(
            "SELECT usn, name, department, email, phone FROM student ORDER BY name ASC",
        )
        .fetch_all(conn)
        .await;
    }

    sqlx::query_as::<_, Student>(
        r#"
        SELECT usn, name, department, email, phone
        FROM student
        WHERE usn ILIKE $1 OR name ILIKE $1
        ORDER BY name ASC
        "#,
    )
    .bind(like_pattern(query))
    .fetch_all(conn)
    .await
}

pub async fn exists(conn: &mut PgConnection, usn: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM student WHERE usn = $1)")
        .bind(usn)
        .fetch_one(conn)
        .await
}
