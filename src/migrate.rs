use anyhow::Result;
use sqlx::SqlitePool;

/// Idempotent schema setup, run by `study init` and by the integration
/// tests against a fresh database.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Courses, scoped to their owner
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            name TEXT NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            instructor TEXT NOT NULL DEFAULT '',
            semester TEXT NOT NULL DEFAULT '',
            credits INTEGER NOT NULL DEFAULT 0,
            description TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Extracted lecture-note text, one row per stored file.
    // Re-upload under the same name upserts (last write wins).
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS note_texts (
            owner_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            text TEXT NOT NULL DEFAULT '',
            content_hash TEXT NOT NULL DEFAULT '',
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (owner_id, course_id, file_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_courses_owner ON courses(owner_id, name)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_note_texts_course ON note_texts(owner_id, course_id, updated_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
