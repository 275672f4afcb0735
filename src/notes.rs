//! Extracted-text persistence for lecture notes.
//!
//! One row per `(owner_id, course_id, file_name)`. Upsert semantics: the
//! last writer wins. There is no versioning and no optimistic-concurrency
//! check; concurrent uploads of the same file name race.

use anyhow::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::models::NoteText;

pub async fn upsert_note_text(
    pool: &SqlitePool,
    owner_id: &str,
    course_id: &str,
    file_name: &str,
    text: &str,
) -> Result<NoteText> {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let content_hash = format!("{:x}", hasher.finalize());
    let updated_at = Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO note_texts (owner_id, course_id, file_name, text, content_hash, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(owner_id, course_id, file_name) DO UPDATE SET
            text = excluded.text,
            content_hash = excluded.content_hash,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(owner_id)
    .bind(course_id)
    .bind(file_name)
    .bind(text)
    .bind(&content_hash)
    .bind(updated_at)
    .execute(pool)
    .await?;

    Ok(NoteText {
        owner_id: owner_id.to_string(),
        course_id: course_id.to_string(),
        file_name: file_name.to_string(),
        text: text.to_string(),
        content_hash,
        updated_at,
    })
}

/// All extracted texts for a course, in the listing order the context
/// assembler depends on: oldest first, file name as a tiebreak so the
/// order is deterministic across calls.
pub async fn list_note_texts(
    pool: &SqlitePool,
    owner_id: &str,
    course_id: &str,
) -> Result<Vec<NoteText>> {
    let rows = sqlx::query(
        "SELECT owner_id, course_id, file_name, text, content_hash, updated_at
         FROM note_texts WHERE owner_id = ? AND course_id = ?
         ORDER BY updated_at ASC, file_name ASC",
    )
    .bind(owner_id)
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| NoteText {
            owner_id: row.get("owner_id"),
            course_id: row.get("course_id"),
            file_name: row.get("file_name"),
            text: row.get("text"),
            content_hash: row.get("content_hash"),
            updated_at: row.get("updated_at"),
        })
        .collect())
}

/// Returns false when no row existed.
pub async fn delete_note_text(
    pool: &SqlitePool,
    owner_id: &str,
    course_id: &str,
    file_name: &str,
) -> Result<bool> {
    let deleted = sqlx::query(
        "DELETE FROM note_texts WHERE owner_id = ? AND course_id = ? AND file_name = ?",
    )
    .bind(owner_id)
    .bind(course_id)
    .bind(file_name)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(deleted > 0)
}
