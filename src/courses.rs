//! Course persistence, scoped to the owning user on every query.

use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::Course;

/// Fields supplied by the client when creating a course.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewCourse {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub instructor: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default)]
    pub credits: i64,
    #[serde(default)]
    pub description: String,
}

pub async fn create_course(pool: &SqlitePool, owner_id: &str, new: &NewCourse) -> Result<Course> {
    let course = Course {
        id: Uuid::new_v4().to_string(),
        owner_id: owner_id.to_string(),
        name: new.name.clone(),
        code: new.code.clone(),
        instructor: new.instructor.clone(),
        semester: new.semester.clone(),
        credits: new.credits,
        description: new.description.clone(),
        created_at: Utc::now().timestamp(),
    };

    sqlx::query(
        r#"
        INSERT INTO courses (id, owner_id, name, code, instructor, semester, credits, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&course.id)
    .bind(&course.owner_id)
    .bind(&course.name)
    .bind(&course.code)
    .bind(&course.instructor)
    .bind(&course.semester)
    .bind(course.credits)
    .bind(&course.description)
    .bind(course.created_at)
    .execute(pool)
    .await?;

    Ok(course)
}

pub async fn list_courses(pool: &SqlitePool, owner_id: &str) -> Result<Vec<Course>> {
    let rows = sqlx::query(
        "SELECT id, owner_id, name, code, instructor, semester, credits, description, created_at
         FROM courses WHERE owner_id = ? ORDER BY name",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(course_from_row).collect())
}

pub async fn get_course(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<Option<Course>> {
    let row = sqlx::query(
        "SELECT id, owner_id, name, code, instructor, semester, credits, description, created_at
         FROM courses WHERE owner_id = ? AND id = ?",
    )
    .bind(owner_id)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(course_from_row))
}

/// Deletes the course row and its note-text rows. Raw file objects are the
/// caller's responsibility (see the ingest layer). Returns false when no
/// such course exists for this owner.
pub async fn delete_course(pool: &SqlitePool, owner_id: &str, id: &str) -> Result<bool> {
    let mut tx = pool.begin().await?;

    let deleted = sqlx::query("DELETE FROM courses WHERE owner_id = ? AND id = ?")
        .bind(owner_id)
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    sqlx::query("DELETE FROM note_texts WHERE owner_id = ? AND course_id = ?")
        .bind(owner_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(deleted > 0)
}

fn course_from_row(row: &sqlx::sqlite::SqliteRow) -> Course {
    Course {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        code: row.get("code"),
        instructor: row.get("instructor"),
        semester: row.get("semester"),
        credits: row.get("credits"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}
