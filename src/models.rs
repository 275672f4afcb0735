//! Core data models for the course/notes pipeline.

use serde::Serialize;

/// A course owned by a user.
#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub id: String,
    #[serde(skip_serializing)]
    pub owner_id: String,
    pub name: String,
    pub code: String,
    pub instructor: String,
    pub semester: String,
    pub credits: i64,
    pub description: String,
    pub created_at: i64,
}

/// Extracted text for one uploaded lecture note, keyed by
/// `(owner_id, course_id, file_name)`. Re-upload upserts (last write wins).
#[derive(Debug, Clone)]
pub struct NoteText {
    pub owner_id: String,
    pub course_id: String,
    pub file_name: String,
    pub text: String,
    pub content_hash: String,
    pub updated_at: i64,
}

/// Listing entry for a stored note: name plus the URL the raw file is
/// served under. Used in API listings and the context manifest fallback.
#[derive(Debug, Clone, Serialize)]
pub struct NoteFile {
    pub name: String,
    pub url: String,
}
