//! Upload pipeline orchestration.
//!
//! One sequential chain per upload: store the raw object, extract text,
//! upsert the extracted-text row. The two writes are independent: when
//! extraction fails the raw object is kept and an empty text row is
//! upserted, so a failed extraction never loses the file or aborts other
//! uploads. The caller receives the extraction failure as a warning.

use sqlx::SqlitePool;
use tracing::warn;

use crate::extract::{self, UnsupportedPolicy};
use crate::models::NoteText;
use crate::notes;
use crate::storage::{validate_segment, BlobStore};

/// Result of one note upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub file_name: String,
    pub url: String,
    pub text: String,
    /// Extraction failure message, when the raw file was stored but no
    /// text could be recovered from it.
    pub warning: Option<String>,
}

/// Upload pipeline error. Input errors abort before any side effect;
/// everything after the raw write is non-fatal per file.
#[derive(Debug)]
pub enum IngestError {
    /// Bad request: unsupported type or invalid file name. Nothing stored.
    Input(String),
    /// Storage or database failure.
    Internal(anyhow::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Input(msg) => write!(f, "{}", msg),
            IngestError::Internal(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for IngestError {}

/// Ingest one uploaded note: raw object write, then extraction, then text
/// upsert. Returns the outcome used to build the upload response.
pub async fn ingest_note(
    pool: &SqlitePool,
    store: &BlobStore,
    policy: UnsupportedPolicy,
    owner_id: &str,
    course_id: &str,
    file_name: &str,
    bytes: &[u8],
) -> Result<UploadOutcome, IngestError> {
    validate_segment(file_name).map_err(|e| IngestError::Input(e.to_string()))?;

    // Strict mode rejects unsupported types up front, before any write.
    if policy == UnsupportedPolicy::Reject {
        let ext = extract::file_extension(file_name).unwrap_or_default();
        if !extract::supported_extension(&ext) {
            return Err(IngestError::Input(format!(
                "unsupported file type: {}",
                if ext.is_empty() { "(none)" } else { &ext }
            )));
        }
    }

    store
        .put(owner_id, course_id, file_name, bytes)
        .map_err(IngestError::Internal)?;

    let (text, warning) = match extract::extract_text(file_name, bytes, policy) {
        Ok(text) => (text, None),
        Err(e) => {
            warn!(file_name, error = %e, "text extraction failed; keeping raw file");
            (String::new(), Some(e.to_string()))
        }
    };

    let note: NoteText = notes::upsert_note_text(pool, owner_id, course_id, file_name, &text)
        .await
        .map_err(IngestError::Internal)?;

    Ok(UploadOutcome {
        url: store.url(owner_id, course_id, file_name),
        file_name: note.file_name,
        text: note.text,
        warning,
    })
}
