//! Context bundle assembly.
//!
//! Joins a course's extracted note texts into the single string handed to
//! the LLM ahead of the user's question. When no note has any extracted
//! text, falls back to a manifest of file names and URLs so the assistant
//! can at least reference what materials exist.

use crate::models::{NoteFile, NoteText};

/// Separator between documents in the assembled bundle.
const DOC_SEPARATOR: &str = "\n\n";

/// Assemble the context bundle for one course.
///
/// `texts` must be in listing order (oldest first); `files` is the note
/// manifest used for the fallback. The result never exceeds `max_chars`:
/// whole documents are dropped oldest-first until the remainder fits, and a
/// single over-budget document is truncated at a char boundary.
///
/// Returns `None` when there is nothing at all to reference.
pub fn assemble_context(
    texts: &[NoteText],
    files: &[NoteFile],
    max_chars: usize,
) -> Option<String> {
    let bodies: Vec<&str> = texts
        .iter()
        .map(|t| t.text.as_str())
        .filter(|t| !t.trim().is_empty())
        .collect();

    let joined = if bodies.is_empty() {
        if files.is_empty() {
            return None;
        }
        files
            .iter()
            .map(|f| format!("{}: {}", f.name, f.url))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        join_within_budget(&bodies, max_chars)
    };

    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Join documents with the separator, dropping oldest documents until the
/// total fits in `max_chars`.
fn join_within_budget(bodies: &[&str], max_chars: usize) -> String {
    let mut start = 0;
    while start < bodies.len() {
        let kept = &bodies[start..];
        let total: usize =
            kept.iter().map(|b| b.len()).sum::<usize>() + DOC_SEPARATOR.len() * (kept.len() - 1);
        if total <= max_chars {
            return kept.join(DOC_SEPARATOR);
        }
        start += 1;
    }
    // Even the newest document alone exceeds the budget.
    truncate_at_char_boundary(bodies[bodies.len() - 1], max_chars).to_string()
}

fn truncate_at_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
