//! Raw file object store.
//!
//! Uploaded note files are kept on the local filesystem under the
//! owner-scoped layout `{root}/{owner_id}/{course_id}/{file_name}`; every
//! read and write goes through that path. No locking: the last writer
//! wins, matching the upsert semantics of the extracted-text rows.

use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::models::NoteFile;

#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl BlobStore {
    pub fn new(root: PathBuf, public_base_url: String) -> Self {
        Self {
            root,
            public_base_url,
        }
    }

    /// Store raw bytes, overwriting any previous object at the same path.
    pub fn put(&self, owner_id: &str, course_id: &str, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(owner_id, course_id, file_name)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(())
    }

    /// List stored note files for a course, sorted by name.
    pub fn list(&self, owner_id: &str, course_id: &str) -> Result<Vec<NoteFile>> {
        let dir = self.course_dir(owner_id, course_id)?;
        let mut files = Vec::new();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let url = self.url(owner_id, course_id, &name);
            files.push(NoteFile { name, url });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Returns false when no such object existed.
    pub fn delete(&self, owner_id: &str, course_id: &str, file_name: &str) -> Result<bool> {
        let path = self.object_path(owner_id, course_id, file_name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove every object under a course (used by course deletion).
    pub fn delete_course(&self, owner_id: &str, course_id: &str) -> Result<()> {
        let dir = self.course_dir(owner_id, course_id)?;
        match std::fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn url(&self, owner_id: &str, course_id: &str, file_name: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.public_base_url, owner_id, course_id, file_name
        )
    }

    fn course_dir(&self, owner_id: &str, course_id: &str) -> Result<PathBuf> {
        validate_segment(owner_id)?;
        validate_segment(course_id)?;
        Ok(self.root.join(owner_id).join(course_id))
    }

    fn object_path(&self, owner_id: &str, course_id: &str, file_name: &str) -> Result<PathBuf> {
        validate_segment(file_name)?;
        Ok(self.course_dir(owner_id, course_id)?.join(file_name))
    }
}

/// Each path segment must be a plain name: no traversal, no separators.
pub fn validate_segment(segment: &str) -> Result<()> {
    if segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains('/')
        || segment.contains('\\')
        || segment.contains('\0')
    {
        bail!("invalid path segment: {:?}", segment);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, BlobStore) {
        let tmp = TempDir::new().unwrap();
        let store = BlobStore::new(tmp.path().to_path_buf(), "https://x/files".to_string());
        (tmp, store)
    }

    #[test]
    fn put_list_delete_roundtrip() {
        let (_tmp, store) = store();
        store.put("u1", "c1", "notes.txt", b"hello").unwrap();
        store.put("u1", "c1", "a.pdf", b"%PDF").unwrap();

        let files = store.list("u1", "c1").unwrap();
        assert_eq!(files.len(), 2);
        // Sorted by name
        assert_eq!(files[0].name, "a.pdf");
        assert_eq!(files[1].name, "notes.txt");
        assert_eq!(files[1].url, "https://x/files/u1/c1/notes.txt");

        assert!(store.delete("u1", "c1", "notes.txt").unwrap());
        assert!(!store.delete("u1", "c1", "notes.txt").unwrap());
        assert_eq!(store.list("u1", "c1").unwrap().len(), 1);
    }

    #[test]
    fn put_overwrites_existing_object() {
        let (tmp, store) = store();
        store.put("u1", "c1", "notes.txt", b"first").unwrap();
        store.put("u1", "c1", "notes.txt", b"second").unwrap();
        let content = std::fs::read(tmp.path().join("u1/c1/notes.txt")).unwrap();
        assert_eq!(content, b"second");
    }

    #[test]
    fn listing_is_owner_scoped() {
        let (_tmp, store) = store();
        store.put("u1", "c1", "mine.txt", b"a").unwrap();
        store.put("u2", "c1", "theirs.txt", b"b").unwrap();
        let files = store.list("u1", "c1").unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "mine.txt");
    }

    #[test]
    fn unknown_course_lists_empty() {
        let (_tmp, store) = store();
        assert!(store.list("u1", "nope").unwrap().is_empty());
    }

    #[test]
    fn traversal_segments_rejected() {
        let (_tmp, store) = store();
        assert!(store.put("u1", "c1", "../evil.txt", b"x").is_err());
        assert!(store.put("..", "c1", "ok.txt", b"x").is_err());
        assert!(store.put("u1", "a/b", "ok.txt", b"x").is_err());
    }
}
