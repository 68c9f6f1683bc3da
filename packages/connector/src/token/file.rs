//! Cursor store backed by one JSON file per token.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

use super::{is_well_formed, Cursor, CursorStore};

const EXTENSION: &str = "json";

/// Durable cursor store in a folder. Survives process restarts.
///
/// Files are written to a temporary name and hard-linked into place, so
/// readers never observe a partially written cursor and an existing token is
/// never overwritten.
#[derive(Debug, Clone)]
pub struct FileCursorStore {
    folder: PathBuf,
}

impl FileCursorStore {
    /// Open (and create if needed) the token folder.
    pub fn new(folder: impl Into<PathBuf>) -> Result<Self> {
        let folder = folder.into();
        fs::create_dir_all(&folder)?;
        Ok(Self { folder })
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn path_for(&self, token: &str) -> PathBuf {
        self.folder.join(format!("{token}.{EXTENSION}"))
    }

    fn read(path: &Path) -> Result<Option<Cursor>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&content) {
            Ok(cursor) => Ok(Some(cursor)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cursor file");
                Ok(None)
            }
        }
    }
}

impl CursorStore for FileCursorStore {
    fn insert(&self, cursor: &Cursor) -> Result<bool> {
        let target = self.path_for(&cursor.token);
        if target.exists() {
            return Ok(false);
        }

        let tmp = self.folder.join(format!(".{}.tmp", cursor.token));
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&tmp) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let published = write_and_link(&mut file, cursor, &tmp, &target);
        drop(file);
        if let Err(e) = fs::remove_file(&tmp) {
            tracing::warn!(path = %tmp.display(), error = %e, "could not remove temporary cursor file");
        }
        published
    }

    fn get(&self, token: &str) -> Result<Option<Cursor>> {
        if !is_well_formed(token) {
            return Ok(None);
        }
        Self::read(&self.path_for(token))
    }

    fn remove(&self, token: &str) -> Result<bool> {
        if !is_well_formed(token) {
            return Ok(false);
        }
        match fs::remove_file(self.path_for(token)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> Result<Vec<Cursor>> {
        let mut cursors = Vec::new();
        for entry in fs::read_dir(&self.folder)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(cursor) = Self::read(&path)? {
                cursors.push(cursor);
            }
        }
        Ok(cursors)
    }
}

/// Write the cursor to `tmp` and link it to `target`. Linking fails if the
/// target exists, so an existing cursor is never replaced.
fn write_and_link(file: &mut File, cursor: &Cursor, tmp: &Path, target: &Path) -> Result<bool> {
    let bytes = serde_json::to_vec_pretty(cursor)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    match fs::hard_link(tmp, target) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.into()),
    }
}
