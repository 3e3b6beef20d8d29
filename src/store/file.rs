//! JSON file document store
//!
//! Each document lives in its own pretty-printed JSON file below a root
//! directory. Writes go to a temporary file first and are renamed into
//! place so readers never observe a half-written document.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use super::{DocumentKey, DocumentStore, Error};

/// Stores documents as files below a root directory
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Creates a store rooted at `root`; directories are created on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file(&self, key: &DocumentKey) -> PathBuf {
        self.root.join(key.path())
    }
}

fn io_error(path: &Path, error: &io::Error) -> Error {
    Error::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

impl DocumentStore for FileStore {
    fn get(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>, Error> {
        let path = self.file(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(&path, &e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::Serialization {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    fn put(&self, key: &DocumentKey, document: serde_json::Value) -> Result<(), Error> {
        let path = self.file(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, &e))?;
        }

        let bytes = serde_json::to_vec_pretty(&document).map_err(|e| Error::Serialization {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let temporary = path.with_extension("json.tmp");
        fs::write(&temporary, bytes).map_err(|e| io_error(&temporary, &e))?;
        fs::rename(&temporary, &path).map_err(|e| io_error(&path, &e))
    }

    fn exists(&self, key: &DocumentKey) -> Result<bool, Error> {
        let path = self.file(key);
        path.try_exists().map_err(|e| io_error(&path, &e))
    }
}
