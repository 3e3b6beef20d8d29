//! Media attached to questions
//!
//! The engine never touches media bytes. An upload is checked against the
//! accepted content types and size limit, and a stored path is handed back
//! for the question definition to reference.

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::constants::media::{MAX_UPLOAD_BYTES, UPLOAD_PATH_PREFIX};

/// Coarse classification of uploaded media
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Any `image/*` content type
    Image,
    /// Any `video/*` content type
    Video,
}

impl MediaKind {
    /// Classifies a MIME content type, returning `None` for anything other
    /// than images and videos
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let (top, _) = content_type.trim().split_once('/')?;
        if top.eq_ignore_ascii_case("image") {
            Some(Self::Image)
        } else if top.eq_ignore_ascii_case("video") {
            Some(Self::Video)
        } else {
            None
        }
    }
}

fn validate_path(val: &str) -> garde::Result {
    if val.starts_with(UPLOAD_PATH_PREFIX) {
        Ok(())
    } else {
        Err(garde::Error::new(format!("path must start with {UPLOAD_PATH_PREFIX}")))
    }
}

/// Reference to stored media, as embedded in a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct MediaRef {
    /// Public path of the stored file
    #[garde(length(min = 1, max = 512), custom(|v, _| validate_path(v)))]
    pub path: String,
    /// Image or video
    #[garde(skip)]
    pub kind: MediaKind,
}

/// Metadata of a file offered for upload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Upload {
    /// Original file name as sent by the client
    pub file_name: String,
    /// Declared MIME content type
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
}

/// Reasons an upload is refused
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No file was provided
    #[error("no file was uploaded")]
    Missing,
    /// The content type is neither an image nor a video
    #[error("only image and video files are accepted, got {0}")]
    UnsupportedType(String),
    /// The file exceeds the size limit
    #[error("file is too large (limit is {} MB)", MAX_UPLOAD_BYTES / 1024 / 1024)]
    TooLarge,
}

impl Upload {
    /// Accepts the upload, naming it after the current time
    ///
    /// # Errors
    ///
    /// See [`Upload::accept_at`].
    pub fn accept(&self) -> Result<MediaRef, Error> {
        self.accept_at(SystemTime::now())
    }

    /// Accepts the upload, naming the stored file `{millis}-{file_name}`
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is empty, is not an image or video,
    /// or exceeds the size limit.
    pub fn accept_at(&self, now: SystemTime) -> Result<MediaRef, Error> {
        let file_name = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if file_name.is_empty() || self.size == 0 {
            return Err(Error::Missing);
        }

        let kind = MediaKind::from_content_type(&self.content_type)
            .ok_or_else(|| Error::UnsupportedType(self.content_type.clone()))?;

        if self.size > MAX_UPLOAD_BYTES {
            return Err(Error::TooLarge);
        }

        let millis = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        Ok(MediaRef {
            path: format!("{UPLOAD_PATH_PREFIX}{millis}-{file_name}"),
            kind,
        })
    }
}
