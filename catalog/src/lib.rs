//! Photo catalog: photo records, face identities and the links between them.
//!
//! [`RedbCatalog`] keeps everything in one redb file and implements the
//! storage seams of the clustering core ([`IdentityStore`],
//! [`PhotoResolver`]) as well as [`PhotoCatalog`], which the importer uses to
//! register new photos.
//!
//! [`IdentityStore`]: famphoto_faceid::IdentityStore
//! [`PhotoResolver`]: famphoto_faceid::PhotoResolver

pub mod redb;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use famphoto_faceid::{FaceIdError, IdentityId, PhotoId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog: storage error: {0}")]
    Storage(String),

    #[error("catalog: serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("catalog: photo already imported: {0}")]
    DuplicatePhoto(String),

    #[error("catalog: identity {0} not found")]
    IdentityNotFound(IdentityId),

    #[error("catalog: {0}")]
    FaceId(#[from] FaceIdError),
}

impl From<CatalogError> for FaceIdError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::FaceId(inner) => inner,
            other => FaceIdError::Store(other.to_string()),
        }
    }
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// A photo registered in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: PhotoId,
    pub file_name: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    /// Upper-case format name, e.g. "JPEG".
    pub format: String,
    /// SHA-256 hex of the file contents. Unique across the catalog.
    pub content_hash: String,
    pub captured_at: DateTime<Utc>,
    /// False when `captured_at` did not come from EXIF `DateTimeOriginal`.
    pub capture_time_accurate: bool,
    /// GPS position as decimal `(latitude, longitude)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<(f64, f64)>,
    /// Camera make and model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    pub imported_at: DateTime<Utc>,
}

/// A photo about to be registered; the catalog assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub file_name: String,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub format: String,
    pub content_hash: String,
    pub captured_at: DateTime<Utc>,
    pub capture_time_accurate: bool,
    pub location: Option<(f64, f64)>,
    pub camera: Option<String>,
    pub imported_at: DateTime<Utc>,
}

impl NewPhoto {
    pub(crate) fn into_record(self, id: PhotoId) -> PhotoRecord {
        PhotoRecord {
            id,
            file_name: self.file_name,
            file_path: self.file_path,
            file_size: self.file_size,
            format: self.format,
            content_hash: self.content_hash,
            captured_at: self.captured_at,
            capture_time_accurate: self.capture_time_accurate,
            location: self.location,
            camera: self.camera,
            imported_at: self.imported_at,
        }
    }
}

/// Photo registration used by the importer.
pub trait PhotoCatalog: Send + Sync {
    /// Reports whether a photo with this content hash is already registered.
    fn contains_hash(&self, content_hash: &str) -> CatalogResult<bool>;

    /// Registers a photo. Fails with [`CatalogError::DuplicatePhoto`] if its
    /// content hash is already present.
    fn add_photo(&self, photo: NewPhoto) -> CatalogResult<PhotoRecord>;
}

pub use self::redb::RedbCatalog;
