//! Folder import: discovers new photos, registers them in the catalog and
//! links the faces found in them to identities.
//!
//! # Pipeline
//!
//! 1. [`scan_folder`]: recursive walk, filtered by [`SUPPORTED_EXTENSIONS`]
//! 2. [`content_hash`]: SHA-256 of each file; known hashes are skipped
//! 3. [`read_metadata`] + [`PhotoCatalog::add_photo`]: register the new
//!    photo with its EXIF capture time, GPS position and camera
//! 4. [`FaceEncoder::encode_faces`]: zero or more encodings per photo
//! 5. One clustering pass over every new face, then one commit
//!
//! [`PhotoCatalog::add_photo`]: famphoto_catalog::PhotoCatalog::add_photo

mod encoder;
mod error;
mod metadata;
mod importer;
mod scan;

pub use encoder::{FaceEncoder, SIDECAR_SUFFIX, SidecarEncoder};
pub use error::ImportError;
pub use metadata::{PhotoMetadata, read_metadata};
pub use importer::{ImportReport, Importer, describe_photo};
pub use scan::{SUPPORTED_EXTENSIONS, content_hash, is_supported, scan_folder};
