use std::path::PathBuf;

use famphoto_catalog::CatalogError;
use thiserror::Error;

/// Errors returned by import operations.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import: not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("import: walk error: {0}")]
    Walk(String),

    #[error("import: io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("import: encoder error: {0}")]
    Encoder(String),

    #[error("import: {0}")]
    Catalog(#[from] CatalogError),
}
