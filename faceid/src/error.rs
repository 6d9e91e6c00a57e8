use thiserror::Error;

use crate::{IdentityId, PhotoId};

/// Errors returned by faceid operations.
#[derive(Debug, Error)]
pub enum FaceIdError {
    /// The clustering pass could not assign every point. Nothing is written.
    #[error("clustering unavailable: {0}")]
    ClusteringUnavailable(String),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A minted id already exists in the store. Fatal for the pass.
    #[error("identity id collision: {0} already exists")]
    IdentityCollision(IdentityId),

    /// Every identity id up to `u64::MAX` is taken.
    #[error("identity ids exhausted")]
    IdsExhausted,

    #[error("dangling link: photo {photo_id} points at missing identity {identity_id}")]
    DanglingLink {
        photo_id: PhotoId,
        identity_id: IdentityId,
    },

    #[error("store error: {0}")]
    Store(String),
}
