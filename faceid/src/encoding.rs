//! Persisted encoding representation and population checks.
//!
//! An encoding is stored as a raw blob of D little-endian `f64` values.
//! Decoding a blob yields exactly the vector that was encoded, bit for bit.

use crate::FaceIdError;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Serializes an encoding into its persisted byte form.
pub fn encode_blob(encoding: &[f64]) -> Result<Vec<u8>, FaceIdError> {
    if encoding.is_empty() {
        return Err(FaceIdError::InvalidEncoding(
            "encoding has zero dimensions".into(),
        ));
    }
    let mut out = Vec::with_capacity(encoding.len() * F64_BYTES);
    for &x in encoding {
        out.extend_from_slice(&x.to_le_bytes());
    }
    Ok(out)
}

/// Rebuilds an encoding from its persisted byte form.
pub fn decode_blob(blob: &[u8]) -> Result<Vec<f64>, FaceIdError> {
    if blob.is_empty() {
        return Err(FaceIdError::InvalidEncoding("empty encoding blob".into()));
    }
    if blob.len() % F64_BYTES != 0 {
        return Err(FaceIdError::InvalidEncoding(format!(
            "blob length {} is not a multiple of {F64_BYTES}",
            blob.len()
        )));
    }
    Ok(blob
        .chunks_exact(F64_BYTES)
        .map(|chunk| {
            let mut arr = [0u8; F64_BYTES];
            arr.copy_from_slice(chunk);
            f64::from_le_bytes(arr)
        })
        .collect())
}

/// Checks that a clustering population is well formed: every vector has the
/// same non-zero dimensionality and only finite components.
///
/// Returns the common dimension.
pub(crate) fn check_population(points: &[&[f64]]) -> Result<usize, FaceIdError> {
    let Some(first) = points.first() else {
        return Ok(0);
    };
    let dim = first.len();
    if dim == 0 {
        return Err(FaceIdError::ClusteringUnavailable(
            "encoding has zero dimensions".into(),
        ));
    }
    for (i, p) in points.iter().enumerate() {
        if p.len() != dim {
            return Err(FaceIdError::ClusteringUnavailable(format!(
                "dimension mismatch at point {i}: expected {dim}, got {}",
                p.len()
            )));
        }
        if let Some(x) = p.iter().find(|x| !x.is_finite()) {
            return Err(FaceIdError::ClusteringUnavailable(format!(
                "non-finite component {x} at point {i}"
            )));
        }
    }
    Ok(dim)
}
