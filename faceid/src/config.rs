use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FaceIdError, Metric};

/// How new faces are matched against known identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// DBSCAN over existing representatives plus the new batch.
    #[default]
    Density,
    /// Compare each new face against each known representative only.
    /// Cost grows with the identity count, not with the point cloud.
    NearestRepresentative,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Density => write!(f, "density"),
            Self::NearestRepresentative => write!(f, "nearest_representative"),
        }
    }
}

/// Controls clustering behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Maximum distance between two faces of the same person.
    /// Higher = more recall across lighting and angle, lower = fewer merges
    /// of different people.
    /// Default: 0.5.
    pub eps: f64,

    /// Minimum neighborhood size (the face itself included) to form a
    /// dense region. Ignored by [`Strategy::NearestRepresentative`].
    /// Default: 5.
    pub min_samples: usize,

    /// Default: Euclidean.
    pub metric: Metric,

    /// Default: Density.
    pub strategy: Strategy,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_samples: 5,
            metric: Metric::Euclidean,
            strategy: Strategy::Density,
        }
    }
}

impl ClusterConfig {
    /// Tighter preset: keeps look-alikes apart at the cost of more
    /// `Unnamed-<n>` identities.
    pub fn strict() -> Self {
        Self {
            eps: 0.2,
            min_samples: 3,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), FaceIdError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(FaceIdError::InvalidConfig(format!(
                "eps must be a positive finite number, got {}",
                self.eps
            )));
        }
        if self.min_samples == 0 {
            return Err(FaceIdError::InvalidConfig(
                "min_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
