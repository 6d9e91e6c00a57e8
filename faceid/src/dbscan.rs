use std::collections::VecDeque;

use crate::Metric;

/// Label assigned to points that did not join any dense region.
pub const NOISE: i32 = -1;

const UNVISITED: i32 = -2;

/// Runs DBSCAN over `points`.
///
/// # Parameters
/// - `eps`: maximum distance for two points to be neighbors
/// - `min_samples`: neighborhood size (the point itself included) needed
///   for a point to be a core point
///
/// # Returns
/// One label per point, in input order. Clusters are numbered `0, 1, ...`
/// in order of discovery; [`NOISE`] marks unclustered points.
///
/// Callers must pass vectors of equal dimension.
pub fn dbscan(points: &[&[f64]], eps: f64, min_samples: usize, metric: Metric) -> Vec<i32> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }

    let mut labels = vec![UNVISITED; n];
    let mut next_cluster: i32 = 0;

    for i in 0..n {
        if labels[i] != UNVISITED {
            continue;
        }

        let neighbors = range_query(points, i, eps, metric);
        if neighbors.len() < min_samples {
            labels[i] = NOISE;
            continue;
        }

        let cluster = next_cluster;
        next_cluster += 1;
        labels[i] = cluster;

        let mut seed: VecDeque<usize> = neighbors.into_iter().filter(|&j| j != i).collect();
        while let Some(q) = seed.pop_front() {
            // Noise reached from a core point becomes a border point.
            if labels[q] == NOISE {
                labels[q] = cluster;
            }
            if labels[q] != UNVISITED {
                continue;
            }
            labels[q] = cluster;

            let q_neighbors = range_query(points, q, eps, metric);
            if q_neighbors.len() >= min_samples {
                seed.extend(q_neighbors);
            }
        }
    }

    labels
}

/// Returns indices of all points within `eps` of `points[idx]`, itself included.
fn range_query(points: &[&[f64]], idx: usize, eps: f64, metric: Metric) -> Vec<usize> {
    let q = points[idx];
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| metric.distance(q, p) <= eps)
        .map(|(i, _)| i)
        .collect()
}
