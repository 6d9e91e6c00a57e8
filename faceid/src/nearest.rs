//! Nearest-representative assignment.
//!
//! Instead of re-clustering the whole historical point cloud, every new face
//! is compared against each known representative once. Representatives
//! minted earlier in the same pass take part in later comparisons, so repeat
//! faces of one new person collapse into a single identity.

use crate::encoding::check_population;
use crate::{ClusterConfig, ClusterOutcome, FaceIdError, FaceLink, IdAllocator, Identity, NewFace};

pub(crate) fn assign<R: Clone>(
    cfg: &ClusterConfig,
    existing: &[Identity],
    faces: &[NewFace<R>],
    mut alloc: IdAllocator,
) -> Result<ClusterOutcome<R>, FaceIdError> {
    let population: Vec<&[f64]> = existing
        .iter()
        .map(|i| i.encoding.as_slice())
        .chain(faces.iter().map(|f| f.encoding.as_slice()))
        .collect();
    check_population(&population)?;

    let mut minted: Vec<Identity> = Vec::new();
    let mut links = Vec::with_capacity(faces.len());

    for face in faces {
        let mut best: Option<(f64, u64, bool)> = None;
        let candidates = existing
            .iter()
            .map(|i| (i, false))
            .chain(minted.iter().map(|i| (i, true)));
        for (candidate, is_new) in candidates {
            let d = cfg.metric.distance(&face.encoding, &candidate.encoding);
            if d > cfg.eps {
                continue;
            }
            // Ties go to the lower id.
            let better = match best {
                None => true,
                Some((bd, bid, _)) => d < bd || (d == bd && candidate.id < bid),
            };
            if better {
                best = Some((d, candidate.id, is_new));
            }
        }

        let (identity_id, is_new) = match best {
            Some((_, id, is_new)) => (id, is_new),
            None => {
                let identity = alloc.mint(&face.encoding)?;
                let id = identity.id;
                minted.push(identity);
                (id, true)
            }
        };
        links.push(FaceLink {
            photo: face.photo.clone(),
            identity_id,
            minted: is_new,
        });
    }

    Ok(ClusterOutcome { links, minted })
}

#[cfg(test)]
mod tests {
    use crate::{ClusterConfig, Clusterer, FaceIdError, Identity, NewFace, Strategy};

    fn clusterer(eps: f64) -> Clusterer {
        Clusterer::new(ClusterConfig {
            eps,
            strategy: Strategy::NearestRepresentative,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn single_face_matches_existing() {
        // No density requirement: one face is enough to match.
        let existing = vec![Identity::new(7, vec![1.0, 1.0], "Aunt")];
        let faces = vec![NewFace::<String>::new("p", vec![1.2, 1.0])];
        let outcome = clusterer(0.5).cluster(&existing, &faces).unwrap();
        assert_eq!(outcome.links[0].identity_id, 7);
        assert!(outcome.minted.is_empty());
    }

    #[test]
    fn picks_nearest_then_lowest_id() {
        let existing = vec![
            Identity::new(2, vec![0.4, 0.0], "far"),
            Identity::new(5, vec![0.1, 0.0], "near"),
            Identity::new(3, vec![-0.1, 0.0], "near twin"),
        ];
        let faces = vec![
            NewFace::<String>::new("p", vec![0.15, 0.0]),
            NewFace::<String>::new("q", vec![0.0, 0.0]),
        ];
        let outcome = clusterer(0.5).cluster(&existing, &faces).unwrap();
        assert_eq!(outcome.links[0].identity_id, 5);
        assert_eq!(outcome.links[1].identity_id, 3);
    }

    #[test]
    fn repeat_faces_in_batch_share_minted_identity() {
        let existing = vec![Identity::new(1, vec![50.0, 50.0], "Dad")];
        let faces = vec![
            NewFace::<String>::new("p1", vec![0.0, 0.0]),
            NewFace::<String>::new("p2", vec![0.1, 0.0]),
            NewFace::<String>::new("p3", vec![10.0, 0.0]),
        ];
        let outcome = clusterer(0.5).cluster(&existing, &faces).unwrap();

        let ids: Vec<u64> = outcome.links.iter().map(|l| l.identity_id).collect();
        assert_eq!(ids, vec![2, 2, 3]);
        assert_eq!(outcome.minted.len(), 2);
        assert!(outcome.links.iter().all(|l| l.minted));
    }

    #[test]
    fn dimension_mismatch_fails() {
        let existing = vec![Identity::new(1, vec![0.0, 0.0], "a")];
        let faces = vec![NewFace::<String>::new("p", vec![0.0])];
        assert!(matches!(
            clusterer(0.5).cluster(&existing, &faces),
            Err(FaceIdError::ClusteringUnavailable(_))
        ));
    }
}
