//! Nearest-centroid association between detections and tracks.

use nalgebra::{Point2, distance};
use ndarray::Array2;

/// Euclidean distance matrix of shape (detections, tracks).
pub fn centroid_distance(
    det_centers: &[Point2<f32>],
    track_centers: &[Point2<f32>],
) -> Array2<f32> {
    let mut dists = Array2::zeros((det_centers.len(), track_centers.len()));
    for (i, d) in det_centers.iter().enumerate() {
        for (j, t) in track_centers.iter().enumerate() {
            dists[[i, j]] = distance(d, t);
        }
    }
    dists
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    /// (detection index, track index)
    pub matches: Vec<(usize, usize)>,
    pub unmatched_detections: Vec<usize>,
}

/// Greedy assignment in detection order.
///
/// Each detection claims the nearest track that is still unclaimed and
/// strictly closer than `thresh`. On equal distance the lower track index
/// wins, so the result is deterministic for a fixed input order.
pub fn greedy_assignment(cost_matrix: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_dets, num_tracks) = cost_matrix.dim();
    let mut claimed = vec![false; num_tracks];
    let mut result = AssignmentResult::default();

    for i in 0..num_dets {
        let mut best: Option<(usize, f32)> = None;
        for j in 0..num_tracks {
            if claimed[j] {
                continue;
            }
            let d = cost_matrix[[i, j]];
            if d < thresh && best.is_none_or(|(_, best_d)| d < best_d) {
                best = Some((j, d));
            }
        }

        match best {
            Some((j, _)) => {
                claimed[j] = true;
                result.matches.push((i, j));
            }
            None => result.unmatched_detections.push(i),
        }
    }

    result
}
