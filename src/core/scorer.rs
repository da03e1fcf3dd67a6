// Per-frame pose similarity scoring

use crate::models::pose::{Pose, COMPARE_LANDMARKS};

/// Distance charged for a landmark missing on either side. Landmarks are
/// normalized to [0,1], so this is the worst case inside the frame.
const MISSING_LANDMARK_PENALTY: f32 = 1.0;

/// Average-distance cutoff: at or beyond this the frame scores 0
const DISTANCE_THRESHOLD: f32 = 0.3;

/// Compare two detected poses and return a similarity score in [0, 100].
///
/// Only the upper-body + hip landmarks ([`COMPARE_LANDMARKS`]) are compared.
/// A landmark absent from either pose counts as the maximum normalized
/// distance (off-camera = worst case). The average distance is mapped
/// through a linear falloff: 0 distance → 100, `DISTANCE_THRESHOLD` or
/// more → 0.
///
/// Callers must check detection success first: both arguments are poses the
/// detector actually produced, never placeholders for "no person found".
pub fn frame_score(user: &Pose, reference: &Pose) -> u8 {
    let mut total_dist = 0.0f32;
    let n = COMPARE_LANDMARKS.len() as f32;

    for landmark in COMPARE_LANDMARKS {
        match (user.landmark(landmark), reference.landmark(landmark)) {
            (Some(a), Some(b)) => total_dist += a.distance_to(b),
            _ => total_dist += MISSING_LANDMARK_PENALTY,
        }
    }

    let avg_dist = total_dist / n;

    let score = if avg_dist < DISTANCE_THRESHOLD {
        (1.0 - avg_dist / DISTANCE_THRESHOLD) * 100.0
    } else {
        0.0
    };

    score.round().clamp(0.0, 100.0) as u8
}
