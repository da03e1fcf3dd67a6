// Stick-figure overlay geometry for the live webcam feed

use crate::models::game::{OverlayFrame, OverlayPoint, OverlaySegment};
use crate::models::pose::{Keypoint, Pose, SKELETON_LINKS};

fn to_pixels(kp: &Keypoint, width: u32, height: u32) -> OverlayPoint {
    OverlayPoint {
        x: kp.x * width as f32,
        y: kp.y * height as f32,
    }
}

/// Build the stick-figure geometry for one frame, scaled to the overlay
/// canvas. Skeleton links with a missing endpoint are omitted; every
/// detected joint gets a marker. `None` (no pose this frame) produces an
/// empty overlay so the canvas is cleared.
pub fn build_overlay(pose: Option<&Pose>, width: u32, height: u32) -> OverlayFrame {
    let Some(pose) = pose else {
        return OverlayFrame::default();
    };

    let segments = SKELETON_LINKS
        .iter()
        .filter_map(|(a, b)| {
            let from = pose.landmark(*a)?;
            let to = pose.landmark(*b)?;
            Some(OverlaySegment {
                from: to_pixels(from, width, height),
                to: to_pixels(to, width, height),
            })
        })
        .collect();

    let joints = pose
        .keypoints
        .iter()
        .map(|kp| to_pixels(kp, width, height))
        .collect();

    OverlayFrame { segments, joints }
}
