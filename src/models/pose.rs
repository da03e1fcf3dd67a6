// Data models for pose landmarks and the MediaPipe Pose output schema

use serde::{Deserialize, Serialize};

// ==============================================================================
// Keypoint & Pose
// ==============================================================================

/// A single detected landmark, normalized to the frame dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,          // Normalized [0, 1] relative to frame width
    pub y: f32,          // Normalized [0, 1] relative to frame height
    pub visibility: f32, // Detection confidence [0, 1]
}

impl Keypoint {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self { x, y, visibility }
    }

    /// Euclidean distance to another normalized keypoint (x/y only)
    pub fn distance_to(&self, other: &Keypoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.hypot(dy)
    }
}

/// One person's pose for a single frame: ordered keypoints indexed by the
/// MediaPipe Pose schema (see [`BodyLandmark`]). The detector may return
/// fewer than 33 entries; indices past the end are simply absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pose {
    pub keypoints: Vec<Keypoint>,
}

impl Pose {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Look up a landmark by schema index; `None` when the detector did not
    /// produce this index for the frame.
    pub fn landmark(&self, index: BodyLandmark) -> Option<&Keypoint> {
        self.keypoints.get(index as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

// ==============================================================================
// MediaPipe Pose Landmark schema (33 total)
// ==============================================================================

/// MediaPipe Pose landmark indices. The numbering is the model's output
/// contract and must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BodyLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

/// The landmarks compared when scoring a frame: upper body + hips.
/// Fixed for the whole session.
pub const COMPARE_LANDMARKS: [BodyLandmark; 9] = [
    BodyLandmark::Nose,
    BodyLandmark::LeftShoulder,
    BodyLandmark::RightShoulder,
    BodyLandmark::LeftElbow,
    BodyLandmark::RightElbow,
    BodyLandmark::LeftWrist,
    BodyLandmark::RightWrist,
    BodyLandmark::LeftHip,
    BodyLandmark::RightHip,
];

/// Joint pairs connected when drawing the stick-figure overlay
pub const SKELETON_LINKS: [(BodyLandmark, BodyLandmark); 10] = [
    // Face hint
    (BodyLandmark::Nose, BodyLandmark::LeftEyeInner),
    (BodyLandmark::Nose, BodyLandmark::LeftEye),
    // Arms
    (BodyLandmark::LeftShoulder, BodyLandmark::LeftElbow),
    (BodyLandmark::LeftElbow, BodyLandmark::LeftWrist),
    (BodyLandmark::RightShoulder, BodyLandmark::RightElbow),
    (BodyLandmark::RightElbow, BodyLandmark::RightWrist),
    // Torso
    (BodyLandmark::LeftShoulder, BodyLandmark::RightShoulder),
    (BodyLandmark::LeftHip, BodyLandmark::RightHip),
    (BodyLandmark::LeftShoulder, BodyLandmark::LeftHip),
    (BodyLandmark::RightShoulder, BodyLandmark::RightHip),
];

// ==============================================================================
// Configuration
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    Lite = 0,  // Fastest, less accurate
    Full = 1,  // Balanced
    Heavy = 2, // Slowest, most accurate
}

/// Detector configuration: single person, still-image (non-streaming) mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub model_variant: ModelVariant,
    pub min_detection_confidence: f32, // Minimum confidence for detection (default: 0.5)
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_variant: ModelVariant::Lite,
            min_detection_confidence: 0.5,
        }
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PoseError {
    #[error("Pose detector not initialized")]
    NotInitialized,

    #[error("Model loading failed: {0}")]
    ModelLoadFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PoseResult<T> = Result<T, PoseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_distance() {
        let a = Keypoint::new(0.0, 0.0, 1.0);
        let b = Keypoint::new(0.3, 0.4, 1.0);
        assert!((a.distance_to(&b) - 0.5).abs() < 1e-6);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_landmark_lookup_in_bounds() {
        let pose = Pose::new(vec![Keypoint::new(0.5, 0.5, 0.9); 33]);
        assert!(pose.landmark(BodyLandmark::Nose).is_some());
        assert!(pose.landmark(BodyLandmark::RightFootIndex).is_some());
    }

    #[test]
    fn test_landmark_lookup_out_of_bounds() {
        // Truncated output: only the face landmarks present
        let pose = Pose::new(vec![Keypoint::new(0.5, 0.5, 0.9); 11]);
        assert!(pose.landmark(BodyLandmark::MouthRight).is_some());
        assert!(pose.landmark(BodyLandmark::LeftShoulder).is_none());
        assert!(pose.landmark(BodyLandmark::RightHip).is_none());
    }

    #[test]
    fn test_compare_landmarks_are_upper_body_and_hips() {
        let indices: Vec<usize> = COMPARE_LANDMARKS.iter().map(|l| *l as usize).collect();
        assert_eq!(indices, vec![0, 11, 12, 13, 14, 15, 16, 23, 24]);
    }

    #[test]
    fn test_skeleton_links_stay_within_schema() {
        for (a, b) in SKELETON_LINKS {
            assert!((a as usize) < 33);
            assert!((b as usize) < 33);
        }
    }

    #[test]
    fn test_detector_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.model_variant, ModelVariant::Lite);
        assert_eq!(config.min_detection_confidence, 0.5);
    }
}
