// MediaPipe integration bridge
// Abstraction over the MediaPipe pose landmarker, single person, still-image
// mode. Implemented via PyO3 (Python MediaPipe) with a dummy fallback.

use crate::models::frame::{PixelFormat, RawFrame};
use crate::models::pose::{DetectorConfig, Pose, PoseResult};
use std::path::Path;

/// MediaPipe bridge trait, one instance per video source
pub trait MediaPipeBridge: Send + Sync {
    /// Load the pose landmarker from a cached .task bundle
    fn new(config: &DetectorConfig, model_path: &Path) -> PoseResult<Self>
    where
        Self: Sized;

    /// Run inference on one RGBA frame. `Ok(None)` means no person found.
    fn detect_pose(
        &self,
        frame_data: &[u8],
        width: u32,
        height: u32,
    ) -> PoseResult<Option<Pose>>;

    /// Check if the model is loaded
    fn is_initialized(&self) -> bool;

    /// Get model info
    fn get_model_info(&self) -> String;
}

// ==============================================================================
// PyO3 Implementation (Python MediaPipe)
// ==============================================================================

#[cfg(feature = "ml-pyo3")]
pub mod pyo3_backend {
    use super::*;
    use crate::models::pose::{Keypoint, PoseError};
    use pyo3::prelude::*;
    use pyo3::types::{PyBytes, PyDict};
    use serde_json::Value;

    pub struct PyO3MediaPipe {
        // Python inference module
        inference_module: PyObject,
        config: DetectorConfig,
        initialized: bool,
    }

    impl MediaPipeBridge for PyO3MediaPipe {
        fn new(config: &DetectorConfig, model_path: &Path) -> PoseResult<Self> {
            Python::with_gil(|py| {
                let sys = py.import("sys").map_err(|e| {
                    PoseError::ModelLoadFailed(format!("Failed to import sys: {}", e))
                })?;

                let path_list = sys.getattr("path").map_err(|e| {
                    PoseError::ModelLoadFailed(format!("Failed to get sys.path: {}", e))
                })?;

                // Python helpers live next to Cargo.toml
                let python_dir = std::env::current_dir().unwrap_or_default().join("python");

                path_list
                    .call_method1("insert", (0, python_dir.to_string_lossy().as_ref()))
                    .map_err(|e| {
                        PoseError::ModelLoadFailed(format!(
                            "Failed to add python dir to path: {}",
                            e
                        ))
                    })?;

                let inference_module = py.import("pose_inference").map_err(|e| {
                    PoseError::ModelLoadFailed(format!(
                        "Failed to import pose_inference: {}. Make sure Python dependencies are installed (pip install -r requirements.txt)",
                        e
                    ))
                })?;

                // Load the landmarker once; per-frame calls reuse it
                let load_fn = inference_module.getattr("load_landmarker").map_err(|e| {
                    PoseError::ModelLoadFailed(format!("Failed to get load_landmarker: {}", e))
                })?;
                load_fn
                    .call1((
                        model_path.to_string_lossy().as_ref(),
                        config.min_detection_confidence,
                    ))
                    .map_err(|e| {
                        PoseError::ModelLoadFailed(format!("Landmarker load failed: {}", e))
                    })?;

                log::info!(
                    "PyO3MediaPipe initialized: model={:?}, min_confidence={}",
                    config.model_variant,
                    config.min_detection_confidence
                );

                Ok(Self {
                    inference_module: inference_module.into(),
                    config: config.clone(),
                    initialized: true,
                })
            })
        }

        fn detect_pose(
            &self,
            frame_data: &[u8],
            width: u32,
            height: u32,
        ) -> PoseResult<Option<Pose>> {
            Python::with_gil(|py| {
                let module = self.inference_module.as_ref(py);

                let process_fn = module.getattr("process_image_bytes").map_err(|e| {
                    PoseError::InferenceFailed(format!(
                        "Failed to get process_image_bytes: {}",
                        e
                    ))
                })?;

                let image_bytes = PyBytes::new(py, frame_data);

                let kwargs = PyDict::new(py);
                kwargs.set_item("image_bytes", image_bytes).map_err(|e| {
                    PoseError::InferenceFailed(format!("Failed to set image_bytes: {}", e))
                })?;
                kwargs.set_item("width", width).map_err(|e| {
                    PoseError::InferenceFailed(format!("Failed to set width: {}", e))
                })?;
                kwargs.set_item("height", height).map_err(|e| {
                    PoseError::InferenceFailed(format!("Failed to set height: {}", e))
                })?;

                let result_json = process_fn.call((), Some(kwargs)).map_err(|e| {
                    PoseError::InferenceFailed(format!("MediaPipe inference failed: {}", e))
                })?;

                let json_str: String = result_json.extract().map_err(|e| {
                    PoseError::InferenceFailed(format!("Failed to extract JSON: {}", e))
                })?;

                let result: Value = serde_json::from_str(&json_str).map_err(|e| {
                    PoseError::InferenceFailed(format!("Failed to parse JSON: {}", e))
                })?;

                match result.get("pose") {
                    Some(pose_data) if !pose_data.is_null() => {
                        Ok(Some(Self::parse_pose(pose_data)?))
                    }
                    _ => Ok(None),
                }
            })
        }

        fn is_initialized(&self) -> bool {
            self.initialized
        }

        fn get_model_info(&self) -> String {
            format!(
                "PyO3 MediaPipe Bridge (Python backend) - model: {:?}",
                self.config.model_variant
            )
        }
    }

    impl PyO3MediaPipe {
        fn parse_pose(data: &Value) -> PoseResult<Pose> {
            let keypoints = data
                .get("keypoints")
                .and_then(|k| k.as_array())
                .ok_or_else(|| PoseError::InferenceFailed("Missing keypoints".to_string()))?;

            let keypoints: Vec<Keypoint> = keypoints
                .iter()
                .map(|kp| Keypoint {
                    x: kp.get("x").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
                    y: kp.get("y").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32,
                    visibility: kp
                        .get("visibility")
                        .and_then(|v| v.as_f64())
                        .unwrap_or(0.0) as f32,
                })
                .collect();

            Ok(Pose::new(keypoints))
        }
    }
}

// ==============================================================================
// Dummy Implementation (for compilation without features)
// ==============================================================================

#[cfg(not(feature = "ml-pyo3"))]
pub struct DummyMediaPipe {
    config: DetectorConfig,
}

#[cfg(not(feature = "ml-pyo3"))]
impl MediaPipeBridge for DummyMediaPipe {
    fn new(config: &DetectorConfig, _model_path: &Path) -> PoseResult<Self> {
        log::warn!("Using dummy MediaPipe implementation (no inference)");
        log::warn!("Enable the 'ml-pyo3' feature for actual pose detection");
        Ok(Self {
            config: config.clone(),
        })
    }

    fn detect_pose(
        &self,
        _frame_data: &[u8],
        _width: u32,
        _height: u32,
    ) -> PoseResult<Option<Pose>> {
        Ok(None)
    }

    fn is_initialized(&self) -> bool {
        false
    }

    fn get_model_info(&self) -> String {
        format!(
            "Dummy MediaPipe (no ML inference - enable 'ml-pyo3') - model: {:?}",
            self.config.model_variant
        )
    }
}

// ==============================================================================
// Default Backend Selection
// ==============================================================================

#[cfg(feature = "ml-pyo3")]
pub type DefaultMediaPipe = pyo3_backend::PyO3MediaPipe;

#[cfg(not(feature = "ml-pyo3"))]
pub type DefaultMediaPipe = DummyMediaPipe;

// ==============================================================================
// Frame-loop adapter
// ==============================================================================

use crate::core::engine::PoseDetector;

/// Wraps a bridge as the detector the frame loop drives. Handles the pixel
/// format conversion MediaPipe expects (RGBA input).
pub struct BridgeDetector<B: MediaPipeBridge> {
    bridge: B,
}

impl<B: MediaPipeBridge> BridgeDetector<B> {
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }
}

impl<B: MediaPipeBridge> PoseDetector for BridgeDetector<B> {
    fn detect(&mut self, frame: &RawFrame) -> PoseResult<Option<Pose>> {
        match frame.format {
            PixelFormat::RGBA8 => {
                self.bridge.detect_pose(&frame.data, frame.width, frame.height)
            }
            PixelFormat::BGRA8 => {
                let mut rgba = frame.data.clone();
                for px in rgba.chunks_exact_mut(4) {
                    px.swap(0, 2);
                }
                self.bridge.detect_pose(&rgba, frame.width, frame.height)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingBridge {
        last_first_byte: std::sync::Mutex<Option<u8>>,
    }

    impl MediaPipeBridge for RecordingBridge {
        fn new(_config: &DetectorConfig, _model_path: &Path) -> PoseResult<Self> {
            Ok(Self {
                last_first_byte: std::sync::Mutex::new(None),
            })
        }

        fn detect_pose(
            &self,
            frame_data: &[u8],
            _width: u32,
            _height: u32,
        ) -> PoseResult<Option<Pose>> {
            *self.last_first_byte.lock().unwrap() = frame_data.first().copied();
            Ok(None)
        }

        fn is_initialized(&self) -> bool {
            true
        }

        fn get_model_info(&self) -> String {
            "recording".to_string()
        }
    }

    #[test]
    fn test_bgra_frames_are_swizzled_to_rgba() {
        let bridge =
            RecordingBridge::new(&DetectorConfig::default(), Path::new("unused")).unwrap();
        let mut detector = BridgeDetector::new(bridge);

        let frame = RawFrame {
            timestamp: 0,
            width: 1,
            height: 1,
            data: vec![10, 20, 30, 255], // B, G, R, A
            format: PixelFormat::BGRA8,
        };
        detector.detect(&frame).unwrap();

        // Red channel must come first after conversion
        let seen = detector.bridge.last_first_byte.lock().unwrap().take();
        assert_eq!(seen, Some(30));
    }

    #[test]
    fn test_rgba_frames_pass_through() {
        let bridge =
            RecordingBridge::new(&DetectorConfig::default(), Path::new("unused")).unwrap();
        let mut detector = BridgeDetector::new(bridge);

        let frame = RawFrame {
            timestamp: 0,
            width: 1,
            height: 1,
            data: vec![30, 20, 10, 255],
            format: PixelFormat::RGBA8,
        };
        detector.detect(&frame).unwrap();

        let seen = detector.bridge.last_first_byte.lock().unwrap().take();
        assert_eq!(seen, Some(30));
    }
}
