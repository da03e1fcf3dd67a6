pub mod mediapipe_bridge;

use crate::core::config::GameConfig;
use crate::core::controller::DetectorProvider;
use crate::core::engine::PoseDetector;
use crate::core::model_cache::{pose_model, ModelManager};
use crate::models::game::{GameError, GameResultOf};
use crate::models::pose::DetectorConfig;
use async_trait::async_trait;
use mediapipe_bridge::{BridgeDetector, DefaultMediaPipe, MediaPipeBridge};
use std::sync::Arc;

/// Default detector factory: downloads the pose model on first use, then
/// loads one MediaPipe landmarker per request
pub struct MediaPipeDetectorProvider {
    detector_config: DetectorConfig,
    manager: Arc<ModelManager>,
}

impl MediaPipeDetectorProvider {
    pub fn new(config: &GameConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let mut cache_dir = config.data_dir.clone();
        cache_dir.push("models");

        Ok(Self {
            detector_config: config.detector_config(),
            manager: Arc::new(ModelManager::new(cache_dir)?),
        })
    }
}

#[async_trait]
impl DetectorProvider for MediaPipeDetectorProvider {
    async fn create_detector(&self) -> GameResultOf<Box<dyn PoseDetector>> {
        let model = pose_model(self.detector_config.model_variant);
        let model_path = self
            .manager
            .ensure_model(&model)
            .await
            .map_err(|e| GameError::DetectorInit(e.to_string()))?;

        // Model loading can block on Python imports; keep it off the runtime
        let detector_config = self.detector_config.clone();
        let bridge = tokio::task::spawn_blocking(move || {
            DefaultMediaPipe::new(&detector_config, &model_path)
        })
        .await
        .map_err(|e| GameError::DetectorInit(e.to_string()))?
        .map_err(|e| GameError::DetectorInit(e.to_string()))?;

        log::info!("Loaded detector: {}", bridge.get_model_info());
        Ok(Box::new(BridgeDetector::new(bridge)))
    }
}
