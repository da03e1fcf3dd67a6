// Pose model downloading and caching
// The MediaPipe .task bundles are fetched once and kept under the data dir

use crate::models::pose::ModelVariant;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Metadata for one downloadable pose model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub url: String,
    pub size_bytes: Option<u64>,
}

/// Published MediaPipe pose landmarker bundles
pub fn pose_model(variant: ModelVariant) -> ModelInfo {
    const BASE: &str =
        "https://storage.googleapis.com/mediapipe-models/pose_landmarker";

    match variant {
        ModelVariant::Lite => ModelInfo {
            name: "pose_landmarker_lite.task".to_string(),
            url: format!("{}/pose_landmarker_lite/float16/latest/pose_landmarker_lite.task", BASE),
            size_bytes: Some(5_500_000), // ~5.5 MB
        },
        ModelVariant::Full => ModelInfo {
            name: "pose_landmarker_full.task".to_string(),
            url: format!("{}/pose_landmarker_full/float16/latest/pose_landmarker_full.task", BASE),
            size_bytes: Some(9_000_000), // ~9 MB
        },
        ModelVariant::Heavy => ModelInfo {
            name: "pose_landmarker_heavy.task".to_string(),
            url: format!("{}/pose_landmarker_heavy/float16/latest/pose_landmarker_heavy.task", BASE),
            size_bytes: Some(29_200_000), // ~29 MB
        },
    }
}

/// Model manager for caching and loading pose models
pub struct ModelManager {
    cache_dir: PathBuf,
}

impl ModelManager {
    /// Create a new model manager with cache directory
    pub fn new(cache_dir: PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        fs::create_dir_all(&cache_dir)?;
        Ok(Self { cache_dir })
    }

    /// Get the cache directory path
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Check if a model is cached
    pub fn is_cached(&self, model: &ModelInfo) -> bool {
        self.get_model_path(&model.name).exists()
    }

    /// Get the local path for a model
    pub fn get_model_path(&self, model_name: &str) -> PathBuf {
        self.cache_dir.join(model_name)
    }

    /// Download a model if not cached, returning its local path
    pub async fn ensure_model(
        &self,
        model: &ModelInfo,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let model_path = self.get_model_path(&model.name);

        if self.is_cached(model) {
            info!("Model {} already cached at {:?}", model.name, model_path);
            return Ok(model_path);
        }

        info!("Downloading model {} from {}", model.name, model.url);

        let response = reqwest::get(&model.url).await?.error_for_status()?;
        let bytes = response.bytes().await?;

        // Write to a temp name first so a failed download never looks cached
        let tmp_path = model_path.with_extension("partial");
        fs::write(&tmp_path, &bytes)?;
        fs::rename(&tmp_path, &model_path)?;

        info!("Model {} cached ({} bytes)", model.name, bytes.len());
        Ok(model_path)
    }

    /// Clear the model cache
    pub fn clear_cache(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Get cache size in bytes
    pub fn get_cache_size(&self) -> Result<u64, Box<dyn std::error::Error>> {
        let mut total_size = 0u64;

        if self.cache_dir.exists() {
            for entry in fs::read_dir(&self.cache_dir)? {
                let entry = entry?;
                let metadata = entry.metadata()?;
                if metadata.is_file() {
                    total_size += metadata.len();
                }
            }
        }

        Ok(total_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_cache() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("groove-models-{}", uuid::Uuid::new_v4()));
        dir
    }

    #[test]
    fn test_pose_model_urls_match_variant() {
        assert!(pose_model(ModelVariant::Lite).url.contains("lite"));
        assert!(pose_model(ModelVariant::Full).url.contains("full"));
        assert!(pose_model(ModelVariant::Heavy).url.contains("heavy"));
    }

    #[test]
    fn test_cache_dir_is_created() {
        let dir = temp_cache();
        let manager = ModelManager::new(dir.clone()).expect("Failed to create manager");
        assert!(manager.cache_dir().exists());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_cached_detection_and_size() {
        let dir = temp_cache();
        let manager = ModelManager::new(dir.clone()).expect("Failed to create manager");
        let model = pose_model(ModelVariant::Lite);

        assert!(!manager.is_cached(&model));

        fs::write(manager.get_model_path(&model.name), vec![0u8; 128])
            .expect("Failed to write fake model");
        assert!(manager.is_cached(&model));
        assert_eq!(manager.get_cache_size().expect("size failed"), 128);

        manager.clear_cache().expect("Failed to clear cache");
        assert!(!manager.is_cached(&model));

        fs::remove_dir_all(dir).ok();
    }
}
