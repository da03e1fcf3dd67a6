// Data structures for captured media frames and reference playback state

use serde::{Deserialize, Serialize};

/// A captured frame from one of the two video sources
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub timestamp: i64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub format: PixelFormat,
}

/// Pixel format of captured frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    RGBA8,
    BGRA8,
}

/// Playback position and status of the reference dancer video
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PlaybackState {
    pub position_secs: f64,
    pub paused: bool,
    pub ended: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            position_secs: 0.0,
            paused: true,
            ended: false,
        }
    }
}

impl PlaybackState {
    /// True while the reference video is actively playing
    pub fn is_playing(&self) -> bool {
        !self.paused && !self.ended
    }
}

/// Error types for media source operations
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("Autoplay blocked: {0}")]
    AutoplayBlocked(String),

    #[error("Media source not ready")]
    NotReady,

    #[error("Media source closed")]
    Closed,

    #[error("Frame decode failed: {0}")]
    DecodeFailed(String),

    #[error("Timed out waiting for the webview media source")]
    Timeout,
}

pub type MediaResult<T> = Result<T, MediaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_state_default_is_paused() {
        let state = PlaybackState::default();
        assert!(!state.is_playing());
        assert_eq!(state.position_secs, 0.0);
    }

    #[test]
    fn test_playback_state_playing() {
        let state = PlaybackState {
            position_secs: 12.5,
            paused: false,
            ended: false,
        };
        assert!(state.is_playing());
    }

    #[test]
    fn test_playback_state_ended_is_not_playing() {
        let state = PlaybackState {
            position_secs: 95.0,
            paused: false,
            ended: true,
        };
        assert!(!state.is_playing());
    }
}
