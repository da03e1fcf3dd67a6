// Data models for the dance-along game: phase machine, score state, events

use serde::{Deserialize, Serialize};

// ==============================================================================
// Game Phase
// ==============================================================================

/// The four states of the game loop. `Finished` is re-entrant: the action
/// control stays clickable and restarts the sequence from `Loading`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Idle,
    Loading,
    Running,
    Finished,
}

impl Default for GamePhase {
    fn default() -> Self {
        GamePhase::Idle
    }
}

impl GamePhase {
    /// Label shown on the single action control in each phase
    pub fn button_label(&self) -> &'static str {
        match self {
            GamePhase::Idle => "Start Game",
            GamePhase::Loading => "Loading…",
            GamePhase::Running => "Game Running…",
            GamePhase::Finished => "Start Again",
        }
    }

    /// Whether the action control accepts a click in this phase
    pub fn accepts_start(&self) -> bool {
        matches!(self, GamePhase::Idle | GamePhase::Finished)
    }
}

// ==============================================================================
// Score State
// ==============================================================================

/// Running score accumulator for one game. Only ever reset or incremented;
/// a frame where either side yields no pose leaves it untouched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ScoreBoard {
    pub total_score: u64,
    pub frame_count: u64,
}

impl ScoreBoard {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Record one scored frame
    pub fn record(&mut self, frame_score: u8) {
        self.total_score += frame_score as u64;
        self.frame_count += 1;
    }

    /// Mean per-frame score over the scored frames, 0.0 when none scored
    pub fn average_frame_score(&self) -> f64 {
        if self.frame_count == 0 {
            return 0.0;
        }
        self.total_score as f64 / self.frame_count as f64
    }
}

// ==============================================================================
// Overlay (stick-figure geometry, drawn by the webview canvas)
// ==============================================================================

/// A point in pixel coordinates of the overlay canvas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPoint {
    pub x: f32,
    pub y: f32,
}

/// One skeleton line segment in pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OverlaySegment {
    pub from: OverlayPoint,
    pub to: OverlayPoint,
}

/// Stick-figure geometry for one frame: skeleton segments plus a marker per
/// detected joint. Empty when no pose was detected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayFrame {
    pub segments: Vec<OverlaySegment>,
    pub joints: Vec<OverlayPoint>,
}

// ==============================================================================
// DTOs & Events
// ==============================================================================

/// Snapshot of the game state for the UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: GamePhase,
    pub button_label: String,
    pub total_score: u64,
    pub frame_count: u64,
}

/// Events published by the engine while a game is in progress
#[derive(Debug, Clone)]
pub enum GameEvent {
    PhaseChanged(GamePhase),
    ScoreUpdated { frame_score: u8, total_score: u64 },
    Overlay(OverlayFrame),
    Finished { total_score: u64, frame_count: u64 },
}

/// A finished game stored in the results history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub id: String,
    pub started_at: i64,
    pub finished_at: i64,
    pub total_score: i64,
    pub frames_scored: i64,
    pub average_frame_score: f64,
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("A game is already loading or running")]
    AlreadyRunning,

    #[error("Could not access webcam: {0}")]
    CameraDenied(String),

    #[error("Autoplay blocked: {0}")]
    AutoplayBlocked(String),

    #[error("Pose detector failed to load: {0}")]
    DetectorInit(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type GameResultOf<T> = Result<T, GameError>;
