// Frame loop: pulls frames from both video sources, runs pose detection,
// and accumulates the score until the reference video stops

use crate::core::config::GameConfig;
use crate::core::overlay::build_overlay;
use crate::core::scorer;
use crate::core::session::GameSession;
use crate::models::frame::{MediaResult, PlaybackState, RawFrame};
use crate::models::game::{GameEvent, GamePhase};
use crate::models::pose::{Pose, PoseResult};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

// ==============================================================================
// Collaborator traits
// ==============================================================================

/// Live webcam feed showing the player
#[async_trait]
pub trait CameraFeed: Send + Sync {
    /// Request access and wait until frames are flowing
    async fn open(&self) -> MediaResult<()>;

    /// Most recent captured frame, `None` before the first one arrives
    async fn latest_frame(&self) -> MediaResult<Option<RawFrame>>;
}

/// Pre-recorded reference dancer video
#[async_trait]
pub trait ReferenceVideo: Send + Sync {
    async fn seek_to_start(&self) -> MediaResult<()>;

    /// Start playback and wait for confirmation that it actually began
    async fn play(&self) -> MediaResult<()>;

    /// Current playback position and status
    async fn playback(&self) -> MediaResult<PlaybackState>;

    /// Most recent decoded frame, `None` before the first one arrives
    async fn latest_frame(&self) -> MediaResult<Option<RawFrame>>;
}

/// Single-person pose detector. Each video source gets its own instance so
/// the two inference contexts never share mutable state.
pub trait PoseDetector: Send {
    /// Detect the most prominent person in the frame. `Ok(None)` means the
    /// detector ran fine but found nobody.
    fn detect(&mut self, frame: &RawFrame) -> PoseResult<Option<Pose>>;
}

// ==============================================================================
// Game Engine
// ==============================================================================

/// Drives one game from `Running` to `Finished`. Owns both detectors and
/// the event channel; shares the session with the controller.
pub struct GameEngine {
    camera: Box<dyn CameraFeed>,
    video: Box<dyn ReferenceVideo>,
    user_detector: Box<dyn PoseDetector>,
    reference_detector: Box<dyn PoseDetector>,
    session: Arc<RwLock<GameSession>>,
    events: mpsc::Sender<GameEvent>,
    cancel: CancellationToken,
    dance_start_secs: f64,
    tick_rate_hz: u32,
    overlay_width: u32,
    overlay_height: u32,
}

impl GameEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        camera: Box<dyn CameraFeed>,
        video: Box<dyn ReferenceVideo>,
        user_detector: Box<dyn PoseDetector>,
        reference_detector: Box<dyn PoseDetector>,
        session: Arc<RwLock<GameSession>>,
        events: mpsc::Sender<GameEvent>,
        cancel: CancellationToken,
        config: &GameConfig,
    ) -> Self {
        Self {
            camera,
            video,
            user_detector,
            reference_detector,
            session,
            events,
            cancel,
            dance_start_secs: config.dance_start_secs,
            tick_rate_hz: config.tick_rate_hz,
            overlay_width: config.capture_width,
            overlay_height: config.capture_height,
        }
    }

    /// Run the frame loop until the reference video stops or the token is
    /// cancelled. Cancellation exits without touching the session; a video
    /// stop transitions it to `Finished`.
    pub async fn run(mut self) {
        let period = Duration::from_millis(1_000 / self.tick_rate_hz.max(1) as u64);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Game engine started at {} Hz", self.tick_rate_hz);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Game engine cancelled");
                    return;
                }
                _ = ticker.tick() => {
                    if self.step().await {
                        break;
                    }
                }
            }
        }

        self.finish().await;
    }

    /// One loop iteration. Returns true when the reference video has
    /// stopped and the game should finish.
    async fn step(&mut self) -> bool {
        let playback = match self.video.playback().await {
            Ok(playback) => playback,
            Err(e) => {
                warn!("Playback state unavailable: {}", e);
                return false;
            }
        };

        if playback.ended || playback.paused {
            return true;
        }

        // The overlay always tracks the player, even before scoring starts
        let user_pose = self.detect_user_pose().await;
        let overlay = build_overlay(user_pose.as_ref(), self.overlay_width, self.overlay_height);
        let _ = self.events.send(GameEvent::Overlay(overlay)).await;

        // Still inside the choreography intro: nothing to score yet
        if playback.position_secs < self.dance_start_secs {
            return false;
        }

        let reference_pose = self.detect_reference_pose().await;

        match (user_pose.as_ref(), reference_pose.as_ref()) {
            (Some(user), Some(reference)) => {
                let frame_score = scorer::frame_score(user, reference);
                let total_score = {
                    let mut session = self.session.write().await;
                    session.record_frame(frame_score);
                    session.score.total_score
                };
                let _ = self
                    .events
                    .send(GameEvent::ScoreUpdated {
                        frame_score,
                        total_score,
                    })
                    .await;
            }
            _ => {
                // A side with no detected pose leaves the score untouched
                debug!("Frame skipped: pose missing on at least one side");
            }
        }

        false
    }

    async fn detect_user_pose(&mut self) -> Option<Pose> {
        let frame = match self.camera.latest_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                warn!("Camera frame unavailable: {}", e);
                return None;
            }
        };

        match self.user_detector.detect(&frame) {
            // A pose without landmarks counts as no detection
            Ok(pose) => pose.filter(|p| !p.is_empty()),
            Err(e) => {
                warn!("User pose detection failed: {}", e);
                None
            }
        }
    }

    async fn detect_reference_pose(&mut self) -> Option<Pose> {
        let frame = match self.video.latest_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                warn!("Reference frame unavailable: {}", e);
                return None;
            }
        };

        match self.reference_detector.detect(&frame) {
            Ok(pose) => pose.filter(|p| !p.is_empty()),
            Err(e) => {
                warn!("Reference pose detection failed: {}", e);
                None
            }
        }
    }

    async fn finish(&mut self) {
        let (total_score, frame_count) = {
            let mut session = self.session.write().await;
            session.finish(Utc::now().timestamp_millis());
            (session.score.total_score, session.score.frame_count)
        };

        info!(
            "Game finished: {} points over {} scored frames",
            total_score, frame_count
        );

        let _ = self
            .events
            .send(GameEvent::PhaseChanged(GamePhase::Finished))
            .await;
        let _ = self
            .events
            .send(GameEvent::Finished {
                total_score,
                frame_count,
            })
            .await;
    }
}
