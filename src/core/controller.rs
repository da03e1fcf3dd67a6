// Game controller: owns the session, runs the loading sequence, spawns the
// frame loop, and persists finished games

use crate::core::config::GameConfig;
use crate::core::database::Database;
use crate::core::engine::{CameraFeed, GameEngine, PoseDetector, ReferenceVideo};
use crate::core::session::GameSession;
use crate::models::game::{GameError, GameEvent, GamePhase, GameResult, GameResultOf, GameSnapshot};
use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

// ==============================================================================
// Collaborator factories
// ==============================================================================

/// Produces the two video sources for a game run
pub trait MediaProvider: Send + Sync {
    fn camera(&self) -> Box<dyn CameraFeed>;
    fn reference(&self) -> Box<dyn ReferenceVideo>;
}

/// Produces pose detectors; called twice per game, once per video source
#[async_trait]
pub trait DetectorProvider: Send + Sync {
    async fn create_detector(&self) -> GameResultOf<Box<dyn PoseDetector>>;
}

// ==============================================================================
// Game Controller
// ==============================================================================

pub struct GameController {
    session: Arc<RwLock<GameSession>>,
    media: Arc<dyn MediaProvider>,
    detectors: Arc<dyn DetectorProvider>,
    database: Database,
    config: GameConfig,
    events_out: mpsc::Sender<GameEvent>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl GameController {
    pub fn new(
        media: Arc<dyn MediaProvider>,
        detectors: Arc<dyn DetectorProvider>,
        database: Database,
        config: GameConfig,
        events_out: mpsc::Sender<GameEvent>,
    ) -> Self {
        Self {
            session: Arc::new(RwLock::new(GameSession::new())),
            media,
            detectors,
            database,
            config,
            events_out,
            cancel: Mutex::new(None),
        }
    }

    /// Current game state for the UI
    pub async fn snapshot(&self) -> GameSnapshot {
        self.session.read().await.snapshot()
    }

    /// Run the full start sequence: webcam, detectors, reference playback,
    /// then spawn the frame loop. Any setup failure returns the session to
    /// `Idle` so the player can try again.
    pub async fn start_game(&self) -> GameResultOf<()> {
        {
            let mut session = self.session.write().await;
            if !session.phase.accepts_start() {
                return Err(GameError::AlreadyRunning);
            }
            session.begin_loading();
            info!("Game {} loading", session.id);
        }
        self.publish(GameEvent::PhaseChanged(GamePhase::Loading)).await;

        match self.load_and_launch().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!("Game setup failed: {}", e);
                self.session.write().await.abort_to_idle();
                self.publish(GameEvent::PhaseChanged(GamePhase::Idle)).await;
                Err(e)
            }
        }
    }

    async fn load_and_launch(&self) -> GameResultOf<()> {
        let camera = self.media.camera();
        let video = self.media.reference();

        camera
            .open()
            .await
            .map_err(|e| GameError::CameraDenied(e.to_string()))?;

        let user_detector = self.detectors.create_detector().await?;
        let reference_detector = self.detectors.create_detector().await?;

        video
            .seek_to_start()
            .await
            .map_err(|e| GameError::AutoplayBlocked(e.to_string()))?;
        video
            .play()
            .await
            .map_err(|e| GameError::AutoplayBlocked(e.to_string()))?;

        {
            let mut session = self.session.write().await;
            session.begin_running(Utc::now().timestamp_millis());
            info!("Game {} running", session.id);
        }
        self.publish(GameEvent::PhaseChanged(GamePhase::Running)).await;

        let cancel = CancellationToken::new();
        {
            let mut guard = self.cancel.lock().await;
            if let Some(previous) = guard.take() {
                previous.cancel();
            }
            *guard = Some(cancel.clone());
        }

        let (engine_tx, engine_rx) = mpsc::channel(256);
        let engine = GameEngine::new(
            camera,
            video,
            user_detector,
            reference_detector,
            self.session.clone(),
            engine_tx,
            cancel,
            &self.config,
        );
        tokio::spawn(engine.run());
        self.spawn_event_forwarder(engine_rx);

        Ok(())
    }

    /// Stop any in-flight game without finishing it
    pub async fn dispose(&self) {
        if let Some(cancel) = self.cancel.lock().await.take() {
            cancel.cancel();
        }
    }

    async fn publish(&self, event: GameEvent) {
        let _ = self.events_out.send(event).await;
    }

    /// Relay engine events outward, persisting the result when the game ends
    fn spawn_event_forwarder(&self, mut engine_rx: mpsc::Receiver<GameEvent>) {
        let session = self.session.clone();
        let database = self.database.clone();
        let events_out = self.events_out.clone();

        tokio::spawn(async move {
            while let Some(event) = engine_rx.recv().await {
                if matches!(event, GameEvent::Finished { .. }) {
                    let result = {
                        let session = session.read().await;
                        GameResult {
                            id: session.id.clone(),
                            started_at: session.started_at.unwrap_or_default(),
                            finished_at: session.finished_at.unwrap_or_default(),
                            total_score: session.score.total_score as i64,
                            frames_scored: session.score.frame_count as i64,
                            average_frame_score: session.score.average_frame_score(),
                        }
                    };
                    if let Err(e) = database.insert_result(&result).await {
                        error!("Failed to store game result {}: {}", result.id, e);
                    }
                }

                if events_out.send(event).await.is_err() {
                    break;
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::frame::{MediaError, MediaResult, PixelFormat, PlaybackState, RawFrame};
    use crate::models::pose::{Keypoint, Pose, PoseResult};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn test_db() -> Database {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        let db = Database { pool };
        db.run_migrations().await.expect("Failed to run migrations");
        db
    }

    fn test_frame() -> RawFrame {
        RawFrame {
            timestamp: 0,
            width: 4,
            height: 4,
            data: vec![0u8; 64],
            format: PixelFormat::RGBA8,
        }
    }

    struct OkCamera;

    #[async_trait]
    impl CameraFeed for OkCamera {
        async fn open(&self) -> MediaResult<()> {
            Ok(())
        }
        async fn latest_frame(&self) -> MediaResult<Option<RawFrame>> {
            Ok(Some(test_frame()))
        }
    }

    struct DeniedCamera;

    #[async_trait]
    impl CameraFeed for DeniedCamera {
        async fn open(&self) -> MediaResult<()> {
            Err(MediaError::PermissionDenied("NotAllowedError".to_string()))
        }
        async fn latest_frame(&self) -> MediaResult<Option<RawFrame>> {
            Ok(None)
        }
    }

    /// Plays a fixed number of scoring frames past the dance start, then ends
    struct ShortVideo {
        frames: usize,
        cursor: AtomicUsize,
        block_play: bool,
    }

    impl ShortVideo {
        fn playing(frames: usize) -> Self {
            Self {
                frames,
                cursor: AtomicUsize::new(0),
                block_play: false,
            }
        }

        fn blocked() -> Self {
            Self {
                frames: 0,
                cursor: AtomicUsize::new(0),
                block_play: true,
            }
        }
    }

    #[async_trait]
    impl ReferenceVideo for ShortVideo {
        async fn seek_to_start(&self) -> MediaResult<()> {
            Ok(())
        }
        async fn play(&self) -> MediaResult<()> {
            if self.block_play {
                Err(MediaError::AutoplayBlocked("play() rejected".to_string()))
            } else {
                Ok(())
            }
        }
        async fn playback(&self) -> MediaResult<PlaybackState> {
            let i = self.cursor.fetch_add(1, Ordering::SeqCst);
            Ok(PlaybackState {
                position_secs: 10.0 + i as f64 * 0.1,
                paused: false,
                ended: i >= self.frames,
            })
        }
        async fn latest_frame(&self) -> MediaResult<Option<RawFrame>> {
            Ok(Some(test_frame()))
        }
    }

    struct MockMedia {
        deny_camera: bool,
        block_play: bool,
        frames: usize,
    }

    impl MediaProvider for MockMedia {
        fn camera(&self) -> Box<dyn CameraFeed> {
            if self.deny_camera {
                Box::new(DeniedCamera)
            } else {
                Box::new(OkCamera)
            }
        }
        fn reference(&self) -> Box<dyn ReferenceVideo> {
            if self.block_play {
                Box::new(ShortVideo::blocked())
            } else {
                Box::new(ShortVideo::playing(self.frames))
            }
        }
    }

    struct PerfectDetectors;

    struct PerfectDetector;

    impl PoseDetector for PerfectDetector {
        fn detect(&mut self, _frame: &RawFrame) -> PoseResult<Option<Pose>> {
            Ok(Some(Pose::new(vec![Keypoint::new(0.5, 0.5, 1.0); 33])))
        }
    }

    #[async_trait]
    impl DetectorProvider for PerfectDetectors {
        async fn create_detector(&self) -> GameResultOf<Box<dyn PoseDetector>> {
            Ok(Box::new(PerfectDetector))
        }
    }

    fn fast_config() -> GameConfig {
        let mut config = GameConfig::default();
        config.tick_rate_hz = 120;
        config
    }

    async fn controller_with(
        media: MockMedia,
    ) -> (GameController, mpsc::Receiver<GameEvent>) {
        let (tx, rx) = mpsc::channel(512);
        let controller = GameController::new(
            Arc::new(media),
            Arc::new(PerfectDetectors),
            test_db().await,
            fast_config(),
            tx,
        );
        (controller, rx)
    }

    async fn wait_for_finished(rx: &mut mpsc::Receiver<GameEvent>) -> (u64, u64) {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("timed out waiting for game end")
                .expect("event channel closed");
            if let GameEvent::Finished {
                total_score,
                frame_count,
            } = event
            {
                return (total_score, frame_count);
            }
        }
    }

    #[tokio::test]
    async fn test_full_game_persists_result() {
        let (controller, mut rx) = controller_with(MockMedia {
            deny_camera: false,
            block_play: false,
            frames: 3,
        })
        .await;

        controller.start_game().await.expect("start failed");
        let (total_score, frame_count) = wait_for_finished(&mut rx).await;

        assert_eq!(frame_count, 3);
        assert_eq!(total_score, 300);

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, GamePhase::Finished);
        assert_eq!(snapshot.button_label, "Start Again");

        // Give the forwarder a beat to finish the insert
        tokio::time::sleep(Duration::from_millis(50)).await;
        let stored = controller
            .database
            .list_results(10)
            .await
            .expect("list failed");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].total_score, 300);
        assert_eq!(stored[0].frames_scored, 3);
    }

    #[tokio::test]
    async fn test_camera_denial_aborts_to_idle() {
        let (controller, _rx) = controller_with(MockMedia {
            deny_camera: true,
            block_play: false,
            frames: 0,
        })
        .await;

        let result = controller.start_game().await;
        assert!(matches!(result, Err(GameError::CameraDenied(_))));

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, GamePhase::Idle);
        assert_eq!(snapshot.button_label, "Start Game");
    }

    #[tokio::test]
    async fn test_blocked_autoplay_aborts_to_idle() {
        let (controller, _rx) = controller_with(MockMedia {
            deny_camera: false,
            block_play: true,
            frames: 0,
        })
        .await;

        let result = controller.start_game().await;
        assert!(matches!(result, Err(GameError::AutoplayBlocked(_))));
        assert_eq!(controller.snapshot().await.phase, GamePhase::Idle);
    }

    #[tokio::test]
    async fn test_start_rejected_while_running() {
        // A long video keeps the first game running while we try again
        let (controller, _rx) = controller_with(MockMedia {
            deny_camera: false,
            block_play: false,
            frames: 100_000,
        })
        .await;

        controller.start_game().await.expect("first start failed");
        let second = controller.start_game().await;
        assert!(matches!(second, Err(GameError::AlreadyRunning)));

        controller.dispose().await;
    }

    #[tokio::test]
    async fn test_finished_game_can_restart() {
        let (controller, mut rx) = controller_with(MockMedia {
            deny_camera: false,
            block_play: false,
            frames: 2,
        })
        .await;

        controller.start_game().await.expect("first start failed");
        wait_for_finished(&mut rx).await;

        controller.start_game().await.expect("restart failed");
        let (total_score, frame_count) = wait_for_finished(&mut rx).await;
        assert_eq!(frame_count, 2);
        assert_eq!(total_score, 200);
    }
}
