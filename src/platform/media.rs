// Webview-backed media sources
//
// The webview owns the actual <video> elements (getUserMedia webcam and the
// reference dancer file) and streams PNG-encoded frames plus playback state
// into these hubs over the command interface. The frame loop consumes them
// through the CameraFeed / ReferenceVideo traits without knowing where the
// pixels come from.

use crate::core::engine::{CameraFeed, ReferenceVideo};
use crate::models::frame::{MediaError, MediaResult, PixelFormat, PlaybackState, RawFrame};
use async_trait::async_trait;
use log::debug;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};

/// How long to wait for the webview to confirm a source before giving up
const SOURCE_TIMEOUT: Duration = Duration::from_secs(10);

/// Instructions sent to the webview's media elements
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MediaCommand {
    OpenCamera { width: u32, height: u32 },
    SeekReference { position_secs: f64 },
    PlayReference { width: u32, height: u32 },
}

/// Lifecycle of one webview media source
#[derive(Debug, Clone)]
enum SourceStatus {
    Idle,
    Pending,
    Ready,
    Failed(String),
}

/// Shared state fed by the webview and read by the frame loop
pub struct MediaHub {
    camera_frame: RwLock<Option<RawFrame>>,
    reference_frame: RwLock<Option<RawFrame>>,
    playback: RwLock<PlaybackState>,
    camera_status: watch::Sender<SourceStatus>,
    reference_status: watch::Sender<SourceStatus>,
    commands: mpsc::Sender<MediaCommand>,
    capture_width: u32,
    capture_height: u32,
    source_timeout: Duration,
}

impl MediaHub {
    /// Create the hub plus the command stream the frontend bridge drains
    pub fn new(capture_width: u32, capture_height: u32) -> (Arc<Self>, mpsc::Receiver<MediaCommand>) {
        Self::with_timeout(capture_width, capture_height, SOURCE_TIMEOUT)
    }

    fn with_timeout(
        capture_width: u32,
        capture_height: u32,
        source_timeout: Duration,
    ) -> (Arc<Self>, mpsc::Receiver<MediaCommand>) {
        let (tx, rx) = mpsc::channel(32);
        let (camera_status, _) = watch::channel(SourceStatus::Idle);
        let (reference_status, _) = watch::channel(SourceStatus::Idle);

        let hub = Arc::new(Self {
            camera_frame: RwLock::new(None),
            reference_frame: RwLock::new(None),
            playback: RwLock::new(PlaybackState::default()),
            camera_status,
            reference_status,
            commands: tx,
            capture_width,
            capture_height,
            source_timeout,
        });
        (hub, rx)
    }

    // ==========================================================================
    // Webview-facing ingestion (called from IPC commands)
    // ==========================================================================

    /// Store a PNG-encoded webcam frame. The first frame after an open
    /// request doubles as the "camera is working" confirmation.
    pub async fn ingest_camera_png(&self, png: &[u8], timestamp: i64) -> MediaResult<()> {
        let frame = decode_png(png, timestamp)?;
        self.check_capture_size(&frame)?;
        *self.camera_frame.write().await = Some(frame);

        if matches!(&*self.camera_status.borrow(), SourceStatus::Pending) {
            self.camera_status.send_replace(SourceStatus::Ready);
        }
        Ok(())
    }

    /// Store a PNG-encoded reference-video frame
    pub async fn ingest_reference_png(&self, png: &[u8], timestamp: i64) -> MediaResult<()> {
        let frame = decode_png(png, timestamp)?;
        self.check_capture_size(&frame)?;
        *self.reference_frame.write().await = Some(frame);
        Ok(())
    }

    /// Both sources must deliver frames at the configured capture size;
    /// anything else means the webview's grab canvas is misconfigured
    fn check_capture_size(&self, frame: &RawFrame) -> MediaResult<()> {
        if frame.width != self.capture_width || frame.height != self.capture_height {
            return Err(MediaError::DecodeFailed(format!(
                "unexpected frame size {}x{}, expected {}x{}",
                frame.width, frame.height, self.capture_width, self.capture_height
            )));
        }
        Ok(())
    }

    /// Update the reference video's playback position and status. Seeing it
    /// actually play confirms a pending play request.
    pub async fn update_playback(&self, state: PlaybackState) {
        *self.playback.write().await = state;

        if state.is_playing()
            && matches!(&*self.reference_status.borrow(), SourceStatus::Pending)
        {
            self.reference_status.send_replace(SourceStatus::Ready);
        }
    }

    /// The webview could not open the webcam (permission denied, no device)
    pub fn report_camera_error(&self, message: String) {
        self.camera_status.send_replace(SourceStatus::Failed(message));
    }

    /// The webview could not start reference playback (autoplay policy)
    pub fn report_reference_error(&self, message: String) {
        self.reference_status.send_replace(SourceStatus::Failed(message));
    }

    // ==========================================================================
    // Internals
    // ==========================================================================

    async fn send_command(&self, command: MediaCommand) -> MediaResult<()> {
        debug!("Media command: {:?}", command);
        self.commands
            .send(command)
            .await
            .map_err(|_| MediaError::Closed)
    }

    /// Wait until the source confirms or fails, surfacing the failure text
    async fn await_ready(
        &self,
        status: &watch::Sender<SourceStatus>,
    ) -> Result<Result<(), String>, MediaError> {
        let mut rx = status.subscribe();
        let wait = async {
            loop {
                let current = rx.borrow().clone();
                match current {
                    SourceStatus::Ready => return Ok(Ok(())),
                    SourceStatus::Failed(msg) => return Ok(Err(msg)),
                    _ => {}
                }
                if rx.changed().await.is_err() {
                    return Err(MediaError::Closed);
                }
            }
        };

        tokio::time::timeout(self.source_timeout, wait)
            .await
            .map_err(|_| MediaError::Timeout)?
    }
}

/// Decode one PNG frame pushed over IPC into raw RGBA pixels
fn decode_png(png: &[u8], timestamp: i64) -> MediaResult<RawFrame> {
    let image = image::load_from_memory(png)
        .map_err(|e| MediaError::DecodeFailed(e.to_string()))?;
    let rgba = image.to_rgba8();

    Ok(RawFrame {
        timestamp,
        width: rgba.width(),
        height: rgba.height(),
        data: rgba.into_raw(),
        format: PixelFormat::RGBA8,
    })
}

// ==============================================================================
// Frame-loop facing sources
// ==============================================================================

pub struct WebviewCamera {
    hub: Arc<MediaHub>,
}

impl WebviewCamera {
    pub fn new(hub: Arc<MediaHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl CameraFeed for WebviewCamera {
    async fn open(&self) -> MediaResult<()> {
        self.hub.camera_status.send_replace(SourceStatus::Pending);
        self.hub
            .send_command(MediaCommand::OpenCamera {
                width: self.hub.capture_width,
                height: self.hub.capture_height,
            })
            .await?;

        match self.hub.await_ready(&self.hub.camera_status).await? {
            Ok(()) => Ok(()),
            Err(msg) => Err(MediaError::PermissionDenied(msg)),
        }
    }

    async fn latest_frame(&self) -> MediaResult<Option<RawFrame>> {
        Ok(self.hub.camera_frame.read().await.clone())
    }
}

pub struct WebviewReferenceVideo {
    hub: Arc<MediaHub>,
}

impl WebviewReferenceVideo {
    pub fn new(hub: Arc<MediaHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl ReferenceVideo for WebviewReferenceVideo {
    async fn seek_to_start(&self) -> MediaResult<()> {
        // Drop stale state from a previous run before the new one starts
        *self.hub.playback.write().await = PlaybackState::default();
        *self.hub.reference_frame.write().await = None;

        self.hub
            .send_command(MediaCommand::SeekReference { position_secs: 0.0 })
            .await
    }

    async fn play(&self) -> MediaResult<()> {
        self.hub.reference_status.send_replace(SourceStatus::Pending);
        self.hub
            .send_command(MediaCommand::PlayReference {
                width: self.hub.capture_width,
                height: self.hub.capture_height,
            })
            .await?;

        match self.hub.await_ready(&self.hub.reference_status).await? {
            Ok(()) => Ok(()),
            Err(msg) => Err(MediaError::AutoplayBlocked(msg)),
        }
    }

    async fn playback(&self) -> MediaResult<PlaybackState> {
        Ok(*self.hub.playback.read().await)
    }

    async fn latest_frame(&self) -> MediaResult<Option<RawFrame>> {
        Ok(self.hub.reference_frame.read().await.clone())
    }
}

/// Hands the controller fresh source handles backed by the shared hub
pub struct WebviewMediaProvider {
    hub: Arc<MediaHub>,
}

impl WebviewMediaProvider {
    pub fn new(hub: Arc<MediaHub>) -> Self {
        Self { hub }
    }
}

impl crate::core::controller::MediaProvider for WebviewMediaProvider {
    fn camera(&self) -> Box<dyn CameraFeed> {
        Box::new(WebviewCamera::new(self.hub.clone()))
    }

    fn reference(&self) -> Box<dyn ReferenceVideo> {
        Box::new(WebviewReferenceVideo::new(self.hub.clone()))
    }
}
