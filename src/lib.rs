pub mod core;
pub mod models;
pub mod platform;

use crate::core::config::GameConfig;
use crate::core::controller::GameController;
use crate::core::database::Database;
use crate::models::frame::PlaybackState;
use crate::models::game::{GameEvent, GameResult, GameSnapshot};
use crate::platform::media::MediaHub;
use crate::platform::pose::MediaPipeDetectorProvider;
use log::{error, warn};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tauri::{Emitter, Manager, State};
use tokio::sync::mpsc;

// Application state
pub struct AppState {
    pub controller: Arc<GameController>,
    pub hub: Arc<MediaHub>,
    pub config: Mutex<GameConfig>,
    pub database: Database,
}

// Game commands
#[tauri::command]
async fn start_game(state: State<'_, AppState>) -> Result<(), String> {
    state
        .controller
        .start_game()
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
async fn game_snapshot(state: State<'_, AppState>) -> Result<GameSnapshot, String> {
    Ok(state.controller.snapshot().await)
}

// Media ingestion commands (called by the webview's frame pump)
#[tauri::command]
async fn push_camera_frame(
    png: Vec<u8>,
    timestamp: i64,
    state: State<'_, AppState>,
) -> Result<(), String> {
    state
        .hub
        .ingest_camera_png(&png, timestamp)
        .await
        .map_err(|e| format!("Failed to ingest camera frame: {}", e))
}

#[tauri::command]
async fn push_reference_frame(
    png: Vec<u8>,
    timestamp: i64,
    state: State<'_, AppState>,
) -> Result<(), String> {
    state
        .hub
        .ingest_reference_png(&png, timestamp)
        .await
        .map_err(|e| format!("Failed to ingest reference frame: {}", e))
}

#[tauri::command]
async fn update_playback(
    position_secs: f64,
    paused: bool,
    ended: bool,
    state: State<'_, AppState>,
) -> Result<(), String> {
    state
        .hub
        .update_playback(PlaybackState {
            position_secs,
            paused,
            ended,
        })
        .await;
    Ok(())
}

#[tauri::command]
fn report_media_error(
    source: String,
    message: String,
    state: State<'_, AppState>,
) -> Result<(), String> {
    match source.as_str() {
        "camera" => state.hub.report_camera_error(message),
        "reference" => state.hub.report_reference_error(message),
        other => return Err(format!("Unknown media source: {}", other)),
    }
    Ok(())
}

// Score history commands
#[tauri::command]
async fn get_score_history(
    limit: Option<i64>,
    state: State<'_, AppState>,
) -> Result<Vec<GameResult>, String> {
    state
        .database
        .list_results(limit.unwrap_or(50))
        .await
        .map_err(|e| format!("Failed to load score history: {}", e))
}

#[tauri::command]
async fn get_best_score(state: State<'_, AppState>) -> Result<Option<GameResult>, String> {
    state
        .database
        .best_result()
        .await
        .map_err(|e| format!("Failed to load best score: {}", e))
}

// Configuration management commands
#[tauri::command]
fn get_config(state: State<'_, AppState>) -> Result<GameConfig, String> {
    let config = state
        .config
        .lock()
        .map_err(|e| format!("Failed to lock config: {}", e))?;

    Ok(config.clone())
}

#[tauri::command]
fn update_config(config: GameConfig, state: State<'_, AppState>) -> Result<(), String> {
    config
        .validate()
        .map_err(|e| format!("Invalid configuration: {}", e))?;

    let mut current_config = state
        .config
        .lock()
        .map_err(|e| format!("Failed to lock config: {}", e))?;

    *current_config = config.clone();

    config
        .save()
        .map_err(|e| format!("Failed to save config: {}", e))?;

    Ok(())
}

#[tauri::command]
fn reset_config(state: State<'_, AppState>) -> Result<GameConfig, String> {
    let default_config = GameConfig::reset()
        .map_err(|e| format!("Failed to reset config: {}", e))?;

    let mut current_config = state
        .config
        .lock()
        .map_err(|e| format!("Failed to lock config: {}", e))?;

    *current_config = default_config.clone();

    Ok(default_config)
}

/// Relay engine events to the webview as Tauri events
fn spawn_event_bridge(handle: tauri::AppHandle, mut events: mpsc::Receiver<GameEvent>) {
    tauri::async_runtime::spawn(async move {
        while let Some(event) = events.recv().await {
            let result = match event {
                GameEvent::PhaseChanged(phase) => handle.emit(
                    "game-phase-changed",
                    json!({
                        "phase": phase,
                        "button_label": phase.button_label(),
                    }),
                ),
                GameEvent::ScoreUpdated {
                    frame_score,
                    total_score,
                } => handle.emit(
                    "score-updated",
                    json!({
                        "frame_score": frame_score,
                        "total_score": total_score,
                    }),
                ),
                GameEvent::Overlay(overlay) => handle.emit("pose-overlay", overlay),
                GameEvent::Finished {
                    total_score,
                    frame_count,
                } => handle.emit(
                    "game-finished",
                    json!({
                        "total_score": total_score,
                        "frame_count": frame_count,
                    }),
                ),
            };
            if let Err(e) = result {
                warn!("Failed to emit game event: {}", e);
            }
        }
    });
}

/// Forward media commands to the webview, which owns the actual elements
fn spawn_media_bridge(
    handle: tauri::AppHandle,
    mut commands: mpsc::Receiver<crate::platform::media::MediaCommand>,
) {
    tauri::async_runtime::spawn(async move {
        while let Some(command) = commands.recv().await {
            if let Err(e) = handle.emit("media-control", &command) {
                error!("Failed to emit media command: {}", e);
            }
        }
    });
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let handle = app.handle().clone();

            tauri::async_runtime::block_on(async {
                let config = GameConfig::load().expect("Failed to load configuration");

                let database = Database::init(&config)
                    .await
                    .expect("Failed to initialize database");

                let (hub, media_commands) =
                    MediaHub::new(config.capture_width, config.capture_height);

                let detectors = MediaPipeDetectorProvider::new(&config)
                    .expect("Failed to initialize detector provider");

                let (events_tx, events_rx) = mpsc::channel(256);
                let controller = Arc::new(GameController::new(
                    Arc::new(crate::platform::media::WebviewMediaProvider::new(
                        hub.clone(),
                    )),
                    Arc::new(detectors),
                    database.clone(),
                    config.clone(),
                    events_tx,
                ));

                spawn_event_bridge(handle.clone(), events_rx);
                spawn_media_bridge(handle, media_commands);

                app.manage(AppState {
                    controller,
                    hub,
                    config: Mutex::new(config),
                    database,
                });
            });

            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            start_game,
            game_snapshot,
            push_camera_frame,
            push_reference_frame,
            update_playback,
            report_media_error,
            get_score_history,
            get_best_score,
            get_config,
            update_config,
            reset_config
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
