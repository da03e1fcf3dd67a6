// Game session state: one object per game, owned by the controller and
// mutated only from the engine's loop task while running

use crate::models::game::{GamePhase, GameSnapshot, ScoreBoard};
use uuid::Uuid;

/// All mutable state of one dance-along game. Created once at startup and
/// explicitly `reset()` on every game start; no ambient globals.
#[derive(Debug, Clone)]
pub struct GameSession {
    pub id: String,
    pub phase: GamePhase,
    pub score: ScoreBoard,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            phase: GamePhase::Idle,
            score: ScoreBoard::default(),
            started_at: None,
            finished_at: None,
        }
    }
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin the loading sequence: fresh id, zeroed score, open timestamps
    pub fn begin_loading(&mut self) {
        self.id = Uuid::new_v4().to_string();
        self.phase = GamePhase::Loading;
        self.score.reset();
        self.started_at = None;
        self.finished_at = None;
    }

    /// Setup succeeded; the frame loop is about to start
    pub fn begin_running(&mut self, now: i64) {
        self.phase = GamePhase::Running;
        self.started_at = Some(now);
    }

    /// Setup failed; back to a restartable idle state
    pub fn abort_to_idle(&mut self) {
        self.phase = GamePhase::Idle;
    }

    /// Record one scored frame; only meaningful while running
    pub fn record_frame(&mut self, frame_score: u8) {
        self.score.record(frame_score);
    }

    /// The reference video stopped: freeze the score and mark the end
    pub fn finish(&mut self, now: i64) {
        self.phase = GamePhase::Finished;
        self.finished_at = Some(now);
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            phase: self.phase,
            button_label: self.phase.button_label().to_string(),
            total_score: self.score.total_score,
            frame_count: self.score.frame_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_idle() {
        let session = GameSession::new();
        assert_eq!(session.phase, GamePhase::Idle);
        assert_eq!(session.score.total_score, 0);
        assert!(session.started_at.is_none());
    }

    #[test]
    fn test_begin_loading_resets_score_and_rotates_id() {
        let mut session = GameSession::new();
        let first_id = session.id.clone();

        session.begin_loading();
        session.begin_running(1_000);
        session.record_frame(80);
        session.record_frame(60);
        session.finish(2_000);

        session.begin_loading();
        assert_eq!(session.phase, GamePhase::Loading);
        assert_eq!(session.score.total_score, 0);
        assert_eq!(session.score.frame_count, 0);
        assert!(session.started_at.is_none());
        assert!(session.finished_at.is_none());
        assert_ne!(session.id, first_id);
    }

    #[test]
    fn test_finish_freezes_totals() {
        let mut session = GameSession::new();
        session.begin_loading();
        session.begin_running(1_000);
        session.record_frame(100);
        session.finish(5_000);

        assert_eq!(session.phase, GamePhase::Finished);
        assert_eq!(session.score.total_score, 100);
        assert_eq!(session.finished_at, Some(5_000));
        // The frozen total survives into the snapshot shown on screen
        let snapshot = session.snapshot();
        assert_eq!(snapshot.total_score, 100);
        assert_eq!(snapshot.button_label, "Start Again");
    }

    #[test]
    fn test_abort_returns_to_idle_label() {
        let mut session = GameSession::new();
        session.begin_loading();
        session.abort_to_idle();
        assert_eq!(session.snapshot().button_label, "Start Game");
    }
}
