use crate::core::config::GameConfig;
use crate::models::game::GameResult;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::{migrate::MigrateDatabase, Sqlite};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Initialize the database with migrations
    pub async fn init(config: &GameConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db_path = Self::get_db_path(config);
        let db_url = format!("sqlite://{}", db_path.display());

        // Create database directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Create database if it doesn't exist
        if !Sqlite::database_exists(&db_url).await? {
            Sqlite::create_database(&db_url).await?;
        }

        // Create connection pool
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let db = Self { pool };

        // Run migrations
        db.run_migrations().await?;

        Ok(db)
    }

    /// Get the pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<(), Box<dyn std::error::Error>> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Get the database file path
    fn get_db_path(config: &GameConfig) -> PathBuf {
        let mut path = config.data_dir.clone();
        path.push("database");
        path.push("groove.db");
        path
    }
}

// Result row model
#[derive(Debug, Clone, sqlx::FromRow)]
struct GameResultRow {
    id: String,
    started_at: i64,
    finished_at: i64,
    total_score: i64,
    frames_scored: i64,
    average_frame_score: f64,
}

impl From<GameResultRow> for GameResult {
    fn from(row: GameResultRow) -> Self {
        GameResult {
            id: row.id,
            started_at: row.started_at,
            finished_at: row.finished_at,
            total_score: row.total_score,
            frames_scored: row.frames_scored,
            average_frame_score: row.average_frame_score,
        }
    }
}

impl Database {
    /// Store one finished game
    pub async fn insert_result(&self, result: &GameResult) -> Result<(), sqlx::Error> {
        let created_at = chrono::Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO game_results
                (id, started_at, finished_at, total_score, frames_scored,
                 average_frame_score, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&result.id)
        .bind(result.started_at)
        .bind(result.finished_at)
        .bind(result.total_score)
        .bind(result.frames_scored)
        .bind(result.average_frame_score)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a stored result by game id
    pub async fn get_result(&self, id: &str) -> Result<Option<GameResult>, sqlx::Error> {
        let row = sqlx::query_as::<_, GameResultRow>(
            "SELECT id, started_at, finished_at, total_score, frames_scored,
                    average_frame_score
             FROM game_results WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GameResult::from))
    }

    /// List stored results, most recent first
    pub async fn list_results(&self, limit: i64) -> Result<Vec<GameResult>, sqlx::Error> {
        let rows = sqlx::query_as::<_, GameResultRow>(
            "SELECT id, started_at, finished_at, total_score, frames_scored,
                    average_frame_score
             FROM game_results ORDER BY finished_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(GameResult::from).collect())
    }

    /// The personal best: highest total score ever recorded
    pub async fn best_result(&self) -> Result<Option<GameResult>, sqlx::Error> {
        let row = sqlx::query_as::<_, GameResultRow>(
            "SELECT id, started_at, finished_at, total_score, frames_scored,
                    average_frame_score
             FROM game_results ORDER BY total_score DESC, finished_at ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GameResult::from))
    }

    /// Delete a stored result
    pub async fn delete_result(&self, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM game_results WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
