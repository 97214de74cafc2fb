use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use crate::{config::DatabaseConfig, models::Note};

const CREATE_NOTES_TABLE: &str = "CREATE TABLE IF NOT EXISTS notes (\
     id INTEGER PRIMARY KEY AUTOINCREMENT, \
     title TEXT, \
     content TEXT, \
     created_at DATETIME)";

/// Owns the SQLite pool. Cloning is cheap and every clone shares the same
/// pool; concurrent access is left to SQLite's own locking.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        tracing::info!("Opened database at {}", config.path.display());

        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(CREATE_NOTES_TABLE).execute(&self.pool).await?;

        tracing::info!("Notes table ready");

        Ok(())
    }

    pub async fn insert_note(
        &self,
        title: String,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Result<Note, sqlx::Error> {
        let id = sqlx::query("INSERT INTO notes (title, content, created_at) VALUES (?, ?, ?)")
            .bind(&title)
            .bind(&content)
            .bind(created_at)
            .execute(&self.pool)
            .await?
            .last_insert_rowid();

        Ok(Note {
            id,
            title,
            content,
            created_at,
        })
    }

    pub async fn find_note(&self, id: i64) -> Result<Option<Note>, sqlx::Error> {
        sqlx::query_as::<_, Note>("SELECT id, title, content, created_at FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_notes(&self) -> Result<Vec<Note>, sqlx::Error> {
        sqlx::query_as::<_, Note>("SELECT id, title, content, created_at FROM notes ORDER BY id")
            .fetch_all(&self.pool)
            .await
    }

    /// Returns the number of rows touched; zero means no note had this id.
    pub async fn update_note(
        &self,
        id: i64,
        title: String,
        content: String,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("UPDATE notes SET title = ?, content = ? WHERE id = ?")
            .bind(title)
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Returns the number of rows removed; zero means no note had this id.
    pub async fn delete_note(&self, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
