//! # refnote-db
//!
//! PostgreSQL database layer for refnote.
//!
//! This crate provides:
//! - Connection pool management
//! - The append-or-create notes repository (one JSONB row per ref_id)
//! - Storage-mode resolution for file payloads (base64 vs filesystem)
//! - Embedded schema migrations
//!
//! ## Example
//!
//! ```rust,ignore
//! use refnote_core::{FileLimits, NewNote};
//! use refnote_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/refnote").await?;
//!     db.migrate().await?;
//!
//!     let (note, count) = db
//!         .notes
//!         .add_note(
//!             "field-42",
//!             "user-1",
//!             NewNote { note_text: "first note".into(), note_files: None },
//!             &FileLimits::default(),
//!         )
//!         .await?;
//!     println!("thread now has {} notes", count);
//!     Ok(())
//! }
//! ```

pub mod notes;
pub mod payload;
pub mod pool;

// Re-export core types
pub use refnote_core::*;

pub use notes::{plan_append, PgNotesRepository, UpsertPlan};
pub use payload::{resolve_file_payload, FilePayload, FilesystemStore};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Notes thread repository.
    pub notes: PgNotesRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notes: PgNotesRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Ok(())
    }
}
