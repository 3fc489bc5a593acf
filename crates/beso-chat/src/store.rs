//! Username/password store over SQLite.
//!
//! Passwords are stored and returned in plaintext so that `recover` can
//! disclose them; this matches the assistant's account-recovery flow and is
//! not suitable for real credentials.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use thiserror::Error;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        password TEXT NOT NULL
    );
";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to create store directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub struct CredentialStore {
    conn: Connection,
}

impl CredentialStore {
    /// Open (or create) the store at `path`, creating parent directories
    /// and the `users` table as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        tracing::info!(path = %path.display(), "credential store opened");
        Self::init(conn)
    }

    /// Private in-memory store, gone when dropped.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Add a user. Returns `false` when the username is already taken.
    pub fn register(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2)",
            params![username, password],
        );

        match inserted {
            Ok(_) => {
                tracing::info!(username, "user registered");
                Ok(true)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                tracing::debug!(username, "registration rejected: username taken");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// True iff a user with exactly this username and password exists.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE username = ?1 AND password = ?2",
                params![username, password],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Stored password for `username`, or `None` if there is no such user.
    pub fn recover(&self, username: &str) -> Result<Option<String>, StoreError> {
        let password = self
            .conn
            .query_row(
                "SELECT password FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .optional()?;
        Ok(password)
    }
}
