//! AsyncDirStorage-based SessionRepository implementation.

use crate::dto::create_session_migrator;
use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use tokio::fs;
use version_migrate::{
    AppPaths, AsyncDirStorage, DirStorageStrategy, FilenameEncoding, FormatStrategy,
    MigrationError, PathStrategy,
};
use wenshu_core::error::Result;
use wenshu_core::session::{Session, SessionRepository};

const ENTITY_NAME: &str = "session";

/// Stores each session as a versioned JSON file.
///
/// Directory structure:
/// ```text
/// base_dir/
/// └── sessions/
///     ├── <session-id-1>.json
///     └── <session-id-2>.json
/// ```
///
/// Files written by older versions are migrated to the current schema when
/// they are loaded.
pub struct AsyncDirSessionRepository {
    storage: AsyncDirStorage,
}

impl AsyncDirSessionRepository {
    /// Creates a repository at the default location (`~/.config/wenshu`).
    pub async fn default_location() -> anyhow::Result<Self> {
        use crate::paths::WenshuPaths;
        let base_dir = WenshuPaths::config_dir()
            .map_err(|e| anyhow::anyhow!("Failed to get config directory: {}", e))?;
        Self::new(base_dir).await
    }

    /// Creates a repository under `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the storage
    /// cannot be initialized.
    pub async fn new(base_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)
            .await
            .context("Failed to create base directory")?;

        let paths = AppPaths::new("wenshu").data_strategy(PathStrategy::CustomBase(base_dir));
        let migrator = create_session_migrator().context("Failed to build session migrator")?;
        let strategy = DirStorageStrategy::default()
            .with_format(FormatStrategy::Json)
            .with_filename_encoding(FilenameEncoding::Direct);

        let storage = AsyncDirStorage::new(paths, "sessions", migrator, strategy)
            .await
            .context("Failed to create AsyncDirStorage")?;

        Ok(Self { storage })
    }

    /// The directory the session files live in.
    pub fn sessions_dir(&self) -> &Path {
        self.storage.base_path()
    }
}

/// Whether `err` means the session file does not exist.
fn is_missing(err: &MigrationError) -> bool {
    if matches!(err, MigrationError::EntityNotFound(_)) {
        return true;
    }
    let message = err.to_string();
    message.contains("No such file or directory")
        || message.contains("not found")
        || message.contains("cannot find")
}

#[async_trait]
impl SessionRepository for AsyncDirSessionRepository {
    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        match self.storage.load::<Session>(ENTITY_NAME, session_id).await {
            Ok(session) => Ok(Some(session)),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, session: &Session) -> Result<()> {
        self.storage.save(ENTITY_NAME, &session.id, session).await?;
        tracing::debug!("[SessionStore] Saved session {}", session.id);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        match self.storage.delete(session_id).await {
            Ok(()) => Ok(()),
            Err(e) if is_missing(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .storage
            .load_all::<Session>(ENTITY_NAME)
            .await?
            .into_iter()
            .map(|(_id, session)| session)
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }
}
