//! Local application state shared by the commands

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use taskboard_persistence::{Database, TokenStore};
use tracing::debug;

const DB_FILE_NAME: &str = "taskboard.db";

/// Opened settings database and the credential store loaded from it
pub struct AppState {
    pub data_dir: PathBuf,
    pub tokens: Arc<TokenStore>,
}

impl AppState {
    /// Open (or create) the settings database under `data_dir`
    pub async fn open(data_dir: PathBuf) -> Result<Self> {
        let db_path = data_dir.join(DB_FILE_NAME);
        let db = Arc::new(Database::connect(&db_path).await?);
        let tokens = Arc::new(TokenStore::load(db).await?);
        debug!("Opened settings database at {}", db_path.display());

        Ok(Self { data_dir, tokens })
    }
}

/// `<local data dir>/Taskboard`, or the working directory when the platform has none
pub fn default_data_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .map(|p| p.join("Taskboard"))
        .unwrap_or_else(|| PathBuf::from("."))
}
