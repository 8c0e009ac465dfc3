//! Token store backing the realtime channel's credential lookup
//!
//! Keeps an in-memory mirror of the auth entries of the settings table so
//! that credential lookups never touch the database. Writes go to the
//! database first, then to the mirror.

use crate::sqlite;
use crate::Database;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use taskboard_core::{AuthState, CredentialProvider, Result};
use tracing::{debug, instrument, warn};

/// Structured session entry (JSON-encoded [`AuthState`])
pub const AUTH_STATE_KEY: &str = "authState";
/// Plain bearer token entry
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Write-through credential store
pub struct TokenStore {
    entries: RwLock<HashMap<String, String>>,
    db: Option<Arc<Database>>,
}

impl TokenStore {
    /// Create a store that lives only in memory
    pub fn in_memory() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            db: None,
        }
    }

    /// Load the auth entries from the settings table
    #[instrument(skip(db))]
    pub async fn load(db: Arc<Database>) -> Result<Self> {
        let mut entries = HashMap::new();
        for key in [AUTH_STATE_KEY, ACCESS_TOKEN_KEY] {
            if let Some(value) = sqlite::get_setting(db.pool(), key).await? {
                entries.insert(key.to_string(), value);
            }
        }
        debug!("Token store loaded {} entries", entries.len());

        Ok(Self {
            entries: RwLock::new(entries),
            db: Some(db),
        })
    }

    /// Persist a session entry
    #[instrument(skip(self, state))]
    pub async fn save_auth_state(&self, state: &AuthState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.put(AUTH_STATE_KEY, json).await
    }

    /// Persist a plain bearer token
    #[instrument(skip(self, token))]
    pub async fn set_access_token(&self, token: &str) -> Result<()> {
        self.put(ACCESS_TOKEN_KEY, token.to_string()).await
    }

    /// Remove both auth entries (logout)
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        if let Some(ref db) = self.db {
            sqlite::delete_setting(db.pool(), AUTH_STATE_KEY).await?;
            sqlite::delete_setting(db.pool(), ACCESS_TOKEN_KEY).await?;
        }
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(AUTH_STATE_KEY);
        entries.remove(ACCESS_TOKEN_KEY);
        Ok(())
    }

    /// Decoded session entry, if present and well-formed
    pub fn auth_state(&self) -> Option<AuthState> {
        let raw = self.get(AUTH_STATE_KEY)?;
        serde_json::from_str(&raw).ok()
    }

    fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        if let Some(ref db) = self.db {
            sqlite::set_setting(db.pool(), key, &value).await?;
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }
}

impl CredentialProvider for TokenStore {
    fn credential(&self) -> Option<String> {
        resolve_credential(
            self.get(AUTH_STATE_KEY).as_deref(),
            self.get(ACCESS_TOKEN_KEY).as_deref(),
        )
    }
}

/// Pick the handshake token: the session entry's token first, then the plain entry.
///
/// A session entry that fails to decode, or whose token is empty, falls
/// through to the plain entry.
pub fn resolve_credential(auth_state: Option<&str>, access_token: Option<&str>) -> Option<String> {
    let from_state = auth_state.and_then(|raw| match serde_json::from_str::<AuthState>(raw) {
        Ok(state) => state.bearer().map(str::to_string),
        Err(e) => {
            warn!("Ignoring malformed {} entry: {}", AUTH_STATE_KEY, e);
            None
        }
    });

    from_state.or_else(|| {
        access_token
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}
