//! Credential lookup capability used by the realtime channel handshake

/// Source of the bearer token attached to a channel handshake.
///
/// Lookups are synchronous: implementations keep whatever they need in memory.
pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Option<String>;
}

/// Fixed credential, or none at all
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(Option<String>);

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        StaticCredentials(Some(token.into()))
    }

    pub fn none() -> Self {
        StaticCredentials(None)
    }
}

impl CredentialProvider for StaticCredentials {
    fn credential(&self) -> Option<String> {
        self.0.clone().filter(|t| !t.is_empty())
    }
}

impl<T: CredentialProvider + ?Sized> CredentialProvider for std::sync::Arc<T> {
    fn credential(&self) -> Option<String> {
        (**self).credential()
    }
}
