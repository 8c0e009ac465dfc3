//! Stored authentication session

use serde::{Deserialize, Serialize};

/// Signed-in user, as stored alongside the token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Persisted session entry (`authState` key)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    #[serde(default)]
    pub user: Option<AuthUser>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

impl AuthState {
    pub fn new(token: impl Into<String>, user: Option<AuthUser>) -> Self {
        Self {
            user,
            token: Some(token.into()),
            is_authenticated: true,
        }
    }

    /// Token if present and non-empty
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stored_state() {
        let raw = r#"{"user":{"id":"u1","name":"Ana","email":"ana@example.com","role":"manager"},
                      "token":"abc","loading":false,"error":null,"isAuthenticated":true}"#;
        let state: AuthState = serde_json::from_str(raw).unwrap();

        assert_eq!(state.bearer(), Some("abc"));
        assert_eq!(state.user.unwrap().role, "manager");
        assert!(state.is_authenticated);
    }

    #[test]
    fn test_empty_token_is_absent() {
        let state: AuthState = serde_json::from_str(r#"{"token":""}"#).unwrap();
        assert_eq!(state.bearer(), None);

        let state: AuthState = serde_json::from_str(r#"{"token":null}"#).unwrap();
        assert_eq!(state.bearer(), None);
    }
}
