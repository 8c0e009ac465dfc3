//! `taskboard token`: manage the stored access token

use anyhow::{Context, Result};
use clap::Subcommand;
use taskboard_core::{AuthState, AuthUser, CredentialProvider};
use taskboard_persistence::TokenStore;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum TokenAction {
    /// Store a session token for the realtime channel
    Set {
        token: String,
        /// Signed-in user as JSON: {"id","name","email","role"}
        #[arg(long)]
        user_json: Option<String>,
    },
    /// Print the token the realtime channel would use
    Show,
    /// Remove stored credentials (logout)
    Clear,
}

pub async fn run(tokens: &TokenStore, action: TokenAction) -> Result<()> {
    match action {
        TokenAction::Set { token, user_json } => {
            let user = user_json
                .map(|raw| serde_json::from_str::<AuthUser>(&raw))
                .transpose()
                .context("Invalid --user-json")?;
            tokens.save_auth_state(&AuthState::new(token, user)).await?;
            info!("Access token saved");
        }
        TokenAction::Show => match tokens.credential() {
            Some(token) => {
                println!("token: {}", mask(&token));
                if let Some(user) = tokens.auth_state().and_then(|s| s.user) {
                    println!("user:  {} <{}> ({})", user.name, user.email, user.role);
                }
            }
            None => println!("No access token stored"),
        },
        TokenAction::Clear => {
            tokens.clear().await?;
            info!("Stored credentials removed");
        }
    }
    Ok(())
}

/// Keep the first four characters, hide the rest
fn mask(token: &str) -> String {
    let shown: String = token.chars().take(4).collect();
    if shown.len() == token.len() {
        "*".repeat(token.chars().count())
    } else {
        format!("{}{}", shown, "*".repeat(8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask("abcdefghijkl"), "abcd********");
        assert_eq!(mask("abc"), "***");
    }

    #[tokio::test]
    async fn test_set_with_user_then_clear() {
        let tokens = TokenStore::in_memory();
        let user = r#"{"id":"u1","name":"Ana","email":"ana@example.com","role":"manager"}"#;

        run(
            &tokens,
            TokenAction::Set {
                token: "secret".to_string(),
                user_json: Some(user.to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(tokens.credential().as_deref(), Some("secret"));
        assert_eq!(tokens.auth_state().unwrap().user.unwrap().name, "Ana");

        run(&tokens, TokenAction::Clear).await.unwrap();
        assert!(tokens.credential().is_none());
    }

    #[tokio::test]
    async fn test_set_rejects_bad_user_json() {
        let tokens = TokenStore::in_memory();
        let result = run(
            &tokens,
            TokenAction::Set {
                token: "secret".to_string(),
                user_json: Some("{not json".to_string()),
            },
        )
        .await;

        assert!(result.is_err());
        assert!(tokens.credential().is_none());
    }
}
