//! OAuth2 token lifecycle for the bridge.
//!
//! One live session at a time: a granted request replaces the stored
//! token, an issuer error leaves it untouched, and sign-out revokes it
//! server-side and clears local state. Issuance is promise-per-call;
//! every caller awaits its own grant, so concurrent requests cannot
//! discard each other's continuation.

use chrono::{Duration, Utc};
use log::debug;

use crate::client::{DriveClient, REVOKE_URL};
use crate::sdk::{TokenIssuer, TokenPrompt};
use crate::types::{AccessToken, BridgeErrorKind, BridgeResult, TokenGrant};

/// Owns the single OAuth2 session token.
#[derive(Default)]
pub struct TokenManager {
    token: Option<AccessToken>,
}

impl TokenManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a session token is currently held.
    pub fn has_session(&self) -> bool {
        self.token.is_some()
    }

    /// The current token, if any.
    pub fn current(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Request a token. Silent when a session already exists, consent
    /// prompt when establishing a new one.
    pub async fn request_token(&mut self, issuer: &dyn TokenIssuer) -> BridgeResult<AccessToken> {
        let prompt = if self.token.is_some() {
            // Skip the account chooser and consent dialog for an existing
            // session.
            TokenPrompt::Silent
        } else {
            TokenPrompt::Consent
        };
        self.issue(issuer, prompt).await
    }

    /// Non-interactive refresh. Assumes a browser session already exists
    /// from prior authorization; never shows a consent prompt.
    pub async fn refresh_silent(&mut self, issuer: &dyn TokenIssuer) -> BridgeResult<AccessToken> {
        self.issue(issuer, TokenPrompt::Silent).await
    }

    async fn issue(
        &mut self,
        issuer: &dyn TokenIssuer,
        prompt: TokenPrompt,
    ) -> BridgeResult<AccessToken> {
        debug!("Requesting access token (prompt: {:?})", prompt);
        // On error the stored token is left exactly as it was.
        let grant = issuer.request_access_token(prompt).await?;
        let token = token_from_grant(grant);
        self.token = Some(token.clone());
        Ok(token)
    }

    /// Revoke the current token server-side and clear local state. No-op
    /// when no token is held.
    pub async fn revoke(&mut self, client: &DriveClient) -> BridgeResult<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };

        debug!("Revoking access token");
        let params = [("token", token.access_token.as_str())];
        let _: serde_json::Value = client
            .post_form_unauthenticated(REVOKE_URL, &params)
            .await
            .or_else(|e| {
                // Revocation endpoint may return 200 with an empty body.
                if matches!(e.kind, BridgeErrorKind::NetworkError) {
                    Ok(serde_json::Value::Null)
                } else {
                    Err(e)
                }
            })?;
        Ok(())
    }
}

/// Convert the raw issuer grant to our token type.
fn token_from_grant(grant: TokenGrant) -> AccessToken {
    let expires_at = grant.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
    AccessToken {
        access_token: grant.access_token,
        token_type: grant.token_type.unwrap_or_else(|| "Bearer".into()),
        expires_at,
        scope: grant.scope,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
