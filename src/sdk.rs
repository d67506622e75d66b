//! SDK loader glue and the seams to the browser-injected SDKs.
//!
//! The auth and picker SDKs load asynchronously and in unspecified
//! relative order. Each one gets a write-once readiness gate that
//! dependent operations await before issuing any SDK call, so an early
//! command can never race an unloaded SDK.
//!
//! The SDKs themselves are external collaborators and appear here only as
//! trait objects: [`TokenIssuer`] (token issuance), [`PickerWidget`]
//! (document selection UI), and [`MediaSource`] (file content retrieval).

use async_trait::async_trait;
use log::debug;
use tokio::sync::watch;

use crate::types::{
    BridgeError, BridgeErrorKind, BridgeResult, PickerResponse, PickerView, TokenGrant,
};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Readiness gates
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The independently-loaded external SDKs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sdk {
    /// Token issuer (identity services).
    Auth,
    /// File picker widget.
    Picker,
    /// API client used for content retrieval and uploads.
    Client,
}

impl std::fmt::Display for Sdk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auth => write!(f, "auth"),
            Self::Picker => write!(f, "picker"),
            Self::Client => write!(f, "client"),
        }
    }
}

/// One awaitable, write-once readiness signal per SDK.
#[derive(Clone)]
pub struct SdkGate {
    auth: watch::Sender<bool>,
    picker: watch::Sender<bool>,
    client: watch::Sender<bool>,
}

impl SdkGate {
    pub fn new() -> Self {
        Self {
            auth: watch::channel(false).0,
            picker: watch::channel(false).0,
            client: watch::channel(false).0,
        }
    }

    fn sender(&self, sdk: Sdk) -> &watch::Sender<bool> {
        match sdk {
            Sdk::Auth => &self.auth,
            Sdk::Picker => &self.picker,
            Sdk::Client => &self.client,
        }
    }

    /// Mark an SDK as loaded. Write-once: repeated marks are ignored.
    pub fn mark_ready(&self, sdk: Sdk) {
        let sender = self.sender(sdk);
        if *sender.borrow() {
            debug!("{} SDK marked ready more than once", sdk);
            return;
        }
        // send_replace: delivery must not depend on a receiver existing yet.
        sender.send_replace(true);
        debug!("{} SDK ready", sdk);
    }

    /// Whether an SDK has finished loading.
    pub fn is_ready(&self, sdk: Sdk) -> bool {
        *self.sender(sdk).borrow()
    }

    /// Wait until an SDK has finished loading.
    pub async fn wait(&self, sdk: Sdk) -> BridgeResult<()> {
        let mut rx = self.sender(sdk).subscribe();
        rx.wait_for(|ready| *ready).await.map_err(|_| {
            BridgeError::new(
                BridgeErrorKind::Other,
                format!("{} SDK gate closed before it became ready", sdk),
            )
        })?;
        Ok(())
    }

    /// Wait until every listed SDK has finished loading.
    pub async fn wait_all(&self, sdks: &[Sdk]) -> BridgeResult<()> {
        for sdk in sdks {
            self.wait(*sdk).await?;
        }
        Ok(())
    }

    /// Run an SDK load task in the background and open the gate when it
    /// completes.
    pub fn attach_loader<F>(&self, sdk: Sdk, load: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let gate = self.clone();
        tokio::spawn(async move {
            load.await;
            gate.mark_ready(sdk);
        });
    }
}

impl Default for SdkGate {
    fn default() -> Self {
        Self::new()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SDK seams
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How a token request is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPrompt {
    /// Show the account chooser and consent dialog.
    Consent,
    /// Reuse the existing browser session without UI.
    Silent,
}

impl TokenPrompt {
    /// Prompt value understood by the identity services SDK.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consent => "consent",
            Self::Silent => "",
        }
    }
}

/// Token issuer SDK. Each call resolves independently with its own grant
/// or error; there is no shared completion slot.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn request_access_token(&self, prompt: TokenPrompt) -> BridgeResult<TokenGrant>;
}

/// File picker widget SDK.
#[async_trait]
pub trait PickerWidget: Send + Sync {
    /// Display the picker and resolve with the user's action.
    async fn display(&self, view: PickerView) -> BridgeResult<PickerResponse>;
}

/// Content retrieval for a picked file. The token is passed explicitly so
/// the fetch always uses the session that was just refreshed.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn fetch_media(&self, file_id: &str, access_token: &str) -> BridgeResult<Vec<u8>>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
