//! Central service façade for the Drive bridge.
//!
//! Owns the HTTP client, the token manager, the SDK readiness gates, and
//! the injected SDK seams, behind a single `BridgeService` struct shared
//! as `Arc<Mutex<_>>` state. The service is the one place the session
//! token is written, which keeps the picker and upload paths reading the
//! same credential.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::auth::TokenManager;
use crate::client::DriveClient;
use crate::picker;
use crate::sdk::{MediaSource, PickerWidget, Sdk, SdkGate, TokenIssuer};
use crate::types::{BridgeConfig, BridgeResult, DriveFile, PickerSelection};
use crate::uploads;

/// Thread-safe shared service state.
pub type BridgeServiceState = Arc<Mutex<BridgeService>>;

/// The core bridge service combining client, session, and SDK seams.
pub struct BridgeService {
    /// HTTP client with auth.
    client: DriveClient,
    /// Single-session token lifecycle.
    tokens: TokenManager,
    /// Per-SDK readiness gates.
    gate: SdkGate,
    /// Token issuer SDK.
    issuer: Arc<dyn TokenIssuer>,
    /// Picker widget SDK.
    picker: Arc<dyn PickerWidget>,
    /// Content retrieval transport.
    media: Arc<dyn MediaSource>,
}

impl BridgeService {
    /// Create a new service wrapped in `Arc<Mutex<_>>`. Content retrieval
    /// goes through the service's own HTTP client.
    pub fn new(
        config: BridgeConfig,
        issuer: Arc<dyn TokenIssuer>,
        picker: Arc<dyn PickerWidget>,
    ) -> BridgeResult<BridgeServiceState> {
        let client = DriveClient::new(config)?;
        let media: Arc<dyn MediaSource> = Arc::new(client.clone());
        Ok(Arc::new(Mutex::new(Self {
            client,
            tokens: TokenManager::new(),
            gate: SdkGate::new(),
            issuer,
            picker,
            media,
        })))
    }

    /// Create with an explicit media transport (tests, alternative fetch
    /// paths).
    pub fn with_media_source(
        config: BridgeConfig,
        issuer: Arc<dyn TokenIssuer>,
        picker: Arc<dyn PickerWidget>,
        media: Arc<dyn MediaSource>,
    ) -> BridgeResult<BridgeServiceState> {
        let client = DriveClient::new(config)?;
        Ok(Arc::new(Mutex::new(Self {
            client,
            tokens: TokenManager::new(),
            gate: SdkGate::new(),
            issuer,
            picker,
            media,
        })))
    }

    // ── SDK loading ──────────────────────────────────────────────

    /// A clone of the readiness gates, for the embedding bootstrap to
    /// signal SDK loads on.
    pub fn gate(&self) -> SdkGate {
        self.gate.clone()
    }

    /// Mark an SDK as loaded.
    pub fn mark_sdk_ready(&self, sdk: Sdk) {
        self.gate.mark_ready(sdk);
    }

    // ── Auth ─────────────────────────────────────────────────────

    /// Establish or refresh the delegated session. Interactive on the
    /// first grant, silent afterwards.
    pub async fn authorize(&mut self) -> BridgeResult<()> {
        self.gate.wait(Sdk::Auth).await?;
        let token = self.tokens.request_token(self.issuer.as_ref()).await?;
        self.client.set_token(token);
        Ok(())
    }

    /// Whether a session token is currently held.
    pub fn is_authorized(&self) -> bool {
        self.tokens.has_session()
    }

    /// Revoke the session server-side and clear all local auth state.
    pub async fn revoke(&mut self) -> BridgeResult<()> {
        self.tokens.revoke(&self.client).await?;
        self.client.clear_token();
        Ok(())
    }

    // ── Picker ───────────────────────────────────────────────────

    /// Run the picker flow and return the selection.
    pub async fn show_picker(&mut self) -> BridgeResult<PickerSelection> {
        let selection = picker::show_picker(
            &self.gate,
            &mut self.tokens,
            self.issuer.as_ref(),
            self.picker.as_ref(),
            self.media.as_ref(),
            self.client.config(),
        )
        .await?;

        // The silent refresh replaced the session token; keep the client
        // on the same credential for subsequent uploads.
        if let Some(token) = self.tokens.current() {
            self.client.set_token(token.clone());
        }
        Ok(selection)
    }

    // ── Uploads ──────────────────────────────────────────────────

    /// Save content to Drive as a dated route file.
    pub async fn save_file(&mut self, content: &[u8]) -> BridgeResult<DriveFile> {
        self.gate.wait(Sdk::Client).await?;
        uploads::upload_json(&self.client, content, Utc::now()).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::TokenPrompt;
    use crate::types::{
        PickerAction, PickerResponse, PickerView, PickedDocument, TokenGrant,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct RecordingIssuer {
        prompts: StdMutex<Vec<TokenPrompt>>,
    }

    impl RecordingIssuer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                prompts: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl TokenIssuer for RecordingIssuer {
        async fn request_access_token(&self, prompt: TokenPrompt) -> BridgeResult<TokenGrant> {
            self.prompts.lock().unwrap().push(prompt);
            Ok(TokenGrant {
                access_token: "ya29.svc".into(),
                token_type: Some("Bearer".into()),
                expires_in: Some(3600),
                scope: None,
            })
        }
    }

    struct StubWidget {
        response: PickerResponse,
        displays: AtomicUsize,
    }

    impl StubWidget {
        fn cancelled() -> Arc<Self> {
            Arc::new(Self {
                response: PickerResponse {
                    action: PickerAction::Cancelled,
                    documents: vec![],
                },
                displays: AtomicUsize::new(0),
            })
        }

        fn picked(id: &str) -> Arc<Self> {
            Arc::new(Self {
                response: PickerResponse {
                    action: PickerAction::Picked,
                    documents: vec![PickedDocument {
                        id: id.into(),
                        url: "u".into(),
                    }],
                },
                displays: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PickerWidget for StubWidget {
        async fn display(&self, _view: PickerView) -> BridgeResult<PickerResponse> {
            self.displays.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    struct StubMedia;

    #[async_trait]
    impl MediaSource for StubMedia {
        async fn fetch_media(&self, _file_id: &str, _token: &str) -> BridgeResult<Vec<u8>> {
            Ok(br#"{"a":1}"#.to_vec())
        }
    }

    fn test_service(widget: Arc<StubWidget>) -> (BridgeServiceState, Arc<RecordingIssuer>) {
        let issuer = RecordingIssuer::new();
        let state = BridgeService::with_media_source(
            BridgeConfig::default(),
            issuer.clone(),
            widget,
            Arc::new(StubMedia),
        )
        .unwrap();
        (state, issuer)
    }

    fn open_all_gates(service: &BridgeService) {
        service.mark_sdk_ready(Sdk::Auth);
        service.mark_sdk_ready(Sdk::Picker);
        service.mark_sdk_ready(Sdk::Client);
    }

    #[tokio::test]
    async fn authorize_prompts_then_goes_silent() {
        let (state, issuer) = test_service(StubWidget::cancelled());
        let mut svc = state.lock().await;
        open_all_gates(&svc);

        assert!(!svc.is_authorized());
        svc.authorize().await.unwrap();
        assert!(svc.is_authorized());
        svc.authorize().await.unwrap();

        assert_eq!(
            *issuer.prompts.lock().unwrap(),
            vec![TokenPrompt::Consent, TokenPrompt::Silent]
        );
    }

    #[tokio::test]
    async fn show_picker_returns_selection_and_keeps_session() {
        let (state, _issuer) = test_service(StubWidget::picked("abc"));
        let mut svc = state.lock().await;
        open_all_gates(&svc);

        let selection = svc.show_picker().await.unwrap();
        match selection {
            PickerSelection::Picked { document, content } => {
                assert_eq!(document.id, "abc");
                assert_eq!(content, br#"{"a":1}"#.to_vec());
            }
            other => panic!("expected a picked selection, got {:?}", other),
        }
        assert!(svc.is_authorized());
        assert!(svc.client.is_authenticated());
    }

    #[tokio::test]
    async fn show_picker_cancelled_is_not_an_error() {
        let widget = StubWidget::cancelled();
        let (state, _issuer) = test_service(widget.clone());
        let mut svc = state.lock().await;
        open_all_gates(&svc);

        let selection = svc.show_picker().await.unwrap();
        assert_eq!(selection, PickerSelection::Cancelled);
        assert_eq!(widget.displays.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn authorize_waits_for_auth_sdk_gate() {
        let (state, _issuer) = test_service(StubWidget::cancelled());
        // Gate clone taken up front: authorize() holds the service lock
        // while it waits, so the ready signal must arrive out-of-band.
        let gate = state.lock().await.gate();

        let state2 = state.clone();
        let handle = tokio::spawn(async move {
            let mut svc = state2.lock().await;
            svc.authorize().await
        });

        tokio::task::yield_now().await;
        assert!(!handle.is_finished());

        gate.mark_ready(Sdk::Auth);
        handle.await.unwrap().unwrap();
        assert!(state.lock().await.is_authorized());
    }

    #[tokio::test]
    async fn revoke_clears_local_state_without_session() {
        let (state, _issuer) = test_service(StubWidget::cancelled());
        let mut svc = state.lock().await;
        open_all_gates(&svc);

        // No session held — revoke is a local no-op.
        svc.revoke().await.unwrap();
        assert!(!svc.is_authorized());
        assert!(!svc.client.is_authenticated());
    }
}
