//! Core types for the Drive port bridge.
//!
//! Wire types use camelCase JSON naming except the command/result message
//! envelopes, whose `type_` tag is fixed by the embedding peer's port
//! protocol.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Errors
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Error kind for bridge operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BridgeErrorKind {
    /// HTTP-level error with status code.
    HttpError(u16),
    /// The token issuer reported an error instead of a grant.
    AuthenticationFailed,
    /// Token has expired.
    TokenExpired,
    /// Permission denied.
    PermissionDenied,
    /// Picker widget failed to display or returned a malformed result.
    PickerFailed,
    /// Media content retrieval failed.
    FetchFailed,
    /// Upload failed.
    UploadFailed,
    /// Rate limit exceeded (HTTP 429).
    RateLimitExceeded,
    /// Invalid request parameter.
    InvalidParameter,
    /// Network/connectivity error.
    NetworkError,
    /// Server error (5xx).
    ServerError,
    /// Generic / unmapped error.
    Other,
}

impl std::fmt::Display for BridgeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpError(code) => write!(f, "HTTP {}", code),
            Self::AuthenticationFailed => write!(f, "AuthenticationFailed"),
            Self::TokenExpired => write!(f, "TokenExpired"),
            Self::PermissionDenied => write!(f, "PermissionDenied"),
            Self::PickerFailed => write!(f, "PickerFailed"),
            Self::FetchFailed => write!(f, "FetchFailed"),
            Self::UploadFailed => write!(f, "UploadFailed"),
            Self::RateLimitExceeded => write!(f, "RateLimitExceeded"),
            Self::InvalidParameter => write!(f, "InvalidParameter"),
            Self::NetworkError => write!(f, "NetworkError"),
            Self::ServerError => write!(f, "ServerError"),
            Self::Other => write!(f, "Other"),
        }
    }
}

/// A bridge error. Serializable so it can cross the port boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub message: String,
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for BridgeError {}

impl BridgeError {
    pub fn new(kind: BridgeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create from an HTTP status code.
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 => BridgeErrorKind::AuthenticationFailed,
            403 => BridgeErrorKind::PermissionDenied,
            429 => BridgeErrorKind::RateLimitExceeded,
            500..=599 => BridgeErrorKind::ServerError,
            _ => BridgeErrorKind::HttpError(status),
        };
        Self::new(kind, body.chars().take(500).collect::<String>())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::AuthenticationFailed, msg)
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::InvalidParameter, msg)
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::new(BridgeErrorKind::NetworkError, msg)
    }
}

/// Convenience type alias.
pub type BridgeResult<T> = Result<T, BridgeError>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  OAuth2
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Google OAuth2 scopes used by the bridge.
pub mod scopes {
    /// Per-file access to files created or opened by the app.
    pub const DRIVE_FILE: &str = "https://www.googleapis.com/auth/drive.file";
}

/// An active OAuth2 access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Bearer access token.
    pub access_token: String,
    /// Token type (usually "Bearer").
    pub token_type: String,
    /// Expiry time, when the issuer reported one.
    pub expires_at: Option<DateTime<Utc>>,
    /// Granted scopes.
    pub scope: Option<String>,
}

impl Default for AccessToken {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            token_type: "Bearer".to_string(),
            expires_at: None,
            scope: None,
        }
    }
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => Utc::now() >= exp,
            None => false,
        }
    }
}

/// Raw grant as reported by the token issuer SDK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub scope: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Configuration
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
    /// OAuth2 client ID (application identifier).
    pub client_id: String,
    /// API developer key (application key), passed to the picker widget.
    pub api_key: String,
    /// Requested scopes.
    pub scopes: Vec<String>,
    /// Parent folder for uploaded files.
    pub upload_parent: String,
    /// Request timeout (seconds).
    pub timeout_seconds: u64,
    /// Maximum retries for transient failures.
    pub max_retries: u32,
    /// Rate-limit delay between requests (ms).
    pub rate_limit_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            api_key: String::new(),
            scopes: vec![scopes::DRIVE_FILE.to_string()],
            upload_parent: "root".to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            rate_limit_ms: 100,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Port messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Command received from the embedding peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandMessage {
    pub type_: String,
    #[serde(default)]
    pub argument: Option<serde_json::Value>,
}

impl CommandMessage {
    pub fn new(type_: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            argument: None,
        }
    }

    pub fn with_argument(type_: impl Into<String>, argument: serde_json::Value) -> Self {
        Self {
            type_: type_.into(),
            argument: Some(argument),
        }
    }
}

/// Recognized command tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Authorize,
    ShowPicker,
    Save,
}

impl CommandKind {
    /// Parse a command tag, case-insensitively. Unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "authorize" => Some(Self::Authorize),
            "showpicker" => Some(Self::ShowPicker),
            "save" => Some(Self::Save),
            _ => None,
        }
    }
}

/// Result tag sent back to the embedding peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    Authorized,
    FileChosen,
    FileSaved,
    PickerDismissed,
    Failed,
}

/// Result sent to the embedding peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultMessage {
    pub type_: ResultKind,
    pub argument: Option<String>,
}

impl ResultMessage {
    pub fn authorized() -> Self {
        Self {
            type_: ResultKind::Authorized,
            argument: None,
        }
    }

    pub fn file_chosen(content: impl Into<String>) -> Self {
        Self {
            type_: ResultKind::FileChosen,
            argument: Some(content.into()),
        }
    }

    pub fn file_saved(file_id: impl Into<String>) -> Self {
        Self {
            type_: ResultKind::FileSaved,
            argument: Some(file_id.into()),
        }
    }

    pub fn picker_dismissed() -> Self {
        Self {
            type_: ResultKind::PickerDismissed,
            argument: None,
        }
    }

    /// Wrap a failure so the peer can render feedback. The argument is the
    /// serialized error, falling back to its display form.
    pub fn failed(error: &BridgeError) -> Self {
        let argument = serde_json::to_string(error).unwrap_or_else(|_| error.to_string());
        Self {
            type_: ResultKind::Failed,
            argument: Some(argument),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Picker
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A document reference extracted from a picker result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickedDocument {
    /// Remote file ID.
    pub id: String,
    /// Remote file URL.
    pub url: String,
}

impl PickedDocument {
    /// The legacy no-selection sentinel (id `-1`, url `"nothing"`), kept
    /// for peers that still expect it alongside the explicit cancelled
    /// outcome.
    pub fn none() -> Self {
        Self {
            id: "-1".to_string(),
            url: "nothing".to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.id == "-1" && self.url == "nothing"
    }
}

/// Action reported by the picker widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PickerAction {
    Picked,
    Cancelled,
    Loaded,
}

/// Structured result delivered by the picker widget's completion callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerResponse {
    pub action: PickerAction,
    #[serde(default)]
    pub documents: Vec<PickedDocument>,
}

/// Display mode for the document-selection view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PickerViewMode {
    List,
    Grid,
}

/// Configuration handed to the picker widget when it is displayed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerView {
    /// MIME-type filter for selectable documents.
    pub mime_types: Vec<String>,
    /// Display mode.
    pub mode: PickerViewMode,
    /// Whether the navigation pane is hidden.
    pub nav_hidden: bool,
    /// Fresh OAuth token for the widget.
    pub oauth_token: String,
    /// Application developer key.
    pub developer_key: String,
}

/// Outcome of a picker flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerSelection {
    /// A document was picked and its content retrieved.
    Picked {
        document: PickedDocument,
        content: Vec<u8>,
    },
    /// The user dismissed the picker without choosing. A valid outcome,
    /// not a failure.
    Cancelled,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Files
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Subset of the Drive v3 file resource returned by the upload endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
