//! Picker orchestration: token refresh, view construction, outcome
//! interpretation, and content retrieval for the chosen document.

use log::{debug, info};

use crate::auth::TokenManager;
use crate::sdk::{MediaSource, PickerWidget, Sdk, SdkGate, TokenIssuer};
use crate::types::{
    BridgeConfig, BridgeError, BridgeErrorKind, BridgeResult, PickerAction, PickerResponse,
    PickerSelection, PickerView, PickerViewMode, PickedDocument,
};

/// MIME filter applied to the document-selection view.
pub const PICKER_MIME_FILTER: &str = "application/json";

/// Build the document-selection view for a fresh token: list mode, JSON
/// mime filter, hidden navigation pane, developer key from config.
pub fn build_view(config: &BridgeConfig, oauth_token: &str) -> PickerView {
    PickerView {
        mime_types: vec![PICKER_MIME_FILTER.to_string()],
        mode: PickerViewMode::List,
        nav_hidden: true,
        oauth_token: oauth_token.to_string(),
        developer_key: config.api_key.clone(),
    }
}

/// Interpret the widget's completion callback. Only `Picked` selects a
/// document, and only the first one; everything else is a dismissal.
pub fn interpret(response: PickerResponse) -> BridgeResult<Option<PickedDocument>> {
    match response.action {
        PickerAction::Picked => {
            let doc = response.documents.into_iter().next().ok_or_else(|| {
                BridgeError::new(
                    BridgeErrorKind::PickerFailed,
                    "Picker reported a pick with no documents",
                )
            })?;
            Ok(Some(doc))
        }
        _ => Ok(None),
    }
}

/// Run the full picker flow: await the SDK gates, refresh the session
/// silently, display the view, and fetch the chosen document's content.
///
/// Dismissal is a valid outcome, not an error. A fetch failure surfaces
/// as [`BridgeErrorKind::FetchFailed`].
pub async fn show_picker(
    gate: &SdkGate,
    tokens: &mut TokenManager,
    issuer: &dyn TokenIssuer,
    widget: &dyn PickerWidget,
    media: &dyn MediaSource,
    config: &BridgeConfig,
) -> BridgeResult<PickerSelection> {
    gate.wait_all(&[Sdk::Auth, Sdk::Picker]).await?;

    let token = tokens.refresh_silent(issuer).await?;
    let view = build_view(config, &token.access_token);
    let response = widget.display(view).await?;

    let Some(document) = interpret(response)? else {
        debug!("Picker dismissed without a selection");
        return Ok(PickerSelection::Cancelled);
    };

    gate.wait(Sdk::Client).await?;
    debug!("Fetching content of picked file {}", document.id);
    let content = media
        .fetch_media(&document.id, &token.access_token)
        .await
        .map_err(|e| {
            BridgeError::new(
                BridgeErrorKind::FetchFailed,
                format!("Content retrieval for '{}' failed: {}", document.id, e),
            )
        })?;

    info!("Picked file {} ({} bytes)", document.id, content.len());
    Ok(PickerSelection::Picked { document, content })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
