//! The message-port boundary to the embedding application.
//!
//! Commands arrive on an inbound channel and are dispatched by their
//! case-insensitive type tag; successes and failures alike go back as
//! typed result messages on the outbound channel. Unknown tags are
//! ignored without a reply. Commands are processed in arrival order, so
//! a second command queues behind an in-flight one instead of displacing
//! it.
//!
//! This protocol is the only integration surface the embedding peer
//! depends on.

use log::{debug, warn};
use tokio::sync::mpsc;

use crate::service::BridgeServiceState;
use crate::types::{
    BridgeError, CommandKind, CommandMessage, PickerSelection, ResultMessage,
};

/// Default channel capacity for each direction of the port.
const PORT_CAPACITY: usize = 16;

/// Relay between the embedding peer's message port and the bridge
/// service.
pub struct PortRelay {
    inbound: mpsc::Receiver<CommandMessage>,
    outbound: mpsc::Sender<ResultMessage>,
    service: BridgeServiceState,
}

impl PortRelay {
    pub fn new(
        service: BridgeServiceState,
        inbound: mpsc::Receiver<CommandMessage>,
        outbound: mpsc::Sender<ResultMessage>,
    ) -> Self {
        Self {
            inbound,
            outbound,
            service,
        }
    }

    /// Create a relay plus the two port endpoints the embedding peer
    /// holds: a sender for commands and a receiver for results.
    pub fn channel(
        service: BridgeServiceState,
    ) -> (
        mpsc::Sender<CommandMessage>,
        mpsc::Receiver<ResultMessage>,
        Self,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(PORT_CAPACITY);
        let (res_tx, res_rx) = mpsc::channel(PORT_CAPACITY);
        (cmd_tx, res_rx, Self::new(service, cmd_rx, res_tx))
    }

    /// Process commands until the peer closes its end.
    pub async fn run(mut self) {
        while let Some(command) = self.inbound.recv().await {
            if let Some(reply) = dispatch(&self.service, command).await {
                if self.outbound.send(reply).await.is_err() {
                    warn!("Embedding peer closed the result port; stopping relay");
                    break;
                }
            }
        }
        debug!("Command port closed; relay finished");
    }
}

/// Dispatch one command. Returns the result message to send back, or
/// `None` when the command is ignored.
pub async fn dispatch(
    service: &BridgeServiceState,
    command: CommandMessage,
) -> Option<ResultMessage> {
    let Some(kind) = CommandKind::parse(&command.type_) else {
        debug!("Ignoring unknown command type '{}'", command.type_);
        return None;
    };

    let reply = match kind {
        CommandKind::Authorize => match service.lock().await.authorize().await {
            Ok(()) => ResultMessage::authorized(),
            Err(e) => ResultMessage::failed(&e),
        },
        CommandKind::ShowPicker => match service.lock().await.show_picker().await {
            Ok(PickerSelection::Picked { content, .. }) => {
                ResultMessage::file_chosen(String::from_utf8_lossy(&content).into_owned())
            }
            Ok(PickerSelection::Cancelled) => ResultMessage::picker_dismissed(),
            Err(e) => ResultMessage::failed(&e),
        },
        CommandKind::Save => match save_argument(command.argument) {
            Ok(content) => match service.lock().await.save_file(&content).await {
                Ok(file) => ResultMessage::file_saved(file.id),
                Err(e) => ResultMessage::failed(&e),
            },
            Err(e) => ResultMessage::failed(&e),
        },
    };
    Some(reply)
}

/// Extract the content bytes of a save command. A string argument is
/// taken verbatim; any other JSON value is re-serialized.
fn save_argument(argument: Option<serde_json::Value>) -> Result<Vec<u8>, BridgeError> {
    let value = argument.ok_or_else(|| BridgeError::invalid("Save command has no content"))?;
    match value {
        serde_json::Value::String(s) => Ok(s.into_bytes()),
        other => serde_json::to_vec(&other)
            .map_err(|e| BridgeError::invalid(format!("Unserializable save content: {e}"))),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
