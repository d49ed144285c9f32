//! Wire messages exchanged with the remote signer
//!
//! Outbound commands are wrapped in an [`Envelope`]. Inbound data is untrusted
//! JSON until [`ParsedMessage::parse`] turns it into a closed [`InboundMessage`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{EmbedError, OperationKind};

pub const TOPIC_CONNECT: &str = "websig:connect";
pub const TOPIC_SIGN_TRANSACTION: &str = "websig:signTransaction";
pub const TOPIC_CONNECTED: &str = "websig:connected";
pub const TOPIC_REJECTED: &str = "websig:rejected";
pub const TOPIC_ERROR: &str = "websig:error";
pub const TOPIC_FALLBACK_TO_POPUP: &str = "websig:fallback_to_popup";
/// Only ever posted by the host page to itself
pub const TOPIC_CLOSE_DIALOG: &str = "websig:close_dialog";

pub const METHOD_SHOW_IFRAME: &str = "show-iframe";
pub const METHOD_HIDE_IFRAME: &str = "hide-iframe";

/// Unique, time ordered id for an outbound envelope or handshake
pub fn new_message_id() -> String {
    Uuid::now_v7().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: String,
    pub topic: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(command: &OutboundCommand) -> Result<Self, EmbedError> {
        Ok(Envelope {
            id: new_message_id(),
            topic: command.topic().to_string(),
            payload: command.payload()?,
        })
    }

    /// The self-addressed message used by the escape key and backdrop handlers
    pub fn close_dialog() -> Self {
        Envelope {
            id: new_message_id(),
            topic: TOPIC_CLOSE_DIALOG.to_string(),
            payload: Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    Connect {
        origin: String,
        name: String,
        seamless: bool,
    },
    SignTransaction {
        transaction: String,
    },
}

#[derive(Serialize)]
struct ConnectPayload<'a> {
    origin: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    seamless: bool,
}

#[derive(Serialize)]
struct SignTransactionPayload<'a> {
    transaction: &'a str,
}

impl OutboundCommand {
    pub fn topic(&self) -> &'static str {
        match self {
            OutboundCommand::Connect { .. } => TOPIC_CONNECT,
            OutboundCommand::SignTransaction { .. } => TOPIC_SIGN_TRANSACTION,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            OutboundCommand::Connect { .. } => OperationKind::Connect,
            OutboundCommand::SignTransaction { .. } => OperationKind::Sign,
        }
    }

    fn payload(&self) -> Result<Value, EmbedError> {
        let value = match self {
            OutboundCommand::Connect {
                origin,
                name,
                seamless,
            } => serde_json::to_value(ConnectPayload {
                origin,
                name,
                seamless: *seamless,
            })?,
            OutboundCommand::SignTransaction { transaction } => {
                serde_json::to_value(SignTransactionPayload { transaction })?
            }
        };
        Ok(value)
    }
}

/// Every inbound message the router knows how to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Connected { public_key: String },
    Rejected,
    Error { error: String, kind: String },
    FallbackToPopup,
    CloseDialog,
    ShowIframe,
    HideIframe,
    Unknown { topic: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    /// Echo of the outbound envelope id, when the signer sends one
    pub id: Option<String>,
    pub message: InboundMessage,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    id: Value,
    topic: Option<String>,
    method: Option<String>,
    #[serde(default)]
    payload: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedPayload {
    public_key: String,
}

/// Error replies are never rejected, whatever shape the signer sends
fn error_of(payload: &Value) -> InboundMessage {
    let error = match payload.get("error") {
        Some(Value::String(error)) => error.clone(),
        Some(Value::Null) | None => String::from("unknown error"),
        Some(other) => other.to_string(),
    };
    let kind = payload
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string();
    InboundMessage::Error { error, kind }
}

fn payload_of<T: for<'de> Deserialize<'de>>(topic: &str, payload: Value) -> Result<T, EmbedError> {
    serde_json::from_value(payload)
        .map_err(|e| EmbedError::MalformedMessage(format!("{} payload: {}", topic, e)))
}

impl ParsedMessage {
    pub fn parse(data: &Value) -> Result<Self, EmbedError> {
        if !data.is_object() {
            return Err(EmbedError::MalformedMessage(format!(
                "expected an object, got {}",
                data
            )));
        }
        let raw: RawMessage = serde_json::from_value(data.clone())
            .map_err(|e| EmbedError::MalformedMessage(e.to_string()))?;

        let message = match raw.topic.as_deref() {
            Some(TOPIC_CONNECTED) => {
                let payload: ConnectedPayload = payload_of(TOPIC_CONNECTED, raw.payload)?;
                if payload.public_key.is_empty() {
                    return Err(EmbedError::MalformedMessage(
                        "publicKey cannot be empty".into(),
                    ));
                }
                InboundMessage::Connected {
                    public_key: payload.public_key,
                }
            }
            Some(TOPIC_REJECTED) => InboundMessage::Rejected,
            Some(TOPIC_ERROR) => error_of(&raw.payload),
            Some(TOPIC_FALLBACK_TO_POPUP) => InboundMessage::FallbackToPopup,
            Some(TOPIC_CLOSE_DIALOG) => InboundMessage::CloseDialog,
            topic => match (raw.method.as_deref(), topic) {
                (Some(METHOD_SHOW_IFRAME), _) => InboundMessage::ShowIframe,
                (Some(METHOD_HIDE_IFRAME), _) => InboundMessage::HideIframe,
                (_, Some(topic)) => InboundMessage::Unknown {
                    topic: topic.to_string(),
                },
                (Some(method), None) => InboundMessage::Unknown {
                    topic: method.to_string(),
                },
                (None, None) => {
                    return Err(EmbedError::MalformedMessage(
                        "message has neither topic nor method".into(),
                    ))
                }
            },
        };

        let id = match raw.id {
            Value::String(id) => Some(id),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        };

        Ok(ParsedMessage { id, message })
    }
}
