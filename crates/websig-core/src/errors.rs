//! Shared error types

use thiserror::Error;

use crate::OperationKind;

/// Everything that can go wrong while embedding the signer.
///
/// None of these are fatal to the host page; the worst outcome is a
/// connection left `disconnected` with a diagnostic trail.
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("message from untrusted origin: {0}")]
    UntrustedOrigin(String),

    #[error("embedded surface is not ready to receive messages")]
    SurfaceNotReady,

    #[error("remote signer error ({kind}): {error}")]
    RemoteError { error: String, kind: String },

    #[error("popup blocked - please allow popups for this site")]
    PopupBlocked,

    #[error("credential ceremony is not available inside the embedded frame")]
    RestrictedContext,

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("operation {0} timed out waiting for the signer")]
    Timeout(String),

    #[error("a {0} operation is already in flight")]
    OperationInFlight(OperationKind),

    #[error("wallet is not connected")]
    NotConnected,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("dom error: {0}")]
    Dom(String),
}

#[cfg(target_arch = "wasm32")]
impl From<EmbedError> for wasm_bindgen::JsValue {
    fn from(error: EmbedError) -> Self {
        wasm_bindgen::JsValue::from_str(&error.to_string())
    }
}
