//! Shared types between the embed client and the host server

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

use crate::EmbedError;

/// Connection state as the host application sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connecting => write!(f, "connecting"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// How the overlay is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayVariant {
    /// Backdrop, escape key and backdrop click dismiss
    #[default]
    Modal,
    /// Full viewport, no host chrome; only the embedded content may dismiss
    Seamless,
}

/// Where the remote signer currently lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedMode {
    #[default]
    Overlay,
    Popup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    #[default]
    Loading,
    Ready,
}

/// Which surface a connect action starts in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectMode {
    /// Top-level browsing context; WebAuthn works without restriction
    #[default]
    Popup,
    Overlay,
    Seamless,
}

/// Kinds of handshake the router tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Connect,
    Sign,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Connect => write!(f, "connect"),
            OperationKind::Sign => write!(f, "sign"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub scrollbars: bool,
}

impl Default for PopupFeatures {
    fn default() -> Self {
        PopupFeatures {
            width: 420,
            height: 600,
            resizable: true,
            scrollbars: true,
        }
    }
}

/// Settings fixed for the lifetime of a page session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbedSettings {
    /// Base url of the remote signer, its origin is the only trusted one
    pub websig_url: String,
    /// Display name sent to the signer
    pub app_name: String,
    pub connect_mode: ConnectMode,
    /// How long a handshake may stay unanswered, 0 disables the timer
    pub handshake_timeout_ms: u32,
    pub popup: PopupFeatures,
}

impl Default for EmbedSettings {
    fn default() -> Self {
        EmbedSettings {
            websig_url: String::from("https://websig.xyz"),
            app_name: String::from("LiquidRoute"),
            connect_mode: ConnectMode::Popup,
            handshake_timeout_ms: 120_000,
            popup: PopupFeatures::default(),
        }
    }
}

impl EmbedSettings {
    pub fn remote_url(&self) -> Result<Url, EmbedError> {
        Url::parse(&self.websig_url)
            .map_err(|e| EmbedError::InvalidSettings(format!("websig_url: {}", e)))
    }

    /// ASCII serialization of the signer origin, e.g. `https://websig.xyz`
    pub fn remote_origin(&self) -> Result<String, EmbedError> {
        let origin = self.remote_url()?.origin();
        if !origin.is_tuple() {
            return Err(EmbedError::InvalidSettings(format!(
                "websig_url has no origin: {}",
                self.websig_url
            )));
        }
        Ok(origin.ascii_serialization())
    }

    pub fn validate(&self) -> Result<(), EmbedError> {
        let url = self.remote_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(EmbedError::InvalidSettings(format!(
                "websig_url must be http(s), got {}",
                url.scheme()
            )));
        }
        self.remote_origin()?;
        if self.app_name.trim().is_empty() {
            return Err(EmbedError::InvalidSettings(
                "app_name cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_origin_strips_path_and_slash() {
        let settings = EmbedSettings {
            websig_url: String::from("https://websig.xyz/"),
            ..Default::default()
        };
        assert_eq!(settings.remote_origin().unwrap(), "https://websig.xyz");

        let settings = EmbedSettings {
            websig_url: String::from("http://localhost:3000/app"),
            ..Default::default()
        };
        assert_eq!(settings.remote_origin().unwrap(), "http://localhost:3000");
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let bad_url = EmbedSettings {
            websig_url: String::from("not a url"),
            ..Default::default()
        };
        assert!(matches!(
            bad_url.validate(),
            Err(EmbedError::InvalidSettings(_))
        ));

        let opaque = EmbedSettings {
            websig_url: String::from("data:text/plain,hello"),
            ..Default::default()
        };
        assert!(opaque.validate().is_err());

        let no_name = EmbedSettings {
            app_name: String::from("  "),
            ..Default::default()
        };
        assert!(no_name.validate().is_err());

        assert!(EmbedSettings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_accept_partial_camel_case_json() {
        let settings: EmbedSettings = serde_json::from_str(
            r#"{"websigUrl":"https://signer.test","connectMode":"seamless"}"#,
        )
        .unwrap();
        assert_eq!(settings.websig_url, "https://signer.test");
        assert_eq!(settings.connect_mode, ConnectMode::Seamless);
        assert_eq!(settings.app_name, "LiquidRoute");
        assert_eq!(settings.popup.width, 420);
    }
}
