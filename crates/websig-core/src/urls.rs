//! Urls and attribute strings derived from the embed settings

use crate::{EmbedError, EmbedSettings, PopupFeatures};

pub const POPUP_WINDOW_NAME: &str = "websig-popup";

/// `<remote>/connect?origin=<host-origin>&name=<app-name>`
///
/// The same entry point serves the iframe and the popup; only the iframe
/// ever asks for seamless presentation.
pub fn connect_url(
    settings: &EmbedSettings,
    host_origin: &str,
    seamless: bool,
) -> Result<String, EmbedError> {
    let mut url = settings
        .remote_url()?
        .join("/connect")
        .map_err(|e| EmbedError::InvalidSettings(format!("connect url: {}", e)))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("origin", host_origin);
        query.append_pair("name", &settings.app_name);
        if seamless {
            query.append_pair("seamless", "true");
        }
    }
    Ok(url.to_string())
}

/// Value of the iframe `allow` attribute, delegating WebAuthn to the signer origin
pub fn frame_permissions(settings: &EmbedSettings) -> Result<String, EmbedError> {
    let origin = settings.remote_origin()?;
    Ok(format!(
        "publickey-credentials-get {origin}; publickey-credentials-create {origin}; clipboard-write"
    ))
}

/// The page's own origin as reported by `location.origin`.
///
/// Sandboxed and `file:` documents report `"null"`, which no message can be
/// checked against.
pub fn page_origin(location_origin: &str) -> Result<String, EmbedError> {
    if location_origin.is_empty() || location_origin == "null" {
        return Err(EmbedError::Dom(String::from("page has an opaque origin")));
    }
    Ok(location_origin.to_string())
}

impl PopupFeatures {
    pub fn to_feature_string(&self) -> String {
        let mut features = vec![
            format!("width={}", self.width),
            format!("height={}", self.height),
        ];
        if self.resizable {
            features.push(String::from("resizable"));
        }
        features.push(format!(
            "scrollbars={}",
            if self.scrollbars { "yes" } else { "no" }
        ));
        features.push(String::from("status=1"));
        features.join(",")
    }
}
