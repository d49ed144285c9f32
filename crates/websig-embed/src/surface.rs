//! Markup of the overlay container and its frame.
//!
//! The DOM backend applies these tables as they are; keeping them here lets
//! the variant geometry be checked without a browser.

use websig_core::OverlayVariant;

use crate::page::SurfaceSpec;

pub const DIALOG_ID: &str = "websig-dialog";
pub const FRAME_ID: &str = "websig-iframe";

pub const BACKDROP_CSS: &str = r#"
dialog[data-websig]::backdrop {
  background: rgba(0, 0, 0, 0.5) !important;
  backdrop-filter: blur(4px);
  pointer-events: auto !important;
}
dialog[data-websig], dialog[data-websig] iframe {
  pointer-events: auto !important;
}
dialog[data-websig][data-variant="seamless"]::backdrop {
  background: transparent !important;
  backdrop-filter: none;
}
"#;

/// Applied once when the container is built
pub const DIALOG_BASE_STYLE: &[(&str, &str)] = &[
    ("background", "transparent"),
    ("border", "none"),
    ("outline", "none"),
    ("padding", "0"),
    ("position", "fixed"),
    ("max-width", "none"),
    ("max-height", "none"),
    ("overflow", "hidden"),
    ("z-index", "999999"),
];

// Both geometries set the same properties so switching variants on the
// reused container never leaves the previous one's values behind.
const MODAL_GEOMETRY: &[(&str, &str)] = &[
    ("top", "50%"),
    ("left", "50%"),
    ("right", "auto"),
    ("bottom", "auto"),
    ("margin", "auto"),
    ("transform", "translate(-50%, -50%)"),
    ("width", "420px"),
    ("height", "600px"),
    ("border-radius", "12px"),
];

const SEAMLESS_GEOMETRY: &[(&str, &str)] = &[
    ("top", "0"),
    ("left", "0"),
    ("right", "0"),
    ("bottom", "0"),
    ("margin", "0"),
    ("transform", "none"),
    ("width", "100vw"),
    ("height", "100vh"),
    ("border-radius", "0"),
];

pub const FRAME_BASE_STYLE: &[(&str, &str)] = &[
    ("background-color", "white"),
    ("border", "none"),
    ("color-scheme", "light dark"),
    ("height", "100%"),
    ("width", "100%"),
    ("display", "block"),
    ("position", "relative"),
];

const MODAL_FRAME: &[(&str, &str)] = &[
    ("border-radius", "12px"),
    ("box-shadow", "0 4px 20px rgba(0, 0, 0, 0.15)"),
];

const SEAMLESS_FRAME: &[(&str, &str)] = &[("border-radius", "0"), ("box-shadow", "none")];

pub fn dialog_geometry(variant: OverlayVariant) -> &'static [(&'static str, &'static str)] {
    match variant {
        OverlayVariant::Modal => MODAL_GEOMETRY,
        OverlayVariant::Seamless => SEAMLESS_GEOMETRY,
    }
}

pub fn frame_geometry(variant: OverlayVariant) -> &'static [(&'static str, &'static str)] {
    match variant {
        OverlayVariant::Modal => MODAL_FRAME,
        OverlayVariant::Seamless => SEAMLESS_FRAME,
    }
}

pub fn variant_name(variant: OverlayVariant) -> &'static str {
    match variant {
        OverlayVariant::Modal => "modal",
        OverlayVariant::Seamless => "seamless",
    }
}

pub fn dialog_attributes(spec: &SurfaceSpec) -> Vec<(&'static str, &str)> {
    vec![
        ("data-websig", ""),
        ("role", "dialog"),
        ("aria-closed", "true"),
        ("aria-label", spec.label.as_str()),
        ("hidden", "until-found"),
    ]
}

/// Everything the frame needs before it is inserted, `src` included.
///
/// A frame inserted without `src` loads `about:blank` and fires `load`
/// before the signer document exists.
pub fn frame_attributes(spec: &SurfaceSpec) -> Vec<(&'static str, &str)> {
    vec![
        ("allow", spec.frame_permissions.as_str()),
        ("tabindex", "0"),
        ("title", spec.label.as_str()),
        ("src", spec.frame_src.as_str()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    fn names(table: &[(&str, &str)]) -> Vec<String> {
        let mut names: Vec<String> = table.iter().map(|(name, _)| name.to_string()).collect();
        names.sort();
        names
    }

    fn value<'a>(table: &'a [(&str, &'a str)], name: &str) -> Option<&'a str> {
        table
            .iter()
            .find(|(property, _)| *property == name)
            .map(|(_, value)| *value)
    }

    #[test]
    fn test_seamless_covers_the_viewport() {
        let seamless = dialog_geometry(OverlayVariant::Seamless);
        for side in ["top", "left", "right", "bottom"] {
            assert_eq!(value(seamless, side), Some("0"));
        }
        assert_eq!(value(seamless, "width"), Some("100vw"));
        assert_eq!(value(seamless, "height"), Some("100vh"));
        assert_eq!(value(seamless, "transform"), Some("none"));
        assert_eq!(value(seamless, "border-radius"), Some("0"));
        assert_eq!(value(frame_geometry(OverlayVariant::Seamless), "border-radius"), Some("0"));
    }

    #[test]
    fn test_modal_is_a_centred_card() {
        let modal = dialog_geometry(OverlayVariant::Modal);
        assert_eq!(value(modal, "width"), Some("420px"));
        assert_eq!(value(modal, "height"), Some("600px"));
        assert_eq!(value(modal, "transform"), Some("translate(-50%, -50%)"));
    }

    #[test]
    fn test_variants_set_the_same_properties() {
        assert_eq!(
            names(dialog_geometry(OverlayVariant::Modal)),
            names(dialog_geometry(OverlayVariant::Seamless))
        );
        assert_eq!(
            names(frame_geometry(OverlayVariant::Modal)),
            names(frame_geometry(OverlayVariant::Seamless))
        );
        // base styles never fight the geometry
        for (property, _) in dialog_geometry(OverlayVariant::Modal) {
            assert_eq!(value(DIALOG_BASE_STYLE, property), None);
        }
    }

    #[test]
    fn test_frame_src_is_set_with_the_other_attributes() {
        let spec = FakePage::spec();
        let attributes = frame_attributes(&spec);

        assert_eq!(value(&attributes, "src"), Some(spec.frame_src.as_str()));
        assert_eq!(value(&attributes, "allow"), Some("clipboard-write"));
        assert_eq!(value(&dialog_attributes(&spec), "aria-label"), Some("WebSig Wallet"));
    }
}
