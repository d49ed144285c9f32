//! The seam between the embedding state machines and the browser page.
//!
//! Everything the overlay and router do to the host document goes through
//! [`PageHost`], so the state machines run unchanged against `web-sys` in the
//! browser and against a recording fake in tests.

use std::time::Duration;

use websig_core::{EmbedError, Envelope, OverlayVariant};

pub const INERT_ATTRIBUTE: &str = "inert";

/// Scroll related style of the host `<body>`, `None` means unset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSnapshot {
    pub overflow: Option<String>,
}

impl StyleSnapshot {
    pub fn scroll_locked() -> Self {
        StyleSnapshot {
            overflow: Some(String::from("hidden")),
        }
    }
}

/// Everything needed to build the dialog container and its frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub frame_src: String,
    pub frame_permissions: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    Frame,
    Popup,
}

/// Asynchronous notifications a page backend hands back to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSignal {
    FrameLoaded,
    FrameFailed(String),
    TimerFired(String),
}

pub trait PageHost {
    /// Handle to a focusable host element
    type Element: Clone;
    type Timer;

    /// Origin of the page itself, e.g. `https://app.liquidroute.com`
    fn host_origin(&self) -> String;

    /// Build the dialog container and frame, hidden and aria-closed
    fn mount_surface(&self, spec: &SurfaceSpec) -> Result<(), EmbedError>;
    fn apply_variant(&self, variant: OverlayVariant);
    /// Toggles `hidden` and `aria-closed` together
    fn set_surface_hidden(&self, hidden: bool);
    fn show_modal(&self) -> Result<(), EmbedError>;
    fn close_modal(&self);
    fn focus_surface(&self);
    fn remove_surface_attribute(&self, name: &str);
    /// Strip `inert` from the container's siblings
    fn release_sibling_inert(&self);
    /// Run `correction` whenever `name` is set on the container.
    ///
    /// Returns false when the platform cannot observe mutations.
    fn observe_surface_attribute(&self, name: &'static str, correction: Box<dyn Fn()>) -> bool;

    fn active_element(&self) -> Option<Self::Element>;
    fn focus(&self, element: &Self::Element);
    fn body_style(&self) -> StyleSnapshot;
    fn set_body_style(&self, style: &StyleSnapshot);

    /// Returns false when the browser refused to open the window
    fn open_popup(&self, url: &str, name: &str, features: &str) -> bool;
    fn post_message(
        &self,
        target: MessageTarget,
        envelope: &Envelope,
        target_origin: &str,
    ) -> Result<(), EmbedError>;

    fn schedule_timeout(&self, operation_id: &str, after: Duration) -> Option<Self::Timer>;
    fn cancel_timeout(&self, timer: Self::Timer);
}
