//! websig-embed: Browser client embedding the WebSig signer
//!
//! This crate provides:
//! - The overlay dialog lifecycle with focus, scroll and inert restoration
//! - Origin-checked message routing for the connect and sign handshakes
//! - Popup fallback when the signer cannot run inside the frame
//!
//! The state machines are written against [`page::PageHost`]; the `web-sys`
//! backend and the JavaScript bindings only exist on `wasm32`.

pub mod overlay;
pub mod page;
pub mod pending;
pub mod router;
pub mod session;
pub mod surface;
pub mod timers;

#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(test)]
mod testing;

pub use overlay::{EmbeddedSurface, OverlayManager, OverlayState};
pub use page::{MessageTarget, PageHost, PageSignal, StyleSnapshot, SurfaceSpec};
pub use router::{ConnectionState, EmbedEvent, EventSubscriber, MessageRouter};
pub use session::WebSigSession;

// Re-export websig-core types
pub use websig_core::*;

#[cfg(target_arch = "wasm32")]
pub use dom::{WebPage, WebSigEmbed};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("websig-embed initialized");
}
