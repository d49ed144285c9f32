//! In-page overlay hosting the remote signer.
//!
//! The container is built once per page session and then only shown and
//! hidden. Showing captures focus and locks body scroll, hiding gives both
//! back exactly as they were. `active` tracks those side effects, `visible`
//! tracks presentation, and `visible == false` implies `active == false`.

use log::{debug, info, warn};
use std::rc::Rc;

use websig_core::{EmbedError, EmbedMode, OverlayVariant, ReadyState};

use crate::page::{PageHost, StyleSnapshot, SurfaceSpec, INERT_ATTRIBUTE};

#[derive(Debug)]
pub struct OverlayState<E> {
    pub active: bool,
    pub visible: bool,
    pub saved_body_style: Option<StyleSnapshot>,
    pub saved_focus_target: Option<E>,
}

impl<E> Default for OverlayState<E> {
    fn default() -> Self {
        Self {
            active: false,
            visible: false,
            saved_body_style: None,
            saved_focus_target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedSurface {
    pub kind: OverlayVariant,
    pub mode: EmbedMode,
    pub ready_state: ReadyState,
    /// Whether the `inert` defense could be installed
    pub inert_guarded: bool,
}

pub struct OverlayManager<H: PageHost> {
    host: Rc<H>,
    spec: SurfaceSpec,
    state: OverlayState<H::Element>,
    surface: Option<EmbeddedSurface>,
}

impl<H: PageHost + 'static> OverlayManager<H> {
    pub fn new(host: Rc<H>, spec: SurfaceSpec) -> Self {
        Self {
            host,
            spec,
            state: OverlayState::default(),
            surface: None,
        }
    }

    pub fn state(&self) -> &OverlayState<H::Element> {
        &self.state
    }

    pub fn surface(&self) -> Option<&EmbeddedSurface> {
        self.surface.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.state.visible
    }

    pub fn is_ready(&self) -> bool {
        self.surface
            .as_ref()
            .is_some_and(|surface| surface.ready_state == ReadyState::Ready)
    }

    /// Escape and backdrop clicks only dismiss the modal variant
    pub fn host_dismiss_allowed(&self) -> bool {
        self.state.visible
            && self
                .surface
                .as_ref()
                .is_some_and(|surface| surface.kind == OverlayVariant::Modal)
    }

    /// Returns true on the first ready signal
    pub fn mark_ready(&mut self) -> bool {
        match self.surface.as_mut() {
            Some(surface) if surface.ready_state == ReadyState::Loading => {
                surface.ready_state = ReadyState::Ready;
                info!("Embedded surface ready");
                true
            }
            _ => false,
        }
    }

    pub fn set_mode(&mut self, mode: EmbedMode) {
        if let Some(surface) = self.surface.as_mut() {
            surface.mode = mode;
        }
    }

    fn ensure_surface(&mut self) -> Result<&mut EmbeddedSurface, EmbedError> {
        if self.surface.is_none() {
            debug!("Building embedded surface: {}", self.spec.frame_src);
            self.host.mount_surface(&self.spec)?;

            // Some extensions mark every sibling of an injected element inert,
            // which would make the frame unreachable.
            let host = Rc::downgrade(&self.host);
            let inert_guarded = self.host.observe_surface_attribute(
                INERT_ATTRIBUTE,
                Box::new(move || {
                    if let Some(host) = host.upgrade() {
                        debug!("Removing externally applied inert from overlay");
                        host.remove_surface_attribute(INERT_ATTRIBUTE);
                    }
                }),
            );
            if !inert_guarded {
                warn!("Mutation observation unavailable, overlay runs without inert defense");
            }

            self.surface = Some(EmbeddedSurface {
                kind: OverlayVariant::Modal,
                mode: EmbedMode::Overlay,
                ready_state: ReadyState::Loading,
                inert_guarded,
            });
        }
        self.surface
            .as_mut()
            .ok_or_else(|| EmbedError::Dom("surface missing after mount".into()))
    }

    /// Show the overlay. Returns false when it was already visible.
    pub fn present(&mut self, variant: OverlayVariant) -> Result<bool, EmbedError> {
        if self.state.visible {
            return Ok(false);
        }

        let host = Rc::clone(&self.host);
        let surface = self.ensure_surface()?;
        surface.kind = variant;
        surface.mode = EmbedMode::Overlay;

        let opener = host.active_element();
        host.apply_variant(variant);
        host.set_surface_hidden(false);
        if let Err(e) = host.show_modal() {
            host.set_surface_hidden(true);
            return Err(e);
        }

        if opener.is_some() {
            self.state.saved_focus_target = opener;
        }

        if !self.state.active {
            self.state.active = true;
            host.focus_surface();
            self.state.saved_body_style = Some(host.body_style());
            host.set_body_style(&StyleSnapshot::scroll_locked());
        }
        self.state.visible = true;

        info!("Overlay shown ({:?})", variant);
        Ok(true)
    }

    /// Hide the overlay. Returns false when it was already hidden.
    pub fn dismiss(&mut self) -> bool {
        if !self.state.visible {
            return false;
        }
        self.state.visible = false;

        self.host.set_surface_hidden(true);
        self.host.close_modal();
        self.host.release_sibling_inert();

        if self.state.active {
            self.state.active = false;

            if let Some(opener) = self.state.saved_focus_target.take() {
                self.host.focus(&opener);
            }
            let saved = self.state.saved_body_style.take().unwrap_or_default();
            self.host.set_body_style(&saved);
        }

        info!("Overlay hidden");
        true
    }
}
