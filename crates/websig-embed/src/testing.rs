//! Recording in-memory page used by the unit tests

use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    time::Duration,
};

use websig_core::{EmbedError, Envelope, OverlayVariant};

use crate::page::{MessageTarget, PageHost, StyleSnapshot, SurfaceSpec, INERT_ATTRIBUTE};

pub const HOST_ORIGIN: &str = "https://app.liquidroute.com";
pub const REMOTE_ORIGIN: &str = "https://websig.xyz";

#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub target: MessageTarget,
    pub envelope: Envelope,
    pub target_origin: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedPopup {
    pub url: String,
    pub name: String,
    pub features: String,
}

pub struct FakePage {
    pub mount_count: Cell<u32>,
    pub mounted_spec: RefCell<Option<SurfaceSpec>>,
    pub surface_hidden: Cell<bool>,
    pub modal_open: Cell<bool>,
    pub show_count: Cell<u32>,
    pub close_count: Cell<u32>,
    pub fail_show: Cell<bool>,
    pub variant: Cell<Option<OverlayVariant>>,
    pub sibling_release_count: Cell<u32>,
    pub observer_supported: Cell<bool>,
    surface_attributes: RefCell<HashSet<String>>,
    correction: RefCell<Option<Box<dyn Fn()>>>,
    active: RefCell<Option<String>>,
    overflow: RefCell<Option<String>>,
    pub block_popups: Cell<bool>,
    pub popups: RefCell<Vec<OpenedPopup>>,
    pub frame_addressable: Cell<bool>,
    pub posted: RefCell<Vec<PostedMessage>>,
    pub timers: RefCell<Vec<(String, Duration)>>,
    pub cancelled_timers: RefCell<Vec<String>>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            mount_count: Cell::new(0),
            mounted_spec: RefCell::new(None),
            surface_hidden: Cell::new(false),
            modal_open: Cell::new(false),
            show_count: Cell::new(0),
            close_count: Cell::new(0),
            fail_show: Cell::new(false),
            variant: Cell::new(None),
            sibling_release_count: Cell::new(0),
            observer_supported: Cell::new(true),
            surface_attributes: RefCell::new(HashSet::new()),
            correction: RefCell::new(None),
            active: RefCell::new(None),
            overflow: RefCell::new(None),
            block_popups: Cell::new(false),
            popups: RefCell::new(Vec::new()),
            frame_addressable: Cell::new(true),
            posted: RefCell::new(Vec::new()),
            timers: RefCell::new(Vec::new()),
            cancelled_timers: RefCell::new(Vec::new()),
        }
    }
}

impl FakePage {
    pub const FRAME_ID: &'static str = "websig-iframe";

    pub fn spec() -> SurfaceSpec {
        SurfaceSpec {
            frame_src: format!("{}/connect?origin=x&name=y", REMOTE_ORIGIN),
            frame_permissions: String::from("clipboard-write"),
            label: String::from("WebSig Wallet"),
        }
    }

    pub fn focus_element(&self, id: &str) {
        *self.active.borrow_mut() = Some(id.to_string());
    }

    pub fn active(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    pub fn set_overflow(&self, value: Option<&str>) {
        *self.overflow.borrow_mut() = value.map(str::to_string);
    }

    pub fn overflow(&self) -> Option<String> {
        self.overflow.borrow().clone()
    }

    pub fn surface_has_attribute(&self, name: &str) -> bool {
        self.surface_attributes.borrow().contains(name)
    }

    /// What a password manager extension does to injected dialogs
    pub fn apply_external_inert(&self) {
        self.surface_attributes
            .borrow_mut()
            .insert(INERT_ATTRIBUTE.to_string());
        if let Some(correction) = self.correction.borrow().as_ref() {
            correction();
        }
    }

    pub fn posted_topics(&self) -> Vec<String> {
        self.posted
            .borrow()
            .iter()
            .map(|posted| posted.envelope.topic.clone())
            .collect()
    }
}

impl PageHost for FakePage {
    type Element = String;
    type Timer = String;

    fn host_origin(&self) -> String {
        HOST_ORIGIN.to_string()
    }

    fn mount_surface(&self, spec: &SurfaceSpec) -> Result<(), EmbedError> {
        self.mount_count.set(self.mount_count.get() + 1);
        *self.mounted_spec.borrow_mut() = Some(spec.clone());
        self.surface_hidden.set(true);
        Ok(())
    }

    fn apply_variant(&self, variant: OverlayVariant) {
        self.variant.set(Some(variant));
    }

    fn set_surface_hidden(&self, hidden: bool) {
        self.surface_hidden.set(hidden);
    }

    fn show_modal(&self) -> Result<(), EmbedError> {
        if self.fail_show.get() {
            return Err(EmbedError::Dom("showModal failed".into()));
        }
        self.show_count.set(self.show_count.get() + 1);
        self.modal_open.set(true);
        Ok(())
    }

    fn close_modal(&self) {
        self.close_count.set(self.close_count.get() + 1);
        self.modal_open.set(false);
    }

    fn focus_surface(&self) {
        self.focus_element(Self::FRAME_ID);
    }

    fn remove_surface_attribute(&self, name: &str) {
        self.surface_attributes.borrow_mut().remove(name);
    }

    fn release_sibling_inert(&self) {
        self.sibling_release_count
            .set(self.sibling_release_count.get() + 1);
    }

    fn observe_surface_attribute(&self, _name: &'static str, correction: Box<dyn Fn()>) -> bool {
        if !self.observer_supported.get() {
            return false;
        }
        *self.correction.borrow_mut() = Some(correction);
        true
    }

    fn active_element(&self) -> Option<String> {
        self.active()
    }

    fn focus(&self, element: &String) {
        self.focus_element(element);
    }

    fn body_style(&self) -> StyleSnapshot {
        StyleSnapshot {
            overflow: self.overflow(),
        }
    }

    fn set_body_style(&self, style: &StyleSnapshot) {
        *self.overflow.borrow_mut() = style.overflow.clone();
    }

    fn open_popup(&self, url: &str, name: &str, features: &str) -> bool {
        if self.block_popups.get() {
            return false;
        }
        self.popups.borrow_mut().push(OpenedPopup {
            url: url.to_string(),
            name: name.to_string(),
            features: features.to_string(),
        });
        true
    }

    fn post_message(
        &self,
        target: MessageTarget,
        envelope: &Envelope,
        target_origin: &str,
    ) -> Result<(), EmbedError> {
        if target == MessageTarget::Frame
            && (self.mount_count.get() == 0 || !self.frame_addressable.get())
        {
            return Err(EmbedError::SurfaceNotReady);
        }
        self.posted.borrow_mut().push(PostedMessage {
            target,
            envelope: envelope.clone(),
            target_origin: target_origin.to_string(),
        });
        Ok(())
    }

    fn schedule_timeout(&self, operation_id: &str, after: Duration) -> Option<String> {
        self.timers
            .borrow_mut()
            .push((operation_id.to_string(), after));
        Some(operation_id.to_string())
    }

    fn cancel_timeout(&self, timer: String) {
        self.cancelled_timers.borrow_mut().push(timer);
    }
}
