//! `web-sys` implementation of [`PageHost`].

use log::{debug, warn};
use serde::Serialize;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::{
    Document, Event, HtmlDialogElement, HtmlElement, HtmlIFrameElement, KeyboardEvent,
    MutationObserver, MutationObserverInit, Window,
};

use websig_core::{page_origin, EmbedError, Envelope, OverlayVariant};

use crate::{
    page::{MessageTarget, PageHost, PageSignal, StyleSnapshot, SurfaceSpec},
    surface::{
        dialog_attributes, dialog_geometry, frame_attributes, frame_geometry, variant_name,
        BACKDROP_CSS, DIALOG_BASE_STYLE, DIALOG_ID, FRAME_BASE_STYLE, FRAME_ID,
    },
    timers::TimerSlots,
};

pub type SignalSink = Rc<dyn Fn(PageSignal)>;

type EventHandler = Closure<dyn FnMut(Event)>;
type TimerCallbacks = Rc<RefCell<TimerSlots<Closure<dyn FnMut()>>>>;

struct Surface {
    dialog: HtmlDialogElement,
    frame: HtmlIFrameElement,
}

pub struct WebPage {
    window: Window,
    document: Document,
    origin: String,
    surface: RefCell<Option<Surface>>,
    variant: Rc<Cell<OverlayVariant>>,
    popup: RefCell<Option<Window>>,
    signals: Rc<RefCell<Option<SignalSink>>>,
    handlers: RefCell<Vec<EventHandler>>,
    observer: RefCell<Option<(MutationObserver, Closure<dyn FnMut()>)>>,
    timers: TimerCallbacks,
}

pub(crate) fn dom_error(err: JsValue) -> EmbedError {
    EmbedError::Dom(
        err.as_string()
            .unwrap_or_else(|| format!("{:?}", err)),
    )
}

pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, EmbedError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| EmbedError::Dom(e.to_string()))
}

fn emit(signals: &Rc<RefCell<Option<SignalSink>>>, signal: PageSignal) {
    let sink = signals.borrow().clone();
    match sink {
        Some(sink) => sink(signal),
        None => debug!("Dropping page signal {:?}, no session attached", signal),
    }
}

fn apply_styles(element: &HtmlElement, styles: &[(&str, &str)]) -> Result<(), EmbedError> {
    let style = element.style();
    for (name, value) in styles {
        style.set_property(name, value).map_err(dom_error)?;
    }
    Ok(())
}

/// Asks the page itself to close the dialog, unless the seamless variant is up
fn request_close(window: &Window, origin: &str, variant: OverlayVariant) {
    if variant != OverlayVariant::Modal {
        debug!("Ignoring host dismissal for {:?} overlay", variant);
        return;
    }
    let message = match to_js(&Envelope::close_dialog()) {
        Ok(message) => message,
        Err(e) => {
            warn!("Failed to encode close request: {}", e);
            return;
        }
    };
    if let Err(e) = window.post_message(&message, origin) {
        warn!("Failed to post close request: {}", dom_error(e));
    }
}

impl WebPage {
    pub fn new() -> Result<Self, EmbedError> {
        let window = web_sys::window().ok_or_else(|| EmbedError::Dom("no window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| EmbedError::Dom("no document".into()))?;
        let origin = page_origin(&window.location().origin().map_err(dom_error)?)?;

        Ok(Self {
            window,
            document,
            origin,
            surface: RefCell::new(None),
            variant: Rc::new(Cell::new(OverlayVariant::Modal)),
            popup: RefCell::new(None),
            signals: Rc::new(RefCell::new(None)),
            handlers: RefCell::new(Vec::new()),
            observer: RefCell::new(None),
            timers: Rc::new(RefCell::new(TimerSlots::default())),
        })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn set_signal_sink(&self, sink: SignalSink) {
        *self.signals.borrow_mut() = Some(sink);
    }

    fn listen(
        &self,
        target: &web_sys::EventTarget,
        event: &str,
        handler: impl FnMut(Event) + 'static,
    ) -> Result<(), EmbedError> {
        let closure = Closure::<dyn FnMut(Event)>::new(handler);
        target
            .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .map_err(dom_error)?;
        self.handlers.borrow_mut().push(closure);
        Ok(())
    }

    fn create<T: JsCast>(&self, tag: &str) -> Result<T, EmbedError> {
        self.document
            .create_element(tag)
            .map_err(dom_error)?
            .dyn_into::<T>()
            .map_err(|_| EmbedError::Dom(format!("<{}> has an unexpected type", tag)))
    }

    fn with_dialog(&self, f: impl FnOnce(&HtmlDialogElement)) {
        if let Some(surface) = self.surface.borrow().as_ref() {
            f(&surface.dialog);
        }
    }

    fn install_dialog_handlers(&self, dialog: &HtmlDialogElement) -> Result<(), EmbedError> {
        // The native Escape close would bypass the overlay state
        self.listen(dialog, "cancel", |event| event.prevent_default())?;

        let (window, origin, variant) = (
            self.window.clone(),
            self.origin.clone(),
            Rc::clone(&self.variant),
        );
        self.listen(dialog, "keydown", move |event| {
            let escape = event
                .dyn_ref::<KeyboardEvent>()
                .is_some_and(|key| key.key() == "Escape");
            if escape {
                request_close(&window, &origin, variant.get());
            }
        })?;

        let (window, origin, variant) = (
            self.window.clone(),
            self.origin.clone(),
            Rc::clone(&self.variant),
        );
        let backdrop: JsValue = dialog.clone().into();
        self.listen(dialog, "click", move |event| {
            // Clicks inside the frame never reach the dialog itself
            let target: Option<JsValue> = event.target().map(Into::into);
            if target.as_ref() == Some(&backdrop) {
                request_close(&window, &origin, variant.get());
            }
        })
    }

    fn install_frame_handlers(&self, frame: &HtmlIFrameElement) -> Result<(), EmbedError> {
        let signals = Rc::clone(&self.signals);
        let loaded = frame.clone();
        self.listen(frame, "load", move |_| {
            let _ = loaded.focus();
            if let Some(content) = loaded.content_window() {
                let _ = content.focus();
            }
            emit(&signals, PageSignal::FrameLoaded);
        })?;

        let signals = Rc::clone(&self.signals);
        self.listen(frame, "error", move |event| {
            emit(&signals, PageSignal::FrameFailed(event.type_()));
        })
    }
}

impl PageHost for WebPage {
    type Element = HtmlElement;
    /// Operation id owning the callback in `timers`
    type Timer = String;

    fn host_origin(&self) -> String {
        self.origin.clone()
    }

    fn mount_surface(&self, spec: &SurfaceSpec) -> Result<(), EmbedError> {
        if self.surface.borrow().is_some() {
            return Ok(());
        }
        if self.document.get_element_by_id(DIALOG_ID).is_some() {
            warn!("Replacing a stale #{} left in the page", DIALOG_ID);
            if let Some(stale) = self.document.get_element_by_id(DIALOG_ID) {
                stale.remove();
            }
        }
        let body = self
            .document
            .body()
            .ok_or_else(|| EmbedError::Dom("no body".into()))?;

        let dialog: HtmlDialogElement = self.create("dialog")?;
        dialog.set_id(DIALOG_ID);
        for (name, value) in dialog_attributes(spec) {
            dialog.set_attribute(name, value).map_err(dom_error)?;
        }
        apply_styles(&dialog, DIALOG_BASE_STYLE)?;
        apply_styles(&dialog, dialog_geometry(self.variant.get()))?;

        let frame: HtmlIFrameElement = self.create("iframe")?;
        frame.set_id(FRAME_ID);
        self.install_frame_handlers(&frame)?;
        // src goes in with the other attributes, before the frame is inserted
        for (name, value) in frame_attributes(spec) {
            frame.set_attribute(name, value).map_err(dom_error)?;
        }
        apply_styles(&frame, FRAME_BASE_STYLE)?;
        apply_styles(&frame, frame_geometry(self.variant.get()))?;

        let style: HtmlElement = self.create("style")?;
        style.set_text_content(Some(BACKDROP_CSS));

        self.install_dialog_handlers(&dialog)?;

        dialog.append_child(&style).map_err(dom_error)?;
        dialog.append_child(&frame).map_err(dom_error)?;
        body.append_child(&dialog).map_err(dom_error)?;

        *self.surface.borrow_mut() = Some(Surface { dialog, frame });
        Ok(())
    }

    fn apply_variant(&self, variant: OverlayVariant) {
        self.variant.set(variant);
        if let Some(surface) = self.surface.borrow().as_ref() {
            let result = surface
                .dialog
                .set_attribute("data-variant", variant_name(variant))
                .map_err(dom_error)
                .and_then(|_| apply_styles(&surface.dialog, dialog_geometry(variant)))
                .and_then(|_| apply_styles(&surface.frame, frame_geometry(variant)));
            if let Err(e) = result {
                warn!("Failed to apply {:?} overlay: {}", variant, e);
            }
        }
    }

    fn set_surface_hidden(&self, hidden: bool) {
        self.with_dialog(|dialog| {
            let result = if hidden {
                dialog
                    .set_attribute("hidden", "until-found")
                    .and_then(|_| dialog.set_attribute("aria-closed", "true"))
            } else {
                dialog
                    .remove_attribute("hidden")
                    .and_then(|_| dialog.set_attribute("aria-closed", "false"))
            };
            if let Err(e) = result {
                warn!("Failed to toggle overlay visibility: {}", dom_error(e));
            }
        });
    }

    fn show_modal(&self) -> Result<(), EmbedError> {
        match self.surface.borrow().as_ref() {
            Some(surface) if surface.dialog.open() => Ok(()),
            Some(surface) => surface.dialog.show_modal().map_err(dom_error),
            None => Err(EmbedError::SurfaceNotReady),
        }
    }

    fn close_modal(&self) {
        self.with_dialog(|dialog| dialog.close());
    }

    fn focus_surface(&self) {
        if let Some(surface) = self.surface.borrow().as_ref() {
            let _ = surface.frame.focus();
        }
    }

    fn remove_surface_attribute(&self, name: &str) {
        self.with_dialog(|dialog| {
            let _ = dialog.remove_attribute(name);
        });
    }

    fn release_sibling_inert(&self) {
        self.with_dialog(|dialog| {
            let Some(parent) = dialog.parent_element() else {
                return;
            };
            let siblings = parent.children();
            for index in 0..siblings.length() {
                let Some(sibling) = siblings.item(index) else {
                    continue;
                };
                if sibling.id() != DIALOG_ID && sibling.has_attribute("inert") {
                    let _ = sibling.remove_attribute("inert");
                }
            }
        });
    }

    fn observe_surface_attribute(&self, name: &'static str, correction: Box<dyn Fn()>) -> bool {
        let surface = self.surface.borrow();
        let Some(surface) = surface.as_ref() else {
            return false;
        };

        let callback = Closure::<dyn FnMut()>::new(move || correction());
        let observer = match MutationObserver::new(callback.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(e) => {
                debug!("MutationObserver unavailable: {}", dom_error(e));
                return false;
            }
        };

        let init = MutationObserverInit::new();
        init.set_attributes(true);
        init.set_attribute_old_value(true);
        init.set_attribute_filter(&js_sys::Array::of1(&JsValue::from_str(name)));
        if let Err(e) = observer.observe_with_options(&surface.dialog, &init) {
            debug!("Failed to observe overlay attributes: {}", dom_error(e));
            return false;
        }

        *self.observer.borrow_mut() = Some((observer, callback));
        true
    }

    fn active_element(&self) -> Option<HtmlElement> {
        self.document
            .active_element()
            .and_then(|element| element.dyn_into::<HtmlElement>().ok())
    }

    fn focus(&self, element: &HtmlElement) {
        if let Err(e) = element.focus() {
            debug!("Failed to restore focus: {}", dom_error(e));
        }
    }

    fn body_style(&self) -> StyleSnapshot {
        let overflow = self
            .document
            .body()
            .and_then(|body| body.style().get_property_value("overflow").ok())
            .filter(|value| !value.is_empty());
        StyleSnapshot { overflow }
    }

    fn set_body_style(&self, snapshot: &StyleSnapshot) {
        let Some(body) = self.document.body() else {
            return;
        };
        let style = body.style();
        let result = match &snapshot.overflow {
            Some(value) => style.set_property("overflow", value),
            None => style.remove_property("overflow").map(|_| ()),
        };
        if let Err(e) = result {
            warn!("Failed to update body style: {}", dom_error(e));
        }
    }

    fn open_popup(&self, url: &str, name: &str, features: &str) -> bool {
        match self
            .window
            .open_with_url_and_target_and_features(url, name, features)
        {
            Ok(Some(popup)) => {
                *self.popup.borrow_mut() = Some(popup);
                true
            }
            Ok(None) => false,
            Err(e) => {
                debug!("window.open failed: {}", dom_error(e));
                false
            }
        }
    }

    fn post_message(
        &self,
        target: MessageTarget,
        envelope: &Envelope,
        target_origin: &str,
    ) -> Result<(), EmbedError> {
        let recipient = match target {
            MessageTarget::Frame => self
                .surface
                .borrow()
                .as_ref()
                .and_then(|surface| surface.frame.content_window()),
            MessageTarget::Popup => self
                .popup
                .borrow()
                .clone()
                .filter(|popup| !popup.closed().unwrap_or(true)),
        }
        .ok_or(EmbedError::SurfaceNotReady)?;

        recipient
            .post_message(&to_js(envelope)?, target_origin)
            .map_err(dom_error)
    }

    fn schedule_timeout(&self, operation_id: &str, after: Duration) -> Option<String> {
        let signals = Rc::clone(&self.signals);
        let slots = Rc::downgrade(&self.timers);
        let fired_id = operation_id.to_string();
        let callback = Closure::<dyn FnMut()>::new(move || {
            emit(&signals, PageSignal::TimerFired(fired_id.clone()));
            if let Some(slots) = slots.upgrade() {
                slots.borrow_mut().mark_fired(&fired_id);
            }
        });

        let millis = i32::try_from(after.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                millis,
            ) {
            Ok(handle) => {
                self.timers
                    .borrow_mut()
                    .insert(operation_id, handle, callback);
                Some(operation_id.to_string())
            }
            Err(e) => {
                warn!("Failed to schedule timeout: {}", dom_error(e));
                None
            }
        }
    }

    fn cancel_timeout(&self, timer: String) {
        let handle = self.timers.borrow_mut().cancel(&timer);
        if let Some(handle) = handle {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}

impl Drop for WebPage {
    fn drop(&mut self) {
        if let Some((observer, _)) = self.observer.borrow_mut().take() {
            observer.disconnect();
        }
        if let Some(surface) = self.surface.borrow_mut().take() {
            surface.dialog.remove();
        }
        for handle in self.timers.borrow_mut().clear() {
            self.window.clear_timeout_with_handle(handle);
        }
    }
}
