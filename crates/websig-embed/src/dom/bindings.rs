//! JavaScript facing wrapper around [`WebSigSession`].

use log::{debug, warn};
use std::{cell::RefCell, rc::Rc};
use wasm_bindgen::{prelude::*, JsCast};
use web_sys::MessageEvent;

use websig_core::{EmbedError, EmbedSettings, OverlayVariant};

use super::page::{dom_error, to_js, WebPage};
use crate::{page::PageSignal, session::WebSigSession};

const BUSY: &str = "WebSig session is busy";

/// Browser entry point for a page embedding the WebSig signer
#[wasm_bindgen]
pub struct WebSigEmbed {
    page: Rc<WebPage>,
    session: Rc<RefCell<WebSigSession<WebPage>>>,
    message_listener: Closure<dyn FnMut(MessageEvent)>,
}

fn parse_settings(settings: JsValue) -> Result<EmbedSettings, EmbedError> {
    if settings.is_undefined() || settings.is_null() {
        return Ok(EmbedSettings::default());
    }
    serde_wasm_bindgen::from_value(settings)
        .map_err(|e| EmbedError::InvalidSettings(e.to_string()))
}

#[wasm_bindgen]
impl WebSigEmbed {
    #[wasm_bindgen(constructor)]
    pub fn new(settings: JsValue) -> Result<WebSigEmbed, JsValue> {
        let settings = parse_settings(settings)?;
        let page = Rc::new(WebPage::new()?);
        let session = Rc::new(RefCell::new(WebSigSession::new(
            Rc::clone(&page),
            settings,
        )?));

        let weak = Rc::downgrade(&session);
        page.set_signal_sink(Rc::new(move |signal: PageSignal| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            match session.try_borrow_mut() {
                Ok(mut session) => session.on_page_signal(signal),
                Err(_) => warn!("Dropping {:?}, session is busy", signal),
            };
        }));

        let weak = Rc::downgrade(&session);
        let message_listener = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let Some(session) = weak.upgrade() else {
                return;
            };
            let data: serde_json::Value = match serde_wasm_bindgen::from_value(event.data()) {
                Ok(data) => data,
                Err(e) => {
                    debug!("Ignoring non-JSON message from {}: {}", event.origin(), e);
                    return;
                }
            };
            let Ok(mut session) = session.try_borrow_mut() else {
                warn!("Dropping message from {}, session is busy", event.origin());
                return;
            };
            if let Err(e) = session.on_message(&event.origin(), &data) {
                debug!("Message discarded: {}", e);
            }
        });
        page.window()
            .add_event_listener_with_callback("message", message_listener.as_ref().unchecked_ref())
            .map_err(dom_error)?;

        Ok(WebSigEmbed {
            page,
            session,
            message_listener,
        })
    }

    /// Start the connect handshake
    pub fn connect(&self) -> Result<(), JsValue> {
        let mut session = self.session.try_borrow_mut().map_err(|_| BUSY)?;
        Ok(session.connect()?)
    }

    /// Returns the id of the sign request envelope
    #[wasm_bindgen(js_name = signTransaction)]
    pub fn sign_transaction(&self, transaction: &str) -> Result<String, JsValue> {
        let mut session = self.session.try_borrow_mut().map_err(|_| BUSY)?;
        Ok(session.sign_transaction(transaction)?)
    }

    pub fn show(&self, seamless: Option<bool>) -> Result<bool, JsValue> {
        let variant = if seamless.unwrap_or(false) {
            OverlayVariant::Seamless
        } else {
            OverlayVariant::Modal
        };
        let mut session = self.session.try_borrow_mut().map_err(|_| BUSY)?;
        Ok(session.show(variant)?)
    }

    pub fn hide(&self) -> Result<bool, JsValue> {
        let mut session = self.session.try_borrow_mut().map_err(|_| BUSY)?;
        Ok(session.hide())
    }

    #[wasm_bindgen(getter)]
    pub fn status(&self) -> Result<String, JsValue> {
        let session = self.session.try_borrow().map_err(|_| BUSY)?;
        Ok(session.connection().status.to_string())
    }

    #[wasm_bindgen(getter)]
    pub fn address(&self) -> Result<String, JsValue> {
        let session = self.session.try_borrow().map_err(|_| BUSY)?;
        Ok(session.connection().address.clone())
    }

    #[wasm_bindgen(getter, js_name = surfaceReady)]
    pub fn surface_ready(&self) -> Result<bool, JsValue> {
        let session = self.session.try_borrow().map_err(|_| BUSY)?;
        let ready = session.overlay().is_ready();
        Ok(ready)
    }

    /// Register `callback(event)` for status, readiness and error events.
    ///
    /// Callbacks run on a later task so they may call back into this object.
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: js_sys::Function) -> Result<(), JsValue> {
        let window = self.page.window().clone();
        let mut session = self.session.try_borrow_mut().map_err(|_| BUSY)?;
        session.subscribe(Box::new(move |event| {
            let value = match to_js(event) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Failed to encode event: {}", e);
                    return;
                }
            };
            let deferred = callback.bind1(&JsValue::NULL, &value);
            if let Err(e) = window.set_timeout_with_callback_and_timeout_and_arguments_0(&deferred, 0)
            {
                warn!("Failed to deliver event: {}", dom_error(e));
            }
        }));
        Ok(())
    }
}

impl Drop for WebSigEmbed {
    fn drop(&mut self) {
        let _ = self.page.window().remove_event_listener_with_callback(
            "message",
            self.message_listener.as_ref().unchecked_ref(),
        );
    }
}
