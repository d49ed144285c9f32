//! Connect and sign actions over one shared overlay and router.
//!
//! The overlay is built once here and injected into the router, so both see
//! the same lifecycle without any page-global lookup.

use log::{info, warn};
use serde_json::Value;
use std::{
    cell::{Ref, RefCell},
    rc::Rc,
};

use websig_core::{
    connect_url, frame_permissions, ConnectMode, ConnectionStatus, EmbedError, EmbedSettings,
    OperationKind, OutboundCommand, OverlayVariant,
};

use crate::{
    overlay::OverlayManager,
    page::{PageHost, PageSignal, SurfaceSpec},
    router::{ConnectionState, EventSubscriber, MessageRouter},
};

pub const SURFACE_LABEL: &str = "WebSig Wallet";

pub struct WebSigSession<H: PageHost> {
    settings: EmbedSettings,
    overlay: Rc<RefCell<OverlayManager<H>>>,
    router: MessageRouter<H>,
}

impl<H: PageHost + 'static> WebSigSession<H> {
    pub fn new(host: Rc<H>, settings: EmbedSettings) -> Result<Self, EmbedError> {
        settings.validate()?;
        let host_origin = host.host_origin();
        let seamless = settings.connect_mode == ConnectMode::Seamless;
        let spec = SurfaceSpec {
            frame_src: connect_url(&settings, &host_origin, seamless)?,
            frame_permissions: frame_permissions(&settings)?,
            label: SURFACE_LABEL.to_string(),
        };

        let overlay = Rc::new(RefCell::new(OverlayManager::new(Rc::clone(&host), spec)));
        let router = MessageRouter::new(host, Rc::clone(&overlay), settings.clone())?;
        info!(
            "WebSig session for {} -> {}",
            host_origin,
            router.remote_origin()
        );

        Ok(Self {
            settings,
            overlay,
            router,
        })
    }

    pub fn settings(&self) -> &EmbedSettings {
        &self.settings
    }

    pub fn connection(&self) -> &ConnectionState {
        self.router.connection()
    }

    pub fn overlay(&self) -> Ref<'_, OverlayManager<H>> {
        self.overlay.borrow()
    }

    pub fn subscribe(&mut self, subscriber: EventSubscriber) {
        self.router.subscribe(subscriber);
    }

    /// Start a connect handshake in the configured surface
    pub fn connect(&mut self) -> Result<(), EmbedError> {
        self.router.ensure_idle(OperationKind::Connect)?;
        info!("Connecting wallet ({:?})", self.settings.connect_mode);

        let variant = match self.settings.connect_mode {
            ConnectMode::Popup => {
                self.router.connect_in_popup()?;
                return Ok(());
            }
            ConnectMode::Overlay => OverlayVariant::Modal,
            ConnectMode::Seamless => OverlayVariant::Seamless,
        };

        self.overlay.borrow_mut().present(variant)?;
        self.router
            .connect_in_overlay(variant == OverlayVariant::Seamless)?;
        Ok(())
    }

    /// Ask the signer to sign `transaction`, returns the envelope id
    pub fn sign_transaction(&mut self, transaction: &str) -> Result<String, EmbedError> {
        self.router.ensure_idle(OperationKind::Sign)?;
        if self.router.connection().status != ConnectionStatus::Connected {
            return Err(EmbedError::NotConnected);
        }
        info!("Signing transaction");

        self.overlay.borrow_mut().present(OverlayVariant::Modal)?;
        self.router.send(OutboundCommand::SignTransaction {
            transaction: transaction.to_string(),
        })
    }

    pub fn show(&mut self, variant: OverlayVariant) -> Result<bool, EmbedError> {
        self.overlay.borrow_mut().present(variant)
    }

    pub fn hide(&mut self) -> bool {
        self.overlay.borrow_mut().dismiss()
    }

    pub fn on_message(&mut self, origin: &str, data: &Value) -> Result<(), EmbedError> {
        self.router.on_message(origin, data)
    }

    pub fn on_page_signal(&mut self, signal: PageSignal) {
        match signal {
            PageSignal::FrameLoaded => {
                info!("Iframe loaded successfully");
                self.router.on_frame_loaded();
            }
            PageSignal::FrameFailed(reason) => warn!("Iframe error: {}", reason),
            PageSignal::TimerFired(operation_id) => {
                self.router.on_timeout(&operation_id);
            }
        }
    }
}
