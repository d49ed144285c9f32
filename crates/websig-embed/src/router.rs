//! Outbound commands and inbound message handling.
//!
//! Inbound data is acted on only when its origin equals the signer origin,
//! with one exception: the host page may post `websig:close_dialog` to itself.
//! [`ConnectionState`] is mutated here and nowhere else.

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::{cell::RefCell, rc::Rc, time::Duration};

use websig_core::{
    connect_url, new_message_id, ConnectionStatus, EmbedError, EmbedMode, EmbedSettings,
    Envelope, InboundMessage, OperationKind, OutboundCommand, OverlayVariant, ParsedMessage,
    ReadyState, POPUP_WINDOW_NAME,
};

use crate::{
    overlay::OverlayManager,
    page::{MessageTarget, PageHost},
    pending::{PendingOperation, PendingOperations},
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    pub address: String,
}

/// Notifications for the host application's status display and log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmbedEvent {
    StatusChanged {
        status: ConnectionStatus,
        address: String,
    },
    SurfaceReady,
    MessageSent {
        id: String,
        topic: String,
    },
    PopupOpened {
        url: String,
    },
    PopupBlocked,
    RemoteError {
        error: String,
        kind: String,
    },
    OperationTimedOut {
        id: String,
        operation: OperationKind,
    },
}

pub type EventSubscriber = Box<dyn Fn(&EmbedEvent)>;

pub struct MessageRouter<H: PageHost> {
    host: Rc<H>,
    overlay: Rc<RefCell<OverlayManager<H>>>,
    settings: EmbedSettings,
    remote_origin: String,
    host_origin: String,
    connection: ConnectionState,
    pending: PendingOperations<H::Timer>,
    /// Envelopes waiting for the frame's load signal
    deferred: Vec<Envelope>,
    subscribers: Vec<EventSubscriber>,
}

impl<H: PageHost + 'static> MessageRouter<H> {
    pub fn new(
        host: Rc<H>,
        overlay: Rc<RefCell<OverlayManager<H>>>,
        settings: EmbedSettings,
    ) -> Result<Self, EmbedError> {
        settings.validate()?;
        let remote_origin = settings.remote_origin()?;
        let host_origin = host.host_origin();
        Ok(Self {
            host,
            overlay,
            settings,
            remote_origin,
            host_origin,
            connection: ConnectionState::default(),
            pending: PendingOperations::default(),
            deferred: Vec::new(),
            subscribers: Vec::new(),
        })
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn remote_origin(&self) -> &str {
        &self.remote_origin
    }

    pub fn subscribe(&mut self, subscriber: EventSubscriber) {
        self.subscribers.push(subscriber);
    }

    pub fn is_pending(&self, kind: OperationKind) -> bool {
        self.pending.is_pending(kind)
    }

    pub fn ensure_idle(&self, kind: OperationKind) -> Result<(), EmbedError> {
        self.pending.ensure_idle(kind)
    }

    fn emit(&self, event: EmbedEvent) {
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if self.connection.status == status {
            return;
        }
        debug!("Connection {} -> {}", self.connection.status, status);
        self.connection.status = status;
        self.emit(EmbedEvent::StatusChanged {
            status,
            address: self.connection.address.clone(),
        });
    }

    fn begin_operation(&mut self, id: String, kind: OperationKind) -> Result<(), EmbedError> {
        self.pending.ensure_idle(kind)?;
        let timer = match self.settings.handshake_timeout_ms {
            0 => None,
            ms => self
                .host
                .schedule_timeout(&id, Duration::from_millis(u64::from(ms))),
        };
        self.pending.begin(PendingOperation { id, kind, timer })
    }

    fn finish(&mut self, operation: PendingOperation<H::Timer>) {
        debug!("{} operation {} finished", operation.kind, operation.id);
        self.deferred.retain(|envelope| envelope.id != operation.id);
        if let Some(timer) = operation.timer {
            self.host.cancel_timeout(timer);
        }
    }

    fn dismiss_overlay(&self) {
        self.overlay.borrow_mut().dismiss();
    }

    /// Deliver a command to the signer and track it until a reply or timeout.
    ///
    /// Returns the envelope id.
    pub fn send(&mut self, command: OutboundCommand) -> Result<String, EmbedError> {
        let kind = command.kind();
        self.pending.ensure_idle(kind)?;

        let (mode, ready) = match self.overlay.borrow().surface() {
            Some(surface) => (surface.mode, surface.ready_state == ReadyState::Ready),
            None => {
                warn!("Cannot send {}: embedded surface does not exist", command.topic());
                return Err(EmbedError::SurfaceNotReady);
            }
        };

        let envelope = Envelope::new(&command)?;
        match mode {
            EmbedMode::Popup => {
                self.host
                    .post_message(MessageTarget::Popup, &envelope, &self.remote_origin)?;
            }
            EmbedMode::Overlay if ready => {
                self.host
                    .post_message(MessageTarget::Frame, &envelope, &self.remote_origin)?;
            }
            EmbedMode::Overlay => {
                debug!("Frame still loading, holding {} until load", envelope.topic);
                self.deferred.push(envelope.clone());
            }
        }

        self.begin_operation(envelope.id.clone(), kind)?;
        info!("Sent {} ({})", envelope.topic, envelope.id);
        self.emit(EmbedEvent::MessageSent {
            id: envelope.id.clone(),
            topic: envelope.topic,
        });
        Ok(envelope.id)
    }

    /// Start a connect handshake inside the already presented overlay
    pub fn connect_in_overlay(&mut self, seamless: bool) -> Result<String, EmbedError> {
        self.pending.ensure_idle(OperationKind::Connect)?;
        self.set_status(ConnectionStatus::Connecting);

        let command = OutboundCommand::Connect {
            origin: self.host_origin.clone(),
            name: self.settings.app_name.clone(),
            seamless,
        };
        match self.send(command) {
            Ok(id) => Ok(id),
            Err(e) => {
                warn!("Connect failed: {}", e);
                self.set_status(ConnectionStatus::Disconnected);
                Err(e)
            }
        }
    }

    /// Start a connect handshake in a top-level popup window
    pub fn connect_in_popup(&mut self) -> Result<String, EmbedError> {
        self.pending.ensure_idle(OperationKind::Connect)?;
        self.set_status(ConnectionStatus::Connecting);

        if let Err(e) = self.open_popup() {
            self.set_status(ConnectionStatus::Disconnected);
            return Err(e);
        }

        let id = new_message_id();
        self.begin_operation(id.clone(), OperationKind::Connect)?;
        Ok(id)
    }

    fn open_popup(&mut self) -> Result<(), EmbedError> {
        let url = connect_url(&self.settings, &self.host_origin, false)?;
        let features = self.settings.popup.to_feature_string();

        if !self.host.open_popup(&url, POPUP_WINDOW_NAME, &features) {
            warn!("Popup blocked - please allow popups for this site");
            self.emit(EmbedEvent::PopupBlocked);
            return Err(EmbedError::PopupBlocked);
        }

        info!("Popup opened: {}", url);
        self.overlay.borrow_mut().set_mode(EmbedMode::Popup);
        self.emit(EmbedEvent::PopupOpened { url });
        Ok(())
    }

    /// Handle one `message` event.
    ///
    /// An `Err` means the message was discarded: untrusted origin or a
    /// payload that does not match its topic. Nothing changes in that case.
    pub fn on_message(&mut self, origin: &str, data: &Value) -> Result<(), EmbedError> {
        if origin == self.host_origin {
            if let Ok(ParsedMessage {
                message: InboundMessage::CloseDialog,
                ..
            }) = ParsedMessage::parse(data)
            {
                debug!("Close requested by host page");
                self.dismiss_overlay();
                return Ok(());
            }
        }

        if origin != self.remote_origin {
            warn!("Ignoring message from untrusted origin: {}", origin);
            return Err(EmbedError::UntrustedOrigin(origin.to_string()));
        }

        let parsed = ParsedMessage::parse(data).inspect_err(|e| {
            warn!("Discarding message from {}: {}", origin, e);
        })?;
        debug!("Received message: {}", data);
        self.dispatch(parsed);
        Ok(())
    }

    fn dispatch(&mut self, parsed: ParsedMessage) {
        let reply_id = parsed.id.as_deref();
        match parsed.message {
            InboundMessage::Connected { public_key } => {
                if let Some(op) = self
                    .pending
                    .resolve(reply_id, Some(OperationKind::Connect), false)
                {
                    self.finish(op);
                }
                info!("Wallet connected: {}", public_key);

                if self.overlay.borrow_mut().mark_ready() {
                    self.emit(EmbedEvent::SurfaceReady);
                }
                let address_changed = self.connection.address != public_key;
                self.connection.address = public_key;
                if address_changed && self.connection.status == ConnectionStatus::Connected {
                    self.emit(EmbedEvent::StatusChanged {
                        status: ConnectionStatus::Connected,
                        address: self.connection.address.clone(),
                    });
                }
                self.set_status(ConnectionStatus::Connected);
                self.dismiss_overlay();
            }
            InboundMessage::Rejected => {
                if let Some(op) = self
                    .pending
                    .resolve(reply_id, Some(OperationKind::Connect), true)
                {
                    self.finish(op);
                }
                info!("User rejected the request");
                self.set_status(ConnectionStatus::Disconnected);
                self.dismiss_overlay();
            }
            InboundMessage::Error { error, kind } => {
                if let Some(op) = self.pending.resolve(reply_id, None, true) {
                    self.finish(op);
                }
                warn!("Error from WebSig ({}): {}", kind, error);
                self.set_status(ConnectionStatus::Disconnected);
                // overlay stays open so the user can retry in place
                self.emit(EmbedEvent::RemoteError { error, kind });
            }
            InboundMessage::FallbackToPopup => {
                info!("{} - opening popup instead", EmbedError::RestrictedContext);
                self.dismiss_overlay();
                if self.open_popup().is_err() {
                    if let Some(op) = self.pending.take_by_kind(OperationKind::Connect) {
                        self.finish(op);
                    }
                    self.set_status(ConnectionStatus::Disconnected);
                }
            }
            InboundMessage::ShowIframe => {
                if let Err(e) = self.overlay.borrow_mut().present(OverlayVariant::Modal) {
                    warn!("Could not show overlay: {}", e);
                }
            }
            InboundMessage::HideIframe => self.dismiss_overlay(),
            InboundMessage::CloseDialog => {
                debug!("Ignoring close_dialog from remote origin");
            }
            InboundMessage::Unknown { topic } => {
                debug!("Ignoring unknown topic: {}", topic);
            }
        }
    }

    /// Deliver envelopes held while the frame was loading
    pub fn on_frame_loaded(&mut self) {
        if self.overlay.borrow_mut().mark_ready() {
            self.emit(EmbedEvent::SurfaceReady);
        }

        for envelope in std::mem::take(&mut self.deferred) {
            match self
                .host
                .post_message(MessageTarget::Frame, &envelope, &self.remote_origin)
            {
                Ok(()) => debug!("Delivered held {} ({})", envelope.topic, envelope.id),
                Err(e) => {
                    warn!("Could not deliver {}: {}", envelope.topic, e);
                    if let Some(op) = self.pending.take_by_id(&envelope.id) {
                        let kind = op.kind;
                        self.finish(op);
                        if kind == OperationKind::Connect {
                            self.set_status(ConnectionStatus::Disconnected);
                        }
                    }
                }
            }
        }
    }

    /// Expire an unanswered operation. Stale timers return `None`.
    pub fn on_timeout(&mut self, operation_id: &str) -> Option<EmbedError> {
        let operation = self.pending.take_by_id(operation_id)?;
        self.deferred.retain(|envelope| envelope.id != operation.id);
        warn!(
            "{} operation {} timed out after {}ms",
            operation.kind, operation.id, self.settings.handshake_timeout_ms
        );

        if operation.kind == OperationKind::Connect
            && self.connection.status == ConnectionStatus::Connecting
        {
            self.set_status(ConnectionStatus::Disconnected);
        }
        self.dismiss_overlay();
        self.emit(EmbedEvent::OperationTimedOut {
            id: operation.id.clone(),
            operation: operation.kind,
        });
        Some(EmbedError::Timeout(operation.id))
    }
}
