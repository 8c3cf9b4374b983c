//! Event dispatch to the application.
//!
//! All callbacks for one connection are invoked from a single task, so the
//! application sees them strictly serialized. The ordering contract:
//! `on_open` first, any `on_error` caused by a termination trigger strictly
//! before the single `on_close`, and nothing at all after `on_close`.

use tokio::sync::{mpsc, watch};

use crate::close::{CloseCode, CloseOutcome};
use crate::error::Error;
use crate::message::Message;

/// Application callback interface.
///
/// One implementation instance per connection. `on_close` is invoked exactly
/// once, carrying the final status code and reason; no other callback fires
/// after it.
pub trait Handler: Send + 'static {
    /// Connection is live and events will follow.
    fn on_open(&mut self) {}

    /// A complete data message arrived.
    fn on_message(&mut self, _payload: Message) {}

    /// A terminal condition occurred. Always followed by `on_close`.
    fn on_error(&mut self, _error: &Error) {}

    /// The connection reached its terminal state. Invoked exactly once.
    fn on_close(&mut self, _code: CloseCode, _reason: &str) {}
}

/// Events queued for serialized delivery to the [`Handler`].
#[derive(Debug)]
pub(crate) enum Event {
    Open,
    Message(Message),
    Error(Error),
    Closed(CloseOutcome),
}

/// Sender half of the per-connection event queue.
///
/// Sends never block; a send after the dispatcher has exited is dropped.
#[derive(Debug, Clone)]
pub(crate) struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn enqueue(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

/// Serializes callback delivery for one connection.
pub(crate) struct EventDispatcher<H> {
    rx: mpsc::UnboundedReceiver<Event>,
    handler: H,
    delivered: watch::Sender<bool>,
}

impl<H: Handler> EventDispatcher<H> {
    /// Create a dispatcher and its event-queue sender.
    ///
    /// `delivered` flips to `true` only after the handler's `on_close`
    /// returns, which is what coordinated shutdown waits on.
    pub(crate) fn new(handler: H, delivered: watch::Sender<bool>) -> (Self, EventSender) {
        let (sender, rx) = EventSender::channel();
        (
            Self {
                rx,
                handler,
                delivered,
            },
            sender,
        )
    }

    /// Drain the event queue until the close event has been delivered.
    ///
    /// Exiting drops the receiver, so any late event a timer or delayed frame
    /// produces is discarded rather than delivered.
    pub(crate) async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            match event {
                Event::Open => self.handler.on_open(),
                Event::Message(payload) => self.handler.on_message(payload),
                Event::Error(error) => self.handler.on_error(&error),
                Event::Closed(outcome) => {
                    self.handler.on_close(outcome.code, &outcome.reason);
                    let _ = self.delivered.send(true);
                    return;
                }
            }
        }
    }
}
