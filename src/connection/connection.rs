//! The public connection facade.
//!
//! `Connection` wires one close state machine to its three collaborators
//! (event dispatcher, write pipeline, idle monitor), each running on its own
//! tokio task, and exposes the signal entry points the external framing
//! layer and the application drive.

use std::sync::Arc;

use tokio::sync::watch;

use crate::close::{CloseCode, CloseFrame, CloseOutcome};
use crate::config::Config;
use crate::connection::idle::IdleMonitor;
use crate::connection::machine::CloseStateMachine;
use crate::connection::state::ConnectionState;
use crate::connection::writer::{FrameSink, WritePipeline};
use crate::dispatch::{Event, EventDispatcher, Handler};
use crate::error::Result;
use crate::message::Message;

/// One live socket session.
///
/// Cheap to clone; all clones share the same state machine. The external
/// framing layer feeds inbound reports through `on_message`,
/// `on_close_frame`, `on_transport_eof` and `on_oversized_message`; the
/// application drives `send` and `close`. Every termination path converges
/// on a single `on_close` callback carrying the final [`CloseOutcome`].
///
/// ## Example
///
/// ```rust,ignore
/// use wsclose::{Config, Connection, CloseCode};
///
/// let conn = Connection::spawn(sink, handler, Config::default());
/// conn.close(CloseCode::Normal, "done")?;
/// conn.closed().await;
/// ```
#[derive(Clone)]
pub struct Connection {
    machine: Arc<CloseStateMachine>,
    delivered: watch::Receiver<bool>,
}

impl Connection {
    /// Create a connection over an already-negotiated framed channel.
    ///
    /// Spawns the dispatcher, write pipeline, and idle monitor tasks; must
    /// be called within a tokio runtime. The handler's `on_open` fires
    /// before any other event.
    pub fn spawn<S, H>(sink: S, handler: H, config: Config) -> Self
    where
        S: FrameSink,
        H: Handler,
    {
        let (delivered_tx, delivered) = watch::channel(false);
        let (dispatcher, events) = EventDispatcher::new(handler, delivered_tx);
        let (pipeline, writer) = WritePipeline::new(sink);
        let (monitor, idle) = IdleMonitor::new(config.idle_timeout);

        let machine = Arc::new(CloseStateMachine::new(config, events.clone(), writer, idle.clone()));

        events.enqueue(Event::Open);
        tokio::spawn(dispatcher.run());
        tokio::spawn(pipeline.run(machine.clone(), idle));
        tokio::spawn(monitor.run(machine.clone()));

        Self { machine, delivered }
    }

    /// Current termination state.
    pub fn state(&self) -> ConnectionState {
        self.machine.state()
    }

    /// Check if the connection is fully open.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// The fixed terminal outcome, once one has been set.
    pub fn outcome(&self) -> Option<CloseOutcome> {
        self.machine.outcome()
    }

    /// This connection's configuration.
    pub fn config(&self) -> &Config {
        self.machine.config()
    }

    /// Queue a data message for FIFO transmission.
    ///
    /// ## Errors
    ///
    /// - [`Error::ConnectionClosed`](crate::Error::ConnectionClosed) if the
    ///   state no longer allows sending
    /// - [`Error::MessageTooLarge`](crate::Error::MessageTooLarge) if the
    ///   payload exceeds the configured cap
    pub fn send(&self, message: Message) -> Result<()> {
        self.machine.send(message)
    }

    /// Initiate the close handshake.
    ///
    /// Queues a close frame and returns without waiting for the peer's
    /// reply; handshake completion is signalled asynchronously through the
    /// handler. A no-op unless the connection is still `Open`.
    ///
    /// ## Errors
    ///
    /// Returns [`Error::InvalidCloseCode`](crate::Error::InvalidCloseCode)
    /// if `code` is reserved and must not be sent.
    pub fn close(&self, code: CloseCode, reason: &str) -> Result<()> {
        self.machine.initiate_local_close(code, reason)
    }

    /// Report a complete inbound data message from the framing layer.
    ///
    /// Delivered to the handler unless the connection has reached `Closed`.
    /// A payload beyond the configured cap terminates the connection with
    /// code 1009 instead of delivering the message.
    pub fn on_message(&self, payload: Message) {
        self.machine.on_message(payload);
    }

    /// Report a peer close frame from the framing layer.
    pub fn on_close_frame(&self, frame: Option<CloseFrame>) {
        self.machine.on_remote_close_frame(frame);
    }

    /// Report that the peer closed the raw transport.
    pub fn on_transport_eof(&self) {
        self.machine.on_transport_eof();
    }

    /// Report an oversized inbound message the framing layer refused to
    /// assemble.
    pub fn on_oversized_message(&self, actual: usize) {
        self.machine.on_oversized_message(actual);
    }

    /// Terminate immediately without waiting for the peer's close frame.
    ///
    /// Used by [`ConnectionSet::stop_all`](crate::ConnectionSet::stop_all)
    /// during coordinated shutdown; also callable directly.
    pub fn force_shutdown(&self, reason: &str) {
        self.machine.force_shutdown(reason);
    }

    /// Wait until the terminal `on_close` callback has been delivered.
    pub async fn closed(&self) {
        let mut delivered = self.delivered.clone();
        let _ = delivered.wait_for(|d| *d).await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::close::CloseCause;
    use crate::connection::writer::tests::RecordingSink;
    use crate::connection::writer::OutboundFrame;
    use crate::error::Error;
    use std::sync::Mutex;

    #[derive(Debug, PartialEq, Eq)]
    enum Seen {
        Open,
        Message(String),
        Error(Error),
        Close(u16, String),
    }

    struct TrackingHandler {
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    impl TrackingHandler {
        fn new() -> (Self, Arc<Mutex<Vec<Seen>>>) {
            let seen = Arc::new(Mutex::new(Vec::new()));
            (Self { seen: seen.clone() }, seen)
        }
    }

    impl Handler for TrackingHandler {
        fn on_open(&mut self) {
            self.seen.lock().unwrap().push(Seen::Open);
        }
        fn on_message(&mut self, payload: Message) {
            self.seen
                .lock()
                .unwrap()
                .push(Seen::Message(payload.as_text().unwrap_or("<bin>").into()));
        }
        fn on_error(&mut self, error: &Error) {
            self.seen.lock().unwrap().push(Seen::Error(error.clone()));
        }
        fn on_close(&mut self, code: CloseCode, reason: &str) {
            self.seen
                .lock()
                .unwrap()
                .push(Seen::Close(code.as_u16(), reason.into()));
        }
    }

    #[tokio::test]
    async fn test_cooperative_close_keeps_local_reason() {
        let (sink, frames, mut shutdown) = RecordingSink::new(None);
        let (handler, seen) = TrackingHandler::new();
        let conn = Connection::spawn(sink, handler, Config::default());

        conn.close(CloseCode::Normal, "send-more-frames").unwrap();
        conn.on_message(Message::text("Hello"));
        conn.on_message(Message::text("World"));
        conn.on_close_frame(Some(CloseFrame::new(CloseCode::Normal, "")));
        conn.closed().await;
        // The pipeline drains independently of callback delivery.
        shutdown.wait_for(|s| *s).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], Seen::Open);
        assert_eq!(seen[1], Seen::Message("Hello".into()));
        assert_eq!(seen[2], Seen::Message("World".into()));
        assert_eq!(seen[3], Seen::Close(1000, "send-more-frames".into()));

        let frames = frames.lock().unwrap();
        assert!(matches!(
            frames[0],
            OutboundFrame::Close(ref cf) if cf.reason == "send-more-frames"
        ));
    }

    #[tokio::test]
    async fn test_peer_abort_reports_abnormal_close() {
        let (sink, _frames, _shutdown) = RecordingSink::new(None);
        let (handler, seen) = TrackingHandler::new();
        let conn = Connection::spawn(sink, handler, Config::default());

        conn.close(CloseCode::Normal, "abort").unwrap();
        conn.on_transport_eof();
        conn.closed().await;

        let seen = seen.lock().unwrap();
        let Seen::Close(code, reason) = seen.last().unwrap() else {
            panic!("expected close event");
        };
        assert_eq!(*code, 1006);
        assert!(reason.contains("EOF") || reason.contains("Disconnected"));
        assert_eq!(conn.outcome().unwrap().cause, CloseCause::PeerAbort);
    }

    #[tokio::test]
    async fn test_transport_severed_on_close() {
        let (sink, _frames, mut shutdown) = RecordingSink::new(None);
        let (handler, _seen) = TrackingHandler::new();
        let conn = Connection::spawn(sink, handler, Config::default());

        conn.force_shutdown("Shutdown");
        conn.closed().await;

        shutdown.wait_for(|s| *s).await.unwrap();
        assert_eq!(conn.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn test_no_delivery_after_close() {
        let (sink, _frames, _shutdown) = RecordingSink::new(None);
        let (handler, seen) = TrackingHandler::new();
        let conn = Connection::spawn(sink, handler, Config::default());

        conn.force_shutdown("Shutdown");
        conn.closed().await;

        conn.on_message(Message::text("late"));
        conn.on_close_frame(Some(CloseFrame::new(CloseCode::Normal, "late")));
        conn.on_transport_eof();
        tokio::task::yield_now().await;

        let seen = seen.lock().unwrap();
        assert!(matches!(seen.last().unwrap(), Seen::Close(1001, _)));
        let closes = seen.iter().filter(|s| matches!(s, Seen::Close(..))).count();
        assert_eq!(closes, 1);
    }
}
