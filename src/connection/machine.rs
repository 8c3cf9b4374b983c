//! The close state machine: single source of truth for a connection's
//! termination.
//!
//! Seven signal sources feed this machine concurrently: the application's
//! close request, the peer's close frame, transport EOF, oversized-message
//! reports, write failures, the idle timeout, and coordinated shutdown. Each
//! transition is applied atomically under one mutex, so the first signal to
//! move the state out of a non-`Closed` state wins and every later signal is
//! a silent no-op. The terminal [`CloseOutcome`] is fixed at most once.

use std::sync::Mutex;

use crate::close::{CloseCause, CloseCode, CloseFrame, CloseOutcome};
use crate::config::Config;
use crate::connection::idle::IdleHandle;
use crate::connection::state::ConnectionState;
use crate::connection::writer::{OutboundFrame, WriteHandle};
use crate::dispatch::{Event, EventSender};
use crate::error::{Error, Result};
use crate::message::Message;

struct Inner {
    state: ConnectionState,
    outcome: Option<CloseOutcome>,
    /// The locally initiated close frame, once one has been queued. When the
    /// peer echoes a close back, the local intent wins the handshake.
    local_close: Option<CloseFrame>,
}

/// Per-connection termination state machine.
pub struct CloseStateMachine {
    config: Config,
    inner: Mutex<Inner>,
    events: EventSender,
    writer: WriteHandle,
    idle: IdleHandle,
}

impl CloseStateMachine {
    pub(crate) fn new(
        config: Config,
        events: EventSender,
        writer: WriteHandle,
        idle: IdleHandle,
    ) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: ConnectionState::Open,
                outcome: None,
                local_close: None,
            }),
            events,
            writer,
            idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.lock().unwrap().state
    }

    /// The fixed terminal outcome, if one has been set.
    pub fn outcome(&self) -> Option<CloseOutcome> {
        self.inner.lock().unwrap().outcome.clone()
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// Application-requested close. Valid only from `Open`; a repeat call or
    /// a call racing a termination signal is a no-op.
    pub(crate) fn initiate_local_close(&self, code: CloseCode, reason: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != ConnectionState::Open {
            return Ok(());
        }
        if code.is_reserved() {
            return Err(Error::InvalidCloseCode(code.as_u16()));
        }

        let frame = CloseFrame::new(code, reason);
        inner.local_close = Some(frame.clone());
        inner.state = ConnectionState::ClosingLocal;
        self.writer.enqueue(OutboundFrame::Close(frame));
        Ok(())
    }

    /// Peer close frame arrived from the framing layer.
    pub(crate) fn on_remote_close_frame(&self, frame: Option<CloseFrame>) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            ConnectionState::Open => {
                let (echo, outcome) = match frame {
                    Some(cf) if cf.code.is_valid() => (
                        CloseFrame::new(cf.code, cf.reason.clone()),
                        CloseOutcome::new(cf.code, cf.reason, CloseCause::Normal),
                    ),
                    Some(cf) => (
                        CloseFrame::new(CloseCode::ProtocolError, "Invalid close code"),
                        CloseOutcome::new(
                            cf.code,
                            format!("Invalid close code: {}", cf.code.as_u16()),
                            CloseCause::ProtocolViolation,
                        ),
                    ),
                    None => (
                        CloseFrame::new(CloseCode::Normal, ""),
                        CloseOutcome::new(CloseCode::Normal, "", CloseCause::Normal),
                    ),
                };
                Self::fix_outcome(&mut inner, outcome);
                inner.state = ConnectionState::ClosingRemote;
                self.writer.enqueue(OutboundFrame::Close(echo));
                self.idle.on_activity();
            }
            ConnectionState::ClosingLocal => {
                // Handshake complete; the locally initiated code and reason
                // win over whatever the peer echoed.
                let local = inner
                    .local_close
                    .clone()
                    .unwrap_or_else(|| CloseFrame::new(CloseCode::Normal, ""));
                let outcome = CloseOutcome::new(local.code, local.reason, CloseCause::Normal);
                self.terminate(&mut inner, outcome, None);
            }
            ConnectionState::ClosingRemote | ConnectionState::Closed => {}
        }
    }

    /// Peer closed the raw transport without a close frame, or after one.
    pub(crate) fn on_transport_eof(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.is_active() {
            return;
        }
        // From `ClosingRemote` this completes an already-acknowledged close
        // and the standing outcome is kept; otherwise the EOF is abnormal.
        let outcome = CloseOutcome::new(
            CloseCode::Abnormal,
            "Disconnected: read EOF before close handshake completed",
            CloseCause::PeerAbort,
        );
        self.terminate(&mut inner, outcome, None);
    }

    /// Framing layer reports an inbound message beyond the configured cap.
    pub(crate) fn on_oversized_message(&self, actual: usize) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state != ConnectionState::Open {
            return;
        }

        let error = Error::MessageTooLarge {
            size: actual,
            max: self.config.max_message_size,
        };
        let reason = error.to_string();
        Self::fix_outcome(
            &mut inner,
            CloseOutcome::new(CloseCode::MessageTooBig, &reason, CloseCause::OversizedMessage),
        );
        let frame = CloseFrame::new(CloseCode::MessageTooBig, reason);
        inner.local_close = Some(frame.clone());
        inner.state = ConnectionState::ClosingLocal;
        self.events.enqueue(Event::Error(error));
        self.writer.enqueue(OutboundFrame::Close(frame));
    }

    /// Write pipeline reports a failed transmission. Terminal immediately;
    /// no further write is attempted.
    pub(crate) fn on_write_failure(&self, err: Error) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.is_active() {
            return;
        }

        // Abnormal if the failure struck before any local close frame was in
        // flight; shutdown if one already was.
        let code = if inner.state == ConnectionState::ClosingLocal {
            CloseCode::Shutdown
        } else {
            CloseCode::Abnormal
        };
        let failure = Error::WriteFailure(err.to_string());
        let outcome = CloseOutcome::new(code, failure.to_string(), CloseCause::WriteFailure);
        self.terminate(&mut inner, outcome, Some(failure));
    }

    /// Idle deadline elapsed without the close handshake completing.
    pub(crate) fn on_idle_timeout(&self) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.is_active() {
            return;
        }

        let error = Error::IdleTimeout {
            after: self.config.idle_timeout.unwrap_or_default(),
        };
        let outcome = CloseOutcome::new(CloseCode::Shutdown, error.to_string(), CloseCause::Timeout);
        self.terminate(&mut inner, outcome, Some(error));
    }

    /// Coordinated local shutdown. Terminates without waiting for the peer.
    pub(crate) fn force_shutdown(&self, reason: &str) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.state.is_active() {
            return;
        }

        let outcome = CloseOutcome::new(CloseCode::Shutdown, reason, CloseCause::LocalShutdown);
        self.terminate(&mut inner, outcome, None);
    }

    /// Queue a data message for transmission.
    pub(crate) fn send(&self, message: Message) -> Result<()> {
        let inner = self.inner.lock().unwrap();
        if !inner.state.can_send() {
            return Err(Error::ConnectionClosed(
                inner.outcome.as_ref().map(|o| o.code.as_u16()),
            ));
        }
        self.config.check_message_size(message.len())?;
        self.writer.enqueue(OutboundFrame::Data(message));
        Ok(())
    }

    /// A complete inbound data message arrived.
    pub(crate) fn on_message(&self, payload: Message) {
        {
            let inner = self.inner.lock().unwrap();
            if !inner.state.can_receive() {
                return;
            }
        }
        if self.config.check_message_size(payload.len()).is_err() {
            self.on_oversized_message(payload.len());
            return;
        }
        self.idle.on_activity();
        self.events.enqueue(Event::Message(payload));
    }

    /// Fix the terminal outcome if none is set yet. Later attempts never
    /// overwrite an earlier one.
    fn fix_outcome(inner: &mut Inner, outcome: CloseOutcome) {
        inner.outcome.get_or_insert(outcome);
    }

    /// Move to `Closed`, cancel the deadline, sever the transport, and queue
    /// the error (if any) strictly before the single close event.
    fn terminate(&self, inner: &mut Inner, outcome: CloseOutcome, error: Option<Error>) {
        debug_assert!(inner.state != ConnectionState::Closed);
        Self::fix_outcome(inner, outcome);
        inner.state = ConnectionState::Closed;
        self.idle.cancel();
        self.writer.sever();
        if let Some(error) = error {
            self.events.enqueue(Event::Error(error));
        }
        // fix_outcome above guarantees this is always Some.
        if let Some(fixed) = inner.outcome.clone() {
            self.events.enqueue(Event::Closed(fixed));
        }
    }
}
