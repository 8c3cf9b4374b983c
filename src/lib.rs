//! # wsclose - Connection-Termination Core
//!
//! `wsclose` implements the close-handshake protocol for persistent,
//! full-duplex, message-oriented socket connections (modeled on the
//! WebSocket close handshake, RFC 6455 Section 7).
//!
//! Given a live, framed, bidirectional channel, the core drives the
//! connection to a single unambiguous terminal state under every
//! combination of cooperative close, protocol violation, oversized payload,
//! unresponsive peer, transport failure, and forced local shutdown - and
//! reports exactly one status code and reason to the application, exactly
//! once.
//!
//! ## Features
//!
//! - **One terminal outcome** - concurrent termination signals race through
//!   one atomically-guarded state transition; the first wins
//! - **Serialized callbacks** - `on_open`/`on_message`/`on_error`/`on_close`
//!   delivered in order from a single task, with errors strictly before the
//!   close and nothing after it
//! - **FIFO write pipeline** - one in-flight write at a time; the first
//!   failure is terminal
//! - **Idle timeout** - per-connection inactivity deadline, re-armed on
//!   activity, safely cancellable
//! - **Coordinated shutdown** - `ConnectionSet::stop_all` forces every
//!   tracked connection down and waits for each close to be delivered
//!
//! Framing, fragmentation, the upgrade handshake, and extension negotiation
//! are external collaborators reached through the [`FrameSink`] seam.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wsclose::{CloseCode, Config, Connection};
//!
//! let config = Config::new().with_idle_timeout(std::time::Duration::from_secs(30));
//! let conn = Connection::spawn(sink, handler, config);
//!
//! conn.close(CloseCode::Normal, "done")?;
//! conn.closed().await;
//! ```

pub mod close;
pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod set;

mod dispatch;

pub use close::{CloseCause, CloseCode, CloseFrame, CloseOutcome};
pub use config::Config;
pub use connection::{Connection, ConnectionState, FrameSink, OutboundFrame};
pub use dispatch::Handler;
pub use error::{Error, Result};
pub use message::Message;
pub use set::{ConnectionId, ConnectionSet};
