//! Connection lifecycle and the close-handshake state machine.
//!
//! One `Connection` owns one close state machine plus three collaborator
//! tasks: the event dispatcher (serialized callbacks), the outbound write
//! pipeline (FIFO frames onto the [`FrameSink`]), and the idle timeout
//! monitor.
//!
//! ## Termination lifecycle
//!
//! 1. **Open** - live, full-duplex traffic
//! 2. **ClosingLocal** - local close frame sent, awaiting the peer
//! 3. **ClosingRemote** - peer close frame received and echoed
//! 4. **Closed** - terminal; outcome fixed and reported exactly once

mod idle;
mod machine;
mod state;
pub(crate) mod writer;

pub use state::ConnectionState;
pub use writer::{FrameSink, OutboundFrame};

#[allow(clippy::module_inception)]
mod connection;

pub use connection::Connection;
