//! Connection termination state machine states.

/// Lifecycle state of a connection's close handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum ConnectionState {
    /// Connection is open; no close handshake in progress.
    #[default]
    Open,
    /// Local close frame sent, awaiting the peer's close frame or transport
    /// termination.
    ClosingLocal,
    /// Peer's close frame received and echoed; awaiting transport termination.
    ClosingRemote,
    /// Handshake completed or abandoned. Terminal; the outcome is fixed.
    Closed,
}

impl ConnectionState {
    /// Check if the connection has not yet reached its terminal state.
    #[must_use]
    #[inline]
    pub const fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }

    /// Check if sending data is allowed in this state.
    ///
    /// Returns `true` only for `Open`.
    #[must_use]
    #[inline]
    pub const fn can_send(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }

    /// Check if receiving data is allowed in this state.
    ///
    /// A half-closed connection still accepts inbound data until the peer's
    /// reply completes the handshake.
    #[must_use]
    #[inline]
    pub const fn can_receive(&self) -> bool {
        !matches!(self, ConnectionState::Closed)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Open => write!(f, "Open"),
            ConnectionState::ClosingLocal => write!(f, "ClosingLocal"),
            ConnectionState::ClosingRemote => write!(f, "ClosingRemote"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}
