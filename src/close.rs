//! Close status codes, close frames, and the terminal outcome of a connection.
//!
//! Status codes mirror the RFC 6455 Section 7.4 registry. The
//! [`CloseOutcome`] is the single, immutable result a connection reports to
//! the application when it terminates.

/// Close status code per RFC 6455 Section 7.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum CloseCode {
    /// Normal closure (1000). The close handshake completed cooperatively.
    #[default]
    Normal,
    /// Going away / shutdown (1001). Endpoint is going away (forced local
    /// shutdown, idle timeout, server stop).
    Shutdown,
    /// Protocol error (1002). Peer sent a malformed frame or violated the protocol.
    ProtocolError,
    /// Unsupported data (1003). Endpoint received a data type it cannot handle.
    UnsupportedData,
    /// Abnormal closure (1006). Transport dropped without a close frame.
    /// Never sent on the wire; reported locally only.
    Abnormal,
    /// Invalid payload (1007). Message contained invalid data for its type.
    InvalidPayload,
    /// Policy violation (1008).
    PolicyViolation,
    /// Message too big (1009). Inbound message exceeded the configured cap.
    MessageTooBig,
    /// Internal error (1011). Endpoint hit an unexpected condition.
    InternalError,
    /// Any other code (registered 1010/1012-1014, application 3000-4999, or invalid).
    Other(u16),
}

impl CloseCode {
    /// Create a `CloseCode` from its numeric value.
    #[must_use]
    pub const fn from_u16(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::Shutdown,
            1002 => CloseCode::ProtocolError,
            1003 => CloseCode::UnsupportedData,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::InvalidPayload,
            1008 => CloseCode::PolicyViolation,
            1009 => CloseCode::MessageTooBig,
            1011 => CloseCode::InternalError,
            other => CloseCode::Other(other),
        }
    }

    /// Get the numeric value of this close code.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::Shutdown => 1001,
            CloseCode::ProtocolError => 1002,
            CloseCode::UnsupportedData => 1003,
            CloseCode::Abnormal => 1006,
            CloseCode::InvalidPayload => 1007,
            CloseCode::PolicyViolation => 1008,
            CloseCode::MessageTooBig => 1009,
            CloseCode::InternalError => 1011,
            CloseCode::Other(code) => *code,
        }
    }

    /// Check if this close code is valid in a received close frame per
    /// RFC 6455 Section 7.4.1.
    ///
    /// Valid: 1000-1003, 1007-1014, 3000-4999. Everything else (including
    /// the reserved 1004-1006 and 1015) must not appear on the wire.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        let code = self.as_u16();
        matches!(code, 1000..=1003 | 1007..=1014 | 3000..=4999)
    }

    /// Check if this close code is reserved and must not be sent in a close
    /// frame (1004-1006, 1015).
    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        let code = self.as_u16();
        matches!(code, 1004..=1006 | 1015)
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

/// Close frame payload: status code and optional reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    /// The close status code.
    pub code: CloseCode,
    /// Human-readable reason for closing (UTF-8, max 123 bytes on the wire).
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame with the given code and reason.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// What triggered a connection's termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CloseCause {
    /// Cooperative close handshake.
    Normal,
    /// Peer severed the transport without a close frame.
    PeerAbort,
    /// Peer sent a malformed close frame or invalid close code.
    ProtocolViolation,
    /// Inbound message exceeded the configured size cap.
    OversizedMessage,
    /// Idle deadline elapsed.
    Timeout,
    /// Outbound transmission failed.
    WriteFailure,
    /// Coordinated local shutdown.
    LocalShutdown,
}

/// The terminal outcome of a connection: status code, reason, and cause.
///
/// Set at most once per connection. Once fixed it is never overwritten, no
/// matter how many later termination signals arrive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOutcome {
    /// The final close status code.
    pub code: CloseCode,
    /// Human-readable reason.
    pub reason: String,
    /// Which signal fixed this outcome.
    pub cause: CloseCause,
}

impl CloseOutcome {
    /// Create a new outcome.
    #[must_use]
    pub fn new(code: CloseCode, reason: impl Into<String>, cause: CloseCause) -> Self {
        Self {
            code,
            reason: reason.into(),
            cause,
        }
    }
}
