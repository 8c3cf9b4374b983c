//! Error types for the connection-termination core.
//!
//! Every error here is terminal: none of these conditions is retried, and
//! each maps to exactly one close outcome reported to the application.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for termination-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Terminal conditions that drive a connection to `Closed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Protocol violation detected (malformed close frame, invalid code).
    ///
    /// Not emitted through `on_error`; protocol violations surface as the
    /// close outcome's cause. The variant exists for applications that map
    /// causes back to errors.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Inbound message size exceeds the configured maximum.
    #[error("Message size {size} exceeds maximum size {max}")]
    MessageTooLarge {
        /// Actual message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Peer severed the raw transport without completing the close handshake.
    #[error("Disconnected: {0}")]
    PeerAbort(String),

    /// Transmission on the outbound channel failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    /// Idle deadline elapsed before the close handshake completed.
    #[error("Timeout on read: no activity for {after:?}")]
    IdleTimeout {
        /// The configured inactivity window.
        after: Duration,
    },

    /// Connection was terminated by a coordinated local shutdown.
    ///
    /// Not emitted through `on_error`; a coordinated shutdown reports only
    /// the close outcome. The variant exists for applications that map
    /// causes back to errors.
    #[error("Shutdown: {0}")]
    ForcedShutdown(String),

    /// Close code is reserved and must not be sent.
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// Operation attempted after the connection stopped accepting it.
    #[error("Connection closed: {0:?}")]
    ConnectionClosed(Option<u16>),

    /// I/O error from the underlying channel.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::MessageTooLarge {
            size: 126_976,
            max: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Message size 126976 exceeds maximum size 1024"
        );
    }

    #[test]
    fn test_timeout_display_mentions_timeout() {
        let err = Error::IdleTimeout {
            after: Duration::from_millis(500),
        };
        assert!(err.to_string().contains("Timeout"));
    }

    #[test]
    fn test_cause_mapped_variants_display() {
        let err = Error::ProtocolViolation("invalid close code".into());
        assert_eq!(err.to_string(), "Protocol violation: invalid close code");

        let err = Error::ForcedShutdown("stop requested".into());
        assert_eq!(err.to_string(), "Shutdown: stop requested");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_clone() {
        let err = Error::PeerAbort("EOF".into());
        let cloned = err.clone();
        assert_eq!(err, cloned);
    }
}
