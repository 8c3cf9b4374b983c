//! Configuration for the connection-termination core.

use std::time::Duration;

use crate::error::Error;

/// Per-connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum inactivity window before the connection is forcibly closed.
    ///
    /// Re-armed on every inbound frame and every successful outbound write.
    /// `None` disables the idle monitor.
    ///
    /// Default: None
    pub idle_timeout: Option<Duration>,

    /// Maximum size of a complete inbound message in bytes.
    ///
    /// Messages above this cap terminate the connection with code 1009.
    ///
    /// Default: 64 MB (64 * 1024 * 1024)
    pub max_message_size: usize,

    /// Bound on how long a coordinated `stop_all` waits for each tracked
    /// connection to finish closing.
    ///
    /// Default: 5 seconds
    pub stop_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            idle_timeout: None,
            max_message_size: 64 * 1024 * 1024,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the idle timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum inbound message size.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the bound for coordinated shutdown waits.
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Validate that a message size is within the configured cap.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds the maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<(), Error> {
        if size > self.max_message_size {
            Err(Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }
}
