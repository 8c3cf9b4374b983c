//! Data message payloads delivered by the framing layer.
//!
//! Framing, fragmentation reassembly and control-frame handling live outside
//! this crate; what arrives here is a complete text or binary message.

use bytes::Bytes;

/// A complete data message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// A text message (UTF-8 encoded).
    Text(String),
    /// A binary message (arbitrary bytes).
    Binary(Bytes),
}

impl Message {
    /// Create a text message.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Message::Text(s.into())
    }

    /// Create a binary message.
    #[must_use]
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Message::Binary(data.into())
    }

    /// Returns `true` if this is a text message.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Message::Text(_))
    }

    /// Returns `true` if this is a binary message.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Message::Binary(_))
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Message::Text(s) => s.len(),
            Message::Binary(b) => b.len(),
        }
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the text content, if this is a text message.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(_) => None,
        }
    }

    /// Borrow the binary content, if this is a binary message.
    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Message::Text(_) => None,
            Message::Binary(data) => Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_text_creation() {
        let msg = Message::text("hello");
        assert!(msg.is_text());
        assert_eq!(msg.as_text(), Some("hello"));
        assert_eq!(msg.len(), 5);
    }

    #[test]
    fn test_message_binary_creation() {
        let msg = Message::binary(vec![1u8, 2, 3]);
        assert!(msg.is_binary());
        assert_eq!(msg.as_binary(), Some([1u8, 2, 3].as_slice()));
        assert_eq!(msg.len(), 3);
    }

    #[test]
    fn test_message_empty() {
        assert!(Message::text("").is_empty());
        assert!(!Message::binary(vec![0u8]).is_empty());
    }

    #[test]
    fn test_message_accessor_mismatch() {
        assert_eq!(Message::text("hello").as_binary(), None);
        assert_eq!(Message::binary(vec![1u8]).as_text(), None);
    }
}
