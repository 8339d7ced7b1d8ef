//! WebSocket message types.

use bytes::Bytes;

/// WebSocket message type.
#[derive(Debug, Clone)]
pub enum Message {
    /// Text message (UTF-8). Every runtime envelope travels as one of these.
    Text(String),
    /// Binary message
    Binary(Bytes),
    /// Ping frame
    Ping(Vec<u8>),
    /// Pong frame
    Pong(Vec<u8>),
    /// Close frame with optional code and reason
    Close(Option<CloseFrame>),
}

/// Close frame data.
#[derive(Debug, Clone)]
pub struct CloseFrame {
    /// Close code (RFC 6455)
    pub code: CloseCode,
    /// Close reason (optional UTF-8 string)
    pub reason: String,
}

impl CloseFrame {
    /// Create a new close frame.
    pub fn new(code: CloseCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// WebSocket close code (RFC 6455). The client only ever sends `NORMAL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseCode(pub u16);

impl CloseCode {
    /// Normal closure
    pub const NORMAL: Self = Self(1000);
}

impl Message {
    /// Text payload, also accepting binary frames that hold valid UTF-8.
    pub fn into_text(self) -> Option<String> {
        match self {
            Message::Text(s) => Some(s),
            Message::Binary(b) => String::from_utf8(b.to_vec()).ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_text() {
        let binary = Message::Binary(Bytes::from_static(b"{\"a\":1}"));
        assert_eq!(binary.into_text().as_deref(), Some("{\"a\":1}"));

        let invalid = Message::Binary(Bytes::from_static(&[0xff, 0xfe]));
        assert_eq!(invalid.into_text(), None);

        assert_eq!(Message::Ping(vec![1]).into_text(), None);
    }

    #[test]
    fn test_close_frame() {
        let frame = CloseFrame::new(CloseCode::NORMAL, "bye");
        assert_eq!(frame.code, CloseCode::NORMAL);
        assert_eq!(frame.reason, "bye");
        assert_eq!(frame.code.0, 1000);
    }
}
