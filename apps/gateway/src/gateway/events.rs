//! Wire format of relayed chat messages and close codes.

use axum::extract::ws::Utf8Bytes;

use super::connection::Outbound;

/// Close codes (4000-range for application-level).
pub const CLOSE_INVALID_PAYLOAD: u16 = 4000;
pub const CLOSE_IDLE_TIMEOUT: u16 = 4009;

/// A chat message received from a client, e.g. `{"content":"hi"}`.
///
/// Any JSON value is accepted. The original text is kept so recipients get
/// exactly the bytes the sender wrote.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    raw: Utf8Bytes,
}

impl ChatMessage {
    /// Validate that `text` is a JSON document.
    pub fn parse(text: Utf8Bytes) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<serde::de::IgnoredAny>(text.as_str())?;
        Ok(Self { raw: text })
    }

    pub fn as_str(&self) -> &str {
        self.raw.as_str()
    }

    /// The frame delivered to each recipient.
    pub fn frame(&self) -> Outbound {
        self.raw.clone()
    }
}
