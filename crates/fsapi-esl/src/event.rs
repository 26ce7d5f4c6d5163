//! ESL message parsing and representation
//!
//! Every frame read from the event socket (greeting, command reply, api
//! response, disconnect notice) is held as an [`EslEvent`]: URL-decoded
//! headers plus an optional body.

use crate::constants::{
    CONTENT_TYPE_API_RESPONSE, CONTENT_TYPE_AUTH, CONTENT_TYPE_DISCONNECT, CONTENT_TYPE_REPLY,
    ERROR_MARKERS,
};
use crate::error::EslError;
use std::collections::HashMap;
use std::fmt;

/// A parsed ESL frame
#[derive(Debug, Clone, Default)]
pub struct EslEvent {
    /// Frame headers (key-value pairs)
    headers: HashMap<String, String>,

    /// Frame body, present when the frame carried `Content-Length`
    body: Option<String>,
}

impl EslEvent {
    /// Build an event from a header block only
    pub fn from_headers(head: &str) -> Self {
        let mut headers = HashMap::new();

        for line in head.lines() {
            // Parse header line: "Key: Value"
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().to_string();
                let value = value.trim();

                let decoded_value = urlencoding::decode(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string());

                headers.insert(key, decoded_value);
            }
        }

        Self {
            headers,
            body: None,
        }
    }

    /// Get a header value by name
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Get frame body
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Set the body
    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = Some(body.into());
    }

    /// Get content type
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("Content-Type")
    }

    /// Get content length
    pub fn content_length(&self) -> Option<usize> {
        self.get_header("Content-Length")
            .and_then(|s| s.parse().ok())
    }

    /// Get reply text
    pub fn reply_text(&self) -> Option<&str> {
        self.get_header("Reply-Text")
    }

    /// Check if this is an auth request (connection greeting)
    pub fn is_auth_request(&self) -> bool {
        self.content_type() == Some(CONTENT_TYPE_AUTH)
    }

    /// Check if this frame answers a command
    pub fn is_reply(&self) -> bool {
        matches!(
            self.content_type(),
            Some(CONTENT_TYPE_REPLY) | Some(CONTENT_TYPE_API_RESPONSE)
        )
    }

    /// Check if the switch is closing the socket
    pub fn is_disconnect_notice(&self) -> bool {
        self.content_type() == Some(CONTENT_TYPE_DISCONNECT)
    }

    /// Check if command was successful (starts with +OK)
    pub fn is_ok(&self) -> bool {
        self.reply_text()
            .map(|t| t.starts_with("+OK"))
            .unwrap_or(false)
    }

    /// Error status carried by the reply text or, for api responses, the
    /// first line of the body
    pub fn error_message(&self) -> Option<String> {
        let is_marker = |text: &str| ERROR_MARKERS.iter().any(|m| text.starts_with(m));

        if let Some(text) = self.reply_text().filter(|t| is_marker(t)) {
            return Some(text.to_string());
        }

        self.body()
            .map(str::trim_start)
            .filter(|b| is_marker(b))
            .map(|b| b.lines().next().unwrap_or(b).trim_end().to_string())
    }

    /// Normalize the frame into the single payload string callers receive
    ///
    /// Prefers a non-empty body and falls back to the reply text.
    pub fn into_reply(self) -> Result<String, EslError> {
        if let Some(message) = self.error_message() {
            return Err(EslError::Remote(message));
        }

        match self.body {
            Some(body) if !body.is_empty() => Ok(body),
            _ => Ok(self
                .headers
                .get("Reply-Text")
                .cloned()
                .unwrap_or_default()),
        }
    }
}

impl fmt::Display for EslEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EslEvent {{")?;

        if let Some(content_type) = self.content_type() {
            write!(f, " Content-Type: {}", content_type)?;
        }

        if let Some(reply) = self.reply_text() {
            write!(f, ", Reply-Text: {}", reply)?;
        }

        write!(
            f,
            ", Headers: {}, Body: {} bytes }}",
            self.headers.len(),
            self.body.as_ref().map_or(0, String::len)
        )
    }
}
