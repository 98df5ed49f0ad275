//! Notification message encoding.
//!
//! A message is one or more `KEY=VALUE` fields joined with `\n`. No trailing
//! terminator is written.

use std::fmt;

use crate::notify::NotifyError;

/// An immutable, non-empty notification payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationMessage {
    bytes: Vec<u8>,
}

impl NotificationMessage {
    /// Wrap a raw payload. Empty payloads are rejected.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, NotifyError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(NotifyError::InvalidArgument("notification message must not be empty"));
        }
        Ok(Self { bytes })
    }

    /// Start building a message field by field.
    pub fn builder() -> MessageBuilder {
        MessageBuilder::default()
    }

    /// `READY=1`
    pub fn ready() -> Self {
        Self::from_static("READY=1")
    }

    /// `STOPPING=1`
    pub fn stopping() -> Self {
        Self::from_static("STOPPING=1")
    }

    /// `DEBUG=1`
    pub fn debug_enabled() -> Self {
        Self::from_static("DEBUG=1")
    }

    /// `RELOADING=1` paired with the monotonic timestamp the reload started at.
    pub fn reloading(monotonic_usec: u64) -> Self {
        Self {
            bytes: format!("RELOADING=1\nMONOTONIC_USEC={monotonic_usec}").into_bytes(),
        }
    }

    fn from_static(text: &'static str) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
        }
    }

    /// Raw wire bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Parsed `(key, value)` pairs. Lines that are not valid UTF-8 or lack `=` are skipped.
    pub fn fields(&self) -> Vec<(&str, &str)> {
        self.bytes
            .split(|b| *b == b'\n')
            .filter_map(|line| std::str::from_utf8(line).ok())
            .filter_map(|line| line.split_once('='))
            .collect()
    }

    /// Value of the first field named `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields().into_iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    /// Key of the first field, used to label metrics and logs.
    pub fn kind(&self) -> &str {
        self.fields().first().map(|(k, _)| *k).unwrap_or("RAW")
    }
}

impl fmt::Display for NotificationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.bytes).escape_debug())
    }
}

/// Builder that validates each field before it is encoded.
#[derive(Debug, Default)]
pub struct MessageBuilder {
    fields: Vec<String>,
}

impl MessageBuilder {
    /// Append a `KEY=VALUE` field.
    pub fn field(mut self, key: &str, value: impl fmt::Display) -> Result<Self, NotifyError> {
        validate_key(key)?;
        let value = value.to_string();
        if value.contains('\n') {
            return Err(NotifyError::InvalidField {
                key: key.to_string(),
                reason: "value must not contain a newline",
            });
        }
        self.fields.push(format!("{key}={value}"));
        Ok(self)
    }

    /// Append a field given in `KEY=VALUE` form, as typed on a command line.
    pub fn assignment(self, assignment: &str) -> Result<Self, NotifyError> {
        match assignment.split_once('=') {
            Some((key, value)) => self.field(key, value),
            None => Err(NotifyError::InvalidField {
                key: assignment.to_string(),
                reason: "expected KEY=VALUE",
            }),
        }
    }

    /// Finish the message. A builder with no fields yields `InvalidArgument`.
    pub fn build(self) -> Result<NotificationMessage, NotifyError> {
        NotificationMessage::new(self.fields.join("\n"))
    }
}

fn validate_key(key: &str) -> Result<(), NotifyError> {
    let reason = if key.is_empty() {
        "key must not be empty"
    } else if !key.is_ascii() {
        "key must be ASCII"
    } else if key.contains('=') || key.contains('\n') {
        "key must not contain '=' or a newline"
    } else {
        return Ok(());
    };

    Err(NotifyError::InvalidField {
        key: key.to_string(),
        reason,
    })
}
