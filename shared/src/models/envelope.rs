//! Transport envelope model.
//!
//! Defines `LogEnvelope`, the typed form of one message received from the
//! syslog transport. The transport adapter builds envelopes; the core never
//! sees untyped transport data.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message received from the log transport.
///
/// # Example
///
/// ```
/// use shared::models::LogEnvelope;
///
/// let envelope = LogEnvelope::new("nginx", "web-1", "time:0.5 status=200")
///     .with_client("10.0.0.7:51234");
///
/// assert_eq!(envelope.tag, "nginx");
/// assert_eq!(envelope.client.as_deref(), Some("10.0.0.7:51234"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEnvelope {
    /// The syslog tag (program name) of the sender.
    pub tag: String,

    /// The hostname reported in the syslog header.
    pub hostname: String,

    /// The raw message payload.
    pub content: String,

    /// Syslog facility decoded from the priority.
    pub facility: u8,

    /// Syslog severity decoded from the priority.
    pub severity: u8,

    /// Timestamp from the syslog header, if one was present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,

    /// Address of the peer that sent the message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,

    /// When the exporter received the message.
    pub received_at: DateTime<Utc>,
}

impl LogEnvelope {
    /// Creates a new envelope received now, with `local7.info` priority.
    #[must_use]
    pub fn new(
        tag: impl Into<String>,
        hostname: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            hostname: hostname.into(),
            content: content.into(),
            facility: 23,
            severity: 6,
            timestamp: None,
            client: None,
            received_at: Utc::now(),
        }
    }

    /// Sets facility and severity from a syslog priority value.
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.facility = priority / 8;
        self.severity = priority % 8;
        self
    }

    /// Sets the header timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    /// Returns the syslog priority value.
    #[must_use]
    pub fn priority(&self) -> u16 {
        u16::from(self.facility) * 8 + u16::from(self.severity)
    }
}
