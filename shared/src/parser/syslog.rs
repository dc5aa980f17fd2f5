//! RFC 3164 (BSD syslog) frame parser using nom.
//!
//! nginx's `access_log syslog:` target emits frames such as:
//! - `<190>Feb 20 09:55:28 web-1 nginx: time:0.000 status=304`
//!
//! The parser is lenient past the priority: the timestamp is optional, a
//! frame whose first header word is already the tag gets an empty hostname,
//! and a frame without a recognisable tag gets an empty tag. Those cases are
//! left to the envelope validator to reject.

use crate::models::LogEnvelope;
use chrono::{Datelike, NaiveDateTime, Utc};
use nom::{
    bytes::complete::{take_till1, take_while1},
    character::complete::{alpha1, char, digit1, space0, space1},
    combinator::{map_opt, opt, recognize, rest},
    sequence::{delimited, preceded},
    IResult, Parser,
};
use thiserror::Error;

/// Highest valid syslog priority (facility 23, severity 7).
pub const MAX_PRIORITY: u8 = 191;

/// Errors that can occur while parsing a syslog frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyslogError {
    /// The frame is empty.
    #[error("Empty syslog frame")]
    EmptyFrame,

    /// The frame does not start with a valid `<PRI>` field.
    #[error("Invalid syslog priority in frame: '{0}'")]
    InvalidPriority(String),

    /// The header after the priority could not be read.
    #[error("Malformed syslog header: '{0}'")]
    MalformedHeader(String),
}

/// Parses one RFC 3164 frame into a `LogEnvelope`.
///
/// Trailing line terminators and NUL bytes are removed from the content.
///
/// # Errors
///
/// Returns a `SyslogError` if:
/// - The frame is empty
/// - The priority is missing or above 191
/// - Nothing follows the priority and timestamp
///
/// # Examples
///
/// ```
/// use shared::parser::parse_rfc3164;
///
/// let envelope = parse_rfc3164("<190>Feb 20 09:55:28 web-1 nginx: time:0.5 status=200").unwrap();
/// assert_eq!(envelope.tag, "nginx");
/// assert_eq!(envelope.hostname, "web-1");
/// assert_eq!(envelope.content, "time:0.5 status=200");
/// ```
pub fn parse_rfc3164(frame: &str) -> Result<LogEnvelope, SyslogError> {
    let frame = frame.trim_end_matches(['\n', '\r', '\0']);
    if frame.is_empty() {
        return Err(SyslogError::EmptyFrame);
    }

    let (input, pri) =
        priority(frame).map_err(|_| SyslogError::InvalidPriority(truncate(frame)))?;
    if pri > MAX_PRIORITY {
        return Err(SyslogError::InvalidPriority(truncate(frame)));
    }

    let (input, timestamp) = match timestamp(input) {
        Ok((input, ts)) => (input, Some(ts)),
        Err(_) => (input, None),
    };

    let (_, header) = header(input).map_err(|_| SyslogError::MalformedHeader(truncate(input)))?;

    let mut envelope =
        LogEnvelope::new(header.tag, header.hostname, header.content).with_priority(pri);
    if let Some(ts) = timestamp {
        envelope = envelope.with_timestamp(ts);
    }
    Ok(envelope)
}

fn truncate(input: &str) -> String {
    input.chars().take(64).collect()
}

struct Header<'a> {
    hostname: &'a str,
    tag: &'a str,
    content: &'a str,
}

// ============================================================================
// Priority and timestamp
// ============================================================================

fn priority(input: &str) -> IResult<&str, u8> {
    delimited(
        char('<'),
        map_opt(digit1, |d: &str| d.parse::<u8>().ok()),
        char('>'),
    )
    .parse(input)
}

fn timestamp(input: &str) -> IResult<&str, NaiveDateTime> {
    let (input, raw) = recognize((
        alpha1,
        space1,
        digit1,
        space1,
        digit1,
        char(':'),
        digit1,
        char(':'),
        digit1,
    ))
    .parse(input)?;
    let (input, _) = space1(input)?;

    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let stamped = format!("{} {normalized}", Utc::now().year());
    match NaiveDateTime::parse_from_str(&stamped, "%Y %b %d %H:%M:%S") {
        Ok(ts) => Ok((input, ts)),
        Err(_) => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::MapOpt,
        ))),
    }
}

// ============================================================================
// Hostname, tag and content
// ============================================================================

fn header(input: &str) -> IResult<&str, Header<'_>> {
    let (input, _) = space0(input)?;

    if let Ok((content, tag)) = tag_field(input) {
        return Ok((
            "",
            Header {
                hostname: "",
                tag,
                content,
            },
        ));
    }

    let (input, hostname) = take_till1(|c: char| c == ' ').parse(input)?;
    let (input, _) = space0(input)?;

    match tag_field(input) {
        Ok((content, tag)) => Ok((
            "",
            Header {
                hostname,
                tag,
                content,
            },
        )),
        Err(_) => Ok((
            "",
            Header {
                hostname,
                tag: "",
                content: input,
            },
        )),
    }
}

/// Reads `tag:` or `tag[pid]:` plus one optional space and returns the rest as content.
fn tag_field(input: &str) -> IResult<&str, &str> {
    let (input, tag) = take_while1(|c: char| !matches!(c, ':' | '[' | ' ')).parse(input)?;
    let (input, _) = opt(delimited(char('['), digit1, char(']'))).parse(input)?;
    let (_, content) = preceded((char(':'), opt(char(' '))), rest).parse(input)?;
    Ok((content, tag))
}
