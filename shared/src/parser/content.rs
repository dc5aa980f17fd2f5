//! Access-log payload parser using nom.
//!
//! Parses payloads produced by an nginx `log_format` such as:
//! - `time:$request_time status=$status method="$request_method"`
//! - `time:0.000 status=304 method="GET" upstream="-"`
//!
//! `key:value` tokens are measurements, `key=value` tokens are labels. A
//! double-quoted section may contain whitespace without splitting the token.

use crate::models::ParsedRecord;
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, one_of},
    combinator::{all_consuming, eof, peek, recognize},
    multi::{many1, separated_list0},
    sequence::{delimited, terminated},
    IResult, Parser,
};
use thiserror::Error;

/// Errors that can occur while parsing a log payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentError {
    /// The payload is empty or contains only whitespace.
    #[error("Empty content")]
    EmptyContent,

    /// A token is neither `key:value` nor `key=value`, or its quoting is broken.
    #[error("Malformed token: '{0}'")]
    MalformedToken(String),

    /// A metric token carries a value that is not a finite number.
    #[error("Invalid value '{value}' for metric '{name}'")]
    InvalidMetricValue {
        /// The metric name.
        name: String,
        /// The value that failed to parse.
        value: String,
    },
}

/// Parses a log payload into measurements and labels.
///
/// Tokens are processed left to right and the first failing token decides
/// the error for the whole payload.
///
/// # Errors
///
/// Returns a `ContentError` if:
/// - The payload is empty
/// - A token has no `:`/`=` delimiter, an invalid key, or broken quoting
/// - A metric value is not a floating point number
///
/// # Examples
///
/// ```
/// use shared::parser::parse_content;
///
/// let record = parse_content(r#"time:0.25 status=200 method="GET""#).unwrap();
/// assert_eq!(record.metrics[0].name, "time");
/// assert_eq!(record.labels.get("method"), Some("GET"));
/// ```
pub fn parse_content(content: &str) -> Result<ParsedRecord, ContentError> {
    if content.trim().is_empty() {
        return Err(ContentError::EmptyContent);
    }

    let (remaining, raw_tokens) =
        tokens(content).map_err(|_| ContentError::MalformedToken(content.trim().to_string()))?;

    let mut record = ParsedRecord::default();
    for raw in raw_tokens {
        match classify(raw)? {
            Token::Metric(name, value) => record.push_metric(name, value),
            Token::Label(name, value) => record.labels.insert(name, value),
        }
    }

    if !remaining.is_empty() {
        let offending = remaining.split_whitespace().next().unwrap_or(remaining);
        return Err(ContentError::MalformedToken(offending.to_string()));
    }

    Ok(record)
}

enum Token<'a> {
    Metric(&'a str, f64),
    Label(&'a str, &'a str),
}

fn classify(raw: &str) -> Result<Token<'_>, ContentError> {
    let Ok((value, (name, delimiter))) = field(raw) else {
        return Err(ContentError::MalformedToken(raw.to_string()));
    };

    if delimiter == ':' {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| Token::Metric(name, v))
            .ok_or_else(|| ContentError::InvalidMetricValue {
                name: name.to_string(),
                value: value.to_string(),
            })
    } else {
        label_value(value)
            .map(|(_, v)| Token::Label(name, v))
            .map_err(|_| ContentError::MalformedToken(raw.to_string()))
    }
}

// ============================================================================
// Tokenizer
// ============================================================================

fn tokens(input: &str) -> IResult<&str, Vec<&str>> {
    delimited(
        multispace0,
        separated_list0(multispace1, token),
        multispace0,
    )
    .parse(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    terminated(
        recognize(many1(alt((bare, quoted)))),
        peek(alt((multispace1, eof))),
    )
    .parse(input)
}

fn bare(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !matches!(c, ' ' | '\t' | '\r' | '\n' | '"')).parse(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    recognize(delimited(char('"'), take_till(|c: char| c == '"'), char('"'))).parse(input)
}

// ============================================================================
// Token fields
// ============================================================================

fn field(input: &str) -> IResult<&str, (&str, char)> {
    (key, one_of(":=")).parse(input)
}

fn key(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_').parse(input)
}

fn label_value(input: &str) -> IResult<&str, &str> {
    all_consuming(alt((
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
        take_while(|c: char| c != '"'),
    )))
    .parse(input)
}

// ============================================================================
// Tests
// ============================================================================
