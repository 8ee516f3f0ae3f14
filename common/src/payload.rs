// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Decoder for the legacy tracker payload.
//!
//! The tracker posts a form encoded body such as `id=7&points=48.68+11.29&acc=5`.
//! Only the `points` field is consulted. Its value is a `+` separated list of
//! decimal numbers of which the first is the latitude and the second the longitude.

use crate::position::Position;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::warn;

const POINTS_FIELD: &str = "points";

/// The raw request body as received from the tracking client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload(String);

impl RawPayload {
    pub fn new(body: impl Into<String>) -> Self {
        RawPayload(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawPayload {
    fn from(body: String) -> Self {
        RawPayload(body)
    }
}

impl From<&str> for RawPayload {
    fn from(body: &str) -> Self {
        RawPayload(body.to_owned())
    }
}

/// Errors that terminate the parsing of a single payload.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The payload has no `points` field.
    #[error("payload has no \"points\" field")]
    MissingField,

    /// The `points` field holds less than two numbers.
    #[error("payload holds {0} coordinate(s), at least 2 are required")]
    InsufficientCoordinates(usize),

    /// A token of the `points` field is not a decimal number.
    #[error("payload token \"{0}\" is not a number")]
    MalformedNumber(String),
}

/// How tokens that are not finite decimal numbers are handled.
///
/// `NaN` and infinities are treated like any other malformed token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumberPolicy {
    /// Reject the payload with [`ParseError::MalformedNumber`].
    #[default]
    Strict,
    /// Replace the token with `0.0`, as older tracker firmware expects.
    Lenient,
}

/// Parser for the tracker payload with a configured [`NumberPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadParser {
    policy: NumberPolicy,
}

impl PayloadParser {
    pub fn new(policy: NumberPolicy) -> Self {
        PayloadParser { policy }
    }

    pub fn policy(&self) -> NumberPolicy {
        self.policy
    }

    /// Parses the payload and stamps the position with the current time.
    pub fn parse(&self, raw: &RawPayload) -> Result<Position, ParseError> {
        self.parse_at(raw, Utc::now())
    }

    /// Parses the payload and stamps the position with `received_at`.
    ///
    /// The payload does not carry a time of its own; the receive time is the
    /// only timestamp a position ever gets.
    pub fn parse_at(
        &self,
        raw: &RawPayload,
        received_at: DateTime<Utc>,
    ) -> Result<Position, ParseError> {
        let value = points_value(raw.as_str()).ok_or(ParseError::MissingField)?;
        let points = self.numbers(value)?;
        match points.as_slice() {
            [latitude, longitude, ..] => Ok(Position::new(*latitude, *longitude, received_at)),
            _ => Err(ParseError::InsufficientCoordinates(points.len())),
        }
    }

    fn numbers(&self, value: &str) -> Result<Vec<f64>, ParseError> {
        value
            .split('+')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| match token.parse::<f64>().ok().filter(|n| n.is_finite()) {
                Some(number) => Ok(number),
                None if self.policy == NumberPolicy::Lenient => {
                    warn!("Payload token \"{token}\" is not a number, using 0");
                    Ok(0.0)
                }
                None => Err(ParseError::MalformedNumber(token.to_owned())),
            })
            .collect()
    }
}

/// Parses the payload with the [`NumberPolicy::Strict`] policy.
pub fn parse(raw: &RawPayload) -> Result<Position, ParseError> {
    PayloadParser::default().parse(raw)
}

/// Returns the value of the first `points` segment of the body.
fn points_value(body: &str) -> Option<&str> {
    body.trim()
        .split('&')
        .map(|segment| segment.split_once('=').unwrap_or((segment, "")))
        .find(|(key, _)| *key == POINTS_FIELD)
        .map(|(_, value)| value)
}
