//! Relay throttling signals.
//!
//! The relay reports rate limiting through HTTP 429 and free-text
//! messages. All text matching lives here so the rest of the worker
//! deals only with [`ThrottleSignal`].

use std::time::Duration;

use super::quota::QUOTA_WINDOW;

/// Extra wait added on top of the relay's own reset hint.
pub const RESET_HINT_MARGIN: Duration = Duration::from_secs(5);

/// Wait used when the relay rate-limits without a reset hint.
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// Longest reset hint honoured. The quota window bounds any real reset.
pub const MAX_RESET_HINT: Duration = QUOTA_WINDOW;

const RATE_LIMIT_STATUS: u16 = 429;

/// Phrases that mark rate limiting in errors that carry no HTTP status.
const RATE_LIMIT_PHRASES: [&str; 3] = ["status 429", "http 429", "too many requests"];

const QUOTA_EXHAUSTED_MARKER: &str = "0 units remaining";

/// What a relay error says about throttling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleSignal {
    /// The call was rejected for rate reasons (HTTP 429).
    pub rate_limited: bool,
    /// Seconds until the limit resets, when the relay said so.
    pub reset_hint: Option<Duration>,
    /// The relay's hourly capacity is used up.
    pub quota_exhausted: bool,
}

impl ThrottleSignal {
    /// How long to wait before retrying, or `None` for non-retryable errors.
    pub fn backoff(&self) -> Option<Duration> {
        if !self.rate_limited {
            return None;
        }
        Some(
            self.reset_hint.map_or(DEFAULT_RATE_LIMIT_BACKOFF, |hint| {
                hint.min(MAX_RESET_HINT).saturating_add(RESET_HINT_MARGIN)
            }),
        )
    }
}

/// Inspect a relay error's status and message.
///
/// A known HTTP status decides rate limiting on its own; the text is
/// only consulted when there is no status.
pub fn classify_error(status: Option<u16>, message: &str) -> ThrottleSignal {
    let lower = message.to_ascii_lowercase();
    let rate_limited = match status {
        Some(code) => code == RATE_LIMIT_STATUS,
        None => RATE_LIMIT_PHRASES.iter().any(|p| lower.contains(p)),
    };

    ThrottleSignal {
        rate_limited,
        reset_hint: if rate_limited { parse_reset_hint(&lower) } else { None },
        quota_exhausted: lower.contains(QUOTA_EXHAUSTED_MARKER),
    }
}

/// Extract `N` from "... resets in N seconds ...".
pub fn parse_reset_hint(message: &str) -> Option<Duration> {
    let lower = message.to_ascii_lowercase();
    let (_, rest) = lower.split_once("resets in ")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let unit = rest[digits.len()..].trim_start();
    if !unit.starts_with("second") {
        return None;
    }
    digits.parse::<u64>().ok().map(Duration::from_secs)
}
