//! Argument extraction shared by the tools.
//!
//! Each helper returns the failure as an [`Outcome`] so tool bodies can
//! bail out with `?` from a `Result<Outcome, Outcome>` helper.

use std::time::Duration;
use serde_json::Value;
use super::Outcome;

/// A non-blank string argument that must be present
pub(crate) fn required_str<'a>(
    params: &'a Value,
    key: &str,
    action: Option<&str>,
) -> Result<&'a str, Outcome> {
    optional_str(params, key).ok_or_else(|| Outcome::missing(key, action))
}

/// A string argument; blank strings count as absent
pub(crate) fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

/// A positive timeout in seconds, given as a number or numeric string
pub(crate) fn optional_secs(params: &Value, key: &str) -> Result<Option<Duration>, Outcome> {
    let secs = match params.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    let invalid = || {
        Outcome::invalid(key, format!("'{}' must be a positive number of seconds", key))
    };
    match secs {
        Some(secs) if secs > 0.0 => Duration::try_from_secs_f64(secs)
            .map(Some)
            .map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}
