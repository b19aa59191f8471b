/*!
 * Content reference resolution.
 *
 * Turns what the user typed (a video serial or an anime page URL) into the
 * numeric serial the danmu API expects.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::errors::AppError;

static DIGITS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

fn is_serial(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Resolve a reference to a video serial
///
/// A numeric input is returned unchanged. For an http(s) URL the `sn` query
/// parameter wins, then `videoSn`, then the last run of digits in the path.
pub fn resolve_reference(input: &str) -> Result<String, AppError> {
    let input = input.trim();
    if is_serial(input) {
        return Ok(input.to_string());
    }

    let url = Url::parse(input).map_err(|_| AppError::InvalidReference(input.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::InvalidReference(input.to_string()));
    }

    for key in ["sn", "videoSn"] {
        if let Some((_, value)) = url.query_pairs().find(|(k, _)| k == key) {
            let value = value.trim();
            if is_serial(value) {
                return Ok(value.to_string());
            }
        }
    }

    DIGITS_REGEX
        .find_iter(url.path())
        .last()
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| AppError::InvalidReference(input.to_string()))
}
