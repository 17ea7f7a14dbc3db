//! `Set-Cookie` scanning for the session id and the saved view.

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "JSESSIONID";
/// Cookie carrying the saved view preferences
pub const VIEW_COOKIE: &str = "myview";

/// Value of cookie `name` in a raw `Set-Cookie` value (`name=value; Path=/`),
/// cut at the first `;`.
pub fn cookie_value<'a>(set_cookie: &'a str, name: &str) -> Option<&'a str> {
    let (key, rest) = set_cookie.split_once('=')?;
    if key.trim() != name {
        return None;
    }
    let value = rest.split(';').next().unwrap_or_default();
    Some(value.trim())
}

/// Scan every `Set-Cookie` header for `name`.
///
/// Header values that are not visible ASCII are skipped. The first match wins.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|raw| match raw.to_str() {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("Skipping unreadable Set-Cookie header: {}", e);
                None
            }
        })
        .find_map(|raw| cookie_value(raw, name))
        .map(str::to_string)
}
