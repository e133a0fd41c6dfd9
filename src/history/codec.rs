//! Hash state codec.
//!
//! Pure functions converting between raw hash fragments and
//! [`NavigationState`] values, and editing the query parameters the
//! reconciler cares about (session token, restore marker).

use super::state::{NavigationState, ScreenMode};
use log::*;
use regex::Regex;
use std::sync::OnceLock;

/// Query parameter carrying the server-side session (draft) handle.
///
pub const SESSION_TOKEN_PARAM: &str = "sap-iapp-state";

/// Query parameter carrying the flexible column layout.
///
pub const LAYOUT_PARAM: &str = "layout";

/// Marker appended to a hash when the history must be rebuilt on arrival.
///
pub const RESTORE_MARKER: &str = "restoreHistory=true";

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Failed to compile regex pattern '{}': {}", pattern, e);
            None
        }
    }
}

fn layout_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| compile(&format!(r"(?:^|&){}=([A-Za-z]*)", LAYOUT_PARAM)))
        .as_ref()
}

fn session_token_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| compile(&format!(r"(?:^|&){}=([^&]*)", regex::escape(SESSION_TOKEN_PARAM))))
        .as_ref()
}

/// Split a hash into its path and its query part (without the `?`).
///
fn split_query(hash: &str) -> (&str, Option<&str>) {
    match hash.find('?') {
        Some(index) => (&hash[..index], Some(&hash[index + 1..])),
        None => (hash, None),
    }
}

/// Rebuild a hash from its path and the surviving query parameters.
///
fn join_query(path: &str, params: &[&str]) -> String {
    if params.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, params.join("&"))
    }
}

/// Drop every query parameter for which `remove` returns true, keeping the
/// remaining query well formed.
///
fn remove_params<F>(hash: &str, remove: F) -> String
where
    F: Fn(&str) -> bool,
{
    let (path, query) = split_query(hash);
    match query {
        None => hash.to_string(),
        Some(query) => {
            let kept: Vec<&str> = query
                .split('&')
                .filter(|param| !param.is_empty() && !remove(param))
                .collect();
            join_query(path, &kept)
        }
    }
}

fn is_param(param: &str, name: &str) -> bool {
    param == name
        || param
            .strip_prefix(name)
            .map_or(false, |rest| rest.starts_with('='))
}

/// Return the path part of a hash (everything before the first `?`).
///
pub fn strip_query(hash: &str) -> &str {
    split_query(hash).0
}

/// Parse a hash fragment into a navigation state.
///
/// Keys are the non-empty path segments, each cut before its first `(` so
/// that key predicates such as `(ID='1')` are ignored.
pub fn parse_state(hash: &str) -> NavigationState {
    let (path, query) = split_query(hash);

    let keys = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.find('(') {
            Some(index) => segment[..index].to_string(),
            None => segment.to_string(),
        })
        .collect();

    let layout = query.and_then(|query| {
        layout_pattern()
            .and_then(|re| re.captures(query))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|layout| !layout.is_empty())
    });
    let screen_mode = ScreenMode::from_layout(layout.as_deref());

    NavigationState {
        hash: hash.to_string(),
        keys,
        layout,
        screen_mode,
        preserved: false,
        focus_control_id: None,
        focus_info: None,
    }
}

/// Return the session token embedded in a hash, if any.
///
pub fn find_session_token(hash: &str) -> Option<String> {
    let (_, query) = split_query(hash);
    query
        .and_then(|query| session_token_pattern().and_then(|re| re.captures(query)))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|token| !token.is_empty())
}

/// Return the hash without its session token parameter.
///
pub fn remove_session_token(hash: &str) -> String {
    remove_params(hash, |param| is_param(param, SESSION_TOKEN_PARAM))
}

/// Return the hash with its session token set to `token`. An existing token
/// is replaced in place, otherwise the parameter is appended.
///
pub fn set_session_token(hash: &str, token: &str) -> String {
    let (path, query) = split_query(hash);
    let entry = format!("{}={}", SESSION_TOKEN_PARAM, token);
    match query {
        None => format!("{}?{}", path, entry),
        Some(query) => {
            let mut replaced = false;
            let mut params: Vec<String> = query
                .split('&')
                .filter(|param| !param.is_empty())
                .map(|param| {
                    if !replaced && is_param(param, SESSION_TOKEN_PARAM) {
                        replaced = true;
                        entry.clone()
                    } else {
                        param.to_string()
                    }
                })
                .collect();
            if !replaced {
                params.push(entry);
            }
            let params: Vec<&str> = params.iter().map(String::as_str).collect();
            join_query(path, &params)
        }
    }
}

/// Whether the hash asks for the history to be rebuilt.
///
pub fn has_restore_marker(hash: &str) -> bool {
    split_query(hash)
        .1
        .map_or(false, |query| query.split('&').any(|param| param == RESTORE_MARKER))
}

/// Return the hash without its restore marker.
///
pub fn remove_restore_marker(hash: &str) -> String {
    remove_params(hash, |param| param == RESTORE_MARKER)
}
