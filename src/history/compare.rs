//! State comparator.
//!
//! Defines the partial order the stack manager uses to decide whether an
//! entry is still a valid fallback for an incoming state.

use super::state::NavigationState;
use serde::Serialize;

/// Relationship of a state `a` to a state `b`.
///
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum StateRelation {
    /// Same keys, same screen mode, same layout.
    Equal,
    /// Same keys and screen mode, different layout.
    Compatible,
    /// `a` shows less of the same drill-down than `b`.
    Ancestor,
    Different,
}

/// Classify how `a` relates to `b`.
///
pub fn compare(a: &NavigationState, b: &NavigationState) -> StateRelation {
    if a.keys.len() > b.keys.len() {
        return StateRelation::Different;
    }

    if a.keys.iter().zip(b.keys.iter()).any(|(ka, kb)| ka != kb) {
        return StateRelation::Different;
    }

    if a.keys.len() < b.keys.len() || a.screen_mode < b.screen_mode {
        return StateRelation::Ancestor;
    }

    if a.screen_mode > b.screen_mode {
        return StateRelation::Different;
    }

    if a.layout == b.layout {
        StateRelation::Equal
    } else {
        StateRelation::Compatible
    }
}
