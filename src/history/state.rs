//! Navigation state types.
//!
//! This module contains the value type stored on the history stack and the
//! screen-mode marker derived from its layout parameter.

use serde::Serialize;

/// Specifying how much of a flexible column layout is shown full screen.
///
/// Ordering matters: a lower mode is considered less detailed than a higher
/// one when states are compared.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Serialize)]
pub enum ScreenMode {
    Normal,
    MidColumnFullScreen,
    EndColumnFullScreen,
}

impl ScreenMode {
    /// Map a layout parameter value to its screen mode. Unknown or absent
    /// layouts are `Normal`.
    ///
    pub fn from_layout(layout: Option<&str>) -> Self {
        match layout {
            Some("MidColumnFullScreen") => ScreenMode::MidColumnFullScreen,
            Some("EndColumnFullScreen") => ScreenMode::EndColumnFullScreen,
            _ => ScreenMode::Normal,
        }
    }
}

/// One entry of the logical navigation history.
///
/// Everything except `preserved` and the focus fields is derived from `hash`
/// and must not change once the state is on the stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationState {
    pub hash: String,
    pub keys: Vec<String>,
    pub layout: Option<String>,
    pub screen_mode: ScreenMode,
    pub preserved: bool,
    pub focus_control_id: Option<String>,
    pub focus_info: Option<serde_json::Value>,
}

impl NavigationState {
    /// Return the focus annotation of this state, if any.
    ///
    pub fn focus(&self) -> Option<(&str, Option<&serde_json::Value>)> {
        self.focus_control_id
            .as_deref()
            .map(|id| (id, self.focus_info.as_ref()))
    }

    /// Copy the focus annotation of another state onto this one.
    ///
    pub fn inherit_focus(&mut self, other: &NavigationState) {
        self.focus_control_id = other.focus_control_id.clone();
        self.focus_info = other.focus_info.clone();
    }
}
