//! Logical navigation history.
//!
//! This module contains the toolkit-independent part of the reconciler:
//! - Hash state codec (`codec`)
//! - State comparator (`compare`)
//! - History stack manager (`stack`)
//! - Navigation guard (`guard`)
//! - History error handling

pub mod codec;
mod compare;
mod error;
mod guard;
mod stack;
mod state;

pub use compare::{compare, StateRelation};
pub use error::HistoryError;
pub use guard::NavigationGuard;
pub use stack::{HistoryAction, HistoryStack, ReconcileOptions, Reconciliation};
pub use state::{NavigationState, ScreenMode};
