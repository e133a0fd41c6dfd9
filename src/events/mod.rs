//! Event handling module.
//!
//! This module contains the navigation script format and the handler that
//! replays its steps against a router driving the simulated browser.

mod error;
pub mod script;

pub use error::ScriptError;
