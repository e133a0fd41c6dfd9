//! Keeps a single-page application's logical navigation stack in sync with
//! the browser's native history.
//!
//! [`history`] holds the pure parts (hash codec, state comparison, the
//! history stack and the navigation guard). [`router`] drives a
//! [`router::HistoryHost`] from them, and [`app`] replays scripted sessions
//! against a simulated browser.

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod history;
pub mod logger;
pub mod router;
