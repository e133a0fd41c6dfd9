//! History-specific error types.

/// Errors that can occur while synchronizing the history with the host.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The host dropped a popstate listener before firing it
    #[error("Popstate listener dropped while going back {steps} step(s)")]
    PopStateListenerDropped { steps: usize },
}
