//! Navigation guard.
//!
//! A guard marks a checkpoint hash; navigating to a hash outside of it needs
//! an explicit confirmation from the user. The crossing flag is advisory:
//! callers set it once the user has confirmed and read it back, the guard
//! itself never blocks anything.

use super::stack::HistoryStack;

/// Marker separating the shell part of a hash from the application part.
///
const APP_HASH_SEPARATOR: &str = "&/";

#[derive(Debug, Default, Clone)]
pub struct NavigationGuard {
    guard_hash: Option<String>,
    crossing_allowed: bool,
}

impl NavigationGuard {
    pub fn new() -> Self {
        NavigationGuard::default()
    }

    /// Establish a guard at `hash`. The query part is dropped unless the hash
    /// ends right after the `?`.
    ///
    pub fn set_guard(&mut self, hash: &str) {
        let guard_hash = match hash.find('?') {
            Some(index) if index < hash.len() - 1 => &hash[..index],
            _ => hash,
        };
        self.guard_hash = Some(guard_hash.to_string());
        self.crossing_allowed = false;
    }

    pub fn clear_guard(&mut self) {
        self.guard_hash = None;
    }

    pub fn has_guard(&self) -> bool {
        self.guard_hash.is_some()
    }

    pub fn guard_hash(&self) -> Option<&str> {
        self.guard_hash.as_deref()
    }

    /// Whether `hash` stays inside the guard. Always true without a guard.
    ///
    pub fn check_hash(&self, hash: &str) -> bool {
        let guard_hash = match &self.guard_hash {
            Some(guard_hash) => guard_hash,
            None => return true,
        };
        let hash = match hash.find(APP_HASH_SEPARATOR) {
            Some(index) => &hash[index + APP_HASH_SEPARATOR.len()..],
            None => hash,
        };
        let hash = hash.strip_prefix('/').unwrap_or(hash);
        hash.starts_with(guard_hash.as_str())
    }

    /// Record that the user confirmed leaving the guarded area.
    ///
    pub fn allow_crossing(&mut self) {
        self.crossing_allowed = true;
    }

    pub fn is_crossing_allowed(&self) -> bool {
        self.crossing_allowed
    }

    /// Predict whether going back from `current_hash` would leave the guard.
    ///
    pub fn would_exit_on_back(&self, current_hash: &str, stack: &HistoryStack) -> bool {
        match stack.previous_hash_of(current_hash) {
            Some(previous) => !self.check_hash(previous),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::codec::parse_state;
    use crate::history::stack::ReconcileOptions;

    #[test]
    fn test_no_guard_accepts_everything() {
        let guard = NavigationGuard::new();
        assert!(!guard.has_guard());
        assert!(guard.check_hash("anything"));
    }

    #[test]
    fn test_prefix_check() {
        let mut guard = NavigationGuard::new();
        guard.set_guard("Products('1')/Items");
        assert!(guard.check_hash("Products('1')/Items/Sub"));
        assert!(!guard.check_hash("Products('2')"));
    }

    #[test]
    fn test_set_guard_strips_query() {
        let mut guard = NavigationGuard::new();
        guard.set_guard("A/B?sap-iapp-state=T1");
        assert_eq!(guard.guard_hash(), Some("A/B"));
        assert!(guard.check_hash("A/B/C?sap-iapp-state=T9"));

        guard.set_guard("A/B?");
        assert_eq!(guard.guard_hash(), Some("A/B?"));
    }

    #[test]
    fn test_check_hash_normalizes_candidate() {
        let mut guard = NavigationGuard::new();
        guard.set_guard("A/B");
        assert!(guard.check_hash("/A/B/C"));
        assert!(guard.check_hash("Shell-display&/A/B/C"));
        assert!(!guard.check_hash("Shell-display&/X"));
    }

    #[test]
    fn test_crossing_flag_resets_on_set() {
        let mut guard = NavigationGuard::new();
        guard.set_guard("A");
        guard.allow_crossing();
        assert!(guard.is_crossing_allowed());
        guard.set_guard("B");
        assert!(!guard.is_crossing_allowed());
        guard.clear_guard();
        assert!(!guard.has_guard());
    }

    #[test]
    fn test_would_exit_on_back() {
        let mut stack = HistoryStack::new("A", false);
        stack.reconcile("A", parse_state("A/B"), ReconcileOptions::default());
        stack.reconcile("A/B", parse_state("A/B/C"), ReconcileOptions::default());

        let mut guard = NavigationGuard::new();
        guard.set_guard("A/B");
        assert!(!guard.would_exit_on_back("A/B/C", &stack));
        assert!(guard.would_exit_on_back("A/B", &stack));
        assert!(guard.would_exit_on_back("A", &stack));
    }
}
