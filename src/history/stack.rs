//! History stack manager.
//!
//! Owns the logical navigation history and decides, for every incoming
//! state, which native history operation brings the browser back in line
//! with it. Native history can only push, replace the top entry or move the
//! cursor back, so interior entries are never removed: popping more than one
//! logical entry turns into a relative "go back" followed, when needed, by a
//! replace.

use super::codec::{self, find_session_token, remove_session_token, set_session_token};
use super::compare::{compare, StateRelation};
use super::state::NavigationState;
use log::*;
use serde::Serialize;

/// Native history operation required after a reconciliation.
///
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HistoryAction {
    /// Push the new top entry.
    Append,
    /// Replace the current native entry with the new top entry.
    Replace,
    /// The native history already shows the new top entry.
    None,
    /// Go back `steps` entries; the target hash is already there.
    Back { steps: usize },
    /// Go back `steps` entries, then replace the entry reached.
    BackReplace { steps: usize },
}

impl HistoryAction {
    fn from_pop_count(pop_count: usize, has_same_hash: bool) -> Self {
        match (pop_count, has_same_hash) {
            (0, _) => HistoryAction::Append,
            (1, true) => HistoryAction::None,
            (1, false) => HistoryAction::Replace,
            (n, true) => HistoryAction::Back { steps: n - 1 },
            (n, false) => HistoryAction::BackReplace { steps: n - 1 },
        }
    }

    /// Whether applying this action moves the native cursor backwards.
    ///
    pub fn goes_back(&self) -> bool {
        matches!(
            self,
            HistoryAction::Back { .. } | HistoryAction::BackReplace { .. }
        )
    }
}

/// Flags steering a single reconciliation.
///
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcileOptions {
    /// Rebuild the history from the current stack without first syncing it
    /// to the observed hash.
    pub rebuild_only: bool,
    /// Keep the current top entry even if the new state is unrelated.
    pub preserve_top: bool,
    /// Ignore preserved entries while pruning.
    pub disable_preservation: bool,
}

/// Outcome of a reconciliation.
///
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Reconciliation {
    pub action: HistoryAction,
    pub pop_count: usize,
    /// The stack lost track of the observed hash and was reseeded from it.
    pub recovered: bool,
}

/// Logical navigation history.
///
#[derive(Debug, Clone)]
pub struct HistoryStack {
    entries: Vec<NavigationState>,
    session_token: Option<String>,
    fcl_enabled: bool,
}

impl HistoryStack {
    /// Return a new stack seeded with the state of `initial_hash`.
    ///
    /// With `fcl_enabled` every state carries its own session token, so
    /// tokens are never copied from a replaced entry.
    pub fn new(initial_hash: &str, fcl_enabled: bool) -> Self {
        HistoryStack {
            entries: vec![codec::parse_state(initial_hash)],
            session_token: find_session_token(initial_hash),
            fcl_enabled,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[NavigationState] {
        &self.entries
    }

    pub fn last_entry(&self) -> Option<&NavigationState> {
        self.entries.last()
    }

    /// Session token of the most recently pushed state.
    ///
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }

    pub fn fcl_enabled(&self) -> bool {
        self.fcl_enabled
    }

    /// Bring the stack in line with `new_state` and return the native history
    /// operation that mirrors the change.
    ///
    /// `current_hash` is the hash the browser shows right now; unless
    /// `rebuild_only` is set, entries above it are dropped first so that
    /// navigation that bypassed the stack (reload, browser buttons) is
    /// accounted for.
    pub fn reconcile(
        &mut self,
        current_hash: &str,
        mut new_state: NavigationState,
        options: ReconcileOptions,
    ) -> Reconciliation {
        let mut pop_count = if options.rebuild_only { 1 } else { 0 };
        let mut recovered = false;

        if !options.rebuild_only {
            while self
                .entries
                .last()
                .map_or(false, |top| top.hash != current_hash)
            {
                self.entries.pop();
                pop_count += 1;
            }
            if self.entries.is_empty() {
                warn!(
                    "Current hash '{}' not found in history, reseeding stack",
                    current_hash
                );
                self.entries.push(codec::parse_state(current_hash));
                recovered = true;
            }
        }

        if options.preserve_top && !options.disable_preservation {
            if let Some(top) = self.entries.last_mut() {
                top.preserved = true;
            }
        }

        let mut last_removed: Option<NavigationState> = None;
        while let Some(top) = self.entries.last() {
            if (options.disable_preservation || !top.preserved)
                && compare(top, &new_state) != StateRelation::Ancestor
            {
                last_removed = self.entries.pop();
                pop_count += 1;
            } else if top.preserved
                && remove_session_token(&top.hash) == remove_session_token(&new_state.hash)
            {
                last_removed = self.entries.pop();
                pop_count += 1;
                new_state.preserved = true;
                break;
            } else {
                break;
            }
        }

        self.session_token = find_session_token(&new_state.hash);
        if !self.fcl_enabled && self.session_token.is_none() {
            if let Some(removed) = &last_removed {
                let relation = compare(removed, &new_state);
                if let Some(previous_token) = find_session_token(&removed.hash) {
                    if matches!(relation, StateRelation::Equal | StateRelation::Compatible) {
                        debug!(
                            "Carrying session token '{}' over to '{}'",
                            previous_token, new_state.hash
                        );
                        new_state.hash = set_session_token(&new_state.hash, &previous_token);
                    }
                }
            }
        }

        let has_same_hash = last_removed
            .as_ref()
            .map_or(false, |removed| removed.hash == new_state.hash);
        let needs_push = self
            .entries
            .last()
            .map_or(true, |top| top.hash != new_state.hash);
        if needs_push {
            if let Some(removed) = &last_removed {
                if remove_session_token(&removed.hash) == remove_session_token(&new_state.hash) {
                    new_state.inherit_focus(removed);
                }
            }
            self.entries.push(new_state);
        }

        let action = HistoryAction::from_pop_count(pop_count, has_same_hash);
        debug!(
            "Reconciled history: popped {} entr{}, action {:?}, depth {}",
            pop_count,
            if pop_count == 1 { "y" } else { "ies" },
            action,
            self.entries.len()
        );
        Reconciliation {
            action,
            pop_count,
            recovered,
        }
    }

    /// Return the hash of the entry preceding the last occurrence of `hash`.
    ///
    pub fn previous_hash_of(&self, hash: &str) -> Option<&str> {
        (1..self.entries.len())
            .rev()
            .find(|&i| self.entries[i].hash == hash)
            .map(|i| self.entries[i - 1].hash.as_str())
    }

    /// Return the layout of the most recent entry whose path matches the
    /// path of `hash`.
    ///
    pub fn find_layout_for_hash(&self, hash: &str) -> Option<&str> {
        let path = codec::strip_query(hash);
        self.entries
            .iter()
            .rev()
            .find(|entry| codec::strip_query(&entry.hash) == path)
            .and_then(|entry| entry.layout.as_deref())
    }

    /// Return the most recent entry with exactly this hash.
    ///
    pub fn entry_for_hash_mut(&mut self, hash: &str) -> Option<&mut NavigationState> {
        self.entries.iter_mut().rev().find(|entry| entry.hash == hash)
    }

    pub fn entry_for_hash(&self, hash: &str) -> Option<&NavigationState> {
        self.entries.iter().rev().find(|entry| entry.hash == hash)
    }

    /// Whether any entry navigates through a path segment starting with
    /// `path` (a leading `/` is ignored).
    ///
    pub fn is_impacted_by(&self, path: &str) -> bool {
        let path = path.strip_prefix('/').unwrap_or(path);
        self.entries.iter().any(|entry| {
            codec::strip_query(&entry.hash)
                .split('/')
                .any(|segment| !segment.is_empty() && segment.starts_with(path))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::codec::parse_state;
    use fake::Fake;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn stack_of(hashes: &[&str]) -> HistoryStack {
        let mut stack = HistoryStack::new(hashes[0], false);
        for hash in &hashes[1..] {
            let current = stack.last_entry().unwrap().hash.clone();
            stack.reconcile(&current, parse_state(hash), ReconcileOptions::default());
        }
        stack
    }

    fn hashes(stack: &HistoryStack) -> Vec<&str> {
        stack.entries().iter().map(|e| e.hash.as_str()).collect()
    }

    fn navigate(stack: &mut HistoryStack, hash: &str) -> Reconciliation {
        let current = stack.last_entry().unwrap().hash.clone();
        stack.reconcile(&current, parse_state(hash), ReconcileOptions::default())
    }

    #[test]
    fn test_drill_down_appends() {
        let mut stack = stack_of(&["A"]);
        let result = navigate(&mut stack, "A/B");
        assert_eq!(result.pop_count, 0);
        assert_eq!(result.action, HistoryAction::Append);
        assert_eq!(hashes(&stack), vec!["A", "A/B"]);
    }

    #[test]
    fn test_sibling_replaces() {
        let mut stack = stack_of(&["A", "A/B"]);
        let result = navigate(&mut stack, "A/C");
        assert_eq!(result.pop_count, 1);
        assert_eq!(result.action, HistoryAction::Replace);
        assert_eq!(hashes(&stack), vec!["A", "A/C"]);
    }

    #[test]
    fn test_same_hash_is_a_no_op() {
        let mut stack = stack_of(&["A", "A/B", "A/B/C"]);
        let result = navigate(&mut stack, "A/B/C");
        assert_eq!(result.pop_count, 1);
        assert_eq!(result.action, HistoryAction::None);
        assert_eq!(hashes(&stack), vec!["A", "A/B", "A/B/C"]);
    }

    #[test]
    fn test_multi_pop_goes_back_then_replaces() {
        let mut stack = stack_of(&["A", "A/B", "A/B/C"]);
        let result = navigate(&mut stack, "A/X");
        assert_eq!(result.pop_count, 2);
        assert_eq!(result.action, HistoryAction::BackReplace { steps: 1 });
        assert_eq!(hashes(&stack), vec!["A", "A/X"]);
    }

    #[test]
    fn test_multi_pop_to_existing_hash_goes_back() {
        let mut stack = stack_of(&["A", "A/B", "A/B/C"]);
        let current = "A/B/C".to_string();
        // Preserve the middle entry so that returning to it pops it as well.
        stack.entries[1].preserved = true;
        let result = stack.reconcile(&current, parse_state("A/B"), ReconcileOptions::default());
        assert_eq!(result.pop_count, 2);
        assert_eq!(result.action, HistoryAction::Back { steps: 1 });
        assert_eq!(hashes(&stack), vec!["A", "A/B"]);
        assert!(stack.last_entry().unwrap().preserved);
    }

    #[test]
    fn test_resync_drops_entries_above_current_hash() {
        let mut stack = stack_of(&["A", "A/B", "A/B/C"]);
        let result = stack.reconcile("A/B", parse_state("A/D"), ReconcileOptions::default());
        assert_eq!(result.pop_count, 2);
        assert_eq!(result.action, HistoryAction::BackReplace { steps: 1 });
        assert!(!result.recovered);
        assert_eq!(hashes(&stack), vec!["A", "A/D"]);
    }

    #[test]
    fn test_resync_reseeds_unknown_hash() {
        let mut stack = stack_of(&["A", "A/B"]);
        let result = stack.reconcile("Z", parse_state("Z/1"), ReconcileOptions::default());
        assert!(result.recovered);
        assert_eq!(result.pop_count, 2);
        assert_eq!(hashes(&stack), vec!["Z", "Z/1"]);
    }

    #[test]
    fn test_rebuild_only_skips_resync() {
        let mut stack = stack_of(&["A", "A/B"]);
        let options = ReconcileOptions {
            rebuild_only: true,
            disable_preservation: true,
            ..ReconcileOptions::default()
        };
        let result = stack.reconcile("unrelated", parse_state("A/B/C"), options);
        assert_eq!(result.pop_count, 1);
        assert_eq!(result.action, HistoryAction::Replace);
        assert_eq!(hashes(&stack), vec!["A", "A/B", "A/B/C"]);
    }

    #[test]
    fn test_preserved_top_survives_unrelated_navigation() {
        let mut stack = stack_of(&["A", "A/B"]);
        let options = ReconcileOptions {
            preserve_top: true,
            ..ReconcileOptions::default()
        };
        let result = stack.reconcile("A/B", parse_state("X"), options);
        assert_eq!(result.action, HistoryAction::Append);
        assert_eq!(hashes(&stack), vec!["A", "A/B", "X"]);
        assert!(stack.entries()[1].preserved);

        let result = navigate(&mut stack, "Y");
        assert_eq!(result.action, HistoryAction::Replace);
        assert_eq!(hashes(&stack), vec!["A", "A/B", "Y"]);
    }

    #[test]
    fn test_disable_preservation_prunes_preserved_entries() {
        let mut stack = stack_of(&["A", "A/B"]);
        stack.entries[1].preserved = true;
        let options = ReconcileOptions {
            disable_preservation: true,
            ..ReconcileOptions::default()
        };
        let result = stack.reconcile("A/B", parse_state("A/C"), options);
        assert_eq!(result.action, HistoryAction::Replace);
        assert_eq!(hashes(&stack), vec!["A", "A/C"]);
    }

    #[test]
    fn test_preserved_entry_with_new_token_is_replaced() {
        let mut stack = stack_of(&["A", "A/B?sap-iapp-state=T1"]);
        stack.entries[1].preserved = true;
        let current = "A/B?sap-iapp-state=T1".to_string();
        let result = stack.reconcile(
            &current,
            parse_state("A/B?sap-iapp-state=T2"),
            ReconcileOptions::default(),
        );
        assert_eq!(result.action, HistoryAction::Replace);
        assert_eq!(hashes(&stack), vec!["A", "A/B?sap-iapp-state=T2"]);
        assert!(stack.last_entry().unwrap().preserved);
    }

    #[test]
    fn test_session_token_is_carried_forward() {
        let mut stack = HistoryStack::new("A/B?sap-iapp-state=T1", false);
        let result = stack.reconcile(
            "A/B?sap-iapp-state=T1",
            parse_state("A/B?layout=TwoColumnsMidExpanded"),
            ReconcileOptions::default(),
        );
        let top = stack.last_entry().unwrap();
        assert!(top.hash.contains("sap-iapp-state=T1"));
        assert_eq!(result.action, HistoryAction::Replace);
    }

    #[test]
    fn test_session_token_carried_to_identical_hash_is_a_no_op() {
        let mut stack = HistoryStack::new("A/B?sap-iapp-state=T1", false);
        let result = stack.reconcile(
            "A/B?sap-iapp-state=T1",
            parse_state("A/B"),
            ReconcileOptions::default(),
        );
        assert_eq!(result.action, HistoryAction::None);
        assert_eq!(hashes(&stack), vec!["A/B?sap-iapp-state=T1"]);
    }

    #[test]
    fn test_session_token_dropped_for_unrelated_state() {
        let mut stack = HistoryStack::new("A/B?sap-iapp-state=T1", false);
        stack.reconcile("A/B?sap-iapp-state=T1", parse_state("C"), ReconcileOptions::default());
        assert_eq!(hashes(&stack), vec!["C"]);
        assert_eq!(stack.session_token(), None);
    }

    #[test]
    fn test_session_token_not_carried_when_fcl_enabled() {
        let mut stack = HistoryStack::new("A/B?sap-iapp-state=T1", true);
        stack.reconcile(
            "A/B?sap-iapp-state=T1",
            parse_state("A/B?layout=TwoColumnsMidExpanded"),
            ReconcileOptions::default(),
        );
        assert_eq!(hashes(&stack), vec!["A/B?layout=TwoColumnsMidExpanded"]);
    }

    #[test]
    fn test_session_token_tracks_pushed_state() {
        let token = format!("T{}", (1000..9999u32).fake::<u32>());
        let mut stack = HistoryStack::new("A", false);
        navigate(&mut stack, &format!("A/B?sap-iapp-state={}", token));
        assert_eq!(stack.session_token(), Some(token.as_str()));
    }

    #[test]
    fn test_focus_survives_token_change() {
        let mut stack = HistoryStack::new("A/B?sap-iapp-state=T1", false);
        stack.entries[0].focus_control_id = Some("field".to_string());
        stack.reconcile(
            "A/B?sap-iapp-state=T1",
            parse_state("A/B?sap-iapp-state=T2"),
            ReconcileOptions::default(),
        );
        let top = stack.last_entry().unwrap();
        assert_eq!(top.hash, "A/B?sap-iapp-state=T2");
        assert_eq!(top.focus_control_id.as_deref(), Some("field"));
    }

    #[test]
    fn test_previous_hash_and_layout_lookup() {
        let stack = stack_of(&["A", "A/B?layout=TwoColumnsMidExpanded", "A/B/C"]);
        assert_eq!(stack.previous_hash_of("A/B/C"), Some("A/B?layout=TwoColumnsMidExpanded"));
        assert_eq!(stack.previous_hash_of("A"), None);
        assert_eq!(stack.previous_hash_of("missing"), None);
        assert_eq!(stack.find_layout_for_hash("A/B"), Some("TwoColumnsMidExpanded"));
        assert_eq!(stack.find_layout_for_hash("A/B/C"), None);
        assert_eq!(stack.find_layout_for_hash("Q"), None);
    }

    #[test]
    fn test_is_impacted_by() {
        let stack = stack_of(&["Products('1')", "Products('1')/_Items(2)"]);
        assert!(stack.is_impacted_by("/_Items(2)"));
        assert!(stack.is_impacted_by("Products"));
        assert!(!stack.is_impacted_by("Orders"));
    }

    #[test]
    fn test_random_navigation_never_stacks_duplicates() {
        let mut rng = StdRng::seed_from_u64(42);
        let targets = [
            "", "A", "A/B", "A/C", "A/B/C", "A/B?layout=MidColumnFullScreen",
            "A/B/C?layout=EndColumnFullScreen", "A/B?sap-iapp-state=T1", "X", "X/Y",
        ];
        let mut stack = HistoryStack::new("A", false);
        for _ in 0..500 {
            let target = targets.choose(&mut rng).unwrap();
            let options = ReconcileOptions {
                rebuild_only: false,
                preserve_top: rng.gen_bool(0.2),
                disable_preservation: rng.gen_bool(0.1),
            };
            // Occasionally pretend the browser moved back on its own.
            let current = if stack.len() > 1 && rng.gen_bool(0.1) {
                stack.entries()[stack.len() - 2].hash.clone()
            } else {
                stack.last_entry().unwrap().hash.clone()
            };
            stack.reconcile(&current, parse_state(target), options);

            assert!(!stack.is_empty());
            for pair in stack.entries().windows(2) {
                assert_ne!(pair[0].hash, pair[1].hash);
            }
        }
    }
}
