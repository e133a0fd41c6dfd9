//! In-memory browser history.
//!
//! `SimulatedBrowser` behaves like `window.history` plus a hash changer:
//! pushing truncates forward entries, `go` moves a cursor, and both hash
//! changes and popstate are delivered later, when the host's event loop is
//! pumped. [`drive`] runs a future while pumping, standing in for the
//! browser event loop.

use super::{HashChangeOutcome, HistoryHost, RouterProxy};
use log::*;
use serde::Serialize;
use std::future::Future;
use tokio::sync::oneshot;

/// One entry of the native history.
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NativeEntry {
    pub hash: String,
    pub navigation_level: Option<usize>,
}

impl NativeEntry {
    fn new(hash: &str) -> Self {
        NativeEntry {
            hash: hash.to_string(),
            navigation_level: None,
        }
    }
}

pub struct SimulatedBrowser {
    entries: Vec<NativeEntry>,
    cursor: usize,
    popstate_listeners: Vec<oneshot::Sender<()>>,
    popstate_due: bool,
    pending_hash_changes: Vec<String>,
    hash_change_log: Vec<(String, HashChangeOutcome)>,
    guard_answer: bool,
    prompts: Vec<String>,
}

impl SimulatedBrowser {
    /// Return a browser showing `initial_hash` with no other history.
    ///
    pub fn new(initial_hash: &str) -> Self {
        SimulatedBrowser {
            entries: vec![NativeEntry::new(initial_hash)],
            cursor: 0,
            popstate_listeners: vec![],
            popstate_due: false,
            pending_hash_changes: vec![],
            hash_change_log: vec![],
            guard_answer: true,
            prompts: vec![],
        }
    }

    /// Answer every guard confirmation prompt with `answer`.
    ///
    pub fn with_guard_answer(mut self, answer: bool) -> Self {
        self.guard_answer = answer;
        self
    }

    pub fn entries(&self) -> &[NativeEntry] {
        &self.entries
    }

    pub fn hashes(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.hash.clone()).collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Targets of the guard prompts shown so far.
    ///
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Hash changes delivered to the router and how it treated them.
    ///
    pub fn hash_change_log(&self) -> &[(String, HashChangeOutcome)] {
        &self.hash_change_log
    }

    pub fn clear_hash_change_log(&mut self) {
        self.hash_change_log.clear();
    }

    /// Navigate to `hash` behind the router's back, as a user typing a URL
    /// or following a link would.
    ///
    pub fn visit(&mut self, hash: &str) {
        debug!("Simulated browser visiting '{}'", hash);
        self.set_hash(hash);
    }

    fn current(&self) -> &NativeEntry {
        &self.entries[self.cursor]
    }

    fn notify_hash_change(&mut self, previous_hash: &str) {
        if self.current().hash != previous_hash {
            let hash = self.current().hash.clone();
            self.pending_hash_changes.push(hash);
        }
    }

    /// Take the hash changes and popstate listeners due for delivery.
    ///
    fn take_due_events(&mut self) -> (Vec<String>, Vec<oneshot::Sender<()>>) {
        let hash_changes = std::mem::take(&mut self.pending_hash_changes);
        let listeners = if self.popstate_due {
            self.popstate_due = false;
            std::mem::take(&mut self.popstate_listeners)
        } else {
            vec![]
        };
        (hash_changes, listeners)
    }
}

impl HistoryHost for SimulatedBrowser {
    fn current_hash(&self) -> String {
        self.current().hash.clone()
    }

    fn replace_hash(&mut self, hash: &str) {
        let previous_hash = self.current_hash();
        self.entries[self.cursor] = NativeEntry::new(hash);
        self.notify_hash_change(&previous_hash);
    }

    fn set_hash(&mut self, hash: &str) {
        let previous_hash = self.current_hash();
        self.entries.truncate(self.cursor + 1);
        self.entries.push(NativeEntry::new(hash));
        self.cursor += 1;
        self.notify_hash_change(&previous_hash);
    }

    fn go(&mut self, delta: isize) {
        let last = self.entries.len() as isize - 1;
        let requested = self.cursor as isize + delta;
        let target = requested.clamp(0, last);
        if target != requested {
            warn!(
                "Simulated browser cannot go {} from entry {}, stopping at {}",
                delta, self.cursor, target
            );
        }
        let previous_hash = self.current_hash();
        self.cursor = target as usize;
        self.notify_hash_change(&previous_hash);
        self.popstate_due = true;
    }

    fn add_popstate_listener(&mut self, listener: oneshot::Sender<()>) {
        self.popstate_listeners.push(listener);
    }

    fn remove_popstate_listeners(&mut self) {
        self.popstate_listeners.clear();
    }

    fn merge_navigation_level(&mut self, level: usize) {
        self.entries[self.cursor].navigation_level = Some(level);
    }

    fn navigation_level(&self) -> Option<usize> {
        self.current().navigation_level
    }

    fn confirm_guard_crossing(&mut self, target_hash: &str) -> bool {
        self.prompts.push(target_hash.to_string());
        self.guard_answer
    }
}

impl RouterProxy<SimulatedBrowser> {
    /// Deliver pending hash changes to the router, then fire popstate.
    /// Returns the number of events delivered.
    ///
    pub fn pump_host_events(&self) -> usize {
        let (hash_changes, listeners) = self.with_host(|host| host.take_due_events());
        let delivered = hash_changes.len() + listeners.len();
        for hash in hash_changes {
            let outcome = self.on_hash_changed(&hash);
            self.with_host(|host| host.hash_change_log.push((hash, outcome)));
        }
        for listener in listeners {
            // The receiving side may already be gone; nothing waits then.
            let _ = listener.send(());
        }
        delivered
    }
}

/// Run `future` to completion while pumping the simulated browser's events.
///
pub async fn drive<F: Future>(router: &RouterProxy<SimulatedBrowser>, future: F) -> F::Output {
    tokio::pin!(future);
    loop {
        tokio::select! {
            biased;
            output = &mut future => {
                router.pump_host_events();
                return output;
            }
            _ = tokio::task::yield_now() => {
                router.pump_host_events();
            }
        }
    }
}
