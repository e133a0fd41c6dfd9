//! Router proxy.
//!
//! Ties the logical history (`crate::history`) to the browser through a
//! [`HistoryHost`]. Navigation requests are serialized on a FIFO queue: a
//! request that arrives while a multi-step "go back" is still waiting for its
//! popstate waits for its turn instead of issuing a second native call.

mod host;
pub mod simulated;
mod sync;

pub use host::HistoryHost;

use crate::history::codec::{self, find_session_token, has_restore_marker, set_session_token};
use crate::history::{
    HistoryError, HistoryStack, NavigationGuard, NavigationState, ReconcileOptions,
};
use log::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Options of a single navigation request.
///
#[derive(Debug, Default, Clone, Copy)]
pub struct NavigateOptions {
    /// Keep the current entry in the history even if the target is unrelated.
    pub preserve_history: bool,
    /// Prune preserved entries like any other.
    pub disable_preservation: bool,
}

/// How the router treated a hash change reported by the host.
///
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize)]
pub enum HashChangeOutcome {
    /// Processing is suspended while the router rewrites the history.
    Custom,
    /// The hash asks for a history rebuild; call `restore_history`.
    RestorePending,
    /// The hash is the top of the logical history.
    InSync,
    /// The hash leaves the guarded area and crossing was not confirmed.
    OutsideGuard,
    /// Navigation that bypassed the router; reconciled on the next request.
    External,
}

struct Core<H> {
    stack: HistoryStack,
    guard: NavigationGuard,
    host: H,
    apply_restore: bool,
}

/// Keeps the logical history in sync with the host's native history.
///
pub struct RouterProxy<H: HistoryHost> {
    core: Mutex<Core<H>>,
    navigation_queue: tokio::sync::Mutex<()>,
    hash_change_suspended: AtomicBool,
    rebuild_running: AtomicBool,
}

impl<H: HistoryHost> RouterProxy<H> {
    /// Return a new router seeded with the host's current hash.
    ///
    pub fn new(mut host: H, fcl_enabled: bool) -> Self {
        let current_hash = host.current_hash();
        debug!("Initializing router history at '{}'...", current_hash);
        if host.navigation_level().is_none() {
            host.merge_navigation_level(0);
        }
        RouterProxy {
            core: Mutex::new(Core {
                stack: HistoryStack::new(&current_hash, fcl_enabled),
                guard: NavigationGuard::new(),
                host,
                apply_restore: false,
            }),
            navigation_queue: tokio::sync::Mutex::new(()),
            hash_change_suspended: AtomicBool::new(false),
            rebuild_running: AtomicBool::new(false),
        }
    }

    fn core(&self) -> MutexGuard<'_, Core<H>> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Navigate to `hash`. Resolves to whether the browser history changed.
    ///
    /// Resolves to false without navigating when the target leaves the
    /// guarded area and the user declines to leave it.
    pub async fn navigate_to(
        &self,
        hash: &str,
        options: NavigateOptions,
    ) -> Result<bool, HistoryError> {
        if self.is_rebuild_running() {
            debug!("Navigation to '{}' queued behind a history rebuild", hash);
        }
        let _turn = self.navigation_queue.lock().await;
        self.navigate_to_locked(hash, options).await
    }

    /// Body of `navigate_to`; the caller holds the navigation queue.
    ///
    async fn navigate_to_locked(
        &self,
        hash: &str,
        options: NavigateOptions,
    ) -> Result<bool, HistoryError> {
        let reconciliation = {
            let mut core = self.core();
            let mut hash = hash.to_string();

            if core.stack.fcl_enabled() && find_session_token(&hash).is_none() {
                if let Some(token) = core.stack.session_token() {
                    hash = set_session_token(&hash, token);
                }
            }

            if core.guard.has_guard()
                && !core.guard.is_crossing_allowed()
                && !core.guard.check_hash(&hash)
            {
                info!(
                    "Navigation to '{}' leaves the guarded area, asking for confirmation",
                    hash
                );
                if !core.host.confirm_guard_crossing(&hash) {
                    info!("Navigation to '{}' cancelled by the user", hash);
                    return Ok(false);
                }
                core.guard.allow_crossing();
            }

            let current_hash = core.host.current_hash();
            let new_state = codec::parse_state(&hash);
            let options = ReconcileOptions {
                rebuild_only: false,
                preserve_top: options.preserve_history,
                disable_preservation: options.disable_preservation,
            };
            core.stack.reconcile(&current_hash, new_state, options)
        };

        self.rebuild_browser_history(reconciliation, false).await
    }

    /// Navigate to the entry preceding the current one, or let the browser
    /// go back when the history does not know one. Waits for its turn on the
    /// navigation queue like `navigate_to`.
    ///
    pub async fn navigate_back(&self) -> Result<(), HistoryError> {
        let _turn = self.navigation_queue.lock().await;
        let previous = {
            let core = self.core();
            let current_hash = core.host.current_hash();
            core.stack.previous_hash_of(&current_hash).map(str::to_string)
        };
        match previous {
            Some(previous) => {
                self.navigate_to_locked(&previous, NavigateOptions::default())
                    .await?;
            }
            None => {
                debug!("No previous entry for the current hash, going back natively");
                if let Err(e) = self.go_back(1).await {
                    // The host went away, usually because the back left the app.
                    debug!("{}", e);
                }
            }
        }
        Ok(())
    }

    /// Rebuild the browser history after arriving on a hash carrying the
    /// restore marker. Does nothing unless `on_hash_changed` saw the marker.
    ///
    pub async fn restore_history(&self) -> Result<(), HistoryError> {
        let _turn = self.navigation_queue.lock().await;

        let reconciliation = {
            let mut core = self.core();
            if !core.apply_restore {
                return Ok(());
            }
            core.apply_restore = false;

            let current_hash = core.host.current_hash();
            let target_hash = codec::remove_restore_marker(&current_hash);
            info!("Restoring history for '{}'...", target_hash);
            let options = ReconcileOptions {
                rebuild_only: true,
                preserve_top: false,
                disable_preservation: true,
            };
            core.stack
                .reconcile(&current_hash, codec::parse_state(&target_hash), options)
        };

        self.rebuild_browser_history(reconciliation, true).await?;
        Ok(())
    }

    /// Hash-change listener. Must be called by the host integration for every
    /// hash change the browser reports.
    ///
    pub fn on_hash_changed(&self, hash: &str) -> HashChangeOutcome {
        if self.is_hash_change_suspended() {
            trace!("Hash change to '{}' ignored while rebuilding history", hash);
            return HashChangeOutcome::Custom;
        }

        let mut core = self.core();
        if has_restore_marker(hash) {
            core.apply_restore = true;
            return HashChangeOutcome::RestorePending;
        }
        if core.stack.last_entry().map_or(false, |top| top.hash == hash) {
            return HashChangeOutcome::InSync;
        }
        if core.guard.has_guard()
            && !core.guard.is_crossing_allowed()
            && !core.guard.check_hash(hash)
        {
            warn!("Hash change to '{}' leaves the guarded area", hash);
            return HashChangeOutcome::OutsideGuard;
        }
        debug!("External hash change to '{}'", hash);
        HashChangeOutcome::External
    }

    pub fn set_guard(&self, hash: &str) {
        let mut core = self.core();
        core.guard.set_guard(hash);
        if let Some(guard_hash) = core.guard.guard_hash() {
            debug!("Navigation guard set at '{}'", guard_hash);
        }
    }

    pub fn clear_guard(&self) {
        self.core().guard.clear_guard();
    }

    pub fn has_guard(&self) -> bool {
        self.core().guard.has_guard()
    }

    pub fn check_hash(&self, hash: &str) -> bool {
        self.core().guard.check_hash(hash)
    }

    pub fn allow_guard_crossing(&self) {
        self.core().guard.allow_crossing();
    }

    pub fn is_guard_crossing_allowed(&self) -> bool {
        self.core().guard.is_crossing_allowed()
    }

    /// Whether going back from the current hash would leave the guard.
    ///
    pub fn would_exit_on_back(&self) -> bool {
        let core = self.core();
        let current_hash = core.host.current_hash();
        core.guard.would_exit_on_back(&current_hash, &core.stack)
    }

    pub fn last_entry(&self) -> Option<NavigationState> {
        self.core().stack.last_entry().cloned()
    }

    pub fn entries(&self) -> Vec<NavigationState> {
        self.core().stack.entries().to_vec()
    }

    pub fn session_token(&self) -> Option<String> {
        self.core().stack.session_token().map(str::to_string)
    }

    pub fn find_layout_for_hash(&self, hash: &str) -> Option<String> {
        self.core().stack.find_layout_for_hash(hash).map(str::to_string)
    }

    /// Whether a stacked state navigates through `path`.
    ///
    pub fn is_current_state_impacted_by(&self, path: &str) -> bool {
        self.core().stack.is_impacted_by(path)
    }

    /// Remember which control held the focus on the current hash. Returns
    /// false when the current hash is not in the history.
    ///
    pub fn store_focus_for_current_hash(
        &self,
        control_id: &str,
        info: Option<serde_json::Value>,
    ) -> bool {
        let mut core = self.core();
        let current_hash = core.host.current_hash();
        match core.stack.entry_for_hash_mut(&current_hash) {
            Some(entry) => {
                entry.focus_control_id = Some(control_id.to_string());
                entry.focus_info = info;
                true
            }
            None => false,
        }
    }

    pub fn focus_for_current_hash(&self) -> Option<(String, Option<serde_json::Value>)> {
        let core = self.core();
        let current_hash = core.host.current_hash();
        core.stack
            .entry_for_hash(&current_hash)
            .and_then(|entry| entry.focus())
            .map(|(id, info)| (id.to_string(), info.cloned()))
    }

    pub fn is_rebuild_running(&self) -> bool {
        self.rebuild_running.load(Ordering::SeqCst)
    }

    pub fn is_hash_change_suspended(&self) -> bool {
        self.hash_change_suspended.load(Ordering::SeqCst)
    }

    /// Run `f` with exclusive access to the host.
    ///
    pub fn with_host<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.core().host)
    }

    /// Detach from the host: pending popstate listeners are dropped, so an
    /// in-flight "go back" resolves with an error.
    ///
    pub fn destroy(&self) {
        debug!("Detaching router from history host");
        self.core().host.remove_popstate_listeners();
    }
}
