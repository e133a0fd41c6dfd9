//! Browser history synchronizer.
//!
//! Applies the action computed by the stack manager to the host. Going back
//! is asynchronous: the host only reports completion through popstate, so a
//! one-shot listener is registered before the native call and awaited
//! afterwards. During a go-back-then-replace the intermediate hash changes
//! must not be reconciled as user navigation, hence the suspension flag.

use super::{HistoryHost, RouterProxy};
use crate::history::{HistoryAction, HistoryError, Reconciliation};
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::oneshot;

impl<H: HistoryHost> RouterProxy<H> {
    /// Mirror a reconciliation in the native history. Resolves to whether a
    /// navigation occurred.
    ///
    pub(super) async fn rebuild_browser_history(
        &self,
        reconciliation: Reconciliation,
        rebuild_only: bool,
    ) -> Result<bool, HistoryError> {
        if reconciliation.recovered {
            self.core().host.merge_navigation_level(0);
        }
        if reconciliation.action.goes_back() {
            debug!("Navigation queue held until popstate");
        }

        let _running = RaisedFlag::raise(&self.rebuild_running);
        self.apply_action(reconciliation.action, rebuild_only).await
    }

    async fn apply_action(
        &self,
        action: HistoryAction,
        rebuild_only: bool,
    ) -> Result<bool, HistoryError> {
        debug!("Applying history action {:?}...", action);
        match action {
            HistoryAction::Replace => {
                self.replace_with_top();
                Ok(true)
            }
            HistoryAction::Append => {
                let mut core = self.core();
                let (target_hash, level) = top_of(&core.stack);
                core.host.set_hash(&target_hash);
                core.host.merge_navigation_level(level);
                Ok(true)
            }
            HistoryAction::Back { steps } => {
                self.go_back(steps).await?;
                Ok(true)
            }
            HistoryAction::BackReplace { steps } => {
                let suspended = RaisedFlag::raise(&self.hash_change_suspended);
                self.go_back(steps).await?;
                // Let the host deliver the hash change of the last step first.
                tokio::task::yield_now().await;
                if rebuild_only {
                    self.replace_with_top();
                    tokio::task::yield_now().await;
                    drop(suspended);
                } else {
                    drop(suspended);
                    self.replace_with_top();
                }
                Ok(true)
            }
            HistoryAction::None => Ok(false),
        }
    }

    /// Go back `steps` native entries and wait for the popstate.
    ///
    pub(super) async fn go_back(&self, steps: usize) -> Result<(), HistoryError> {
        let (listener, popstate) = oneshot::channel();
        {
            let mut core = self.core();
            core.host.add_popstate_listener(listener);
            core.host.go(-(steps as isize));
        }
        popstate
            .await
            .map_err(|_| HistoryError::PopStateListenerDropped { steps })?;
        trace!("Popstate received after going back {} step(s)", steps);
        Ok(())
    }

    fn replace_with_top(&self) {
        let mut core = self.core();
        let (target_hash, level) = top_of(&core.stack);
        core.host.replace_hash(&target_hash);
        core.host.merge_navigation_level(level);
    }
}

/// Router flag that stays set while this value lives. Clearing happens on
/// drop, so an abandoned navigation future cannot leave the flag set.
///
struct RaisedFlag<'a>(&'a AtomicBool);

impl<'a> RaisedFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        RaisedFlag(flag)
    }
}

impl Drop for RaisedFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Hash and navigation level of the stack's top entry.
///
fn top_of(stack: &crate::history::HistoryStack) -> (String, usize) {
    let hash = stack
        .last_entry()
        .map(|entry| entry.hash.clone())
        .unwrap_or_default();
    (hash, stack.len().saturating_sub(1))
}
