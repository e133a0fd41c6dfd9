//! Native history primitives the router drives.

use tokio::sync::oneshot;

/// Browser-side collaborator of the router.
///
/// Implementations wrap the native hash changer and `window.history`. Hash
/// changes caused by these calls are reported back through
/// [`RouterProxy::on_hash_changed`](super::RouterProxy::on_hash_changed),
/// and cursor moves caused by [`go`](HistoryHost::go) must eventually fire
/// every registered popstate listener.
pub trait HistoryHost {
    /// Hash currently shown by the browser.
    fn current_hash(&self) -> String;

    /// Replace the current native entry's hash.
    fn replace_hash(&mut self, hash: &str);

    /// Push a new native entry with this hash.
    fn set_hash(&mut self, hash: &str);

    /// Move the native cursor by `delta` entries (negative goes back).
    fn go(&mut self, delta: isize);

    /// Register a listener fired once by the next popstate.
    fn add_popstate_listener(&mut self, listener: oneshot::Sender<()>);

    /// Drop every registered popstate listener without firing it.
    fn remove_popstate_listeners(&mut self);

    /// Merge the `navigationLevel` marker into the current entry's state
    /// without navigating.
    fn merge_navigation_level(&mut self, level: usize);

    /// `navigationLevel` marker of the current entry, if one was merged.
    fn navigation_level(&self) -> Option<usize>;

    /// Ask the user whether navigating to `target_hash` may leave the
    /// guarded area.
    fn confirm_guard_crossing(&mut self, target_hash: &str) -> bool;
}
