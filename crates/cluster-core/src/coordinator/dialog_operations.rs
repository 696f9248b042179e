//! Dialog lifecycle operations
//!
//! The three-tier lookup and the write paths. Storage faults never cross
//! this boundary: reads degrade to "not found", writes to "skipped", and the
//! node keeps handling calls on local state alone.

use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use crate::dialog::{early_key, Dialog, DialogContext, DialogKey, SharedDialog};
use crate::snapshot::dialog_codec;

use super::core::ClusterCoordinator;

impl ClusterCoordinator {
    /// Create (or reuse) a dialog for a client-originated request.
    ///
    /// Standalone mode delegates straight to plain construction. Clustered
    /// mode consults the early-dialog table first and reuses any
    /// non-terminal entry for the same key; a terminated stray is replaced.
    pub fn create_dialog(&self, ctx: &DialogContext) -> SharedDialog {
        let key = early_key(&ctx.call_id, ctx.local_tag.as_deref());

        if !self.config.clustered {
            let dialog = Dialog::from_context(ctx, false).into_shared();
            self.early_dialogs.insert(key, dialog.clone());
            return dialog;
        }

        let replicate_app_data = self.config.effective_application_data();
        match self.early_dialogs.entry(key) {
            Entry::Occupied(mut entry) => {
                if entry.get().read().is_terminated() {
                    let dialog = Dialog::from_context(ctx, replicate_app_data).into_shared();
                    entry.insert(dialog.clone());
                    dialog
                } else {
                    debug!(call_id = %ctx.call_id, "reusing early dialog");
                    entry.get().clone()
                }
            }
            Entry::Vacant(entry) => {
                let dialog = Dialog::from_context(ctx, replicate_app_data).into_shared();
                entry.insert(dialog.clone());
                dialog
            }
        }
    }

    /// Create a dialog from a response that finalizes it.
    ///
    /// The matching early entry is removed and promoted; when none exists
    /// (dialog created directly from a final response) a fresh confirmed
    /// dialog is constructed. Either way the result lands in the confirmed
    /// table with insert-if-absent semantics.
    pub fn create_dialog_from_response(&self, ctx: &DialogContext) -> SharedDialog {
        let ekey = early_key(&ctx.call_id, ctx.local_tag.as_deref());
        let dialog = match self.early_dialogs.remove(&ekey) {
            Some((_, existing)) => {
                existing.write().confirm(
                    ctx.remote_tag.clone(),
                    ctx.remote_target.clone(),
                    Some(ctx.route_set.clone()),
                );
                existing
            }
            None => {
                let replicate_app_data =
                    self.config.clustered && self.config.effective_application_data();
                let mut dialog = Dialog::from_context(ctx, replicate_app_data);
                dialog.confirm(ctx.remote_tag.clone(), ctx.remote_target.clone(), None);
                dialog.into_shared()
            }
        };
        self.put_dialog(dialog)
    }

    /// Three-tier dialog lookup: local table, distributed store, not found.
    pub async fn get_dialog(&self, raw_key: &str) -> Option<SharedDialog> {
        let local = self.dialogs.get(raw_key).map(|entry| entry.value().clone());
        if let Some(existing) = local {
            self.reconcile_with_store(raw_key, &existing).await;
            return Some(existing);
        }

        if let Some(existing) = self.early_dialogs.get(raw_key).map(|e| e.value().clone()) {
            return Some(existing);
        }

        // Early/untagged identifiers are never fetched remotely
        if !self.remote_enabled() || !DialogKey::is_established(raw_key) {
            return None;
        }
        self.fetch_and_recreate(raw_key).await
    }

    /// Proactive reconciliation of a confirmed local dialog against the
    /// store, in case another node holds a newer version. Failures are
    /// logged and the local copy is returned unchanged.
    async fn reconcile_with_store(&self, raw_key: &str, dialog: &SharedDialog) {
        let (confirmed, local_version) = {
            let guard = dialog.read();
            (guard.is_confirmed(), guard.version)
        };
        if !confirmed || !self.remote_enabled() {
            return;
        }
        match self.store.update_dialog(raw_key, local_version).await {
            Ok(Some(snapshot)) => {
                let mut guard = dialog.write();
                // re-check: a concurrent reconcile may have applied already
                if snapshot.version > guard.version {
                    debug!(
                        key = %raw_key,
                        local = guard.version,
                        stored = snapshot.version,
                        "applying newer stored dialog version"
                    );
                    dialog_codec::apply_snapshot(&mut guard, &snapshot);
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(key = %raw_key, error = %e, "dialog reconciliation failed; keeping local copy");
            }
        }
    }

    /// Distributed lookup plus reconstruction. The local insert is
    /// insert-if-absent: when another thread recreated the same dialog
    /// concurrently, its instance wins and ours is discarded.
    async fn fetch_and_recreate(&self, raw_key: &str) -> Option<SharedDialog> {
        let snapshot = match self.store.get_dialog(raw_key).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %raw_key, error = %e, "distributed dialog lookup failed; treating as absent");
                return None;
            }
        };

        let key = DialogKey::parse(raw_key)?;
        let mut rebuilt =
            match dialog_codec::from_snapshot(&key, &snapshot, self.endpoints.as_ref()) {
                Ok(dialog) => dialog,
                Err(e) => {
                    warn!(key = %raw_key, error = %e, "dialog reconstruction failed; treating as absent");
                    return None;
                }
            };
        // snapshots do not carry the policy flag; the active policy decides
        rebuilt.replicate_application_data = self.config.effective_application_data();
        let rebuilt = rebuilt.into_shared();

        let winner = match self.dialogs.entry(raw_key.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                entry.insert(rebuilt.clone());
                rebuilt
            }
        };
        Some(winner)
    }

    /// Register a dialog in the local tables, insert-if-absent; returns
    /// whichever instance won the race. A dialog with no established key yet
    /// goes to the early table, so removal always finds it there.
    ///
    /// This never writes through to the distributed store: automatic
    /// write-through over-replicated provisional dialogs and was disabled.
    /// Distributed writes happen only via
    /// [`put_dialog_into_distributed_cache`](Self::put_dialog_into_distributed_cache).
    pub fn put_dialog(&self, dialog: SharedDialog) -> SharedDialog {
        let (established, ekey) = {
            let guard = dialog.read();
            (guard.key().map(|k| k.to_string()), guard.early_key())
        };
        let (table, key) = match established {
            Some(key) => (&self.dialogs, key),
            None => (&self.early_dialogs, ekey),
        };
        match table.entry(key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                entry.insert(dialog.clone());
                dialog
            }
        }
    }

    /// Explicit distributed write, gated by dialog state and policy.
    pub async fn put_dialog_into_distributed_cache(&self, dialog: &SharedDialog) {
        if !self.remote_enabled() {
            return;
        }
        let (key, snapshot) = {
            let guard = dialog.read();
            let eligible = guard.is_confirmed()
                || (self.config.strategy.replicates_early_dialogs() && !guard.is_terminated());
            if !eligible {
                debug!(call_id = %guard.call_id, state = %guard.state, "dialog not eligible for replication");
                return;
            }
            let key = match guard.key() {
                Some(key) => key.to_string(),
                None => {
                    debug!(call_id = %guard.call_id, "dialog has no established key yet; skipping replication");
                    return;
                }
            };
            (key, dialog_codec::to_snapshot(&guard))
        };
        if let Err(e) = self.store.put_dialog(&key, snapshot).await {
            warn!(key = %key, error = %e, "distributed dialog write failed; skipped");
        }
    }

    /// Remove a dialog: distributed entry first (so other nodes miss rather
    /// than race on a stale copy), then the local tables, then the engine's
    /// normal termination side-effects.
    pub async fn remove_dialog(&self, dialog: &SharedDialog) {
        let (key, ekey) = {
            let guard = dialog.read();
            (guard.key().map(|k| k.to_string()), guard.early_key())
        };

        if self.remote_enabled() {
            if let Some(key) = &key {
                if let Err(e) = self.store.remove_dialog(key).await {
                    warn!(key = %key, error = %e, "distributed dialog removal failed; removing locally anyway");
                }
            }
        }

        if let Some(key) = &key {
            self.dialogs.remove(key);
        }
        self.early_dialogs.remove(&ekey);
        dialog.write().terminate();

        let event_key = key.unwrap_or(ekey);
        self.session_events.on_dialog_terminated(&event_key);
    }
}
