//! In-memory panel collection and per-panel in-flight locking.
//!
//! The collection is only ever mutated by whole-collection replacement:
//! [`PanelStore::update`] clones the current collection, applies the
//! mutation to the matching panel, and swaps the whole vector back in.
//! No interior partial mutation escapes this module.
//!
//! Single-flight per panel is enforced here, not by UI convention:
//! [`PanelStore::begin`] atomically checks-and-sets the in-flight flag
//! and returns a [`ProcessingGuard`] that releases it on drop, so the
//! flag clears on every exit path including early returns.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use panelworks_core::panel::Panel;
use panelworks_core::types::PanelId;
use tokio::sync::RwLock;

use crate::error::PipelineError;

/// Session-scoped owner of the panels being worked on.
#[derive(Default)]
pub struct PanelStore {
    panels: RwLock<Vec<Panel>>,
    selection: RwLock<Option<PanelId>>,
    in_flight: Mutex<HashSet<PanelId>>,
}

/// Releases a panel's in-flight flag when dropped.
pub struct ProcessingGuard {
    store: Arc<PanelStore>,
    panel_id: PanelId,
}

impl std::fmt::Debug for ProcessingGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingGuard")
            .field("panel_id", &self.panel_id)
            .finish()
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.store
            .in_flight
            .lock()
            .expect("in-flight set poisoned")
            .remove(&self.panel_id);
    }
}

impl PanelStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the whole collection. Timeline order is the caller's
    /// order and is preserved.
    pub async fn replace_all(&self, panels: Vec<Panel>) {
        *self.panels.write().await = panels;
    }

    /// Snapshot of the collection in timeline order.
    pub async fn snapshot(&self) -> Vec<Panel> {
        self.panels.read().await.clone()
    }

    /// Clone of a single panel by ID.
    pub async fn get(&self, panel_id: PanelId) -> Option<Panel> {
        self.panels
            .read()
            .await
            .iter()
            .find(|p| p.id == panel_id)
            .cloned()
    }

    /// Number of panels currently held.
    pub async fn len(&self) -> usize {
        self.panels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.panels.read().await.is_empty()
    }

    /// Apply a mutation to one panel via whole-collection replacement.
    /// Returns `false` when the panel is unknown.
    pub async fn update<F>(&self, panel_id: PanelId, mutate: F) -> bool
    where
        F: FnOnce(&mut Panel),
    {
        let mut panels = self.panels.write().await;
        let mut next = panels.clone();
        let Some(panel) = next.iter_mut().find(|p| p.id == panel_id) else {
            return false;
        };
        mutate(panel);
        *panels = next;
        true
    }

    /// Set or clear the active selection.
    pub async fn select(&self, panel_id: Option<PanelId>) {
        *self.selection.write().await = panel_id;
    }

    /// The currently selected panel, if any.
    pub async fn selected(&self) -> Option<PanelId> {
        *self.selection.read().await
    }

    /// Atomically claim a panel for processing.
    ///
    /// Fails with [`PipelineError::AlreadyProcessing`] when an operation
    /// for the panel is already in flight.
    pub fn begin(self: &Arc<Self>, panel_id: PanelId) -> Result<ProcessingGuard, PipelineError> {
        let mut in_flight = self.in_flight.lock().expect("in-flight set poisoned");
        if !in_flight.insert(panel_id) {
            return Err(PipelineError::AlreadyProcessing(panel_id));
        }
        Ok(ProcessingGuard {
            store: Arc::clone(self),
            panel_id,
        })
    }

    /// Whether a processing operation is in flight for the panel.
    pub fn is_in_flight(&self, panel_id: PanelId) -> bool {
        self.in_flight
            .lock()
            .expect("in-flight set poisoned")
            .contains(&panel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use uuid::Uuid;

    fn panel(url: &str) -> Panel {
        Panel::new(Uuid::new_v4(), url)
    }

    #[tokio::test]
    async fn replace_all_preserves_order() {
        let store = PanelStore::new();
        let panels = vec![panel("a"), panel("b"), panel("c")];
        let ids: Vec<_> = panels.iter().map(|p| p.id).collect();
        store.replace_all(panels).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.iter().map(|p| p.id).collect::<Vec<_>>(), ids);
    }

    #[tokio::test]
    async fn update_mutates_only_the_target_panel() {
        let store = PanelStore::new();
        let panels = vec![panel("a"), panel("b")];
        let target = panels[0].id;
        let other = panels[1].id;
        store.replace_all(panels).await;

        let updated = store
            .update(target, |p| p.fail_with("remote analysis failed"))
            .await;

        assert!(updated);
        assert!(store.get(target).await.unwrap().is_error);
        assert!(!store.get(other).await.unwrap().is_error);
    }

    #[tokio::test]
    async fn update_unknown_panel_returns_false() {
        let store = PanelStore::new();
        store.replace_all(vec![panel("a")]).await;
        assert!(!store.update(Uuid::new_v4(), |p| p.begin_processing()).await);
    }

    #[tokio::test]
    async fn begin_denies_reentrant_processing() {
        let store = PanelStore::new();
        let p = panel("a");
        let id = p.id;
        store.replace_all(vec![p]).await;

        let _guard = store.begin(id).unwrap();
        assert_matches!(
            store.begin(id),
            Err(PipelineError::AlreadyProcessing(got)) if got == id
        );
    }

    #[tokio::test]
    async fn guard_releases_on_drop() {
        let store = PanelStore::new();
        let id = Uuid::new_v4();

        let guard = store.begin(id).unwrap();
        assert!(store.is_in_flight(id));
        drop(guard);
        assert!(!store.is_in_flight(id));

        // Claimable again after release.
        let _guard = store.begin(id).unwrap();
    }

    #[tokio::test]
    async fn guard_releases_on_early_return() {
        let store = PanelStore::new();
        let id = Uuid::new_v4();

        fn bails_early(store: &Arc<PanelStore>, id: PanelId) -> Result<(), PipelineError> {
            let _guard = store.begin(id)?;
            Err(PipelineError::MissingImage(id))
        }

        assert!(bails_early(&store, id).is_err());
        assert!(!store.is_in_flight(id));
    }

    #[tokio::test]
    async fn different_panels_do_not_conflict() {
        let store = PanelStore::new();
        let _a = store.begin(Uuid::new_v4()).unwrap();
        let _b = store.begin(Uuid::new_v4()).unwrap();
    }

    #[tokio::test]
    async fn selection_round_trips() {
        let store = PanelStore::new();
        let id = Uuid::new_v4();
        assert_eq!(store.selected().await, None);
        store.select(Some(id)).await;
        assert_eq!(store.selected().await, Some(id));
        store.select(None).await;
        assert_eq!(store.selected().await, None);
    }
}
