//! Open/closed state of collapsible rows across reloads.
//!
//! Row identities are positional, so a reload that inserts or removes rows
//! shifts identities rather than carrying element identity across renders.
//! The registry only keeps what the previous render looked like: the state of
//! every collapsible row and how many rows there were. Rows appended past that
//! count are new and open by default.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::row::{RowIdentity, RowKind, RowSlot};

/// Open-state of one tracked row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowState {
    /// Row identity.
    pub id: RowIdentity,
    /// Whether the row's disclosure element is open.
    pub open: bool,
}

/// Open-state table keyed by row identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowRegistry {
    states: BTreeMap<RowIdentity, bool>,
    previous_row_count: Option<usize>,
}

impl RowRegistry {
    /// Create an empty registry. Nothing has been rendered yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of the row of `kind` at `position`.
    #[must_use]
    pub const fn identify(kind: RowKind, position: usize) -> RowIdentity {
        RowIdentity::new(kind, position)
    }

    /// Whether the row should render open.
    ///
    /// A stored state always wins. Unseen rows are open only when they sit past
    /// the row count of the previous render, i.e. they were just appended.
    #[must_use]
    pub fn is_open(&self, id: RowIdentity) -> bool {
        if let Some(open) = self.states.get(&id) {
            return *open;
        }
        self.previous_row_count
            .is_some_and(|previous| id.position >= previous)
    }

    /// Record a user toggle.
    pub fn set_open(&mut self, id: RowIdentity, open: bool) {
        self.states.insert(id, open);
    }

    /// Flip the state of a row and return the new state.
    pub fn toggle(&mut self, id: RowIdentity) -> bool {
        let open = !self.is_open(id);
        self.set_open(id, open);
        open
    }

    /// Decide the open state of every collapsible row of a fresh render and
    /// replace the table with exactly those states.
    ///
    /// Rows without a disclosure element are skipped. Every row counts towards
    /// the row count used to detect appended rows on the next reconcile.
    pub fn reconcile(&mut self, rows: &[RowSlot]) -> Vec<RowState> {
        let states: Vec<RowState> = rows
            .iter()
            .filter(|slot| slot.collapsible)
            .map(|slot| RowState {
                id: slot.id,
                open: self.is_open(slot.id),
            })
            .collect();
        tracing::debug!(
            previous = ?self.previous_row_count,
            rows = rows.len(),
            tracked = states.len(),
            "reconciled row states"
        );
        self.states = states.iter().map(|state| (state.id, state.open)).collect();
        self.previous_row_count = Some(rows.len());
        states
    }

    /// Mark rows as open before the first render, e.g. from a persisted field.
    pub fn seed_open(&mut self, ids: impl IntoIterator<Item = RowIdentity>) {
        for id in ids {
            self.states.insert(id, true);
        }
    }

    /// Parse a whitespace-separated list of row ids and mark them open.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SyncError::InvalidRowId`] for the first malformed id;
    /// the registry is left unchanged in that case.
    pub fn seed_from_field(&mut self, value: &str) -> Result<()> {
        let ids = value
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<RowIdentity>>>()?;
        self.seed_open(ids);
        Ok(())
    }

    /// Tracked states in position order.
    #[must_use]
    pub fn states(&self) -> Vec<RowState> {
        let mut states: Vec<RowState> = self
            .states
            .iter()
            .map(|(id, open)| RowState {
                id: *id,
                open: *open,
            })
            .collect();
        states.sort_by_key(|state| state.id.position);
        states
    }

    /// Identities of open rows in position order.
    #[must_use]
    pub fn open_rows(&self) -> Vec<RowIdentity> {
        self.states()
            .into_iter()
            .filter(|state| state.open)
            .map(|state| state.id)
            .collect()
    }

    /// Value of the persisted open-state field.
    #[must_use]
    pub fn open_field_value(&self) -> String {
        self.open_rows()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Row count of the last reconciled render.
    #[must_use]
    pub fn previous_row_count(&self) -> Option<usize> {
        self.previous_row_count
    }

    /// Number of tracked rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no row is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(kinds: &[RowKind]) -> Vec<RowSlot> {
        kinds
            .iter()
            .enumerate()
            .map(|(position, kind)| RowSlot {
                id: RowIdentity::new(*kind, position),
                collapsible: true,
            })
            .collect()
    }

    const THREE: [RowKind; 3] = [RowKind::LogicGroup, RowKind::FilterRule, RowKind::FilterRule];

    #[test]
    fn test_first_render_is_closed() {
        let mut registry = RowRegistry::new();
        let states = registry.reconcile(&slots(&THREE));
        assert!(states.iter().all(|s| !s.open));
        assert_eq!(registry.previous_row_count(), Some(3));
    }

    #[test]
    fn test_appended_row_opens() {
        let mut registry = RowRegistry::new();
        registry.reconcile(&slots(&THREE));
        let rule1 = RowIdentity::new(RowKind::FilterRule, 1);
        registry.set_open(rule1, true);

        let mut four = THREE.to_vec();
        four.push(RowKind::FilterRule);
        let states = registry.reconcile(&slots(&four));
        let open: Vec<usize> = states
            .iter()
            .filter(|s| s.open)
            .map(|s| s.id.position)
            .collect();
        assert_eq!(open, vec![1, 3]);
    }

    #[test]
    fn test_removed_rows_are_dropped() {
        let mut registry = RowRegistry::new();
        let mut four = THREE.to_vec();
        four.push(RowKind::FilterRule);
        registry.reconcile(&slots(&four));
        registry.set_open(RowIdentity::new(RowKind::FilterRule, 3), true);

        registry.reconcile(&slots(&THREE));
        assert_eq!(registry.len(), 3);
        assert!(registry.states().iter().all(|s| !s.open));
    }

    #[test]
    fn test_non_collapsible_rows_are_not_tracked() {
        let mut registry = RowRegistry::new();
        let mut rows = slots(&THREE);
        rows[0].collapsible = false;
        let states = registry.reconcile(&rows);
        assert_eq!(states.len(), 2);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.previous_row_count(), Some(3));
    }

    #[test]
    fn test_kind_change_at_position_is_a_new_identity() {
        let mut registry = RowRegistry::new();
        registry.reconcile(&slots(&THREE));
        registry.set_open(RowIdentity::new(RowKind::FilterRule, 2), true);

        let swapped = [RowKind::LogicGroup, RowKind::FilterRule, RowKind::LogicGroup];
        let states = registry.reconcile(&slots(&swapped));
        assert!(!states[2].open);
    }

    #[test]
    fn test_toggle_and_field_value() {
        let mut registry = RowRegistry::new();
        registry.reconcile(&slots(&THREE));
        assert!(registry.toggle(RowIdentity::new(RowKind::FilterRule, 2)));
        assert!(registry.toggle(RowIdentity::new(RowKind::LogicGroup, 0)));
        assert_eq!(registry.open_field_value(), "logic-0 rule-2");
        assert!(!registry.toggle(RowIdentity::new(RowKind::LogicGroup, 0)));
        assert_eq!(registry.open_field_value(), "rule-2");
    }

    #[test]
    fn test_seed_from_field() {
        let mut registry = RowRegistry::new();
        registry.seed_from_field("rule-1  logic-0").unwrap();
        let states = registry.reconcile(&slots(&THREE));
        assert_eq!(
            states.iter().map(|s| s.open).collect::<Vec<_>>(),
            vec![true, true, false]
        );

        let mut untouched = RowRegistry::new();
        assert!(untouched.seed_from_field("rule-1 bogus").is_err());
        assert!(untouched.is_empty());
    }
}
