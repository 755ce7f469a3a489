//! Open-state laws across arbitrary row insertions and removals.

use proptest::prelude::*;
use searchkit_core::{RowIdentity, RowKind, RowRegistry, RowSlot};

fn kind() -> impl Strategy<Value = RowKind> {
    prop_oneof![Just(RowKind::LogicGroup), Just(RowKind::FilterRule)]
}

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

/// A render, user toggles on it, and the next render. The next render keeps
/// a prefix of the rows and appends fresh ones of arbitrary kind.
fn reload() -> impl Strategy<Value = (Vec<RowKind>, Vec<bool>, Vec<RowKind>)> {
    (prop::collection::vec(kind(), 1..10), 0usize..10, prop::collection::vec(kind(), 0..5))
        .prop_flat_map(|(before, keep, appended)| {
            let toggles = prop::collection::vec(any::<bool>(), before.len());
            let keep = keep.min(before.len());
            let mut after = before[..keep].to_vec();
            after.extend(appended);
            (Just(before), toggles, Just(after))
        })
}

proptest! {
    #[test]
    fn test_reconcile_keeps_known_and_opens_appended((before, toggles, after) in reload()) {
        let mut registry = RowRegistry::new();
        registry.reconcile(&slots(&before));
        for (position, (kind, open)) in before.iter().zip(&toggles).enumerate() {
            registry.set_open(RowIdentity::new(*kind, position), *open);
        }

        let states = registry.reconcile(&slots(&after));
        prop_assert_eq!(states.len(), after.len());
        prop_assert_eq!(registry.len(), after.len());
        for state in states {
            let position = state.id.position;
            let known = before.get(position) == Some(&state.id.kind);
            if known {
                prop_assert_eq!(state.open, toggles[position]);
            } else if position >= before.len() {
                prop_assert!(state.open);
            } else {
                // Kind changed in place: a new identity inside the old row count.
                prop_assert!(!state.open);
            }
            prop_assert_eq!(registry.is_open(state.id), state.open);
        }
    }

    #[test]
    fn test_first_render_opens_nothing(kinds in prop::collection::vec(kind(), 0..12)) {
        let mut registry = RowRegistry::new();
        let states = registry.reconcile(&slots(&kinds));
        prop_assert!(states.iter().all(|s| !s.open));
    }

    #[test]
    fn test_reconcile_tracks_only_collapsible_rows(
        rows in prop::collection::vec((kind(), any::<bool>()), 0..12)
    ) {
        let rows: Vec<RowSlot> = rows
            .iter()
            .enumerate()
            .map(|(position, (kind, collapsible))| RowSlot {
                id: RowIdentity::new(*kind, position),
                collapsible: *collapsible,
            })
            .collect();
        let mut registry = RowRegistry::new();
        registry.reconcile(&rows);
        let collapsible = rows.iter().filter(|r| r.collapsible).count();
        prop_assert_eq!(registry.len(), collapsible);
        prop_assert_eq!(registry.previous_row_count(), Some(rows.len()));
    }

    #[test]
    fn test_persisted_field_restores_open_rows((kinds, toggles, _) in reload()) {
        let mut registry = RowRegistry::new();
        registry.reconcile(&slots(&kinds));
        for (position, (kind, open)) in kinds.iter().zip(&toggles).enumerate() {
            registry.set_open(RowIdentity::new(*kind, position), *open);
        }

        let mut restored = RowRegistry::new();
        restored.seed_from_field(&registry.open_field_value()).unwrap();
        let states = restored.reconcile(&slots(&kinds));
        let open: Vec<bool> = states.iter().map(|s| s.open).collect();
        prop_assert_eq!(open, toggles);
    }
}
