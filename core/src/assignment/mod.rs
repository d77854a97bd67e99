pub mod flags;

use crate::catalog::model::SlotKind;
use crate::catalog::{EntityCatalog, Item};
use crate::error::{CoreError, CoreResult};
use flags::FlagSet;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Side effects of a single `place` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Slot the item was lifted out of, if it was already placed elsewhere.
    pub moved_from: Option<String>,
    /// Item that previously occupied the target slot and went back to the pool.
    pub displaced: Option<String>,
}

/// User answers for one scenario: slot assignments plus flagged items.
///
/// Invariant: a pool item occupies at most one placement slot. `place` keeps it
/// by lifting the item out of its old slot in the same call.
#[derive(Debug, Clone)]
pub struct AssignmentStore {
    catalog: Arc<EntityCatalog>,
    assigned: BTreeMap<String, Option<String>>,
    placed_in: BTreeMap<String, String>,
    flags: FlagSet,
}

impl AssignmentStore {
    pub fn new(catalog: Arc<EntityCatalog>) -> Self {
        let assigned = initial_assignments(&catalog);
        Self {
            catalog,
            assigned,
            placed_in: BTreeMap::new(),
            flags: FlagSet::default(),
        }
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn place(&mut self, item_id: &str, slot_id: &str) -> CoreResult<Placement> {
        let slot = self.catalog.require_slot(slot_id)?;
        self.catalog.require_item(item_id)?;
        if slot.kind != SlotKind::Placement {
            return Err(CoreError::InvalidInput(format!(
                "slot {} takes a choice, not a pool item",
                slot_id
            )));
        }

        let mut out = Placement::default();
        match self.placed_in.get(item_id) {
            Some(current) if current == slot_id => return Ok(out),
            Some(current) => {
                let old = current.clone();
                self.assigned.insert(old.clone(), None);
                out.moved_from = Some(old);
            }
            None => {}
        }

        if let Some(Some(previous)) = self.assigned.get(slot_id) {
            let previous = previous.clone();
            self.placed_in.remove(&previous);
            out.displaced = Some(previous);
        }

        self.assigned
            .insert(slot_id.to_string(), Some(item_id.to_string()));
        self.placed_in
            .insert(item_id.to_string(), slot_id.to_string());
        debug!(
            item = item_id,
            slot = slot_id,
            moved_from = ?out.moved_from,
            displaced = ?out.displaced,
            "item placed"
        );
        Ok(out)
    }

    /// Sets a choice field. Options are per-field values, so the same option id may
    /// appear in many fields.
    pub fn select(&mut self, slot_id: &str, option_id: &str) -> CoreResult<()> {
        let slot = self.catalog.require_slot(slot_id)?;
        if slot.kind != SlotKind::Choice {
            return Err(CoreError::InvalidInput(format!(
                "slot {} takes a pool item, not a choice",
                slot_id
            )));
        }
        if !slot.has_option(option_id) {
            return Err(CoreError::unknown_option(option_id));
        }
        self.assigned
            .insert(slot_id.to_string(), Some(option_id.to_string()));
        debug!(slot = slot_id, option = option_id, "option selected");
        Ok(())
    }

    /// Moves a choice field to its next option, wrapping around. An empty field
    /// takes the first option.
    pub fn cycle(&mut self, slot_id: &str) -> CoreResult<String> {
        let slot = self.catalog.require_slot(slot_id)?;
        if slot.kind != SlotKind::Choice {
            return Err(CoreError::InvalidInput(format!(
                "slot {} takes a pool item, not a choice",
                slot_id
            )));
        }
        let current = self.assignment(slot_id);
        let next_idx = match current.and_then(|c| slot.options.iter().position(|o| o.id == c)) {
            Some(i) => (i + 1) % slot.options.len(),
            None => 0,
        };
        let next = slot.options[next_idx].id.clone();
        self.assigned
            .insert(slot_id.to_string(), Some(next.clone()));
        Ok(next)
    }

    /// Empties the slot and hands back what was in it.
    pub fn clear(&mut self, slot_id: &str) -> CoreResult<Option<String>> {
        self.catalog.require_slot(slot_id)?;
        let previous = self.assigned.insert(slot_id.to_string(), None).flatten();
        if let Some(p) = &previous {
            if self.placed_in.get(p).map(String::as_str) == Some(slot_id) {
                self.placed_in.remove(p);
            }
            debug!(slot = slot_id, item = p.as_str(), "slot cleared");
        }
        Ok(previous)
    }

    /// Back to the initial state: placement slots empty, choice fields at their
    /// defaults, no flags.
    pub fn reset(&mut self) {
        self.assigned = initial_assignments(&self.catalog);
        self.placed_in.clear();
        self.flags.clear();
        debug!(scenario = self.catalog.id(), "assignment store reset");
    }

    pub fn is_placed(&self, item_id: &str) -> bool {
        self.placed_in.contains_key(item_id)
    }

    pub fn slot_of(&self, item_id: &str) -> Option<&str> {
        self.placed_in.get(item_id).map(String::as_str)
    }

    pub fn assignment(&self, slot_id: &str) -> Option<&str> {
        self.assigned.get(slot_id).and_then(|a| a.as_deref())
    }

    /// Slot id and current assignment, in declaration order.
    pub fn assignments(&self) -> Vec<(&str, Option<&str>)> {
        self.catalog
            .slots()
            .iter()
            .map(|s| (s.id.as_str(), self.assignment(&s.id)))
            .collect()
    }

    pub fn empty_slots(&self) -> Vec<&str> {
        self.catalog
            .slots()
            .iter()
            .filter(|s| self.assignment(&s.id).is_none())
            .map(|s| s.id.as_str())
            .collect()
    }

    pub fn filled_count(&self) -> usize {
        self.assigned.values().filter(|a| a.is_some()).count()
    }

    /// Slots the user has actually answered: placed slots and choice fields moved
    /// off their default option.
    pub fn answered_count(&self) -> usize {
        self.catalog
            .slots()
            .iter()
            .filter(|s| match self.assignment(&s.id) {
                None => false,
                Some(current) => s.kind == SlotKind::Placement
                    || s.default_option.as_deref() != Some(current),
            })
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.filled_count() == self.catalog.slots().len()
    }

    /// Pool items not sitting in any slot, in catalog order.
    pub fn available_items(&self) -> Vec<&Item> {
        self.catalog
            .items()
            .iter()
            .filter(|i| !self.is_placed(&i.id))
            .collect()
    }

    pub fn flag(&mut self, item_id: &str) -> CoreResult<bool> {
        self.flags.flag(&self.catalog, item_id)
    }

    pub fn unflag(&mut self, item_id: &str) -> CoreResult<bool> {
        self.flags.unflag(&self.catalog, item_id)
    }

    pub fn toggle_flag(&mut self, item_id: &str) -> CoreResult<bool> {
        let now = self.flags.toggle(&self.catalog, item_id)?;
        debug!(item = item_id, flagged = now, "flag toggled");
        Ok(now)
    }

    pub fn flags(&self) -> &FlagSet {
        &self.flags
    }
}

fn initial_assignments(catalog: &EntityCatalog) -> BTreeMap<String, Option<String>> {
    catalog
        .slots()
        .iter()
        .map(|s| {
            let initial = match s.kind {
                SlotKind::Placement => None,
                SlotKind::Choice => s.default_option.clone(),
            };
            (s.id.clone(), initial)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::*;
    use proptest::prelude::*;

    fn catalog() -> Arc<EntityCatalog> {
        let def = ScenarioDefinition {
            id: "store_test".to_string(),
            title: "Store".to_string(),
            description: String::new(),
            difficulty: Difficulty::Foundational,
            category: "Test".to_string(),
            items: ["a", "b", "c"]
                .iter()
                .map(|id| ItemDef {
                    id: id.to_string(),
                    label: id.to_string(),
                    category: String::new(),
                })
                .collect(),
            slots: vec![
                SlotDef {
                    id: "s1".to_string(),
                    label: "Slot 1".to_string(),
                    kind: SlotKind::Placement,
                    options: vec![],
                    default_option: None,
                    correct: vec!["a".to_string()],
                    hint: None,
                },
                SlotDef {
                    id: "s2".to_string(),
                    label: "Slot 2".to_string(),
                    kind: SlotKind::Placement,
                    options: vec![],
                    default_option: None,
                    correct: vec!["b".to_string()],
                    hint: None,
                },
                SlotDef {
                    id: "perm".to_string(),
                    label: "Permission".to_string(),
                    kind: SlotKind::Choice,
                    options: ["none", "read", "read_write"]
                        .iter()
                        .map(|o| ChoiceOption {
                            id: o.to_string(),
                            label: o.to_string(),
                        })
                        .collect(),
                    default_option: Some("none".to_string()),
                    correct: vec!["read".to_string()],
                    hint: None,
                },
            ],
            strategy: StrategyDef::SetMembership,
            scoring: ScoringDef::AllOrNothing,
            phases: vec![],
            retry_phase: None,
            rules: vec![],
            diagnostic_cap: None,
            generic_failure: None,
            success_message: "ok".to_string(),
            require_complete: true,
        };
        Arc::new(EntityCatalog::from_definition(&def).unwrap())
    }

    #[test]
    fn defaulted_choice_fields_do_not_count_as_answers() {
        let mut store = AssignmentStore::new(catalog());
        assert_eq!(store.filled_count(), 1);
        assert_eq!(store.answered_count(), 0);

        store.select("perm", "read").unwrap();
        assert_eq!(store.answered_count(), 1);
        store.select("perm", "none").unwrap();
        assert_eq!(store.answered_count(), 0);

        store.place("a", "s1").unwrap();
        assert_eq!(store.answered_count(), 1);
    }

    #[test]
    fn place_moves_item_between_slots() {
        let mut store = AssignmentStore::new(catalog());
        store.place("a", "s1").unwrap();
        let out = store.place("a", "s2").unwrap();
        assert_eq!(out.moved_from.as_deref(), Some("s1"));
        assert_eq!(store.assignment("s1"), None);
        assert_eq!(store.assignment("s2"), Some("a"));
        assert_eq!(store.slot_of("a"), Some("s2"));
    }

    #[test]
    fn place_into_occupied_slot_returns_old_item_to_pool() {
        let mut store = AssignmentStore::new(catalog());
        store.place("a", "s1").unwrap();
        let out = store.place("b", "s1").unwrap();
        assert_eq!(out.displaced.as_deref(), Some("a"));
        assert!(!store.is_placed("a"));
        assert!(store.is_placed("b"));
    }

    #[test]
    fn place_is_idempotent() {
        let mut store = AssignmentStore::new(catalog());
        store.place("a", "s1").unwrap();
        let out = store.place("a", "s1").unwrap();
        assert_eq!(out, Placement::default());
        assert_eq!(store.assignment("s1"), Some("a"));
    }

    #[test]
    fn unknown_ids_fail_loudly() {
        let mut store = AssignmentStore::new(catalog());
        assert!(matches!(
            store.place("ghost", "s1"),
            Err(CoreError::UnknownId { kind: "item", .. })
        ));
        assert!(matches!(
            store.place("a", "nowhere"),
            Err(CoreError::UnknownId { kind: "slot", .. })
        ));
        assert!(matches!(
            store.select("perm", "admin"),
            Err(CoreError::UnknownId { kind: "option", .. })
        ));
        assert!(store.toggle_flag("ghost").is_err());
    }

    #[test]
    fn clear_returns_previous_item() {
        let mut store = AssignmentStore::new(catalog());
        store.place("b", "s2").unwrap();
        assert_eq!(store.clear("s2").unwrap().as_deref(), Some("b"));
        assert!(!store.is_placed("b"));
        assert_eq!(store.clear("s2").unwrap(), None);
    }

    #[test]
    fn choice_fields_cycle_and_reset_to_default() {
        let mut store = AssignmentStore::new(catalog());
        assert_eq!(store.assignment("perm"), Some("none"));
        assert_eq!(store.cycle("perm").unwrap(), "read");
        assert_eq!(store.cycle("perm").unwrap(), "read_write");
        assert_eq!(store.cycle("perm").unwrap(), "none");
        store.select("perm", "read").unwrap();
        assert!(store.place("a", "perm").is_err());
        store.reset();
        assert_eq!(store.assignment("perm"), Some("none"));
    }

    #[test]
    fn reset_restores_full_pool_and_drops_flags() {
        let mut store = AssignmentStore::new(catalog());
        store.place("a", "s1").unwrap();
        store.place("b", "s2").unwrap();
        store.toggle_flag("c").unwrap();
        assert_eq!(store.available_items().len(), 1);
        store.reset();
        assert_eq!(store.available_items().len(), 3);
        assert!(store.flags().is_empty());
        assert_eq!(store.empty_slots(), vec!["s1", "s2"]);
    }

    #[test]
    fn toggle_flag_flips_state() {
        let mut store = AssignmentStore::new(catalog());
        assert!(store.toggle_flag("c").unwrap());
        assert!(store.flags().is_flagged("c"));
        assert!(!store.toggle_flag("c").unwrap());
        assert!(!store.flags().is_flagged("c"));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Place(usize, usize),
        Clear(usize),
        Reset,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..3, 0usize..2).prop_map(|(i, s)| Op::Place(i, s)),
            (0usize..2).prop_map(Op::Clear),
            Just(Op::Reset),
        ]
    }

    proptest! {
        #[test]
        fn prop_no_item_occupies_two_slots(ops in proptest::collection::vec(op(), 0..40)) {
            let items = ["a", "b", "c"];
            let slots = ["s1", "s2"];
            let mut store = AssignmentStore::new(catalog());
            for op in ops {
                match op {
                    Op::Place(i, s) => { store.place(items[i], slots[s]).unwrap(); }
                    Op::Clear(s) => { store.clear(slots[s]).unwrap(); }
                    Op::Reset => store.reset(),
                }
                for item in items {
                    let holders = store
                        .assignments()
                        .iter()
                        .filter(|(_, a)| *a == Some(item))
                        .count();
                    prop_assert!(holders <= 1);
                    prop_assert_eq!(holders == 1, store.is_placed(item));
                }
            }
        }

        #[test]
        fn prop_place_twice_equals_place_once(i in 0usize..3, s in 0usize..2) {
            let items = ["a", "b", "c"];
            let slots = ["s1", "s2"];
            let mut once = AssignmentStore::new(catalog());
            once.place(items[i], slots[s]).unwrap();
            let mut twice = AssignmentStore::new(catalog());
            twice.place(items[i], slots[s]).unwrap();
            twice.place(items[i], slots[s]).unwrap();
            prop_assert_eq!(once.assignments(), twice.assignments());
        }
    }
}
