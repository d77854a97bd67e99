pub mod library;
pub mod model;

use crate::determinism::fingerprint::catalog_fingerprint;
use crate::error::{CoreError, CoreResult};
use model::{
    ChoiceOption, Difficulty, DiagnosticRule, PhaseDef, ScenarioDefinition, ScoringDef, SlotKind,
    StrategyDef,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    pub label: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotDefinition {
    pub id: String,
    pub label: String,
    pub kind: SlotKind,
    pub options: Vec<ChoiceOption>,
    pub default_option: Option<String>,
    pub correct_ids: BTreeSet<String>,
    pub hint: Option<String>,
}

impl SlotDefinition {
    pub fn accepts(&self, id: &str) -> bool {
        self.correct_ids.contains(id)
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    SetMembership,
    PositionalSequence { canonical_order: Vec<String> },
    FlagDetection { positives: BTreeSet<String> },
}

/// Immutable ground truth for one scenario. Built once from a definition; nothing
/// handed out by reference allows the answers to change afterwards.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    id: String,
    title: String,
    difficulty: Difficulty,
    category: String,
    items: Vec<Item>,
    item_index: BTreeMap<String, usize>,
    slots: Vec<SlotDefinition>,
    slot_index: BTreeMap<String, usize>,
    strategy: Strategy,
    scoring: ScoringDef,
    phases: Vec<PhaseDef>,
    retry_phase: Option<String>,
    rules: Vec<DiagnosticRule>,
    diagnostic_cap: usize,
    generic_failure: Option<String>,
    success_message: String,
    require_complete: bool,
    fingerprint: String,
}

impl EntityCatalog {
    pub fn from_definition(def: &ScenarioDefinition) -> CoreResult<Self> {
        if def.id.trim().is_empty() {
            return Err(CoreError::InvalidCatalog(
                "scenario id cannot be empty".to_string(),
            ));
        }

        let mut items = Vec::with_capacity(def.items.len());
        let mut item_index = BTreeMap::new();
        for (idx, it) in def.items.iter().enumerate() {
            if item_index.insert(it.id.clone(), idx).is_some() {
                return Err(CoreError::InvalidCatalog(format!(
                    "{}: duplicate item id {}",
                    def.id, it.id
                )));
            }
            items.push(Item {
                id: it.id.clone(),
                label: it.label.clone(),
                category: it.category.clone(),
            });
        }

        let canonical = match &def.strategy {
            StrategyDef::PositionalSequence { canonical_order } => {
                if canonical_order.len() != def.slots.len() {
                    return Err(CoreError::InvalidCatalog(format!(
                        "{}: canonical order has {} entries for {} slots",
                        def.id,
                        canonical_order.len(),
                        def.slots.len()
                    )));
                }
                let mut seen = BTreeSet::new();
                if let Some(dup) = canonical_order.iter().find(|id| !seen.insert(id.as_str())) {
                    return Err(CoreError::InvalidCatalog(format!(
                        "{}: canonical order repeats item {}",
                        def.id, dup
                    )));
                }
                Some(canonical_order.as_slice())
            }
            _ => None,
        };

        let mut slots = Vec::with_capacity(def.slots.len());
        let mut slot_index = BTreeMap::new();
        for (pos, s) in def.slots.iter().enumerate() {
            if slot_index.insert(s.id.clone(), pos).is_some() {
                return Err(CoreError::InvalidCatalog(format!(
                    "{}: duplicate slot id {}",
                    def.id, s.id
                )));
            }
            let mut correct: BTreeSet<String> = s.correct.iter().cloned().collect();
            if let Some(order) = canonical {
                if s.kind != SlotKind::Placement {
                    return Err(CoreError::InvalidCatalog(format!(
                        "{}: positional slot {} must be a placement slot",
                        def.id, s.id
                    )));
                }
                let expected = &order[pos];
                if correct.is_empty() {
                    correct.insert(expected.clone());
                } else if correct.len() != 1 || !correct.contains(expected) {
                    return Err(CoreError::InvalidCatalog(format!(
                        "{}: slot {} disagrees with canonical order",
                        def.id, s.id
                    )));
                }
            }
            if correct.is_empty() {
                return Err(CoreError::InvalidCatalog(format!(
                    "{}: slot {} has no correct answer",
                    def.id, s.id
                )));
            }
            match s.kind {
                SlotKind::Placement => {
                    if let Some(unknown) = correct.iter().find(|c| !item_index.contains_key(*c)) {
                        return Err(CoreError::InvalidCatalog(format!(
                            "{}: slot {} accepts unknown item {}",
                            def.id, s.id, unknown
                        )));
                    }
                }
                SlotKind::Choice => {
                    if s.options.is_empty() {
                        return Err(CoreError::InvalidCatalog(format!(
                            "{}: choice slot {} has no options",
                            def.id, s.id
                        )));
                    }
                    let offered: BTreeSet<&str> = s.options.iter().map(|o| o.id.as_str()).collect();
                    if let Some(unknown) = correct.iter().find(|c| !offered.contains(c.as_str())) {
                        return Err(CoreError::InvalidCatalog(format!(
                            "{}: slot {} accepts option {} it does not offer",
                            def.id, s.id, unknown
                        )));
                    }
                    if let Some(d) = &s.default_option {
                        if !offered.contains(d.as_str()) {
                            return Err(CoreError::InvalidCatalog(format!(
                                "{}: slot {} defaults to unknown option {}",
                                def.id, s.id, d
                            )));
                        }
                    }
                }
            }
            slots.push(SlotDefinition {
                id: s.id.clone(),
                label: s.label.clone(),
                kind: s.kind,
                options: s.options.clone(),
                default_option: s.default_option.clone(),
                correct_ids: correct,
                hint: s.hint.clone(),
            });
        }

        let strategy = match &def.strategy {
            StrategyDef::SetMembership => {
                if slots.is_empty() {
                    return Err(CoreError::InvalidCatalog(format!(
                        "{}: set membership needs at least one slot",
                        def.id
                    )));
                }
                Strategy::SetMembership
            }
            StrategyDef::PositionalSequence { canonical_order } => {
                if slots.is_empty() {
                    return Err(CoreError::InvalidCatalog(format!(
                        "{}: positional sequence needs at least one slot",
                        def.id
                    )));
                }
                Strategy::PositionalSequence {
                    canonical_order: canonical_order.clone(),
                }
            }
            StrategyDef::FlagDetection { positives } => {
                let positives: BTreeSet<String> = positives.iter().cloned().collect();
                if positives.is_empty() {
                    return Err(CoreError::InvalidCatalog(format!(
                        "{}: flag detection needs at least one positive",
                        def.id
                    )));
                }
                if let Some(unknown) = positives.iter().find(|p| !item_index.contains_key(*p)) {
                    return Err(CoreError::InvalidCatalog(format!(
                        "{}: positive {} is not an item",
                        def.id, unknown
                    )));
                }
                Strategy::FlagDetection { positives }
            }
        };

        if let ScoringDef::Threshold { pass_threshold } = def.scoring {
            if pass_threshold == 0 || pass_threshold > 100 {
                return Err(CoreError::InvalidCatalog(format!(
                    "{}: pass threshold must be within 1..=100",
                    def.id
                )));
            }
        }

        let phases = if def.phases.is_empty() {
            vec![PhaseDef {
                id: "solve".to_string(),
                label: "Solve".to_string(),
                guard: model::Guard::Always,
                blocked_message: None,
            }]
        } else {
            def.phases.clone()
        };
        let mut phase_ids = BTreeSet::new();
        for p in &phases {
            if !phase_ids.insert(p.id.as_str()) {
                return Err(CoreError::InvalidCatalog(format!(
                    "{}: duplicate phase id {}",
                    def.id, p.id
                )));
            }
        }
        if let Some(retry) = &def.retry_phase {
            if !phase_ids.contains(retry.as_str()) {
                return Err(CoreError::InvalidCatalog(format!(
                    "{}: retry phase {} is not declared",
                    def.id, retry
                )));
            }
        }

        for rule in &def.rules {
            let item = match rule {
                DiagnosticRule::ItemMisplaced { item, .. }
                | DiagnosticRule::ItemAfterPosition { item, .. }
                | DiagnosticRule::FlagMissed { item, .. }
                | DiagnosticRule::FalsePositive { item, .. } => item,
            };
            if !item_index.contains_key(item) {
                return Err(CoreError::InvalidCatalog(format!(
                    "{}: diagnostic rule references unknown item {}",
                    def.id, item
                )));
            }
        }

        let diagnostic_cap = def.diagnostic_cap.unwrap_or(match strategy {
            Strategy::PositionalSequence { .. } => 3,
            _ => 5,
        });

        Ok(Self {
            id: def.id.clone(),
            title: def.title.clone(),
            difficulty: def.difficulty,
            category: def.category.clone(),
            items,
            item_index,
            slots,
            slot_index,
            strategy,
            scoring: def.scoring,
            phases,
            retry_phase: def.retry_phase.clone(),
            rules: def.rules.clone(),
            diagnostic_cap,
            generic_failure: def.generic_failure.clone(),
            success_message: def.success_message.clone(),
            require_complete: def.require_complete,
            fingerprint: catalog_fingerprint(def)?,
        })
    }

    pub fn item_by_id(&self, id: &str) -> Option<&Item> {
        self.item_index.get(id).map(|&i| &self.items[i])
    }

    pub fn slot_definition_by_id(&self, id: &str) -> Option<&SlotDefinition> {
        self.slot_index.get(id).map(|&i| &self.slots[i])
    }

    pub fn require_item(&self, id: &str) -> CoreResult<&Item> {
        self.item_by_id(id).ok_or_else(|| CoreError::unknown_item(id))
    }

    pub fn require_slot(&self, id: &str) -> CoreResult<&SlotDefinition> {
        self.slot_definition_by_id(id)
            .ok_or_else(|| CoreError::unknown_slot(id))
    }

    /// 0-based position of the slot in declaration order.
    pub fn slot_position(&self, id: &str) -> Option<usize> {
        self.slot_index.get(id).copied()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn slots(&self) -> &[SlotDefinition] {
        &self.slots
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn scoring(&self) -> ScoringDef {
        self.scoring
    }

    pub fn pass_threshold(&self) -> u8 {
        self.scoring.pass_threshold()
    }

    pub fn phases(&self) -> &[PhaseDef] {
        &self.phases
    }

    pub fn retry_phase(&self) -> Option<&str> {
        self.retry_phase.as_deref()
    }

    pub fn rules(&self) -> &[DiagnosticRule] {
        &self.rules
    }

    pub fn diagnostic_cap(&self) -> usize {
        self.diagnostic_cap
    }

    pub fn generic_failure(&self) -> Option<&str> {
        self.generic_failure.as_deref()
    }

    pub fn success_message(&self) -> &str {
        &self.success_message
    }

    pub fn require_complete(&self) -> bool {
        self.require_complete
    }

    /// SHA-256 of the canonical JSON definition this catalog was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[cfg(test)]
mod tests {
    use super::model::*;
    use super::*;

    fn item(id: &str) -> ItemDef {
        ItemDef {
            id: id.to_string(),
            label: id.to_uppercase(),
            category: String::new(),
        }
    }

    fn placement(id: &str, correct: &[&str]) -> SlotDef {
        SlotDef {
            id: id.to_string(),
            label: id.to_string(),
            kind: SlotKind::Placement,
            options: vec![],
            default_option: None,
            correct: correct.iter().map(|s| s.to_string()).collect(),
            hint: None,
        }
    }

    fn sequence_def() -> ScenarioDefinition {
        ScenarioDefinition {
            id: "seq".to_string(),
            title: "Sequence".to_string(),
            description: String::new(),
            difficulty: Difficulty::Foundational,
            category: "SOC Operations".to_string(),
            items: vec![item("a"), item("b"), item("c")],
            slots: vec![placement("p1", &[]), placement("p2", &[]), placement("p3", &[])],
            strategy: StrategyDef::PositionalSequence {
                canonical_order: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            },
            scoring: ScoringDef::AllOrNothing,
            phases: vec![],
            retry_phase: None,
            rules: vec![],
            diagnostic_cap: None,
            generic_failure: None,
            success_message: "done".to_string(),
            require_complete: true,
        }
    }

    #[test]
    fn positional_slots_derive_correct_ids_from_canonical_order() {
        let cat = EntityCatalog::from_definition(&sequence_def()).unwrap();
        let p2 = cat.slot_definition_by_id("p2").unwrap();
        assert!(p2.accepts("b"));
        assert!(!p2.accepts("a"));
        assert_eq!(cat.slot_position("p3"), Some(2));
        assert_eq!(cat.diagnostic_cap(), 3);
        assert_eq!(cat.phases().len(), 1);
        assert_eq!(cat.pass_threshold(), 100);
    }

    #[test]
    fn lookups_miss_cleanly_and_require_fails_loudly() {
        let cat = EntityCatalog::from_definition(&sequence_def()).unwrap();
        assert!(cat.item_by_id("zzz").is_none());
        assert!(cat.slot_definition_by_id("zzz").is_none());
        assert!(matches!(
            cat.require_item("zzz"),
            Err(CoreError::UnknownId { kind: "item", .. })
        ));
    }

    #[test]
    fn rejects_canonical_order_length_mismatch() {
        let mut def = sequence_def();
        def.strategy = StrategyDef::PositionalSequence {
            canonical_order: vec!["a".to_string()],
        };
        assert!(EntityCatalog::from_definition(&def).is_err());
    }

    #[test]
    fn rejects_canonical_order_with_repeated_item() {
        let mut def = sequence_def();
        def.strategy = StrategyDef::PositionalSequence {
            canonical_order: vec!["a".to_string(), "a".to_string(), "c".to_string()],
        };
        let err = EntityCatalog::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("canonical order repeats item a"));
    }

    #[test]
    fn rejects_flag_detection_without_positives() {
        let mut def = sequence_def();
        def.slots.clear();
        def.strategy = StrategyDef::FlagDetection { positives: vec![] };
        let err = EntityCatalog::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("at least one positive"));
    }

    #[test]
    fn rejects_slot_accepting_unknown_item() {
        let mut def = sequence_def();
        def.strategy = StrategyDef::SetMembership;
        def.slots = vec![placement("p1", &["ghost"])];
        assert!(EntityCatalog::from_definition(&def).is_err());
    }

    #[test]
    fn fingerprint_is_stable_per_definition() {
        let a = EntityCatalog::from_definition(&sequence_def()).unwrap();
        let b = EntityCatalog::from_definition(&sequence_def()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);

        let mut changed = sequence_def();
        changed.success_message = "other".to_string();
        let c = EntityCatalog::from_definition(&changed).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
