use crate::catalog::model::{Guard, SlotKind};
use crate::catalog::{EntityCatalog, SlotDefinition, Strategy};
use crate::error::{CoreError, CoreResult};
use crate::feedback::Verdict;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{ScenarioHost, ScenarioSession};

/// A complete set of user actions for one scenario, as exchanged with the answer
/// checker tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerSheet {
    /// slot id -> pool item id
    #[serde(default)]
    pub placements: BTreeMap<String, String>,
    /// slot id -> option id
    #[serde(default)]
    pub selections: BTreeMap<String, String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub counters: BTreeMap<String, usize>,
}

impl AnswerSheet {
    pub fn from_json(text: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// The sheet that solves the scenario: an accepted answer per slot with no pool
    /// item used twice, every positive flagged and every counter guard met.
    pub fn ground_truth(catalog: &EntityCatalog) -> CoreResult<Self> {
        let mut sheet = AnswerSheet::default();
        let mut placement_slots = Vec::new();
        for slot in catalog.slots() {
            match slot.kind {
                SlotKind::Placement => placement_slots.push(slot),
                SlotKind::Choice => {
                    let answer = slot.correct_ids.iter().next().cloned().ok_or_else(|| {
                        CoreError::InvalidCatalog(format!("slot {} has no correct answer", slot.id))
                    })?;
                    sheet.selections.insert(slot.id.clone(), answer);
                }
            }
        }
        let mut used = BTreeSet::new();
        let mut chosen = Vec::with_capacity(placement_slots.len());
        if !assign_distinct(&placement_slots, &mut used, &mut chosen) {
            return Err(CoreError::InvalidCatalog(format!(
                "{}: placement slots cannot all hold distinct correct items",
                catalog.id()
            )));
        }
        for (slot, item) in placement_slots.iter().zip(chosen) {
            sheet.placements.insert(slot.id.clone(), item);
        }
        if let Strategy::FlagDetection { positives } = catalog.strategy() {
            sheet.flags = positives.iter().cloned().collect();
        }
        for phase in catalog.phases() {
            if let Guard::MinCounter { counter, count } = &phase.guard {
                let entry = sheet.counters.entry(counter.clone()).or_insert(0);
                *entry = (*entry).max(*count);
            }
        }
        Ok(sheet)
    }

    /// Replays the sheet into a session, then walks forward and submits.
    pub fn play<H: ScenarioHost>(&self, session: &mut ScenarioSession<H>) -> CoreResult<Verdict> {
        self.apply(session)?;
        session.advance_to_final()?;
        session.submit()
    }

    pub fn apply<H: ScenarioHost>(&self, session: &mut ScenarioSession<H>) -> CoreResult<()> {
        for (counter, target) in &self.counters {
            while session.counter(counter) < *target {
                session.bump_counter(counter)?;
            }
        }
        for item in &self.flags {
            if !session.is_flagged(item) {
                session.toggle_flag(item)?;
            }
        }
        for (slot, item) in &self.placements {
            session.place(item, slot)?;
        }
        for (slot, option) in &self.selections {
            session.select_option(slot, option)?;
        }
        Ok(())
    }
}

/// Depth-first search for one distinct correct item per placement slot.
fn assign_distinct(
    slots: &[&SlotDefinition],
    used: &mut BTreeSet<String>,
    chosen: &mut Vec<String>,
) -> bool {
    let Some((slot, rest)) = slots.split_first() else {
        return true;
    };
    for candidate in &slot.correct_ids {
        if used.contains(candidate) {
            continue;
        }
        used.insert(candidate.clone());
        chosen.push(candidate.clone());
        if assign_distinct(rest, used, chosen) {
            return true;
        }
        chosen.pop();
        used.remove(candidate);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::model::*;
    use crate::determinism::shuffle::ShuffleSeed;
    use crate::session::NoopHost;
    use std::sync::Arc;

    fn shared_slots_catalog(first: &[&str], second: &[&str]) -> Arc<EntityCatalog> {
        let slot = |id: &str, correct: &[&str]| SlotDef {
            id: id.to_string(),
            label: id.to_string(),
            kind: SlotKind::Placement,
            options: vec![],
            default_option: None,
            correct: correct.iter().map(|c| c.to_string()).collect(),
            hint: None,
        };
        let def = ScenarioDefinition {
            id: "shared".to_string(),
            title: "Shared".to_string(),
            description: String::new(),
            difficulty: Difficulty::Intermediate,
            category: "Network Security".to_string(),
            items: ["a", "b", "c"]
                .iter()
                .map(|id| ItemDef {
                    id: id.to_string(),
                    label: id.to_uppercase(),
                    category: String::new(),
                })
                .collect(),
            slots: vec![slot("s1", first), slot("s2", second)],
            strategy: StrategyDef::SetMembership,
            scoring: ScoringDef::AllOrNothing,
            phases: vec![],
            retry_phase: None,
            rules: vec![],
            diagnostic_cap: None,
            generic_failure: None,
            success_message: "done".to_string(),
            require_complete: true,
        };
        Arc::new(EntityCatalog::from_definition(&def).unwrap())
    }

    #[test]
    fn ground_truth_uses_distinct_items_for_overlapping_slots() {
        let catalog = shared_slots_catalog(&["a", "b"], &["a", "b"]);
        let sheet = AnswerSheet::ground_truth(&catalog).unwrap();
        assert_ne!(sheet.placements["s1"], sheet.placements["s2"]);

        let mut session = ScenarioSession::new(catalog, NoopHost, ShuffleSeed::Identity).unwrap();
        let verdict = sheet.play(&mut session).unwrap();
        assert!(verdict.passed);
        assert_eq!(verdict.score, 100);
    }

    #[test]
    fn ground_truth_backtracks_past_a_greedy_choice() {
        let catalog = shared_slots_catalog(&["a", "b"], &["a"]);
        let sheet = AnswerSheet::ground_truth(&catalog).unwrap();
        assert_eq!(sheet.placements["s1"], "b");
        assert_eq!(sheet.placements["s2"], "a");
    }

    #[test]
    fn ground_truth_reports_unsolvable_placements() {
        let catalog = shared_slots_catalog(&["a"], &["a"]);
        assert!(matches!(
            AnswerSheet::ground_truth(&catalog),
            Err(CoreError::InvalidCatalog(_))
        ));
    }

    #[test]
    fn parses_partial_sheets() {
        let sheet = AnswerSheet::from_json(r#"{"flags": ["svchost_exe"]}"#).unwrap();
        assert_eq!(sheet.flags, vec!["svchost_exe".to_string()]);
        assert!(sheet.placements.is_empty());
        assert!(AnswerSheet::from_json("{").is_err());
    }
}
