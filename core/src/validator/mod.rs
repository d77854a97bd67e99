pub mod diagnostics;
pub mod scoring;

use crate::assignment::AssignmentStore;
use crate::catalog::{EntityCatalog, Strategy};
use crate::error::{CoreError, CoreResult};
use diagnostics::{capped, CappedDiagnostics, Diagnostic, DiagnosticSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    SetMembership,
    PositionalSequence,
    FlagDetection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotOutcome {
    pub slot_id: String,
    pub label: String,
    pub assigned: Option<String>,
    pub expected: Vec<String>,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FlagTally {
    pub hits: usize,
    pub false_positives: usize,
    pub missed: usize,
    pub expected: usize,
}

/// Derived per submission; never stored in the scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationResult {
    pub scenario_id: String,
    pub strategy: StrategyKind,
    pub correct_count: usize,
    pub total: usize,
    pub score: u8,
    pub slot_outcomes: Vec<SlotOutcome>,
    pub flag_tally: Option<FlagTally>,
    pub diagnostics: Vec<Diagnostic>,
    pub diagnostic_cap: usize,
}

impl ValidationResult {
    pub fn is_perfect(&self) -> bool {
        self.correct_count == self.total && self.diagnostics.is_empty()
    }

    pub fn capped_diagnostics(&self) -> CappedDiagnostics<'_> {
        capped(&self.diagnostics, self.diagnostic_cap)
    }
}

/// Compares the store against the catalog's ground truth. Pure: the same store
/// state always yields the same result.
pub fn validate(store: &AssignmentStore, catalog: &EntityCatalog) -> CoreResult<ValidationResult> {
    if store.catalog().id() != catalog.id() {
        return Err(CoreError::InvalidInput(format!(
            "store belongs to scenario {}, not {}",
            store.catalog().id(),
            catalog.id()
        )));
    }
    Ok(match catalog.strategy() {
        Strategy::SetMembership => validate_slots(store, catalog, StrategyKind::SetMembership),
        Strategy::PositionalSequence { .. } => {
            validate_slots(store, catalog, StrategyKind::PositionalSequence)
        }
        Strategy::FlagDetection { positives } => validate_flags(store, catalog, positives),
    })
}

// Set membership checks `assigned ∈ correct_ids`. For positional sequences the
// catalog pins each slot's correct set to exactly canonical_order[i], so the same
// test is a strict by-position comparison: the right item one slot off scores 0.
fn validate_slots(
    store: &AssignmentStore,
    catalog: &EntityCatalog,
    kind: StrategyKind,
) -> ValidationResult {
    let mut sink = DiagnosticSink::default();
    let mut outcomes = Vec::with_capacity(catalog.slots().len());
    let mut correct_count = 0;

    for (position, slot) in catalog.slots().iter().enumerate() {
        let assigned = store.assignment(&slot.id);
        let correct = assigned.map(|a| slot.accepts(a)).unwrap_or(false);
        if correct {
            correct_count += 1;
        } else {
            diagnostics::wrong_slot(catalog, slot, position, assigned, &mut sink);
        }
        outcomes.push(SlotOutcome {
            slot_id: slot.id.clone(),
            label: slot.label.clone(),
            assigned: assigned.map(str::to_string),
            expected: slot.correct_ids.iter().cloned().collect(),
            correct,
        });
    }

    let total = outcomes.len();
    if correct_count < total && sink.is_empty() {
        sink.push(catalog.id(), diagnostics::generic_failure(catalog));
    }

    ValidationResult {
        scenario_id: catalog.id().to_string(),
        strategy: kind,
        correct_count,
        total,
        score: scoring::ratio_score(correct_count, total),
        slot_outcomes: outcomes,
        flag_tally: None,
        diagnostics: sink.finish(),
        diagnostic_cap: catalog.diagnostic_cap(),
    }
}

fn validate_flags(
    store: &AssignmentStore,
    catalog: &EntityCatalog,
    positives: &BTreeSet<String>,
) -> ValidationResult {
    let flagged: BTreeSet<&str> = store.flags().iter().collect();
    let missed: Vec<&str> = positives
        .iter()
        .map(String::as_str)
        .filter(|p| !flagged.contains(p))
        .collect();
    let false_positives: Vec<&str> = flagged
        .iter()
        .copied()
        .filter(|f| !positives.contains(*f))
        .collect();
    let hits = positives.len() - missed.len();

    let mut sink = DiagnosticSink::default();
    if !missed.is_empty() {
        sink.push(
            catalog.id(),
            format!(
                "You missed {} of {} expected finding(s).",
                missed.len(),
                positives.len()
            ),
        );
    }
    if !false_positives.is_empty() {
        sink.push(
            catalog.id(),
            format!(
                "You flagged {} item(s) that are not findings.",
                false_positives.len()
            ),
        );
    }
    diagnostics::flag_rules(catalog, &missed, &false_positives, &mut sink);
    if !sink.is_empty() {
        if let Some(hint) = catalog.generic_failure() {
            sink.push(catalog.id(), hint);
        }
    }

    ValidationResult {
        scenario_id: catalog.id().to_string(),
        strategy: StrategyKind::FlagDetection,
        correct_count: hits,
        total: positives.len(),
        score: scoring::flag_score(hits, false_positives.len(), positives.len()),
        slot_outcomes: Vec::new(),
        flag_tally: Some(FlagTally {
            hits,
            false_positives: false_positives.len(),
            missed: missed.len(),
            expected: positives.len(),
        }),
        diagnostics: sink.finish(),
        diagnostic_cap: catalog.diagnostic_cap(),
    }
}
