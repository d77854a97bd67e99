use crate::catalog::model::DiagnosticRule;
use crate::catalog::{EntityCatalog, SlotDefinition, Strategy};
use serde::{Deserialize, Serialize};

pub const OVERFLOW_INDICATOR: &str = "...and more.";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    /// Slot or item the message is about.
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CappedDiagnostics<'a> {
    pub shown: &'a [Diagnostic],
    pub hidden: usize,
}

impl CappedDiagnostics<'_> {
    pub fn has_more(&self) -> bool {
        self.hidden > 0
    }
}

pub fn capped(diagnostics: &[Diagnostic], cap: usize) -> CappedDiagnostics<'_> {
    let shown = &diagnostics[..diagnostics.len().min(cap)];
    CappedDiagnostics {
        shown,
        hidden: diagnostics.len() - shown.len(),
    }
}

/// Collects messages in order, dropping repeats of the same text.
#[derive(Debug, Default)]
pub(crate) struct DiagnosticSink {
    out: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub(crate) fn push(&mut self, subject: &str, message: impl Into<String>) {
        let message = message.into();
        if self.out.iter().any(|d| d.message == message) {
            return;
        }
        self.out.push(Diagnostic {
            subject: subject.to_string(),
            message,
        });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub(crate) fn finish(self) -> Vec<Diagnostic> {
        self.out
    }
}

/// Messages for one wrongly answered slot. Falls back to a per-slot generic line
/// only for set-membership tasks; sequence tasks get one scenario-level line instead.
pub(crate) fn wrong_slot(
    catalog: &EntityCatalog,
    slot: &SlotDefinition,
    position: usize,
    assigned: Option<&str>,
    sink: &mut DiagnosticSink,
) {
    let Some(assigned) = assigned else {
        sink.push(&slot.id, format!("{}: no item assigned.", slot.label));
        return;
    };

    let mut specific = false;
    for rule in catalog.rules() {
        match rule {
            DiagnosticRule::ItemMisplaced { item, message } if item == assigned => {
                sink.push(assigned, message.clone());
                specific = true;
            }
            DiagnosticRule::ItemAfterPosition {
                item,
                max_position,
                message,
            } if item == assigned && position > *max_position => {
                sink.push(assigned, message.clone());
                specific = true;
            }
            _ => {}
        }
    }
    if let Some(hint) = &slot.hint {
        sink.push(&slot.id, hint.clone());
        specific = true;
    }
    if !specific && matches!(catalog.strategy(), Strategy::SetMembership) {
        sink.push(&slot.id, format!("{}: incorrect assignment.", slot.label));
    }
}

pub(crate) fn flag_rules(
    catalog: &EntityCatalog,
    missed: &[&str],
    false_positives: &[&str],
    sink: &mut DiagnosticSink,
) {
    for rule in catalog.rules() {
        match rule {
            DiagnosticRule::FlagMissed { item, message } if missed.contains(&item.as_str()) => {
                sink.push(item, message.clone());
            }
            DiagnosticRule::FalsePositive { item, message }
                if false_positives.contains(&item.as_str()) =>
            {
                sink.push(item, message.clone());
            }
            _ => {}
        }
    }
}

pub(crate) fn generic_failure(catalog: &EntityCatalog) -> String {
    if let Some(text) = catalog.generic_failure() {
        return text.to_string();
    }
    match catalog.strategy() {
        Strategy::PositionalSequence { .. } => {
            "The items are not in the correct order.".to_string()
        }
        _ => "One or more answers are incorrect.".to_string(),
    }
}
