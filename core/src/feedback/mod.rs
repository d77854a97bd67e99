pub mod render;

use crate::catalog::EntityCatalog;
use crate::validator::diagnostics::OVERFLOW_INDICATOR;
use crate::validator::ValidationResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub score: u8,
    pub message: String,
}

/// Turns a validation result into user-facing text. Implementations only decide
/// presentation; `passed` is always `score >= pass_threshold`.
pub trait FeedbackComposer: Send + Sync {
    fn compose(&self, result: &ValidationResult, pass_threshold: u8) -> Verdict;
}

/// Plain text: a fixed success line, or one "• " bullet per diagnostic.
#[derive(Debug, Clone)]
pub struct BulletComposer {
    pub success_message: String,
}

impl BulletComposer {
    pub fn new(success_message: impl Into<String>) -> Self {
        Self {
            success_message: success_message.into(),
        }
    }

    pub fn for_catalog(catalog: &EntityCatalog) -> Self {
        Self::new(catalog.success_message())
    }
}

impl FeedbackComposer for BulletComposer {
    fn compose(&self, result: &ValidationResult, pass_threshold: u8) -> Verdict {
        let passed = result.score >= pass_threshold;
        let message = if passed {
            self.success_message.clone()
        } else {
            let capped = result.capped_diagnostics();
            let mut lines: Vec<String> = capped
                .shown
                .iter()
                .map(|d| format!("• {}", d.message))
                .collect();
            if capped.has_more() {
                lines.push(OVERFLOW_INDICATOR.to_string());
            }
            if lines.is_empty() {
                lines.push(format!(
                    "• Score {} is below the pass mark of {}.",
                    result.score, pass_threshold
                ));
            }
            lines.join("\n")
        };
        Verdict {
            passed,
            score: result.score,
            message,
        }
    }
}

/// Markdown report for hosts that render rich text.
#[derive(Debug, Clone, Default)]
pub struct MarkdownComposer;

impl FeedbackComposer for MarkdownComposer {
    fn compose(&self, result: &ValidationResult, pass_threshold: u8) -> Verdict {
        Verdict {
            passed: result.score >= pass_threshold,
            score: result.score,
            message: render::render_result_markdown(result, pass_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::diagnostics::Diagnostic;
    use crate::validator::StrategyKind;

    fn result(score: u8, messages: &[&str], cap: usize) -> ValidationResult {
        ValidationResult {
            scenario_id: "t".to_string(),
            strategy: StrategyKind::SetMembership,
            correct_count: 0,
            total: 4,
            score,
            slot_outcomes: vec![],
            flag_tally: None,
            diagnostics: messages
                .iter()
                .map(|m| Diagnostic {
                    subject: "s".to_string(),
                    message: m.to_string(),
                })
                .collect(),
            diagnostic_cap: cap,
        }
    }

    #[test]
    fn passing_result_uses_success_message() {
        let c = BulletComposer::new("All clear.");
        let v = c.compose(&result(100, &[], 5), 100);
        assert!(v.passed);
        assert_eq!(v.message, "All clear.");
    }

    #[test]
    fn failure_lists_capped_bullets_with_overflow_line() {
        let c = BulletComposer::new("All clear.");
        let v = c.compose(&result(25, &["one", "two", "three", "four"], 3), 100);
        assert!(!v.passed);
        assert_eq!(v.message, "• one\n• two\n• three\n...and more.");
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let c = BulletComposer::new("ok");
        assert!(c.compose(&result(80, &[], 5), 80).passed);
        let v = c.compose(&result(79, &[], 5), 80);
        assert!(!v.passed);
        assert_eq!(v.message, "• Score 79 is below the pass mark of 80.");
    }

    #[test]
    fn composers_agree_on_pass_fail() {
        let r = result(67, &["You missed 1 of 3 expected finding(s)."], 5);
        let plain = BulletComposer::new("ok").compose(&r, 80);
        let md = MarkdownComposer.compose(&r, 80);
        assert_eq!(plain.passed, md.passed);
        assert_eq!(plain.score, md.score);
        assert!(md.message.starts_with("# Result: FAIL"));
    }
}
