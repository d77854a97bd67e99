use crate::error::CoreResult;
use crate::validator::diagnostics::OVERFLOW_INDICATOR;
use crate::validator::ValidationResult;

pub fn render_result_csv(result: &ValidationResult) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(["slot_id", "label", "assigned", "expected", "status"])?;
    for row in &result.slot_outcomes {
        let expected = row.expected.join(";");
        wtr.write_record([
            row.slot_id.as_str(),
            row.label.as_str(),
            row.assigned.as_deref().unwrap_or(""),
            expected.as_str(),
            if row.correct { "CORRECT" } else { "WRONG" },
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}

pub fn render_result_markdown(result: &ValidationResult, pass_threshold: u8) -> String {
    let passed = result.score >= pass_threshold;
    let mut out = Vec::new();
    out.push(format!(
        "# Result: {}",
        if passed { "PASS" } else { "FAIL" }
    ));
    out.push("".to_string());
    out.push(format!("- Scenario: {}", result.scenario_id));
    out.push(format!(
        "- Score: {} (pass mark {})",
        result.score, pass_threshold
    ));
    out.push(format!("- Correct: {} of {}", result.correct_count, result.total));
    if let Some(t) = &result.flag_tally {
        out.push(format!(
            "- Findings: {} hit, {} missed, {} false positive(s)",
            t.hits, t.missed, t.false_positives
        ));
    }
    out.push("".to_string());

    if !result.slot_outcomes.is_empty() {
        out.push("| Slot | Assigned | Status |".to_string());
        out.push("|---|---|---|".to_string());
        for row in &result.slot_outcomes {
            out.push(format!(
                "| {} | {} | {} |",
                row.label,
                row.assigned.as_deref().unwrap_or("-"),
                if row.correct { "correct" } else { "wrong" }
            ));
        }
        out.push("".to_string());
    }

    let capped = result.capped_diagnostics();
    if !capped.shown.is_empty() {
        out.push("## Review".to_string());
        out.push("".to_string());
        for d in capped.shown {
            out.push(format!("- [ ] {}", d.message));
        }
        if capped.has_more() {
            out.push(format!("- {}", OVERFLOW_INDICATOR));
        }
        out.push("".to_string());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{SlotOutcome, StrategyKind};

    fn matrix_result() -> ValidationResult {
        ValidationResult {
            scenario_id: "matrix".to_string(),
            strategy: StrategyKind::SetMembership,
            correct_count: 1,
            total: 2,
            score: 50,
            slot_outcomes: vec![
                SlotOutcome {
                    slot_id: "hr_personnel".to_string(),
                    label: "HR Manager / Personnel Files".to_string(),
                    assigned: Some("read_write".to_string()),
                    expected: vec!["read_write".to_string()],
                    correct: true,
                },
                SlotOutcome {
                    slot_id: "sales_sys".to_string(),
                    label: "Sales Rep / System Config".to_string(),
                    assigned: None,
                    expected: vec!["none".to_string()],
                    correct: false,
                },
            ],
            flag_tally: None,
            diagnostics: vec![],
            diagnostic_cap: 5,
        }
    }

    #[test]
    fn csv_has_one_row_per_slot() {
        let csv = render_result_csv(&matrix_result()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "slot_id,label,assigned,expected,status");
        assert_eq!(
            lines[1],
            "hr_personnel,HR Manager / Personnel Files,read_write,read_write,CORRECT"
        );
        assert_eq!(lines[2], "sales_sys,Sales Rep / System Config,,none,WRONG");
        assert!(!csv.contains('\r'));
    }

    #[test]
    fn markdown_marks_empty_slots() {
        let md = render_result_markdown(&matrix_result(), 100);
        assert!(md.starts_with("# Result: FAIL"));
        assert!(md.contains("| Sales Rep / System Config | - | wrong |"));
        assert!(!md.contains("## Review"));
    }
}
