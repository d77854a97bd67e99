use crate::catalog::model::{Guard, PhaseDef};
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Counts a guard is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct GuardContext<'a> {
    pub filled_slots: usize,
    /// Filled slots excluding choice fields still at their default.
    pub answered_slots: usize,
    pub total_slots: usize,
    pub flagged: usize,
    pub counters: &'a BTreeMap<String, usize>,
}

impl Guard {
    /// `Err` carries the user-facing reason the guard does not hold.
    pub fn check(&self, ctx: &GuardContext<'_>) -> Result<(), String> {
        match self {
            Guard::Always => Ok(()),
            Guard::MinFlagged { count } => {
                if ctx.flagged >= *count {
                    Ok(())
                } else {
                    Err(format!(
                        "Flag {} pieces of evidence first ({} flagged so far).",
                        count, ctx.flagged
                    ))
                }
            }
            Guard::AllSlotsFilled => {
                if ctx.filled_slots >= ctx.total_slots {
                    Ok(())
                } else {
                    Err(format!(
                        "Fill every slot first ({} of {} filled).",
                        ctx.filled_slots, ctx.total_slots
                    ))
                }
            }
            Guard::AtLeastOneSelection => {
                if ctx.answered_slots + ctx.flagged > 0 {
                    Ok(())
                } else {
                    Err("Make at least one selection first.".to_string())
                }
            }
            Guard::MinCounter { counter, count } => {
                let have = ctx.counters.get(counter).copied().unwrap_or(0);
                if have >= *count {
                    Ok(())
                } else {
                    Err(format!(
                        "Complete '{}' first ({} of {}).",
                        counter, have, count
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PhaseStatus {
    Active,
    /// Terminal: a passing submission was recorded.
    Passed,
}

/// Ordered phases with a cursor. Forward moves are guarded; `retreat` is not.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    phases: Vec<PhaseDef>,
    current: usize,
    status: PhaseStatus,
}

impl PhaseMachine {
    pub fn new(phases: Vec<PhaseDef>) -> CoreResult<Self> {
        if phases.is_empty() {
            return Err(CoreError::InvalidCatalog(
                "phase machine needs at least one phase".to_string(),
            ));
        }
        Ok(Self {
            phases,
            current: 0,
            status: PhaseStatus::Active,
        })
    }

    pub fn current(&self) -> &PhaseDef {
        &self.phases[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn phases(&self) -> &[PhaseDef] {
        &self.phases
    }

    pub fn status(&self) -> PhaseStatus {
        self.status
    }

    pub fn is_final(&self) -> bool {
        self.current + 1 == self.phases.len()
    }

    pub fn can_advance(&self, ctx: &GuardContext<'_>) -> bool {
        self.check_advance(ctx).is_ok()
    }

    pub fn check_advance(&self, ctx: &GuardContext<'_>) -> CoreResult<()> {
        self.ensure_active()?;
        if self.is_final() {
            return Err(self.blocked("This is the final step; submit your answer instead."));
        }
        self.check_current_guard(ctx)
    }

    pub fn advance(&mut self, ctx: &GuardContext<'_>) -> CoreResult<&PhaseDef> {
        self.check_advance(ctx)?;
        let from = self.current;
        self.current += 1;
        info!(
            from = self.phases[from].id.as_str(),
            to = self.current().id.as_str(),
            "phase advanced"
        );
        Ok(self.current())
    }

    /// Steps back one phase. Returns false at the first phase.
    pub fn retreat(&mut self) -> CoreResult<bool> {
        self.ensure_active()?;
        if self.current == 0 {
            return Ok(false);
        }
        self.current -= 1;
        info!(to = self.current().id.as_str(), "phase retreated");
        Ok(true)
    }

    /// Submission is only possible from the final phase with its guard satisfied.
    pub fn check_submit(&self, ctx: &GuardContext<'_>) -> CoreResult<()> {
        self.ensure_active()?;
        if !self.is_final() {
            let last = &self.phases[self.phases.len() - 1];
            return Err(self.blocked(&format!(
                "Finish this step before moving on to {}.",
                last.label
            )));
        }
        self.check_current_guard(ctx)
    }

    /// Jumps back to `phase_id` after a failed submission. Unknown ids leave the
    /// cursor where it is.
    pub fn return_to(&mut self, phase_id: &str) -> bool {
        if self.status != PhaseStatus::Active {
            return false;
        }
        match self.phases.iter().position(|p| p.id == phase_id) {
            Some(idx) if idx <= self.current => {
                self.current = idx;
                true
            }
            _ => false,
        }
    }

    pub fn restart(&mut self) {
        self.current = 0;
        self.status = PhaseStatus::Active;
    }

    pub fn mark_passed(&mut self) {
        self.status = PhaseStatus::Passed;
    }

    fn check_current_guard(&self, ctx: &GuardContext<'_>) -> CoreResult<()> {
        let phase = self.current();
        phase.guard.check(ctx).map_err(|reason| CoreError::GuardNotSatisfied {
            phase: phase.id.clone(),
            reason: phase.blocked_message.clone().unwrap_or(reason),
        })
    }

    fn blocked(&self, reason: &str) -> CoreError {
        CoreError::GuardNotSatisfied {
            phase: self.current().id.clone(),
            reason: reason.to_string(),
        }
    }

    fn ensure_active(&self) -> CoreResult<()> {
        match self.status {
            PhaseStatus::Active => Ok(()),
            PhaseStatus::Passed => Err(CoreError::ScenarioClosed(
                "scenario already passed".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(id: &str, guard: Guard) -> PhaseDef {
        PhaseDef {
            id: id.to_string(),
            label: id.to_string(),
            guard,
            blocked_message: None,
        }
    }

    fn machine() -> PhaseMachine {
        PhaseMachine::new(vec![
            phase("investigate", Guard::MinFlagged { count: 3 }),
            phase("analyze", Guard::AtLeastOneSelection),
            phase("remediate", Guard::Always),
        ])
        .unwrap()
    }

    fn ctx(flagged: usize, counters: &BTreeMap<String, usize>) -> GuardContext<'_> {
        GuardContext {
            filled_slots: 0,
            answered_slots: 0,
            total_slots: 2,
            flagged,
            counters,
        }
    }

    #[test]
    fn advance_blocked_until_guard_holds() {
        let counters = BTreeMap::new();
        let mut m = machine();
        let err = m.advance(&ctx(2, &counters)).unwrap_err();
        assert!(matches!(err, CoreError::GuardNotSatisfied { .. }));
        assert!(err.user_message().contains("Flag 3 pieces of evidence"));
        assert_eq!(m.current().id, "investigate");

        assert!(m.can_advance(&ctx(3, &counters)));
        assert_eq!(m.advance(&ctx(3, &counters)).unwrap().id, "analyze");
    }

    #[test]
    fn at_least_one_selection_ignores_defaulted_fields() {
        let counters = BTreeMap::new();
        let defaults_only = GuardContext {
            filled_slots: 2,
            answered_slots: 0,
            total_slots: 2,
            flagged: 0,
            counters: &counters,
        };
        assert!(Guard::AtLeastOneSelection.check(&defaults_only).is_err());

        let changed = GuardContext {
            answered_slots: 1,
            ..defaults_only
        };
        assert!(Guard::AtLeastOneSelection.check(&changed).is_ok());
    }

    #[test]
    fn cannot_advance_past_final_phase() {
        let counters = BTreeMap::new();
        let mut m = machine();
        m.advance(&ctx(3, &counters)).unwrap();
        m.advance(&ctx(3, &counters)).unwrap();
        assert!(m.is_final());
        assert!(!m.can_advance(&ctx(3, &counters)));
        assert!(m.check_submit(&ctx(3, &counters)).is_ok());
    }

    #[test]
    fn retreat_is_unconditional_and_stops_at_first_phase() {
        let counters = BTreeMap::new();
        let mut m = machine();
        m.advance(&ctx(3, &counters)).unwrap();
        assert!(m.retreat().unwrap());
        assert!(!m.retreat().unwrap());
        assert_eq!(m.current_index(), 0);
    }

    #[test]
    fn submit_only_from_final_phase() {
        let counters = BTreeMap::new();
        let m = machine();
        assert!(m.check_submit(&ctx(5, &counters)).is_err());
    }

    #[test]
    fn counter_guard_and_custom_blocked_message() {
        let mut counters = BTreeMap::new();
        let mut p = phase(
            "keys",
            Guard::MinCounter {
                counter: "keys_generated".to_string(),
                count: 1,
            },
        );
        p.blocked_message = Some("Generate the private key first.".to_string());
        let mut m = PhaseMachine::new(vec![p, phase("csr", Guard::Always)]).unwrap();

        let err = m.advance(&ctx(0, &counters)).unwrap_err();
        assert_eq!(err.user_message(), "Generate the private key first.");

        counters.insert("keys_generated".to_string(), 1);
        assert!(m.advance(&ctx(0, &counters)).is_ok());
    }

    #[test]
    fn passed_machine_is_closed() {
        let counters = BTreeMap::new();
        let mut m = machine();
        m.mark_passed();
        assert!(matches!(
            m.advance(&ctx(3, &counters)),
            Err(CoreError::ScenarioClosed(_))
        ));
        assert!(!m.return_to("investigate"));
        m.restart();
        assert_eq!(m.status(), PhaseStatus::Active);
    }

    #[test]
    fn return_to_only_moves_backwards() {
        let counters = BTreeMap::new();
        let mut m = machine();
        assert!(!m.return_to("remediate"));
        m.advance(&ctx(3, &counters)).unwrap();
        m.advance(&ctx(3, &counters)).unwrap();
        assert!(m.return_to("investigate"));
        assert_eq!(m.current().id, "investigate");
    }
}
