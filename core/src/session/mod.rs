pub mod answers;
pub mod deferred;
pub mod journal;

use crate::assignment::{AssignmentStore, Placement};
use crate::catalog::model::{Guard, PhaseDef, SlotKind};
use crate::catalog::{EntityCatalog, Item};
use crate::determinism::fingerprint::session_id_ulid;
use crate::determinism::shuffle::{shuffled, ShuffleSeed};
use crate::error::{CoreError, CoreResult};
use crate::feedback::{BulletComposer, FeedbackComposer, Verdict};
use crate::phase::{GuardContext, PhaseMachine};
use crate::validator::{validate, ValidationResult};
use deferred::Deferred;
use journal::{Journal, SessionEventType};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The two callbacks a hosting application supplies per scenario instance.
pub trait ScenarioHost {
    /// Called at most once per session, only for a passing submission.
    fn on_complete(&mut self, score: u8);
    fn on_exit(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHost;

impl ScenarioHost for NoopHost {
    fn on_complete(&mut self, _score: u8) {}
    fn on_exit(&mut self) {}
}

/// Adapts a pair of closures into a host.
pub struct CallbackHost<C, E>
where
    C: FnMut(u8),
    E: FnMut(),
{
    on_complete: C,
    on_exit: E,
}

impl<C, E> CallbackHost<C, E>
where
    C: FnMut(u8),
    E: FnMut(),
{
    pub fn new(on_complete: C, on_exit: E) -> Self {
        Self {
            on_complete,
            on_exit,
        }
    }
}

impl<C, E> ScenarioHost for CallbackHost<C, E>
where
    C: FnMut(u8),
    E: FnMut(),
{
    fn on_complete(&mut self, score: u8) {
        (self.on_complete)(score)
    }

    fn on_exit(&mut self) {
        (self.on_exit)()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Active,
    Passed,
    Exited,
}

/// One mounted scenario: catalog, answers, phases and host callbacks. Nothing is
/// shared between sessions.
pub struct ScenarioSession<H: ScenarioHost> {
    session_id: String,
    catalog: Arc<EntityCatalog>,
    store: AssignmentStore,
    phases: PhaseMachine,
    counters: BTreeMap<String, usize>,
    selected: Option<String>,
    pool_order: Vec<String>,
    composer: Box<dyn FeedbackComposer>,
    host: H,
    state: SessionState,
    completion_reported: bool,
    attempts: u32,
    last_verdict: Option<Verdict>,
    journal: Journal,
}

impl<H: ScenarioHost> ScenarioSession<H> {
    pub fn new(catalog: Arc<EntityCatalog>, host: H, seed: ShuffleSeed) -> CoreResult<Self> {
        let session_id = session_id_ulid();
        let ids: Vec<String> = catalog.items().iter().map(|i| i.id.clone()).collect();
        let pool_order = shuffled(&ids, seed);
        let phases = PhaseMachine::new(catalog.phases().to_vec())?;
        let mut journal = Journal::new(session_id.clone());
        journal.record(
            SessionEventType::SessionStarted,
            json!({
                "scenario_id": catalog.id(),
                "catalog_fingerprint": catalog.fingerprint(),
            }),
        )?;
        info!(
            session_id = session_id.as_str(),
            scenario = catalog.id(),
            "session started"
        );
        Ok(Self {
            session_id,
            store: AssignmentStore::new(catalog.clone()),
            composer: Box::new(BulletComposer::for_catalog(&catalog)),
            catalog,
            phases,
            counters: BTreeMap::new(),
            selected: None,
            pool_order,
            host,
            state: SessionState::Active,
            completion_reported: false,
            attempts: 0,
            last_verdict: None,
            journal,
        })
    }

    /// Swaps the presentation of verdicts without touching validation.
    pub fn with_composer(mut self, composer: Box<dyn FeedbackComposer>) -> Self {
        self.composer = composer;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn catalog(&self) -> &EntityCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &AssignmentStore {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_verdict(&self) -> Option<&Verdict> {
        self.last_verdict.as_ref()
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    // -- pool and selection --

    /// Unplaced pool items in this session's shuffled order.
    pub fn available_items(&self) -> Vec<&Item> {
        self.pool_order
            .iter()
            .filter(|id| !self.store.is_placed(id))
            .filter_map(|id| self.catalog.item_by_id(id))
            .collect()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Returns false when the item is already placed and therefore disabled.
    pub fn select_item(&mut self, item_id: &str) -> CoreResult<bool> {
        self.ensure_active()?;
        self.catalog.require_item(item_id)?;
        if self.store.is_placed(item_id) {
            return Ok(false);
        }
        self.selected = Some(item_id.to_string());
        Ok(true)
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn place_selected(&mut self, slot_id: &str) -> CoreResult<Placement> {
        let item = self
            .selected
            .clone()
            .ok_or_else(|| CoreError::InvalidInput("no item selected".to_string()))?;
        self.place(&item, slot_id)
    }

    // -- store mutations --

    pub fn place(&mut self, item_id: &str, slot_id: &str) -> CoreResult<Placement> {
        self.ensure_active()?;
        let out = self.store.place(item_id, slot_id)?;
        if self.selected.as_deref() == Some(item_id) {
            self.selected = None;
        }
        self.journal.record(
            SessionEventType::ItemPlaced,
            json!({
                "item": item_id,
                "slot": slot_id,
                "moved_from": out.moved_from,
                "displaced": out.displaced,
            }),
        )?;
        Ok(out)
    }

    /// Empties a slot. A pool item taken out of a placement slot becomes the
    /// current selection so it can be dropped straight somewhere else.
    pub fn clear(&mut self, slot_id: &str) -> CoreResult<Option<String>> {
        self.ensure_active()?;
        let kind = self.catalog.require_slot(slot_id)?.kind;
        let previous = self.store.clear(slot_id)?;
        if kind == SlotKind::Placement {
            if let Some(p) = &previous {
                self.selected = Some(p.clone());
            }
        }
        self.journal.record(
            SessionEventType::SlotCleared,
            json!({ "slot": slot_id, "previous": previous }),
        )?;
        Ok(previous)
    }

    pub fn select_option(&mut self, slot_id: &str, option_id: &str) -> CoreResult<()> {
        self.ensure_active()?;
        self.store.select(slot_id, option_id)?;
        self.journal.record(
            SessionEventType::OptionSelected,
            json!({ "slot": slot_id, "option": option_id }),
        )?;
        Ok(())
    }

    pub fn cycle_option(&mut self, slot_id: &str) -> CoreResult<String> {
        self.ensure_active()?;
        let next = self.store.cycle(slot_id)?;
        self.journal.record(
            SessionEventType::OptionSelected,
            json!({ "slot": slot_id, "option": next }),
        )?;
        Ok(next)
    }

    pub fn toggle_flag(&mut self, item_id: &str) -> CoreResult<bool> {
        self.ensure_active()?;
        let now = self.store.toggle_flag(item_id)?;
        self.journal.record(
            SessionEventType::FlagToggled,
            json!({ "item": item_id, "flagged": now }),
        )?;
        Ok(now)
    }

    pub fn is_flagged(&self, item_id: &str) -> bool {
        self.store.flags().is_flagged(item_id)
    }

    pub fn flagged_count(&self) -> usize {
        self.store.flags().len()
    }

    /// Records one completed auxiliary step (key generated, CSR created, ...).
    /// Only counters some phase guard refers to exist.
    pub fn bump_counter(&mut self, counter: &str) -> CoreResult<usize> {
        self.ensure_active()?;
        let known = self.catalog.phases().iter().any(|p| {
            matches!(&p.guard, Guard::MinCounter { counter: c, .. } if c == counter)
        });
        if !known {
            return Err(CoreError::UnknownId {
                kind: "counter",
                id: counter.to_string(),
            });
        }
        let value = self.counters.entry(counter.to_string()).or_insert(0);
        *value += 1;
        let value = *value;
        debug!(
            session_id = self.session_id.as_str(),
            counter,
            value,
            "counter bumped"
        );
        self.journal.record(
            SessionEventType::CounterBumped,
            json!({ "counter": counter, "value": value }),
        )?;
        Ok(value)
    }

    pub fn counter(&self, counter: &str) -> usize {
        self.counters.get(counter).copied().unwrap_or(0)
    }

    // -- phases --

    pub fn current_phase(&self) -> &PhaseDef {
        self.phases.current()
    }

    pub fn is_final_phase(&self) -> bool {
        self.phases.is_final()
    }

    pub fn can_advance(&self) -> bool {
        self.state == SessionState::Active && self.phases.can_advance(&self.guard_context())
    }

    pub fn advance(&mut self) -> CoreResult<&PhaseDef> {
        self.ensure_active()?;
        let from = self.phases.current().id.clone();
        let ctx = GuardContext {
            filled_slots: self.store.filled_count(),
            answered_slots: self.store.answered_count(),
            total_slots: self.catalog.slots().len(),
            flagged: self.store.flags().len(),
            counters: &self.counters,
        };
        if let Err(e) = self.phases.advance(&ctx) {
            warn!(
                session_id = self.session_id.as_str(),
                phase = from.as_str(),
                reason = %e.user_message(),
                "advance blocked"
            );
            return Err(e);
        }
        let to = self.phases.current().id.clone();
        self.journal.record(
            SessionEventType::PhaseAdvanced,
            json!({ "from": from, "to": to }),
        )?;
        Ok(self.phases.current())
    }

    /// Advances until the final phase, stopping at the first unmet guard.
    pub fn advance_to_final(&mut self) -> CoreResult<()> {
        while !self.phases.is_final() {
            self.advance()?;
        }
        Ok(())
    }

    pub fn retreat(&mut self) -> CoreResult<bool> {
        self.ensure_active()?;
        let moved = self.phases.retreat()?;
        if moved {
            self.journal.record(
                SessionEventType::PhaseRetreated,
                json!({ "to": self.phases.current().id }),
            )?;
        }
        Ok(moved)
    }

    // -- grading --

    /// Validates the current answers without recording an attempt.
    pub fn preview(&self) -> CoreResult<ValidationResult> {
        validate(&self.store, &self.catalog)
    }

    pub fn submit(&mut self) -> CoreResult<Verdict> {
        self.ensure_active()?;
        if let Err(e) = self.check_submittable() {
            warn!(
                session_id = self.session_id.as_str(),
                reason = %e.user_message(),
                "submission rejected"
            );
            self.journal.record(
                SessionEventType::SubmissionRejected,
                json!({ "reason": e.user_message() }),
            )?;
            return Err(e);
        }

        let result = validate(&self.store, &self.catalog)?;
        let verdict = self
            .composer
            .compose(&result, self.catalog.pass_threshold());
        self.attempts += 1;
        info!(
            session_id = self.session_id.as_str(),
            scenario = self.catalog.id(),
            score = verdict.score,
            passed = verdict.passed,
            attempt = self.attempts,
            "submission scored"
        );
        self.journal.record(
            SessionEventType::SubmissionScored,
            json!({
                "attempt": self.attempts,
                "score": verdict.score,
                "passed": verdict.passed,
                "correct_count": result.correct_count,
                "total": result.total,
            }),
        )?;

        if verdict.passed {
            self.phases.mark_passed();
            self.state = SessionState::Passed;
            if !self.completion_reported {
                self.completion_reported = true;
                self.host.on_complete(verdict.score);
                self.journal.record(
                    SessionEventType::ScenarioCompleted,
                    json!({ "score": verdict.score }),
                )?;
            }
        } else if let Some(retry) = self.catalog.retry_phase() {
            if self.phases.return_to(retry) {
                debug!(
                    session_id = self.session_id.as_str(),
                    phase = retry,
                    "returned for retry"
                );
            }
        }

        self.last_verdict = Some(verdict.clone());
        Ok(verdict)
    }

    /// Same grading as `submit`; the verdict is handed back behind a cosmetic
    /// delay the caller may wait out, skip or cancel.
    pub fn submit_with_delay(&mut self, delay: Duration) -> CoreResult<Deferred<Verdict>> {
        let verdict = self.submit()?;
        Ok(Deferred::new(verdict, delay))
    }

    /// Clears answers, flags and counters and goes back to the first phase.
    pub fn reset(&mut self) -> CoreResult<()> {
        self.ensure_active()?;
        self.store.reset();
        self.phases.restart();
        self.counters.clear();
        self.selected = None;
        self.last_verdict = None;
        self.journal
            .record(SessionEventType::ScenarioReset, json!({}))?;
        info!(session_id = self.session_id.as_str(), "session reset");
        Ok(())
    }

    /// Abandons the scenario. Safe in any state; the host hears about it once.
    pub fn exit(&mut self) -> CoreResult<()> {
        if self.state == SessionState::Exited {
            return Ok(());
        }
        let was = self.state;
        self.state = SessionState::Exited;
        self.host.on_exit();
        self.journal.record(
            SessionEventType::ScenarioExited,
            json!({ "from_state": was, "phase": self.phases.current().id }),
        )?;
        info!(session_id = self.session_id.as_str(), "session exited");
        Ok(())
    }

    fn check_submittable(&self) -> CoreResult<()> {
        self.phases.check_submit(&self.guard_context())?;
        if self.catalog.require_complete() {
            let missing: Vec<String> = self
                .store
                .empty_slots()
                .into_iter()
                .map(str::to_string)
                .collect();
            if !missing.is_empty() {
                return Err(CoreError::IncompleteSubmission { missing });
            }
        }
        Ok(())
    }

    fn guard_context(&self) -> GuardContext<'_> {
        GuardContext {
            filled_slots: self.store.filled_count(),
            answered_slots: self.store.answered_count(),
            total_slots: self.catalog.slots().len(),
            flagged: self.store.flags().len(),
            counters: &self.counters,
        }
    }

    fn ensure_active(&self) -> CoreResult<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Passed => Err(CoreError::ScenarioClosed(
                "scenario already passed".to_string(),
            )),
            SessionState::Exited => Err(CoreError::ScenarioClosed(
                "scenario was exited".to_string(),
            )),
        }
    }
}
