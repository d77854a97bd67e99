use crate::determinism::fingerprint::sha256_hex;
use crate::determinism::json_canonical;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ZERO_HASH_64: &str = "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventType {
    SessionStarted,
    ItemPlaced,
    SlotCleared,
    OptionSelected,
    FlagToggled,
    CounterBumped,
    PhaseAdvanced,
    PhaseRetreated,
    SubmissionRejected,
    SubmissionScored,
    ScenarioCompleted,
    ScenarioReset,
    ScenarioExited,
}

/// One entry of the in-memory session history. Entries are hash chained so a
/// host that exports the history can show it was not edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEvent {
    pub seq: u64,
    pub session_id: String,
    pub event_type: SessionEventType,
    pub details: Value,
    pub prev_event_hash: String,
    pub event_hash: String,
}

fn compute_event_hash(event: &SessionEvent) -> CoreResult<String> {
    let mut e = event.clone();
    e.event_hash = ZERO_HASH_64.to_string();
    let bytes = json_canonical::to_canonical_bytes(&e)?;
    Ok(sha256_hex(&bytes))
}

#[derive(Debug, Clone)]
pub struct Journal {
    session_id: String,
    events: Vec<SessionEvent>,
}

impl Journal {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            events: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        event_type: SessionEventType,
        details: Value,
    ) -> CoreResult<&SessionEvent> {
        let prev = self
            .events
            .last()
            .map(|e| e.event_hash.clone())
            .unwrap_or_else(|| ZERO_HASH_64.to_string());
        let mut event = SessionEvent {
            seq: self.events.len() as u64,
            session_id: self.session_id.clone(),
            event_type,
            details,
            prev_event_hash: prev,
            event_hash: ZERO_HASH_64.to_string(),
        };
        event.event_hash = compute_event_hash(&event)?;
        self.events.push(event);
        Ok(&self.events[self.events.len() - 1])
    }

    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn count(&self, event_type: SessionEventType) -> usize {
        self.events
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// One compact JSON object per line.
    pub fn to_ndjson(&self) -> CoreResult<String> {
        let mut out = String::new();
        for e in &self.events {
            out.push_str(&serde_json::to_string(e)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Checks sequence numbers and the hash chain of an exported history.
pub fn verify_chain(events: &[SessionEvent]) -> CoreResult<()> {
    let mut prev = ZERO_HASH_64.to_string();
    for (idx, e) in events.iter().enumerate() {
        if e.seq != idx as u64 {
            return Err(CoreError::InvalidInput(format!(
                "event {} has seq {}",
                idx, e.seq
            )));
        }
        if e.prev_event_hash != prev {
            return Err(CoreError::InvalidInput(format!(
                "event {} does not chain to its predecessor",
                idx
            )));
        }
        if compute_event_hash(e)? != e.event_hash {
            return Err(CoreError::InvalidInput(format!(
                "event {} hash mismatch",
                idx
            )));
        }
        prev = e.event_hash.clone();
    }
    Ok(())
}
