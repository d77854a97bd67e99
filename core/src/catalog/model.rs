use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Foundational,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Foundational,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemDef {
    pub id: String,
    pub label: String,
    /// Presentation grouping only.
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    /// Takes one item from the shared pool; an item sits in at most one placement slot.
    #[default]
    Placement,
    /// Takes one value from the slot's own option list.
    Choice,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlotDef {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub kind: SlotKind,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub default_option: Option<String>,
    /// Accepted answers. Positional scenarios may leave this empty; it is then
    /// derived from the canonical order.
    #[serde(default)]
    pub correct: Vec<String>,
    /// Message shown verbatim when this slot is answered wrongly.
    #[serde(default)]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyDef {
    SetMembership,
    PositionalSequence { canonical_order: Vec<String> },
    FlagDetection { positives: Vec<String> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScoringDef {
    AllOrNothing,
    Threshold { pass_threshold: u8 },
}

impl ScoringDef {
    pub fn pass_threshold(&self) -> u8 {
        match self {
            ScoringDef::AllOrNothing => 100,
            ScoringDef::Threshold { pass_threshold } => *pass_threshold,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Guard {
    #[default]
    Always,
    MinFlagged {
        count: usize,
    },
    AllSlotsFilled,
    AtLeastOneSelection,
    MinCounter {
        counter: String,
        count: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseDef {
    pub id: String,
    pub label: String,
    /// Must hold to leave this phase forward (or to submit from the final phase).
    #[serde(default)]
    pub guard: Guard,
    #[serde(default)]
    pub blocked_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum DiagnosticRule {
    /// The item sits in a slot that does not accept it.
    ItemMisplaced { item: String, message: String },
    /// The item sits in a wrong slot whose position is later than `max_position` (0-based).
    ItemAfterPosition {
        item: String,
        max_position: usize,
        message: String,
    },
    FlagMissed { item: String, message: String },
    FalsePositive { item: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScenarioDefinition {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    pub category: String,
    #[serde(default)]
    pub items: Vec<ItemDef>,
    #[serde(default)]
    pub slots: Vec<SlotDef>,
    pub strategy: StrategyDef,
    pub scoring: ScoringDef,
    #[serde(default)]
    pub phases: Vec<PhaseDef>,
    #[serde(default)]
    pub retry_phase: Option<String>,
    #[serde(default)]
    pub rules: Vec<DiagnosticRule>,
    #[serde(default)]
    pub diagnostic_cap: Option<usize>,
    #[serde(default)]
    pub generic_failure: Option<String>,
    pub success_message: String,
    #[serde(default = "default_true")]
    pub require_complete: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioLibrary {
    pub library_version: String,
    pub scenarios: Vec<ScenarioDefinition>,
}
