use crate::catalog::model::{Difficulty, ScenarioLibrary};
use crate::quiz::QuizReport;
use crate::session::ScenarioHost;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionRecord {
    pub best_score: u8,
    pub last_score: u8,
    pub completions: u32,
    /// Catalog revision the best score was earned on.
    pub catalog_fingerprint: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Clearance {
    Trainee,
    JuniorAnalyst,
    SecurityAnalyst,
    SecurityArchitect,
    Ciso,
}

impl Clearance {
    pub fn for_completion(pct: u8) -> Self {
        match pct {
            90.. => Clearance::Ciso,
            70..=89 => Clearance::SecurityArchitect,
            50..=69 => Clearance::SecurityAnalyst,
            20..=49 => Clearance::JuniorAnalyst,
            _ => Clearance::Trainee,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Clearance::Trainee => "Trainee",
            Clearance::JuniorAnalyst => "Junior Analyst",
            Clearance::SecurityAnalyst => "Security Analyst",
            Clearance::SecurityArchitect => "Security Architect",
            Clearance::Ciso => "CISO",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct DifficultyStats {
    pub total: usize,
    pub completed: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub completion_pct: u8,
    pub average_score: u8,
    pub by_difficulty: BTreeMap<Difficulty, DifficultyStats>,
    pub clearance: Clearance,
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    ((200 * part + whole) / (2 * whole)).min(100) as u8
}

/// In-memory record of passed scenarios, fed by session completion callbacks,
/// plus the practice questions still waiting for review.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    records: BTreeMap<String, CompletionRecord>,
    missed_questions: BTreeSet<u32>,
    quizzes_taken: u32,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, scenario_id: &str, fingerprint: &str, score: u8) {
        let score = score.min(100);
        let rec = self
            .records
            .entry(scenario_id.to_string())
            .or_insert_with(|| CompletionRecord {
                best_score: 0,
                last_score: 0,
                completions: 0,
                catalog_fingerprint: fingerprint.to_string(),
            });
        rec.completions += 1;
        rec.last_score = score;
        if score >= rec.best_score || rec.catalog_fingerprint != fingerprint {
            rec.best_score = score;
            rec.catalog_fingerprint = fingerprint.to_string();
        }
        info!(scenario = scenario_id, score, best = rec.best_score, "completion recorded");
    }

    /// Wrong or skipped questions join the review queue; questions answered
    /// correctly leave it.
    pub fn record_quiz(&mut self, report: &QuizReport) {
        for r in &report.results {
            if r.correct {
                self.missed_questions.remove(&r.question_id);
            } else {
                self.missed_questions.insert(r.question_id);
            }
        }
        self.quizzes_taken += 1;
        info!(
            score = report.score,
            queued = self.missed_questions.len(),
            "quiz recorded"
        );
    }

    pub fn missed_questions(&self) -> &BTreeSet<u32> {
        &self.missed_questions
    }

    pub fn quizzes_taken(&self) -> u32 {
        self.quizzes_taken
    }

    pub fn get(&self, scenario_id: &str) -> Option<&CompletionRecord> {
        self.records.get(scenario_id)
    }

    pub fn records(&self) -> &BTreeMap<String, CompletionRecord> {
        &self.records
    }

    /// Host that records a session's completion into this tracker.
    pub fn host_for<'a>(&'a mut self, scenario_id: &str, fingerprint: &str) -> ProgressHost<'a> {
        ProgressHost {
            tracker: self,
            scenario_id: scenario_id.to_string(),
            fingerprint: fingerprint.to_string(),
            exited: false,
        }
    }

    /// Dashboard numbers over the scenarios of `library`. Records for ids the
    /// library does not contain are ignored.
    pub fn stats(&self, library: &ScenarioLibrary) -> DashboardStats {
        let total = library.scenarios.len();
        let done: Vec<&CompletionRecord> = library
            .scenarios
            .iter()
            .filter_map(|s| self.records.get(&s.id))
            .collect();
        let completed = done.len();
        let average_score = if completed == 0 {
            0
        } else {
            let sum: usize = done.iter().map(|r| r.best_score as usize).sum();
            percent(sum, completed * 100)
        };

        let mut by_difficulty = BTreeMap::new();
        for d in Difficulty::ALL {
            let level: Vec<&str> = library
                .scenarios
                .iter()
                .filter(|s| s.difficulty == d)
                .map(|s| s.id.as_str())
                .collect();
            let level_done = level.iter().filter(|id| self.records.contains_key(**id)).count();
            by_difficulty.insert(
                d,
                DifficultyStats {
                    total: level.len(),
                    completed: level_done,
                    percent: percent(level_done, level.len()),
                },
            );
        }

        let completion_pct = percent(completed, total);
        DashboardStats {
            total,
            completed,
            completion_pct,
            average_score,
            by_difficulty,
            clearance: Clearance::for_completion(completion_pct),
        }
    }
}

pub struct ProgressHost<'a> {
    tracker: &'a mut ProgressTracker,
    scenario_id: String,
    fingerprint: String,
    exited: bool,
}

impl ProgressHost<'_> {
    pub fn exited(&self) -> bool {
        self.exited
    }
}

impl ScenarioHost for ProgressHost<'_> {
    fn on_complete(&mut self, score: u8) {
        self.tracker
            .record(&self.scenario_id, &self.fingerprint, score);
    }

    fn on_exit(&mut self) {
        self.exited = true;
    }
}
