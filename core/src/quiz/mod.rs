//! Multiple-choice practice quizzes drawn from the question bank.
//!
//! A quiz is a fixed list of questions answered one at a time. Each answer is
//! locked in when given and scored immediately; the final report uses the same
//! ratio scoring as the mapping scenarios.

pub mod bank;

use crate::determinism::fingerprint::session_id_ulid;
use crate::determinism::shuffle::{shuffled, ShuffleSeed};
use crate::error::{CoreError, CoreResult};
use crate::validator::scoring::ratio_score;
use bank::{PracticeQuestion, QuestionBank};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

pub const DEFAULT_QUIZ_LENGTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizMode {
    /// `count` questions from the whole bank in shuffled order.
    Random { count: usize },
    /// Every question of one domain, shuffled.
    Domain(String),
    /// Every previously missed question still in the bank, shuffled.
    Review,
}

/// Picks the questions for a new quiz.
pub fn select_questions(
    bank: &QuestionBank,
    mode: &QuizMode,
    missed: &BTreeSet<u32>,
    seed: ShuffleSeed,
) -> CoreResult<Vec<PracticeQuestion>> {
    let pool: Vec<PracticeQuestion> = match mode {
        QuizMode::Random { count } => {
            if *count == 0 {
                return Err(CoreError::InvalidInput(
                    "a quiz needs at least one question".to_string(),
                ));
            }
            let mut all = shuffled(&bank.questions, seed);
            all.truncate(*count);
            return Ok(all);
        }
        QuizMode::Domain(domain) => {
            let picked: Vec<PracticeQuestion> =
                bank.by_domain(domain).into_iter().cloned().collect();
            if picked.is_empty() {
                return Err(CoreError::UnknownId {
                    kind: "domain",
                    id: domain.clone(),
                });
            }
            picked
        }
        QuizMode::Review => {
            let picked: Vec<PracticeQuestion> = bank
                .questions
                .iter()
                .filter(|q| missed.contains(&q.id))
                .cloned()
                .collect();
            if picked.is_empty() {
                return Err(CoreError::InvalidInput(
                    "No missed questions yet.".to_string(),
                ));
            }
            picked
        }
    };
    Ok(shuffled(&pool, seed))
}

/// Outcome shown right after a question is answered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub question_id: u32,
    pub correct: bool,
    pub correct_answer: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionResult {
    pub question_id: u32,
    pub domain: String,
    /// `None` when the question was skipped.
    pub chosen: Option<usize>,
    pub correct_answer: usize,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizReport {
    pub results: Vec<QuestionResult>,
    pub correct_count: usize,
    pub total: usize,
    pub score: u8,
}

impl QuizReport {
    pub fn incorrect(&self) -> impl Iterator<Item = &QuestionResult> {
        self.results.iter().filter(|r| !r.correct)
    }

    pub fn missed_ids(&self) -> Vec<u32> {
        self.incorrect().map(|r| r.question_id).collect()
    }

    /// Correct and total answers per domain.
    pub fn by_domain(&self) -> BTreeMap<&str, (usize, usize)> {
        let mut out: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for r in &self.results {
            let entry = out.entry(r.domain.as_str()).or_insert((0, 0));
            entry.1 += 1;
            if r.correct {
                entry.0 += 1;
            }
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    session_id: String,
    questions: Vec<PracticeQuestion>,
    answers: Vec<Option<usize>>,
    current: usize,
    finished: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<PracticeQuestion>) -> CoreResult<Self> {
        if questions.is_empty() {
            return Err(CoreError::InvalidInput(
                "a quiz needs at least one question".to_string(),
            ));
        }
        let session_id = session_id_ulid();
        info!(session_id = session_id.as_str(), questions = questions.len(), "quiz started");
        Ok(Self {
            session_id,
            answers: vec![None; questions.len()],
            questions,
            current: 0,
            finished: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// `None` once the last question has been left.
    pub fn current(&self) -> Option<&PracticeQuestion> {
        if self.finished {
            None
        } else {
            self.questions.get(self.current)
        }
    }

    /// 1-based position of the current question and the quiz length.
    pub fn position(&self) -> (usize, usize) {
        (self.current + 1, self.questions.len())
    }

    pub fn is_answered(&self) -> bool {
        self.answers[self.current].is_some()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Locks in an answer for the current question.
    pub fn answer(&mut self, option: usize) -> CoreResult<AnswerOutcome> {
        if self.finished {
            return Err(CoreError::ScenarioClosed(
                "the quiz is already finished".to_string(),
            ));
        }
        let q = &self.questions[self.current];
        if self.answers[self.current].is_some() {
            return Err(CoreError::InvalidInput(format!(
                "question {} is already answered",
                q.id
            )));
        }
        if option >= q.options.len() {
            return Err(CoreError::unknown_option(&option.to_string()));
        }
        self.answers[self.current] = Some(option);
        let correct = option == q.correct_answer;
        debug!(
            session_id = self.session_id.as_str(),
            question = q.id,
            correct,
            "question answered"
        );
        Ok(AnswerOutcome {
            question_id: q.id,
            correct,
            correct_answer: q.correct_answer,
            explanation: q.explanation.clone(),
        })
    }

    /// Moves to the next question. An unanswered question counts as skipped.
    /// Returns `false` when the quiz is over.
    pub fn next_question(&mut self) -> CoreResult<bool> {
        if self.finished {
            return Err(CoreError::ScenarioClosed(
                "the quiz is already finished".to_string(),
            ));
        }
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            return Ok(true);
        }
        self.finished = true;
        let report = self.report();
        info!(
            session_id = self.session_id.as_str(),
            score = report.score,
            correct = report.correct_count,
            total = report.total,
            "quiz finished"
        );
        Ok(false)
    }

    /// Per-question results so far; unanswered questions count as incorrect.
    pub fn report(&self) -> QuizReport {
        let results: Vec<QuestionResult> = self
            .questions
            .iter()
            .zip(&self.answers)
            .map(|(q, chosen)| QuestionResult {
                question_id: q.id,
                domain: q.domain.clone(),
                chosen: *chosen,
                correct_answer: q.correct_answer,
                correct: *chosen == Some(q.correct_answer),
            })
            .collect();
        let correct_count = results.iter().filter(|r| r.correct).count();
        let total = results.len();
        QuizReport {
            score: ratio_score(correct_count, total),
            results,
            correct_count,
            total,
        }
    }
}
