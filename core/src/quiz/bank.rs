use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const BANK_VERSION: &str = "practice_questions_v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PracticeQuestion {
    pub id: u32,
    pub domain: String,
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    pub explanation: String,
}

impl PracticeQuestion {
    pub fn correct_option(&self) -> &str {
        self.options
            .get(self.correct_answer)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub bank_version: String,
    pub questions: Vec<PracticeQuestion>,
}

pub fn question_bank_v1() -> CoreResult<QuestionBank> {
    let json = include_str!("questions_v1.json");
    let bank: QuestionBank = serde_json::from_str(json)?;
    if bank.bank_version != BANK_VERSION {
        return Err(CoreError::InvalidCatalog(format!(
            "embedded question bank is not {}",
            BANK_VERSION
        )));
    }
    bank.validate()?;
    Ok(bank)
}

impl QuestionBank {
    /// Unique ids, at least two options per question and an answer index inside
    /// the option list.
    pub fn validate(&self) -> CoreResult<()> {
        let mut seen = BTreeSet::new();
        for q in &self.questions {
            if !seen.insert(q.id) {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate question id {}",
                    q.id
                )));
            }
            if q.options.len() < 2 {
                return Err(CoreError::InvalidCatalog(format!(
                    "question {} offers fewer than two options",
                    q.id
                )));
            }
            if q.correct_answer >= q.options.len() {
                return Err(CoreError::InvalidCatalog(format!(
                    "question {} answer index {} is out of range",
                    q.id, q.correct_answer
                )));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&PracticeQuestion> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Domain name and question count, sorted by name.
    pub fn domains(&self) -> Vec<(&str, usize)> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for q in &self.questions {
            *counts.entry(q.domain.as_str()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }

    pub fn by_domain(&self, domain: &str) -> Vec<&PracticeQuestion> {
        self.questions
            .iter()
            .filter(|q| q.domain == domain)
            .collect()
    }
}
