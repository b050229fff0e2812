// TOML question bank: categories of prompts loaded at startup.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::{CategoryId, Question, QuestionId};

#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read question bank: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse question bank: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid question bank: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionBank {
    #[serde(default)]
    pub categories: Vec<BankCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankCategory {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub questions: Vec<BankQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BankQuestion {
    pub id: i64,
    pub text: String,
}

impl QuestionBank {
    pub fn parse(source: &str) -> Result<Self, BankError> {
        let bank: QuestionBank = toml::from_str(source)?;
        bank.validate()?;
        Ok(bank)
    }

    pub fn load(path: &Path) -> Result<Self, BankError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Flattened list of every question with its category.
    pub fn questions(&self) -> Vec<Question> {
        self.categories
            .iter()
            .flat_map(|category| {
                category.questions.iter().map(|question| Question {
                    id: QuestionId(question.id),
                    category_id: CategoryId(category.id),
                    text: question.text.clone(),
                })
            })
            .collect()
    }

    // Ids must be positive and unique; texts non-empty.
    fn validate(&self) -> Result<(), BankError> {
        let mut categories = HashSet::new();
        let mut questions = HashSet::new();

        for category in &self.categories {
            if category.id <= 0 || !categories.insert(category.id) {
                return Err(BankError::Invalid(format!(
                    "category id {} is not positive or repeated",
                    category.id
                )));
            }
            if category.name.trim().is_empty() {
                return Err(BankError::Invalid(format!(
                    "category {} has no name",
                    category.id
                )));
            }
            for question in &category.questions {
                if question.id <= 0 || !questions.insert(question.id) {
                    return Err(BankError::Invalid(format!(
                        "question id {} is not positive or repeated",
                        question.id
                    )));
                }
                if question.text.trim().is_empty() {
                    return Err(BankError::Invalid(format!(
                        "question {} has no text",
                        question.id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_bank_is_well_formed_then_questions_are_flattened_with_categories() {
        let bank = QuestionBank::parse(
            r#"
            [[categories]]
            id = 7
            name = "Food"

            [[categories.questions]]
            id = 70
            text = "Favourite breakfast?"

            [[categories.questions]]
            id = 71
            text = "Worst meal ever?"
            "#,
        )
        .expect("expected bank");

        let questions = bank.questions();

        assert_eq!(questions.len(), 2);
        assert!(questions.iter().all(|q| q.category_id == CategoryId(7)));
        assert_eq!(questions[1].id, QuestionId(71));
    }

    #[test]
    fn when_question_id_repeats_then_bank_is_invalid() {
        let result = QuestionBank::parse(
            r#"
            [[categories]]
            id = 1
            name = "A"
            questions = [{ id = 5, text = "one" }]

            [[categories]]
            id = 2
            name = "B"
            questions = [{ id = 5, text = "two" }]
            "#,
        );

        assert!(matches!(result, Err(BankError::Invalid(_))));
    }

    #[test]
    fn when_toml_is_malformed_then_parse_error() {
        assert!(matches!(
            QuestionBank::parse("categories = ["),
            Err(BankError::Parse(_))
        ));
    }
}
