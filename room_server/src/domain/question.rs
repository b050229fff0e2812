use serde::Serialize;

use crate::domain::errors::GameError;
use crate::domain::ids::{AnswerId, CategoryId, QuestionId, RoomId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: QuestionId,
    pub category_id: CategoryId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerAction {
    Answered,
    Skipped,
}

impl AnswerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerAction::Answered => "answered",
            AnswerAction::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "answered" => Some(AnswerAction::Answered),
            "skipped" => Some(AnswerAction::Skipped),
            _ => None,
        }
    }
}

// Append-only record of one player's response to a drawn question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub id: AnswerId,
    pub room_id: RoomId,
    pub question_id: QuestionId,
    pub author_id: UserId,
    pub text: String,
    pub action: AnswerAction,
}

// Skips carry no text; real answers must say something.
pub fn normalize_answer_text(text: &str, action: AnswerAction) -> Result<String, GameError> {
    const MAX_LEN: usize = 1000;

    match action {
        AnswerAction::Skipped => Ok(String::new()),
        AnswerAction::Answered => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.chars().count() > MAX_LEN {
                return Err(GameError::InvalidAnswer);
            }
            Ok(trimmed.to_string())
        }
    }
}

/// The answer shown for `question`: the latest one recorded against it.
pub fn current_answer(answers: &[Answer], question: QuestionId) -> Option<&Answer> {
    answers.iter().rev().find(|answer| answer.question_id == question)
}
