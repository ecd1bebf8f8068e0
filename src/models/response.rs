use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::question::{Question, QuestionId, QuestionType};
use crate::error::{Error, Result};

pub const MAX_TEXT_ANSWER_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerPayload {
    Text(String),
    Selected(BTreeSet<u32>),
}

impl AnswerPayload {
    /// Checks the payload shape against the question it answers.
    pub fn validate_for(&self, question: &Question) -> Result<()> {
        match (self, question.question_type) {
            (AnswerPayload::Text(text), QuestionType::FreeText | QuestionType::Code) => {
                if text.len() > MAX_TEXT_ANSWER_BYTES {
                    return Err(Error::BadRequest(format!(
                        "Answer for question {} exceeds {} bytes",
                        question.id, MAX_TEXT_ANSWER_BYTES
                    )));
                }
                Ok(())
            }
            (AnswerPayload::Selected(selected), qt) if qt.is_choice() => {
                if qt == QuestionType::SingleChoice && selected.len() > 1 {
                    return Err(Error::BadRequest(format!(
                        "Question {} accepts a single option",
                        question.id
                    )));
                }
                if let Some(bad) = selected.iter().find(|&&idx| idx as usize >= question.options.len()) {
                    return Err(Error::BadRequest(format!(
                        "Option {} does not exist on question {}",
                        bad, question.id
                    )));
                }
                Ok(())
            }
            (_, qt) => Err(Error::BadRequest(format!(
                "Answer shape does not match question type {:?}",
                qt
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub question_id: QuestionId,
    pub answer: AnswerPayload,
    pub updated_at: DateTime<Utc>,
}

/// The persisted shape: one per question, answered or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question_id: QuestionId,
    pub question_type: QuestionType,
    pub answer: Option<String>,
    pub selected_options: Option<Vec<u32>>,
    pub timestamp: DateTime<Utc>,
}

impl ResponseRecord {
    pub fn from_response(response: &Response, question_type: QuestionType) -> Self {
        let (answer, selected_options) = match &response.answer {
            AnswerPayload::Text(text) => (Some(text.clone()), None),
            AnswerPayload::Selected(set) => (None, Some(set.iter().copied().collect())),
        };
        Self {
            question_id: response.question_id,
            question_type,
            answer,
            selected_options,
            timestamp: response.updated_at,
        }
    }

    pub fn placeholder(question: &Question, timestamp: DateTime<Utc>) -> Self {
        Self {
            question_id: question.id,
            question_type: question.question_type,
            answer: None,
            selected_options: None,
            timestamp,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.answer.is_none() && self.selected_options.is_none()
    }
}
