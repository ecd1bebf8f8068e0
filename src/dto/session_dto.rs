use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use validator::Validate;

use crate::error::{Error, Result};
use crate::models::question::{Question, QuestionId};
use crate::models::response::{AnswerPayload, MAX_TEXT_ANSWER_BYTES};
use crate::session::SessionSnapshot;

const MAX_ANSWER_LEN: u64 = MAX_TEXT_ANSWER_BYTES as u64;

/// Body of `PUT /session/answers/{question_id}`. Exactly one of the two fields is set.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerRequest {
    #[validate(length(max = MAX_ANSWER_LEN))]
    pub answer: Option<String>,
    #[validate(length(max = 64))]
    pub selected_options: Option<Vec<u32>>,
}

impl AnswerRequest {
    pub fn into_payload(self) -> Result<AnswerPayload> {
        match (self.answer, self.selected_options) {
            (Some(text), None) => Ok(AnswerPayload::Text(text)),
            (None, Some(selected)) => Ok(AnswerPayload::Selected(selected.into_iter().collect::<BTreeSet<_>>())),
            (Some(_), Some(_)) => Err(Error::BadRequest(
                "Provide either answer or selected_options, not both".to_string(),
            )),
            (None, None) => Err(Error::BadRequest(
                "Provide answer or selected_options".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub question_id: QuestionId,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponse {
    pub saved: bool,
    pub question_id: QuestionId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSummary {
    pub assignment_id: uuid::Uuid,
    pub test_id: uuid::Uuid,
    pub duration_minutes: i32,
    pub total_marks: i32,
    pub instructions: Option<String>,
    pub is_proctored: bool,
    pub total_questions: usize,
}

/// `GET /session`. Questions are only listed while the attempt is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub test: TestSummary,
    pub session: SessionSnapshot,
    pub questions: Vec<Question>,
}
