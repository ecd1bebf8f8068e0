use chrono::{DateTime, Utc};
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::models::question::{QuestionId, QuestionSet};
use crate::models::response::{AnswerPayload, Response, ResponseRecord};
use crate::session::state::SessionState;

/// In-memory answers keyed by question id with dirty tracking for autosave.
#[derive(Debug, Default)]
pub struct ResponseStore {
    entries: HashMap<QuestionId, Response>,
    dirty: BTreeSet<QuestionId>,
    sealed: bool,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest write wins. Marks the entry dirty.
    pub fn upsert(&mut self, question_id: QuestionId, answer: AnswerPayload, at: DateTime<Utc>) -> Result<&Response> {
        if self.sealed {
            return Err(Error::NotAccepting(SessionState::Submitting));
        }
        self.dirty.insert(question_id);
        match self.entries.entry(question_id) {
            Entry::Occupied(occupied) => {
                let response = occupied.into_mut();
                response.answer = answer;
                response.updated_at = at;
                Ok(response)
            }
            Entry::Vacant(vacant) => Ok(vacant.insert(Response {
                question_id,
                answer,
                updated_at: at,
            })),
        }
    }

    pub fn get(&self, question_id: QuestionId) -> Option<&Response> {
        self.entries.get(&question_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_dirty(&self, question_id: QuestionId) -> bool {
        self.dirty.contains(&question_id)
    }

    /// Hands out every dirty response and clears the marks.
    pub fn take_dirty(&mut self) -> Vec<Response> {
        let ids = std::mem::take(&mut self.dirty);
        ids.into_iter()
            .filter_map(|id| self.entries.get(&id).cloned())
            .collect()
    }

    /// Clears the mark for a single response being saved explicitly.
    pub fn take_one(&mut self, question_id: QuestionId) -> Option<Response> {
        self.dirty.remove(&question_id);
        self.entries.get(&question_id).cloned()
    }

    /// Re-marks responses whose flush failed so the next cycle resends them.
    pub fn mark_dirty(&mut self, ids: impl IntoIterator<Item = QuestionId>) {
        if self.sealed {
            return;
        }
        for id in ids {
            if self.entries.contains_key(&id) {
                self.dirty.insert(id);
            }
        }
    }

    pub fn seal(&mut self) {
        self.sealed = true;
        self.dirty.clear();
    }

    /// One record per question, in question order. Unanswered ones get a null placeholder.
    pub fn resolve(&self, questions: &QuestionSet, at: DateTime<Utc>) -> Vec<ResponseRecord> {
        questions
            .questions
            .iter()
            .map(|q| match self.entries.get(&q.id) {
                Some(response) => ResponseRecord::from_response(response, q.question_type),
                None => ResponseRecord::placeholder(q, at),
            })
            .collect()
    }
}
