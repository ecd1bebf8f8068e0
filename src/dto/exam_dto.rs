use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::response::ResponseRecord;
use crate::models::violation::ViolationEvent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptRequest {
    pub candidate_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResponseRequest {
    #[serde(flatten)]
    pub record: ResponseRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportViolationRequest {
    #[serde(flatten)]
    pub event: ViolationEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeAttemptResponse {
    pub attempt_id: Uuid,
    pub status: String,
}
