use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestAttempt {
    pub id: Uuid,
    pub assignment_id: Uuid,
    pub candidate_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: AttemptStatus,
}

impl TestAttempt {
    pub fn start(id: Uuid, assignment_id: Uuid, candidate_id: Uuid, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            assignment_id,
            candidate_id,
            started_at,
            ended_at: None,
            status: AttemptStatus::InProgress,
        }
    }

    /// Seals the attempt. Later calls keep the first end time.
    pub fn finish(&mut self, ended_at: DateTime<Utc>) {
        if self.status == AttemptStatus::Submitted {
            return;
        }
        self.ended_at = Some(ended_at);
        self.status = AttemptStatus::Submitted;
    }

    pub fn time_spent_seconds(&self) -> Option<i64> {
        self.ended_at.map(|end| (end - self.started_at).num_seconds().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn finish_is_sticky() {
        let start = Utc::now();
        let mut attempt = TestAttempt::start(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), start);
        attempt.finish(start + Duration::seconds(90));
        attempt.finish(start + Duration::seconds(500));
        assert_eq!(attempt.status, AttemptStatus::Submitted);
        assert_eq!(attempt.time_spent_seconds(), Some(90));
    }
}
