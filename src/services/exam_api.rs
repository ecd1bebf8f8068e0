use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::dto::exam_dto::{
    FinalizeAttemptResponse, ReportViolationRequest, SaveResponseRequest, StartAttemptRequest,
    StartAttemptResponse,
};
use crate::error::{Error, Result};
use crate::models::assignment::TestAssignment;
use crate::models::question::QuestionSet;
use crate::models::response::ResponseRecord;
use crate::models::violation::ViolationEvent;

/// The collaborator contracts the session engine consumes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExamApi: Send + Sync + 'static {
    async fn fetch_assignment(&self, assignment_id: Uuid, candidate_id: Uuid) -> Result<TestAssignment>;

    async fn fetch_questions(&self, test_id: Uuid) -> Result<QuestionSet>;

    /// Fails if the attempt was already started, completed or the window expired.
    async fn start_attempt(&self, assignment_id: Uuid, candidate_id: Uuid) -> Result<Uuid>;

    /// Idempotent upsert keyed by question id.
    async fn save_response(&self, attempt_id: Uuid, record: &ResponseRecord) -> Result<()>;

    /// Idempotent; a repeat call after success succeeds without effect.
    async fn finalize_attempt(&self, attempt_id: Uuid) -> Result<()>;

    async fn report_violation(&self, attempt_id: Uuid, event: &ViolationEvent) -> Result<()>;
}

#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    base_url: Url,
    token: String,
}

impl HttpExamApi {
    pub fn new(base_url: &str, token: String, timeout: std::time::Duration) -> Result<Self> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)?;
        if base_url.scheme() != "http" && base_url.scheme() != "https" {
            return Err(Error::Config(format!(
                "Exam API base URL must be http(s), got {}",
                base_url.scheme()
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Reqwest)?;
        Ok(Self { client, base_url, token })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<reqwest::Response> {
        let resp = self.authorized(builder).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(Error::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let resp = self.send(builder).await?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl ExamApi for HttpExamApi {
    async fn fetch_assignment(&self, assignment_id: Uuid, candidate_id: Uuid) -> Result<TestAssignment> {
        let mut url = self.endpoint(&format!("api/exam/assignments/{}", assignment_id))?;
        url.query_pairs_mut()
            .append_pair("candidate_id", &candidate_id.to_string());
        self.send_json(self.client.get(url)).await
    }

    async fn fetch_questions(&self, test_id: Uuid) -> Result<QuestionSet> {
        let url = self.endpoint(&format!("api/exam/tests/{}/questions", test_id))?;
        self.send_json(self.client.get(url)).await
    }

    async fn start_attempt(&self, assignment_id: Uuid, candidate_id: Uuid) -> Result<Uuid> {
        let url = self.endpoint(&format!("api/exam/assignments/{}/start", assignment_id))?;
        let started: StartAttemptResponse = self
            .send_json(self.client.post(url).json(&StartAttemptRequest { candidate_id }))
            .await?;
        Ok(started.attempt_id)
    }

    async fn save_response(&self, attempt_id: Uuid, record: &ResponseRecord) -> Result<()> {
        let url = self.endpoint(&format!(
            "api/exam/attempts/{}/responses/{}",
            attempt_id, record.question_id
        ))?;
        let body = SaveResponseRequest {
            record: record.clone(),
        };
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn finalize_attempt(&self, attempt_id: Uuid) -> Result<()> {
        let url = self.endpoint(&format!("api/exam/attempts/{}/finalize", attempt_id))?;
        let resp = self.send(self.client.post(url)).await?;
        if let Ok(body) = resp.json::<FinalizeAttemptResponse>().await {
            debug!(attempt_id = %body.attempt_id, status = %body.status, "finalize acknowledged");
        }
        Ok(())
    }

    async fn report_violation(&self, attempt_id: Uuid, event: &ViolationEvent) -> Result<()> {
        let url = self.endpoint(&format!("api/exam/attempts/{}/violations", attempt_id))?;
        let body = ReportViolationRequest { event: event.clone() };
        self.send(self.client.post(url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn base_url_gets_trailing_slash() {
        let api = HttpExamApi::new("http://backend.local/v1", "t".into(), Duration::from_secs(1)).unwrap();
        let url = api.endpoint("api/exam/tests/abc/questions").unwrap();
        assert_eq!(url.as_str(), "http://backend.local/v1/api/exam/tests/abc/questions");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let result = HttpExamApi::new("ftp://backend.local", "t".into(), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
