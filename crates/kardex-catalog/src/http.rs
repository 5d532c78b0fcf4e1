//! HTTP backend for [`CatalogGateway`].
//!
//! Thin REST client over the academic-records service. Transient failures
//! on read operations are retried internally (bounded attempts with a short
//! pause); write operations are never retried, since a duplicate-candidate
//! write must not be resubmitted without the caller deciding to.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::gateway::CatalogGateway;
use crate::models::{
    CareerId, Course, CourseId, Cycle, CycleId, EnrollmentId, EnrollmentRecord, Group, GroupId,
    Student, StudentId,
};

/// Read retries beyond the first attempt.
const READ_RETRIES: u32 = 2;
/// Pause between read attempts.
const RETRY_PAUSE: Duration = Duration::from_millis(250);

/// Map an HTTP error status to the failure taxonomy.
///
/// 400/422 are malformed or invalid input (`Validation`); 404/409 mean a
/// referenced record is gone or conflicted (`Dependency`); everything else,
/// including all 5xx, is `Transient`.
pub fn classify_status(status: StatusCode, body: &str) -> CatalogError {
    let detail = if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    };
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            CatalogError::Validation(detail)
        }
        StatusCode::NOT_FOUND | StatusCode::CONFLICT => CatalogError::Dependency(detail),
        _ => CatalogError::Transient(detail),
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        // Transport-level failures never carry a usable status here; the
        // status path is handled before deserialization.
        CatalogError::Transient(err.to_string())
    }
}

/// REST implementation of [`CatalogGateway`].
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    /// Build a gateway rooted at `base_url` (no trailing slash required).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> CatalogResult<T> {
        let response = self.client.get(self.url(path)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        Ok(response.json::<T>().await?)
    }

    /// Issue an idempotent read, retrying transient failures.
    async fn read_with_retry<T: DeserializeOwned>(&self, path: &str) -> CatalogResult<T> {
        let mut attempt = 0;
        loop {
            match self.get_json(path).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < READ_RETRIES => {
                    attempt += 1;
                    warn!(path, attempt, error = %err, "transient read failure, retrying");
                    tokio::time::sleep(RETRY_PAUSE).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl CatalogGateway for HttpCatalog {
    async fn list_cycles(&self) -> CatalogResult<Vec<Cycle>> {
        self.read_with_retry("/cycles").await
    }

    async fn list_courses(&self, career: CareerId, cycle: CycleId) -> CatalogResult<Vec<Course>> {
        self.read_with_retry(&format!("/courses?career={career}&cycle={cycle}"))
            .await
    }

    async fn list_groups(
        &self,
        course: CourseId,
        cycle: CycleId,
        career: CareerId,
    ) -> CatalogResult<Vec<Group>> {
        self.read_with_retry(&format!(
            "/groups?course={course}&cycle={cycle}&career={career}"
        ))
        .await
    }

    async fn list_eligible_students(&self, cycle: CycleId) -> CatalogResult<Vec<Student>> {
        self.read_with_retry(&format!("/cycles/{cycle}/eligible-students"))
            .await
    }

    async fn enrollment_exists(
        &self,
        student: StudentId,
        group: GroupId,
    ) -> CatalogResult<bool> {
        // A 404 from the listing endpoint means "no enrollments", not an
        // error; any other failure classifies normally.
        let path = format!("/enrollments?student={student}&group={group}");
        match self.read_with_retry::<Vec<EnrollmentRecord>>(&path).await {
            Ok(records) => Ok(!records.is_empty()),
            Err(CatalogError::Dependency(detail)) if detail.starts_with("404") => {
                debug!(%student, %group, "enrollment listing returned 404, treating as empty");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    async fn create_enrollment(
        &self,
        student: StudentId,
        group: GroupId,
    ) -> CatalogResult<EnrollmentRecord> {
        let response = self
            .client
            .post(self.url("/enrollments"))
            .json(&json!({ "student_id": student, "group_id": group }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        Ok(response.json().await?)
    }

    async fn repoint_enrollment(
        &self,
        enrollment: EnrollmentId,
        new_group: GroupId,
    ) -> CatalogResult<()> {
        let response = self
            .client
            .patch(self.url(&format!("/enrollments/{enrollment}")))
            .json(&json!({ "group_id": new_group }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }
        Ok(())
    }
}
