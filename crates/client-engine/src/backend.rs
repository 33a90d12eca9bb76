use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use vidnotes_client_core::{JobId, JobRecord};

/// Error kinds produced by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network failure, non-2xx response or a request rejected before sending.
    Fetch,
    /// The backend answered with a payload that could not be decoded.
    Parse,
}

/// Failure talking to the jobs backend.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The request could not be sent or the response body could not be read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a non-success status.
    #[error("http {status}: {body}")]
    Status {
        /// HTTP status code.
        status: StatusCode,
        /// Response body, as text.
        body: String,
    },
    /// The jobs payload was not valid JSON for a job list.
    #[error("malformed jobs payload: {0}")]
    Parse(#[from] serde_json::Error),
    /// A blank transcript was submitted.
    #[error("transcript is empty")]
    EmptyTranscript,
}

impl SyncError {
    /// Classify into the engine's error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Parse(_) => ErrorKind::Parse,
            SyncError::Transport(_) | SyncError::Status { .. } | SyncError::EmptyTranscript => {
                ErrorKind::Fetch
            }
        }
    }
}

/// Source of job snapshots and per-job actions.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Fetch the current job list (`GET /video-jobs`).
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>, SyncError>;

    /// Queue summary generation for a job.
    async fn generate_summary(&self, id: &JobId) -> Result<(), SyncError>;

    /// Store a manual transcript for a job.
    async fn save_transcript(&self, id: &JobId, transcript: &str) -> Result<(), SyncError>;

    /// Delete a job and its stored assets.
    async fn delete_job(&self, id: &JobId) -> Result<(), SyncError>;

    /// Copy a job's summary into a new note.
    async fn save_as_note(&self, id: &JobId) -> Result<SavedNote, SyncError>;
}

/// Note created from a job summary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SavedNote {
    /// Id of the new note.
    pub note_id: String,
    /// Note title, derived from the job's filename.
    pub title: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest<'a> {
    transcript: &'a str,
}

/// [`JobBackend`] over the REST API.
#[derive(Debug, Clone)]
pub struct HttpJobBackend {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpJobBackend {
    /// Default per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Build a backend client for `base` (e.g. `http://127.0.0.1:8000`).
    ///
    /// `token` is attached as a bearer credential when present.
    pub fn new(base: Url, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        if base.cannot_be_a_base() {
            anyhow::bail!("backend url cannot be used as a base: {base}");
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| anyhow::anyhow!("build http client: {err:#}"))?;
        Ok(Self { http, base, token })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

async fn check_status(res: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status();
    let body = res.text().await.unwrap_or_default();
    Err(SyncError::Status { status, body })
}

#[async_trait]
impl JobBackend for HttpJobBackend {
    async fn fetch_jobs(&self) -> Result<Vec<JobRecord>, SyncError> {
        let url = self.endpoint(&["video-jobs"]);
        let res = self.authorize(self.http.get(url)).send().await?;
        let body = check_status(res).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn generate_summary(&self, id: &JobId) -> Result<(), SyncError> {
        let url = self.endpoint(&["video-jobs", id.as_str(), "generate"]);
        let res = self.authorize(self.http.post(url)).send().await?;
        check_status(res).await?;
        Ok(())
    }

    async fn save_transcript(&self, id: &JobId, transcript: &str) -> Result<(), SyncError> {
        let url = self.endpoint(&["video-jobs", id.as_str(), "transcript"]);
        let res = self
            .authorize(self.http.post(url))
            .json(&TranscriptRequest { transcript })
            .send()
            .await?;
        check_status(res).await?;
        Ok(())
    }

    async fn delete_job(&self, id: &JobId) -> Result<(), SyncError> {
        let url = self.endpoint(&["video-jobs", id.as_str()]);
        let res = self.authorize(self.http.delete(url)).send().await?;
        check_status(res).await?;
        Ok(())
    }

    async fn save_as_note(&self, id: &JobId) -> Result<SavedNote, SyncError> {
        let url = self.endpoint(&["video-jobs", id.as_str(), "save-as-note"]);
        let res = self.authorize(self.http.post(url)).send().await?;
        let body = check_status(res).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpJobBackend {
        HttpJobBackend::new(Url::parse(base).unwrap(), None, HttpJobBackend::DEFAULT_TIMEOUT)
            .unwrap()
    }

    #[test]
    fn endpoints_keep_base_path() {
        let b = backend("http://127.0.0.1:8000");
        assert_eq!(
            b.endpoint(&["video-jobs"]).as_str(),
            "http://127.0.0.1:8000/video-jobs"
        );
        let b = backend("https://api.example/v1/");
        assert_eq!(
            b.endpoint(&["video-jobs", "abc", "generate"]).as_str(),
            "https://api.example/v1/video-jobs/abc/generate"
        );
    }

    #[test]
    fn job_ids_are_escaped() {
        let b = backend("http://127.0.0.1:8000");
        assert_eq!(
            b.endpoint(&["video-jobs", "a/b"]).as_str(),
            "http://127.0.0.1:8000/video-jobs/a%2Fb"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        let url = Url::parse("mailto:ops@example.com").unwrap();
        assert!(HttpJobBackend::new(url, None, HttpJobBackend::DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn classifies_errors() {
        let parse = serde_json::from_str::<Vec<JobRecord>>("{").unwrap_err();
        assert_eq!(SyncError::from(parse).kind(), ErrorKind::Parse);
        let status = SyncError::Status {
            status: StatusCode::BAD_GATEWAY,
            body: String::new(),
        };
        assert_eq!(status.kind(), ErrorKind::Fetch);
    }
}
