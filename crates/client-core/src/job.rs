//! Job snapshot records as reported by the backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque, stable job identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Processing status of a job.
///
/// The backend may introduce statuses this client does not know about; those
/// are kept verbatim in [`JobStatus::Other`] instead of failing the whole poll.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Queued,
    Processing,
    AudioExtracted,
    Transcribing,
    Transcribed,
    Ready,
    Failed,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::AudioExtracted => "audio_extracted",
            JobStatus::Transcribing => "transcribing",
            JobStatus::Transcribed => "transcribed",
            JobStatus::Ready => "ready",
            JobStatus::Failed => "failed",
            JobStatus::Other(raw) => raw,
        }
    }
}

impl From<&str> for JobStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "queued" => JobStatus::Queued,
            "processing" => JobStatus::Processing,
            "audio_extracted" => JobStatus::AudioExtracted,
            "transcribing" => JobStatus::Transcribing,
            "transcribed" => JobStatus::Transcribed,
            "ready" => JobStatus::Ready,
            "failed" => JobStatus::Failed,
            other => JobStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for JobStatus {
    fn from(raw: String) -> Self {
        match JobStatus::from(raw.as_str()) {
            JobStatus::Other(_) => JobStatus::Other(raw),
            known => known,
        }
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processing job as seen in a single backend snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    /// Original upload filename, used for display only.
    #[serde(default)]
    pub filename: String,
    /// Storage blob backing this job. Changes only when the asset is replaced.
    #[serde(default, rename = "video_url", alias = "resource_ref")]
    pub resource_ref: Option<String>,
    pub status: JobStatus,
    /// Short-lived signed URL for the asset; reissued on every poll.
    #[serde(default, rename = "signed_url", alias = "ephemeral_access_url")]
    pub ephemeral_access_url: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    /// Backend failure message for `failed` jobs.
    #[serde(default)]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// The access URL, treating an empty string the same as no URL.
    pub fn access_url(&self) -> Option<&str> {
        self.ephemeral_access_url
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn job(id: &str, resource: &str, url: Option<&str>, status: &str) -> JobRecord {
        JobRecord {
            id: JobId::from(id),
            filename: format!("{id}.mp4"),
            resource_ref: Some(resource.to_string()),
            status: JobStatus::from(status),
            ephemeral_access_url: url.map(str::to_string),
            transcript: None,
            summary: None,
            error: None,
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_backend_payload() {
        let raw = r#"{
            "id": "5f0c6a9e-2b1e-4a57-9c61-0d7f7f0a1c11",
            "owner_id": "ignored",
            "filename": "lecture.mp4",
            "video_url": "videos/abc.mp4",
            "signed_url": "https://storage.example/videos/abc.mp4?sig=1",
            "status": "transcribing",
            "transcript": null,
            "created_at": "2026-02-02T15:05:25.193084+00:00",
            "updated_at": "2026-02-02T15:06:00Z"
        }"#;
        let job: JobRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(job.id.as_str(), "5f0c6a9e-2b1e-4a57-9c61-0d7f7f0a1c11");
        assert_eq!(job.resource_ref.as_deref(), Some("videos/abc.mp4"));
        assert_eq!(job.status, JobStatus::Transcribing);
        assert_eq!(
            job.access_url(),
            Some("https://storage.example/videos/abc.mp4?sig=1")
        );
        assert!(job.summary.is_none());
        assert!(job.updated_at.is_some());
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status: JobStatus = serde_json::from_str("\"summarizing\"").unwrap();
        assert_eq!(status, JobStatus::Other("summarizing".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"summarizing\"");
    }

    #[test]
    fn empty_signed_url_counts_as_missing() {
        let job = fixtures::job("A", "r1", Some(""), "queued");
        assert_eq!(job.access_url(), None);
    }
}
