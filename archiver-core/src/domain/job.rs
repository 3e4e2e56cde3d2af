//! Job domain types

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::options::CrawlOptions;

/// Field names of a persisted job record.
pub mod fields {
    pub const URL: &str = "url";
    pub const STATUS: &str = "status";
    pub const CREATED_AT: &str = "created_at";
    pub const ERROR: &str = "error";
    pub const OPTIONS: &str = "options";
    pub const STARTED_AT: &str = "started_at";
    pub const FINISHED_AT: &str = "finished_at";
}

/// A crawl-and-archive job
///
/// Persisted as a flat mapping of string fields keyed by the job ID.
/// Written by the producer (creation) and by the claiming worker (status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub url: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<CrawlOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Job lifecycle status
///
/// `Pending -> Running -> Completed | Failed`. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether the job has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown job status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Formats a timestamp the way job records store it (RFC 3339, seconds, `Z`)
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

impl Job {
    /// Creates a pending job with a freshly minted ID
    pub fn new_pending(url: impl Into<String>, options: CrawlOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            status: JobStatus::Pending,
            created_at: Utc::now(),
            error: None,
            options: Some(options),
            started_at: None,
            finished_at: None,
        }
    }

    /// Flattens the job into record fields
    ///
    /// Optional attributes are only emitted when present.
    pub fn to_record(&self) -> Vec<(&'static str, String)> {
        let mut record = vec![
            (fields::URL, self.url.clone()),
            (fields::STATUS, self.status.to_string()),
            (fields::CREATED_AT, format_timestamp(self.created_at)),
        ];

        if let Some(error) = &self.error {
            record.push((fields::ERROR, error.clone()));
        }
        if let Some(options) = &self.options {
            if let Ok(json) = serde_json::to_string(options) {
                record.push((fields::OPTIONS, json));
            }
        }
        if let Some(started_at) = self.started_at {
            record.push((fields::STARTED_AT, format_timestamp(started_at)));
        }
        if let Some(finished_at) = self.finished_at {
            record.push((fields::FINISHED_AT, format_timestamp(finished_at)));
        }

        record
    }

    /// Rebuilds a job from its ID and record fields
    ///
    /// Returns `None` when the record is empty or unparsable (bad ID, unknown
    /// status, missing URL or creation timestamp). An unreadable `options`
    /// field is dropped rather than rejecting the whole record.
    pub fn from_record(id: &str, record: &HashMap<String, String>) -> Option<Self> {
        if record.is_empty() {
            return None;
        }

        let id = Uuid::parse_str(id).ok()?;
        let url = record.get(fields::URL)?.clone();
        let status = record.get(fields::STATUS)?.parse().ok()?;
        let created_at = parse_timestamp(record.get(fields::CREATED_AT)?)?;

        let error = record
            .get(fields::ERROR)
            .filter(|e| !e.is_empty())
            .cloned();
        let options = record
            .get(fields::OPTIONS)
            .and_then(|json| serde_json::from_str(json).ok());
        let started_at = record
            .get(fields::STARTED_AT)
            .and_then(|ts| parse_timestamp(ts));
        let finished_at = record
            .get(fields::FINISHED_AT)
            .and_then(|ts| parse_timestamp(ts));

        Some(Job {
            id,
            url,
            status,
            created_at,
            error,
            options,
            started_at,
            finished_at,
        })
    }
}
