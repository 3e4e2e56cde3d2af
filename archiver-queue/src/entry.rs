//! Dispatch entries
//!
//! A dispatch entry is the work stream record describing one job to run:
//! `job_id`, `target_url` and the JSON-serialized crawl options.

use archiver_core::domain::options::CrawlOptions;
use thiserror::Error;
use uuid::Uuid;

use crate::store::StreamMessage;

pub const JOB_ID_FIELD: &str = "job_id";
pub const TARGET_URL_FIELD: &str = "target_url";
pub const OPTIONS_FIELD: &str = "options";

/// Why a stream message could not be decoded into a dispatch entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEntry {
    #[error("field '{0}' is missing")]
    MissingField(&'static str),

    #[error("field '{0}' is not valid UTF-8")]
    NotText(&'static str),

    #[error("field '{0}' is empty")]
    Empty(&'static str),

    #[error("job_id '{0}' is not a UUID")]
    InvalidJobId(String),
}

/// A typed dispatch entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchEntry {
    pub job_id: Uuid,
    pub target_url: String,
    /// Serialized options, decoded on demand
    pub options: Option<String>,
}

impl DispatchEntry {
    pub fn new(job_id: Uuid, target_url: impl Into<String>, options: &CrawlOptions) -> Result<Self, serde_json::Error> {
        Ok(Self {
            job_id,
            target_url: target_url.into(),
            options: Some(serde_json::to_string(options)?),
        })
    }

    /// Fields written to the stream
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            (JOB_ID_FIELD, self.job_id.to_string()),
            (TARGET_URL_FIELD, self.target_url.clone()),
        ];
        if let Some(options) = &self.options {
            fields.push((OPTIONS_FIELD, options.clone()));
        }
        fields
    }

    /// Decodes a delivered message
    ///
    /// `job_id` and `target_url` are required. `options` is kept raw when it
    /// is text and dropped otherwise.
    pub fn decode(message: &StreamMessage) -> Result<Self, MalformedEntry> {
        let job_id = required_text(message, JOB_ID_FIELD)?;
        let job_id =
            Uuid::parse_str(job_id).map_err(|_| MalformedEntry::InvalidJobId(job_id.to_string()))?;

        let target_url = required_text(message, TARGET_URL_FIELD)?.trim();
        if target_url.is_empty() {
            return Err(MalformedEntry::Empty(TARGET_URL_FIELD));
        }

        let options = message
            .fields
            .get(OPTIONS_FIELD)
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .map(str::to_string);

        Ok(Self {
            job_id,
            target_url: target_url.to_string(),
            options,
        })
    }

    /// Decodes the crawl options; absent options decode to the defaults
    pub fn crawl_options(&self) -> Result<CrawlOptions, serde_json::Error> {
        match self.options.as_deref() {
            Some(json) if !json.trim().is_empty() => serde_json::from_str(json),
            _ => Ok(CrawlOptions::default()),
        }
    }
}

fn required_text<'a>(message: &'a StreamMessage, field: &'static str) -> Result<&'a str, MalformedEntry> {
    let bytes = message
        .fields
        .get(field)
        .ok_or(MalformedEntry::MissingField(field))?;
    std::str::from_utf8(bytes).map_err(|_| MalformedEntry::NotText(field))
}
