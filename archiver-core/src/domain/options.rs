//! Crawl options
//!
//! `CrawlOptions` is what a client asks for; every field is optional.
//! `CrawlSettings` is the normalized form handed to the crawl executor,
//! with defaults applied for absent or negative values.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PAGE_LIMIT: u64 = 1000;
pub const DEFAULT_SIZE_LIMIT_MB: u64 = 100;
pub const DEFAULT_DEPTH: u64 = 0;

/// How far the crawler may wander from the seed URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScopeType {
    Page,
    PageSpa,
    #[default]
    Prefix,
    Host,
    Domain,
    Any,
}

impl ScopeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeType::Page => "page",
            ScopeType::PageSpa => "page-spa",
            ScopeType::Prefix => "prefix",
            ScopeType::Host => "host",
            ScopeType::Domain => "domain",
            ScopeType::Any => "any",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Crawl options as submitted by a client
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlOptions {
    /// Output archive name (without extension)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_type: Option<ScopeType>,
    /// Maximum number of pages to crawl
    #[serde(default, alias = "page_limit", skip_serializing_if = "Option::is_none")]
    pub page_limit: Option<i64>,
    /// Maximum archive size in MiB
    #[serde(default, alias = "size_limit", skip_serializing_if = "Option::is_none")]
    pub size_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<i64>,
}

/// Normalized crawl settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSettings {
    pub name: Option<String>,
    pub scope_type: ScopeType,
    pub page_limit: u64,
    pub size_limit_mb: u64,
    pub depth: u64,
}

impl CrawlSettings {
    /// Size limit in bytes, as the crawler expects it
    pub fn size_limit_bytes(&self) -> u64 {
        self.size_limit_mb.saturating_mul(1024 * 1024)
    }
}

fn non_negative(value: Option<i64>, default: u64) -> u64 {
    match value {
        Some(v) if v >= 0 => v as u64,
        _ => default,
    }
}

impl CrawlOptions {
    /// Applies defaults to absent or negative values
    pub fn normalize(&self) -> CrawlSettings {
        CrawlSettings {
            name: self
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            scope_type: self.scope_type.unwrap_or_default(),
            page_limit: non_negative(self.page_limit, DEFAULT_PAGE_LIMIT),
            size_limit_mb: non_negative(self.size_limit, DEFAULT_SIZE_LIMIT_MB),
            depth: non_negative(self.depth, DEFAULT_DEPTH),
        }
    }
}
