//! Service Module
//!
//! Business logic layer for the API.
//! Services sit between the handlers and the job store / archive directory.

pub mod archive;
pub mod job;

// Re-export for convenience
pub use archive as archive_service;
pub use job as job_service;
