//! Data Transfer Objects for the HTTP API
//!
//! Request and response bodies exchanged between clients and the API service.

pub mod archive;
pub mod job;
