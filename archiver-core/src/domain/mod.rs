//! Core domain types
//!
//! These types are shared between the API (which admits jobs and answers
//! status queries) and the worker (which executes jobs and writes back status).

pub mod archive;
pub mod job;
pub mod options;
