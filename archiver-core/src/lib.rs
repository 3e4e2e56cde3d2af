//! Archiver Core
//!
//! Core types shared by the crawl archiver services.
//!
//! This crate contains:
//! - Domain types: crawl jobs, crawl options, archive naming rules
//! - DTOs: request/response bodies exchanged over the HTTP API

pub mod domain;
pub mod dto;
