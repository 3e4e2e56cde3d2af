//! Crawl job queue
//!
//! Durable job records, the job index and the dispatch stream, shared by the
//! API (which enqueues) and the workers (which consume).
//!
//! # Example
//!
//! ```no_run
//! use archiver_core::domain::options::CrawlOptions;
//! use archiver_queue::{RedisStore, producer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = RedisStore::connect("redis://127.0.0.1:6379").await?;
//!
//!     let job_id = producer::enqueue(&store, "https://example.com", CrawlOptions::default()).await?;
//!
//!     println!("Queued job: {}", job_id);
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod consumer;
pub mod entry;
pub mod error;
pub mod keys;
pub mod producer;
pub mod repository;
pub mod shutdown;
pub mod store;

// Re-export commonly used types
pub use backoff::Backoff;
pub use consumer::{Consumer, ConsumerConfig, Outcome, Processor};
pub use entry::{DispatchEntry, MalformedEntry};
pub use error::{EnqueueError, Result, StoreError};
pub use shutdown::ShutdownCoordinator;
pub use store::{MemoryStore, RedisStore, Store};
