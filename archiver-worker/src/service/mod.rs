//! Service layer
//!
//! Services contain the worker's business logic: running the crawler for a
//! job and storing the archive it produces. The crawl service plugs into
//! the queue consumer through the `Processor` trait.

mod archive;
mod crawl;

pub use crawl::CommandCrawlService;
