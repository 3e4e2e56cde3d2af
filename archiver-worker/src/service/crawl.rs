//! Crawl service
//!
//! Runs the external crawler for a job and hands the resulting archive to
//! the archive directory. The crawler's output goes straight to the
//! worker's stdout/stderr.

use anyhow::{Context, Result};
use archiver_core::domain::archive::archive_file_name;
use archiver_core::domain::options::CrawlSettings;
use archiver_queue::Processor;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::service::archive::{collection_archive_path, store_archive};

/// Processor that shells out to the crawler
pub struct CommandCrawlService {
    /// Program followed by its leading arguments
    command: Vec<String>,
    workdir: PathBuf,
    archives_dir: PathBuf,
    workers: u32,
    page_timeout_secs: u64,
}

impl CommandCrawlService {
    pub fn new(config: &Config) -> Self {
        Self {
            command: config.crawler_command.clone(),
            workdir: config.crawl_workdir.clone(),
            archives_dir: config.archives_dir.clone(),
            workers: config.crawler_workers,
            page_timeout_secs: config.page_timeout_secs,
        }
    }

    /// Crawler arguments for one job, after the configured command
    pub fn crawl_args(&self, job_id: Uuid, target_url: &str, settings: &CrawlSettings) -> Vec<String> {
        vec![
            "--url".to_string(),
            target_url.to_string(),
            "--generateWACZ".to_string(),
            "--collection".to_string(),
            job_id.to_string(),
            "--ignoreRobots".to_string(),
            "--text".to_string(),
            "--workers".to_string(),
            self.workers.to_string(),
            "--scopeType".to_string(),
            settings.scope_type.to_string(),
            "--limit".to_string(),
            settings.page_limit.to_string(),
            "--sizeLimit".to_string(),
            settings.size_limit_bytes().to_string(),
            "--depth".to_string(),
            settings.depth.to_string(),
            "--timeout".to_string(),
            self.page_timeout_secs.to_string(),
        ]
    }

    async fn run_crawler(&self, job_id: Uuid, target_url: &str, settings: &CrawlSettings) -> Result<()> {
        let Some((program, leading)) = self.command.split_first() else {
            anyhow::bail!("No crawler command configured");
        };

        let args = self.crawl_args(job_id, target_url, settings);
        debug!("Running {} {:?} {:?}", program, leading, args);

        let status = Command::new(program)
            .args(leading)
            .args(&args)
            .current_dir(&self.workdir)
            .stdin(Stdio::null())
            .status()
            .await
            .with_context(|| format!("Failed to start crawler '{}'", program))?;

        if !status.success() {
            anyhow::bail!("Crawler exited with {}", status);
        }

        Ok(())
    }
}

#[async_trait]
impl Processor for CommandCrawlService {
    async fn process(&self, job_id: Uuid, target_url: &str, settings: &CrawlSettings) -> Result<()> {
        info!("Crawling {} for job {}", target_url, job_id);

        self.run_crawler(job_id, target_url, settings)
            .await
            .with_context(|| format!("Crawl failed for {}", target_url))?;

        let source = collection_archive_path(&self.workdir, job_id);
        let name = archive_file_name(settings.name.as_deref(), job_id);

        store_archive(&source, &self.archives_dir, &name).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archiver_core::domain::options::{CrawlOptions, ScopeType};
    use std::path::Path;

    fn service(command: &[&str], workdir: &Path, archives_dir: &Path) -> CommandCrawlService {
        let mut config = Config::new("test-worker".to_string());
        config.crawler_command = command.iter().map(|s| s.to_string()).collect();
        config.crawl_workdir = workdir.to_path_buf();
        config.archives_dir = archives_dir.to_path_buf();
        CommandCrawlService::new(&config)
    }

    #[test]
    fn test_crawl_args_with_defaults() {
        let svc = service(&["crawler"], Path::new("."), Path::new("archives"));
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let settings = CrawlOptions::default().normalize();

        let args = svc.crawl_args(id, "https://example.com", &settings);

        assert_eq!(
            args,
            vec![
                "--url",
                "https://example.com",
                "--generateWACZ",
                "--collection",
                "550e8400-e29b-41d4-a716-446655440000",
                "--ignoreRobots",
                "--text",
                "--workers",
                "2",
                "--scopeType",
                "prefix",
                "--limit",
                "1000",
                "--sizeLimit",
                "104857600",
                "--depth",
                "0",
                "--timeout",
                "30",
            ]
        );
    }

    #[test]
    fn test_crawl_args_with_options() {
        let svc = service(&["crawler"], Path::new("."), Path::new("archives"));
        let settings = CrawlOptions {
            scope_type: Some(ScopeType::PageSpa),
            page_limit: Some(5),
            size_limit: Some(2),
            depth: Some(3),
            ..Default::default()
        }
        .normalize();

        let args = svc.crawl_args(Uuid::new_v4(), "https://example.com", &settings);
        let value_after = |flag: &str| {
            let pos = args.iter().position(|a| a == flag).unwrap();
            args[pos + 1].clone()
        };

        assert_eq!(value_after("--scopeType"), "page-spa");
        assert_eq!(value_after("--limit"), "5");
        assert_eq!(value_after("--sizeLimit"), "2097152");
        assert_eq!(value_after("--depth"), "3");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_crawl_stores_named_archive() {
        let work = tempfile::tempdir().unwrap();
        let archives = work.path().join("archives");
        // $5 is the collection (job ID)
        let svc = service(
            &[
                "sh",
                "-c",
                "mkdir -p \"collections/$5\" && printf wacz > \"collections/$5/$5.wacz\"",
                "crawler",
            ],
            work.path(),
            &archives,
        );
        let settings = CrawlOptions {
            name: Some("my site".to_string()),
            ..Default::default()
        }
        .normalize();

        svc.process(Uuid::new_v4(), "https://example.com", &settings)
            .await
            .unwrap();

        assert_eq!(std::fs::read(archives.join("my-site.wacz")).unwrap(), b"wacz");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unnamed_archive_uses_job_id() {
        let work = tempfile::tempdir().unwrap();
        let archives = work.path().join("archives");
        let svc = service(
            &[
                "sh",
                "-c",
                "mkdir -p \"collections/$5\" && printf wacz > \"collections/$5/$5.wacz\"",
                "crawler",
            ],
            work.path(),
            &archives,
        );
        let id = Uuid::new_v4();

        svc.process(id, "https://example.com", &CrawlOptions::default().normalize())
            .await
            .unwrap();

        assert!(archives.join(format!("{}.wacz", id)).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let work = tempfile::tempdir().unwrap();
        let svc = service(&["sh", "-c", "exit 3", "crawler"], work.path(), work.path());

        let err = svc
            .process(Uuid::new_v4(), "https://example.com", &CrawlOptions::default().normalize())
            .await
            .unwrap_err();

        let message = format!("{:#}", err);
        assert!(message.contains("Crawl failed for https://example.com"));
        assert!(message.contains("exit"));
    }

    #[tokio::test]
    async fn test_missing_program_fails() {
        let work = tempfile::tempdir().unwrap();
        let svc = service(&["/nonexistent/crawler-binary"], work.path(), work.path());

        let result = svc
            .process(Uuid::new_v4(), "https://example.com", &CrawlOptions::default().normalize())
            .await;

        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_output_fails() {
        let work = tempfile::tempdir().unwrap();
        let svc = service(&["sh", "-c", "true", "crawler"], work.path(), &work.path().join("archives"));

        let result = svc
            .process(Uuid::new_v4(), "https://example.com", &CrawlOptions::default().normalize())
            .await;

        assert!(result.is_err());
    }
}
