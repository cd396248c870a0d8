use crate::article::{ArticleDownloader, EntryFailure, ExtractionRules, FailureStage, StoredDocument};
use crate::config::Config;
use crate::fetch::{FailureLedger, FailureRecord, FetchClient, FetchSettings};
use crate::output::render_report;
use crate::pipeline::pool::{Completion, WorkerPool};
use crate::query::{DocumentQuery, ScraperQuery};
use crate::store::ContentStore;
use crate::toc::{CrawlRequest, Toc, TocCrawler, TocEntry};
use crate::{BinderError, Result};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Where the table of contents of a run comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Crawl the listing and write a new snapshot
    Fresh,
    /// Reuse the snapshot written by an earlier run
    Resume,
}

/// Final state of one TOC entry
#[derive(Debug, Clone)]
pub enum EntryStatus {
    Stored(StoredDocument),
    /// Document already present and `skip-existing` set
    Skipped,
    Failed(EntryFailure),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct EntryOutcome {
    pub entry: TocEntry,
    pub status: EntryStatus,
}

/// An ordered chapter for the downstream format writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub path: PathBuf,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub toc: Toc,
    /// One outcome per TOC entry, in TOC order
    pub outcomes: Vec<EntryOutcome>,
    /// Requests given up on, images included
    pub fetch_failures: Vec<FailureRecord>,
    pub output_dir: PathBuf,
    pub config_hash: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Documents available on disk, in book order
    pub fn chapters(&self) -> Vec<Chapter> {
        self.outcomes
            .iter()
            .filter_map(|outcome| {
                let path = match &outcome.status {
                    EntryStatus::Stored(document) => document.asset.path.clone(),
                    EntryStatus::Skipped => ContentStore::new(&self.output_dir)
                        .document_path(outcome.entry.content_key()),
                    EntryStatus::Failed(_) | EntryStatus::Cancelled => return None,
                };
                Some(Chapter {
                    title: outcome.entry.title().to_string(),
                    path,
                })
            })
            .collect()
    }

    pub fn stored_count(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Stored(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Skipped))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Failed(_)))
    }

    pub fn cancelled_count(&self) -> usize {
        self.count(|s| matches!(s, EntryStatus::Cancelled))
    }

    pub fn failures(&self) -> Vec<&EntryFailure> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.status {
                EntryStatus::Failed(failure) => Some(failure),
                _ => None,
            })
            .collect()
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    fn count(&self, predicate: impl Fn(&EntryStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}

/// Drives a complete harvest
///
/// # Example
///
/// ```no_run
/// use sumi_binder::config::load_config;
/// use sumi_binder::{Pipeline, RunMode};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("binder.toml"))?;
/// let pipeline = Pipeline::new(config)?;
/// let report = pipeline.run(RunMode::Fresh).await?;
/// for chapter in report.chapters() {
///     println!("{} -> {}", chapter.title, chapter.path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: Config,
    client: Arc<FetchClient>,
    store: Arc<ContentStore>,
    query: Arc<dyn DocumentQuery>,
    ledger: FailureLedger,
    cancel: CancellationToken,
    config_hash: Option<String>,
}

impl Pipeline {
    /// Creates a pipeline with a fresh failure ledger and cancellation token
    pub fn new(config: Config) -> Result<Self> {
        let ledger = FailureLedger::new();
        let cancel = CancellationToken::new();
        let client = FetchClient::new(
            FetchSettings::from_config(&config.fetch),
            ledger.clone(),
            cancel.clone(),
        )?;
        let store = ContentStore::new(&config.output.directory);

        Ok(Self {
            config,
            client: Arc::new(client),
            store: Arc::new(store),
            query: Arc::new(ScraperQuery::new()),
            ledger,
            cancel,
            config_hash: None,
        })
    }

    /// Replaces the document-query engine
    pub fn with_query(mut self, query: Arc<dyn DocumentQuery>) -> Self {
        self.query = query;
        self
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token stopping the run; clones share the same state
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Crawls the listing and writes the snapshot
    ///
    /// An empty TOC is fatal: there is nothing to download.
    pub async fn build_toc(&self) -> Result<Toc> {
        self.store.prepare().await?;

        let request = CrawlRequest::from_config(&self.config)?;
        tracing::info!("Crawling table of contents from {}", request.start_url);

        let toc = TocCrawler::new(&self.client, self.query.as_ref())
            .crawl(&request)
            .await?;

        if toc.is_empty() {
            return Err(BinderError::EmptyToc {
                url: request.start_url.to_string(),
            });
        }

        let path = self
            .store
            .write_snapshot(&self.config.output.snapshot_file, &toc)
            .await?;
        tracing::info!(
            "{} entries from {} listing page(s), snapshot at {}",
            toc.len(),
            toc.pages().len(),
            path.display()
        );

        Ok(toc)
    }

    /// Reloads the TOC written by an earlier run
    pub async fn load_toc(&self) -> Result<Toc> {
        let toc = self
            .store
            .load_snapshot(&self.config.output.snapshot_file)
            .await?;

        if toc.is_empty() {
            return Err(BinderError::EmptyToc {
                url: toc.source().to_string(),
            });
        }

        tracing::info!("Resuming with {} entries from snapshot", toc.len());
        Ok(toc)
    }

    /// Downloads every entry of `toc` over the worker pool
    ///
    /// Every entry is attempted exactly once. Outcomes come back in TOC
    /// order.
    pub async fn download(&self, toc: &Toc) -> Vec<EntryOutcome> {
        let total = toc.len();
        let downloader = ArticleDownloader::new(
            Arc::clone(&self.client),
            Arc::clone(&self.store),
            Arc::clone(&self.query),
        );
        let store = Arc::clone(&self.store);
        let rules = Arc::new(ExtractionRules::from_config(&self.config.extract));
        let skip_existing = self.config.pipeline.skip_existing;
        let finished = Arc::new(AtomicUsize::new(0));

        let pool = WorkerPool::new(self.config.pipeline.workers, self.cancel.clone());
        tracing::info!("Downloading {} entries with {} workers", total, pool.workers());

        let entries = toc.entries().to_vec();
        let completions = pool
            .run(entries.clone(), move |entry: TocEntry| {
                let downloader = downloader.clone();
                let store = Arc::clone(&store);
                let rules = Arc::clone(&rules);
                let finished = Arc::clone(&finished);

                async move {
                    let status = if skip_existing && store.has_document(entry.content_key()).await {
                        tracing::debug!("Skipping {}, already stored", entry.source_url());
                        EntryStatus::Skipped
                    } else {
                        match downloader.download_entry(&entry, &rules).await {
                            Ok(document) => EntryStatus::Stored(document),
                            Err(failure) if failure.stage == FailureStage::Cancelled => {
                                EntryStatus::Cancelled
                            }
                            Err(failure) => {
                                tracing::error!("{}", failure);
                                EntryStatus::Failed(failure)
                            }
                        }
                    };

                    let done = finished.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::info!("[{}/{}] {}", done, total, entry.title());
                    status
                }
            })
            .await;

        entries
            .into_iter()
            .zip(completions)
            .map(|(entry, completion)| {
                let status = match completion {
                    Completion::Done(status) => status,
                    Completion::Panicked(message) => EntryStatus::Failed(EntryFailure {
                        url: entry.source_url().to_string(),
                        stage: FailureStage::Panicked,
                        reason: message,
                    }),
                    Completion::NotStarted => EntryStatus::Cancelled,
                };
                EntryOutcome { entry, status }
            })
            .collect()
    }

    /// Runs a complete harvest and writes the markdown report
    pub async fn run(&self, mode: RunMode) -> Result<RunReport> {
        let started_at = Utc::now();

        let toc = match mode {
            RunMode::Fresh => self.build_toc().await?,
            RunMode::Resume => {
                self.store.prepare().await?;
                self.load_toc().await?
            }
        };

        if self.cancel.is_cancelled() {
            return Err(BinderError::Cancelled);
        }

        let outcomes = self.download(&toc).await;

        let report = RunReport {
            toc,
            outcomes,
            fetch_failures: self.ledger.snapshot(),
            output_dir: self.store.root().to_path_buf(),
            config_hash: self.config_hash.clone(),
            started_at,
            finished_at: Utc::now(),
        };

        match self
            .store
            .write_text(&self.config.output.report_file, &render_report(&report))
            .await
        {
            Ok(path) => tracing::info!("Report written to {}", path.display()),
            Err(e) => tracing::warn!("Could not write run report: {}", e),
        }

        tracing::info!(
            "Run finished: {} stored, {} skipped, {} failed, {} cancelled",
            report.stored_count(),
            report.skipped_count(),
            report.failed_count(),
            report.cancelled_count()
        );

        Ok(report)
    }
}
