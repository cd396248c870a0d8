use serde::Deserialize;

/// Main configuration structure for Sumi-Binder
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    pub extract: ExtractConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where the table of contents lives and how to walk it
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Starting listing URL; `https://` is assumed when no scheme is given
    pub url: String,

    /// Rule selecting entry links on each listing page
    #[serde(rename = "link-selector", default = "default_link_selector")]
    pub link_selector: String,

    /// Rule selecting the "next page" link; one page only when absent
    #[serde(rename = "next-page-selector", default)]
    pub next_page_selector: Option<String>,

    /// Upper bound on listing pages visited in one crawl
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: usize,
}

/// How the main content region is cut out of each article
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractConfig {
    /// Rule selecting the main content region
    #[serde(rename = "content-selector")]
    pub content_selector: String,

    /// Rules for substructure stripped before extraction
    #[serde(rename = "remove-selectors", default)]
    pub remove_selectors: Vec<String>,
}

/// Network behavior of the fetch client
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Retries after the initial attempt
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(rename = "connect-timeout-secs", default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "read-timeout-secs", default = "default_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Double the read timeout once after the first read timeout
    #[serde(rename = "escalate-read-timeout", default = "default_true")]
    pub escalate_read_timeout: bool,

    /// Length of one backoff unit in milliseconds
    #[serde(rename = "backoff-unit-ms", default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,

    /// Endpoint answering with one proxy address per request
    #[serde(rename = "proxy-source", default)]
    pub proxy_source: Option<String>,

    /// User agents rotated across requests (built-in list when empty)
    #[serde(rename = "user-agents", default)]
    pub user_agents: Vec<String>,
}

/// Batch execution settings
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Width of the download worker pool
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Times a single listing page is fetched before the crawl gives up on it
    #[serde(rename = "listing-page-attempts", default = "default_listing_page_attempts")]
    pub listing_page_attempts: u32,

    /// Skip entries whose document already exists in the output directory
    #[serde(rename = "skip-existing", default)]
    pub skip_existing: bool,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Flat directory receiving documents, images and the snapshot
    #[serde(default = "default_output_directory")]
    pub directory: String,

    /// TOC snapshot file name, relative to `directory`
    #[serde(rename = "snapshot-file", default = "default_snapshot_file")]
    pub snapshot_file: String,

    /// Markdown run report file name, relative to `directory`
    #[serde(rename = "report-file", default = "default_report_file")]
    pub report_file: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            connect_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
            escalate_read_timeout: true,
            backoff_unit_ms: default_backoff_unit_ms(),
            proxy_source: None,
            user_agents: Vec::new(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            listing_page_attempts: default_listing_page_attempts(),
            skip_existing: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            snapshot_file: default_snapshot_file(),
            report_file: default_report_file(),
        }
    }
}

fn default_link_selector() -> String {
    "a".to_string()
}

fn default_max_pages() -> usize {
    500
}

fn default_max_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_backoff_unit_ms() -> u64 {
    1000
}

fn default_workers() -> usize {
    20
}

fn default_listing_page_attempts() -> u32 {
    2
}

fn default_output_directory() -> String {
    "tmp".to_string()
}

fn default_snapshot_file() -> String {
    "toc.toml".to_string()
}

fn default_report_file() -> String {
    "report.md".to_string()
}
