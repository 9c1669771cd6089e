//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for the paperflow pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory watched for incoming documents.
    pub watch_dir: PathBuf,

    /// Root of the processed area; success/failed subfolders live under it.
    pub processed_dir: PathBuf,

    /// Path of the processed-record ledger document.
    pub ledger_path: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Watcher tuning.
    pub watch: WatchConfig,

    /// Queue and worker-pool tuning.
    pub pipeline: PipelineConfig,

    /// Registry client tuning.
    pub registry: RegistryConfig,

    /// Match-validation tuning.
    pub matching: MatchConfig,
}

/// Directory-watcher tuning.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Accepted file extensions, lowercase, with leading dot.
    pub extensions: Vec<String>,

    /// Size ceiling in megabytes; larger files are rejected.
    pub max_file_size_mb: u64,

    /// Window during which repeat events for one path are suppressed.
    pub debounce_window: Duration,

    /// Age after which debounce entries are purged lazily.
    pub debounce_purge_after: Duration,

    /// Interval between readability re-checks of pending files.
    pub stability_poll: Duration,

    /// Absolute cap on how long a file may stay pending.
    pub stability_timeout: Duration,

    /// OS-event coalescing window passed to the debouncer.
    pub event_coalesce: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".pdf".to_string()],
            max_file_size_mb: 50,
            debounce_window: Duration::from_secs(30),
            debounce_purge_after: Duration::from_secs(3600),
            stability_poll: Duration::from_secs(5),
            stability_timeout: Duration::from_secs(30),
            event_coalesce: Duration::from_millis(500),
        }
    }
}

/// Queue and worker-pool tuning.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of worker tasks pulling from the queue.
    pub workers: usize,

    /// Timeout on each queue pop so shutdown is observed promptly.
    pub pop_timeout: Duration,

    /// Pause between items on each worker.
    pub inter_item_pause: Duration,

    /// Minimum extracted-text length for a usable document.
    pub min_text_len: usize,

    /// Timeout for the fast extraction attempt.
    pub quick_extract_timeout: Duration,

    /// Timeout for the slow, thorough extraction attempt.
    pub thorough_extract_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            pop_timeout: Duration::from_secs(1),
            inter_item_pause: Duration::from_secs(3),
            min_text_len: 100,
            quick_extract_timeout: Duration::from_secs(30),
            thorough_extract_timeout: Duration::from_secs(600),
        }
    }
}

impl PipelineConfig {
    /// Queue capacity: twice the worker count, minimum 2.
    #[must_use]
    pub const fn queue_capacity(&self) -> usize {
        if self.workers < 1 { 2 } else { self.workers * 2 }
    }
}

/// Registry client tuning.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Minimum gap between consecutive registry calls.
    pub request_gap: Duration,

    /// Bounded retry attempts for transient registry errors.
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries.
    pub retry_base_delay: Duration,

    /// How many hits of one query are validated before moving on.
    pub max_hits_per_query: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            request_gap: Duration::from_millis(500),
            max_retries: 3,
            retry_base_delay: Duration::from_secs(1),
            max_hits_per_query: 3,
        }
    }
}

/// Match-validation tuning.
///
/// The thresholds and weights are heuristic values preserved for
/// behavioral compatibility; nothing about them is known to be optimal.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Weight of title word-set similarity.
    pub title_weight: f64,

    /// Weight of author-surname overlap.
    pub author_weight: f64,

    /// Weight of publication-year closeness.
    pub year_weight: f64,

    /// Accept threshold for identifier-based strategies.
    pub identifier_threshold: f64,

    /// Accept threshold for heuristic strategies.
    pub heuristic_threshold: f64,

    /// How many source authors participate in surname overlap.
    pub max_authors: usize,

    /// Title Jaccard floor for the post-enrichment duplicate check.
    pub dedup_title_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            title_weight: 60.0,
            author_weight: 30.0,
            year_weight: 10.0,
            identifier_threshold: 80.0,
            heuristic_threshold: 85.0,
            max_authors: 5,
            dedup_title_threshold: 0.8,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_dir: PathBuf::from("./inbox"),
            processed_dir: PathBuf::from("./processed"),
            ledger_path: PathBuf::from("./data/processed_records.json"),
            log_level: "info".to_string(),
            watch: WatchConfig::default(),
            pipeline: PipelineConfig::default(),
            registry: RegistryConfig::default(),
            matching: MatchConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.watch.extensions.is_empty() {
            return Err(Error::config("extension allow-list cannot be empty"));
        }

        if self.watch.max_file_size_mb == 0 {
            return Err(Error::config("max_file_size_mb cannot be 0"));
        }

        if self.pipeline.workers == 0 {
            return Err(Error::config("workers cannot be 0"));
        }

        if self.pipeline.workers > 32 {
            return Err(Error::config("workers cannot exceed 32"));
        }

        if self.pipeline.pop_timeout.is_zero() {
            return Err(Error::config("pop_timeout cannot be zero"));
        }

        let m = &self.matching;
        let max_total = m.title_weight + m.author_weight + m.year_weight;
        if max_total <= 0.0 {
            return Err(Error::config("match weights must sum to a positive value"));
        }
        if m.identifier_threshold > max_total || m.heuristic_threshold > max_total {
            return Err(Error::config(format!(
                "match thresholds cannot exceed the maximum score ({max_total})"
            )));
        }
        if !(0.0..=1.0).contains(&m.dedup_title_threshold) {
            return Err(Error::config("dedup_title_threshold must be within 0..=1"));
        }

        Ok(())
    }

    /// Directory that successfully processed files move to.
    #[must_use]
    pub fn success_dir(&self) -> PathBuf {
        self.processed_dir.join("success")
    }

    /// Directory that failed files move to.
    #[must_use]
    pub fn failed_dir(&self) -> PathBuf {
        self.processed_dir.join("failed")
    }
}
