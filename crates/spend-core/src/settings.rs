use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Floor for the pause between two requests to the same host.
pub const MIN_REQUEST_DELAY_MS: u64 = 1_000;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Collect and analyse published government payment disclosures
#[derive(Parser, Debug, Clone)]
#[command(
    name = "spend-monitor",
    about = "Collect and analyse published government payment disclosures",
    version
)]
pub struct Settings {
    /// Pipeline stage to run
    #[arg(default_value = "all", value_parser = ["collect", "analyze", "all"])]
    pub mode: String,

    /// Directory holding raw downloads and processed snapshots
    #[arg(long, env = "SPEND_DATA_DIR", default_value = "historical_data")]
    pub data_dir: PathBuf,

    /// JSON source catalogue replacing the built-in one
    #[arg(long, env = "SPEND_SOURCES")]
    pub sources: Option<PathBuf>,

    /// Per-request timeout in seconds (1-300)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=300))]
    pub timeout_secs: u64,

    /// Minimum pause between requests to one host, in milliseconds (>= 1000)
    #[arg(long, default_value = "1000", value_parser = clap::value_parser!(u64).range(1000..))]
    pub request_delay_ms: u64,

    /// Restrict analyzer aggregations to one source type
    #[arg(long)]
    pub source_type: Option<String>,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply derived overrides.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os().collect())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args(args: Vec<std::ffi::OsString>) -> Self {
        Self::resolve(Settings::parse_from(args))
    }

    /// Apply the `--debug` flag.
    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    pub fn runs_collector(&self) -> bool {
        matches!(self.mode.as_str(), "collect" | "all")
    }

    pub fn runs_analyzer(&self) -> bool {
        matches!(self.mode.as_str(), "analyze" | "all")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Request pacing, never below [`MIN_REQUEST_DELAY_MS`].
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms.max(MIN_REQUEST_DELAY_MS))
    }

    /// Where analyzer artifacts go.
    pub fn analysis_dir(&self) -> PathBuf {
        self.data_dir.join("analysis")
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
