use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the Gazette binary.
#[derive(Debug, Parser)]
#[command(name = "gazette", version, about = "Research report publishing pipeline")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "GAZETTE_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Render and store a single report, then rebuild the archive index.
    Create(CreateArgs),
    /// Rebuild the archive index from stored metadata.
    #[command(name = "rebuild-index")]
    RebuildIndex,
    /// Print today's research topics as a JSON array.
    Topics,
    /// Create one report per daily topic and rebuild the archive index.
    Daily(DailyArgs),
    /// Delete old generated pages by age or count.
    Prune(PruneArgs),
}

/// Overrides accepted by every command.
#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Directory used by the local storage backend.
    #[arg(
        long = "storage-local-root",
        env = "LOCAL_OUT",
        value_name = "PATH",
        value_hint = ValueHint::DirPath,
        global = true
    )]
    pub storage_local_root: Option<PathBuf>,

    /// Store reports in this cloud storage bucket instead of the local directory.
    #[arg(
        long = "storage-gcs-bucket",
        env = "GCS_BUCKET",
        value_name = "BUCKET",
        global = true
    )]
    pub storage_gcs_bucket: Option<String>,

    /// Storage key of the archive index page.
    #[arg(
        long = "archive-index",
        env = "ARCHIVE_INDEX",
        value_name = "KEY",
        global = true
    )]
    pub archive_index: Option<String>,

    /// API key for topic generation; without one the static topic list is used.
    #[arg(
        long = "topics-api-key",
        env = "GEMINI_API_KEY",
        value_name = "KEY",
        hide_env_values = true,
        global = true
    )]
    pub topics_api_key: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    /// Report topic; also used as the title.
    #[arg(long)]
    pub topic: String,

    /// Tag to attach; repeat for several.
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Template name (report_v1 or report_v1_sections).
    #[arg(long, default_value = gazette_api_types::DEFAULT_TEMPLATE)]
    pub template: String,

    /// JSON file holding the template data (subtitle, summary, sections, extra fields).
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub data: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct DailyArgs {
    /// Only create reports for the first N topics.
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct PruneArgs {
    /// Site output root to prune.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Keep the latest N pages.
    #[arg(long = "max", value_name = "N")]
    pub max_keep: Option<usize>,

    /// Keep pages newer than DAYS.
    #[arg(long = "days", value_name = "DAYS")]
    pub days_keep: Option<u64>,

    /// Report what would be deleted without deleting anything.
    #[arg(long = "dry-run", action = clap::ArgAction::SetTrue)]
    pub dry_run: bool,
}
