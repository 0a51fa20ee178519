//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CliArgs, Command, CreateArgs, DailyArgs, GlobalOverrides, PruneArgs, ServeArgs,
    ServeOverrides,
};

use crate::infra::gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::infra::storage::{DEFAULT_GCS_ENDPOINT, DEFAULT_METADATA_ENDPOINT};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "gazette";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_LOCAL_ROOT: &str = "out";
const DEFAULT_INDEX_KEY: &str = "index.html";
const DEFAULT_ARCHIVE_TITLE: &str = "Research Archive";

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
    pub archive: ArchiveSettings,
    pub topics: TopicsSettings,
    pub retention: RetentionSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub local_root: PathBuf,
    /// Present when a bucket is configured; selects the cloud backend.
    pub gcs: Option<GcsSettings>,
}

#[derive(Debug, Clone)]
pub struct GcsSettings {
    pub bucket: String,
    pub endpoint: Url,
    pub token: Option<String>,
    pub metadata_endpoint: Url,
}

#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    pub index_key: String,
    pub title: String,
}

#[derive(Debug, Clone)]
pub struct TopicsSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: Url,
}

#[derive(Debug, Clone)]
pub struct RetentionSettings {
    pub root: PathBuf,
    pub max_keep: Option<usize>,
    pub days_keep: Option<u64>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("GAZETTE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_global_overrides(&cli.overrides);
    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Prune(args)) => raw.apply_prune_overrides(args),
        Some(Command::Create(_))
        | Some(Command::RebuildIndex)
        | Some(Command::Topics)
        | Some(Command::Daily(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    storage: RawStorageSettings,
    archive: RawArchiveSettings,
    topics: RawTopicsSettings,
    retention: RawRetentionSettings,
}

impl RawSettings {
    fn apply_global_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(root) = overrides.storage_local_root.as_ref() {
            self.storage.local_root = Some(root.clone());
        }
        if let Some(bucket) = overrides.storage_gcs_bucket.as_ref() {
            self.storage.gcs_bucket = Some(bucket.clone());
        }
        if let Some(index) = overrides.archive_index.as_ref() {
            self.archive.index_key = Some(index.clone());
        }
        if let Some(key) = overrides.topics_api_key.as_ref() {
            self.topics.api_key = Some(key.clone());
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
    }

    fn apply_prune_overrides(&mut self, args: &PruneArgs) {
        if let Some(root) = args.root.as_ref() {
            self.retention.root = Some(root.clone());
        }
        if let Some(max) = args.max_keep {
            self.retention.max_keep = Some(max);
        }
        if let Some(days) = args.days_keep {
            self.retention.days_keep = Some(days);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            storage,
            archive,
            topics,
            retention,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let storage = build_storage_settings(storage)?;
        let archive = build_archive_settings(archive)?;
        let topics = build_topics_settings(topics)?;
        let retention = build_retention_settings(retention, &storage);

        Ok(Self {
            server,
            logging,
            storage,
            archive,
            topics,
            retention,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_storage_settings(storage: RawStorageSettings) -> Result<StorageSettings, LoadError> {
    let local_root = storage
        .local_root
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOCAL_ROOT));
    if local_root.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "storage.local_root",
            "path must not be empty",
        ));
    }

    let gcs = match non_blank(storage.gcs_bucket) {
        Some(bucket) => Some(GcsSettings {
            bucket,
            endpoint: parse_url(
                storage.gcs_endpoint.as_deref(),
                DEFAULT_GCS_ENDPOINT,
                "storage.gcs_endpoint",
            )?,
            token: non_blank(storage.gcs_token),
            metadata_endpoint: parse_url(
                storage.gcs_metadata_endpoint.as_deref(),
                DEFAULT_METADATA_ENDPOINT,
                "storage.gcs_metadata_endpoint",
            )?,
        }),
        None => None,
    };

    Ok(StorageSettings { local_root, gcs })
}

fn build_archive_settings(archive: RawArchiveSettings) -> Result<ArchiveSettings, LoadError> {
    let index_key = non_blank(archive.index_key).unwrap_or_else(|| DEFAULT_INDEX_KEY.to_string());
    crate::application::storage::validate_key(&index_key)
        .map_err(|err| LoadError::invalid("archive.index_key", err.to_string()))?;

    let title = non_blank(archive.title).unwrap_or_else(|| DEFAULT_ARCHIVE_TITLE.to_string());

    Ok(ArchiveSettings { index_key, title })
}

fn build_topics_settings(topics: RawTopicsSettings) -> Result<TopicsSettings, LoadError> {
    let model = non_blank(topics.model).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string());
    let endpoint = parse_url(
        topics.endpoint.as_deref(),
        DEFAULT_GEMINI_ENDPOINT,
        "topics.endpoint",
    )?;

    Ok(TopicsSettings {
        api_key: non_blank(topics.api_key),
        model,
        endpoint,
    })
}

/// Zero limits mean "not set". The root defaults to the local storage directory.
fn build_retention_settings(
    retention: RawRetentionSettings,
    storage: &StorageSettings,
) -> RetentionSettings {
    RetentionSettings {
        root: retention
            .root
            .filter(|root| !root.as_os_str().is_empty())
            .unwrap_or_else(|| storage.local_root.clone()),
        max_keep: retention.max_keep.filter(|max| *max > 0),
        days_keep: retention.days_keep.filter(|days| *days > 0),
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawStorageSettings {
    local_root: Option<PathBuf>,
    gcs_bucket: Option<String>,
    gcs_endpoint: Option<String>,
    gcs_token: Option<String>,
    gcs_metadata_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawArchiveSettings {
    index_key: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawTopicsSettings {
    api_key: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRetentionSettings {
    root: Option<PathBuf>,
    max_keep: Option<usize>,
    days_keep: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn parse_url(value: Option<&str>, default: &str, key: &'static str) -> Result<Url, LoadError> {
    let candidate = value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(default);
    Url::parse(candidate).map_err(|err| LoadError::invalid(key, format!("invalid URL: {err}")))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
