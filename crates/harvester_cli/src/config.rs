//! Optional RON configuration file and its merge with command-line flags.
//!
//! Precedence, lowest first: built-in defaults, the `--config` file, flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use harvester_engine::{
    HarvestConfig, OutputFormat, PaginationStyle, ParsePolicy, Strategy,
};
use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StrategyArg {
    Html,
    Auto,
    Wpcom,
    Rest,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Html => Strategy::Html,
            StrategyArg::Auto => Strategy::Auto,
            StrategyArg::Wpcom => Strategy::WpCom,
            StrategyArg::Rest => Strategy::SiteRest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PaginationArg {
    Path,
    Query,
    PathThenQuery,
}

impl From<PaginationArg> for PaginationStyle {
    fn from(value: PaginationArg) -> Self {
        match value {
            PaginationArg::Path => PaginationStyle::Path,
            PaginationArg::Query => PaginationStyle::Query,
            PaginationArg::PathThenQuery => PaginationStyle::PathThenQuery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ParsePolicyArg {
    Skip,
    Abort,
}

impl From<ParsePolicyArg> for ParsePolicy {
    fn from(value: ParsePolicyArg) -> Self {
        match value {
            ParsePolicyArg::Skip => ParsePolicy::Skip,
            ParsePolicyArg::Abort => ParsePolicy::Abort,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FormatArg {
    Lines,
    Csv,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Lines => OutputFormat::Lines,
            FormatArg::Csv => OutputFormat::Csv,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Contents of a `--config` file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub strategy: Option<StrategyArg>,
    pub pagination: Option<PaginationArg>,
    pub max_pages: Option<u32>,
    pub max_empty_pages: Option<u32>,
    pub parse_policy: Option<ParsePolicyArg>,
    pub delay_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_bytes: Option<u64>,
    pub user_agent: Option<String>,
    pub wpcom_api_base: Option<String>,
    pub selectors: Option<Vec<String>>,
    pub format: Option<FormatArg>,
    pub output: Option<PathBuf>,
    pub sort: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        ron::from_str(text).map_err(|err| err.to_string())
    }
}

/// Everything a run needs after defaults, file and flags are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub harvest: HarvestConfig,
    pub selectors: Option<Vec<String>>,
    pub format: OutputFormat,
    pub output: Option<PathBuf>,
    pub sort: bool,
}

impl RunConfig {
    pub fn resolve(file: FileConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let mut harvest = HarvestConfig::default();

        if let Some(strategy) = cli.strategy.or(file.strategy) {
            harvest.strategy = strategy.into();
        }
        if let Some(pagination) = cli.pagination.or(file.pagination) {
            harvest.settings.pagination = pagination.into();
        }
        if let Some(policy) = cli.parse_policy.or(file.parse_policy) {
            harvest.settings.parse_policy = policy.into();
        }
        if let Some(max_pages) = cli.max_pages.or(file.max_pages) {
            if max_pages == 0 {
                return Err(ConfigError::Invalid("max_pages must be at least 1".into()));
            }
            harvest.settings.max_pages = max_pages;
        }
        if let Some(max_empty) = cli.max_empty_pages.or(file.max_empty_pages) {
            if max_empty == 0 {
                return Err(ConfigError::Invalid(
                    "max_empty_pages must be at least 1".into(),
                ));
            }
            harvest.settings.max_empty_pages = max_empty;
        }
        if let Some(delay_ms) = cli.delay_ms.or(file.delay_ms) {
            harvest.request_delay = Duration::from_millis(delay_ms);
        }
        if let Some(secs) = cli.timeout_secs.or(file.timeout_secs) {
            if secs == 0 {
                return Err(ConfigError::Invalid("timeout must be at least 1s".into()));
            }
            harvest.fetch.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.connect_timeout_secs {
            harvest.fetch.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(max_bytes) = file.max_bytes {
            harvest.fetch.max_bytes = max_bytes;
        }
        if let Some(agent) = cli.user_agent.clone().or(file.user_agent) {
            harvest.fetch.user_agent = agent;
        }
        if let Some(base) = file.wpcom_api_base {
            harvest.wpcom_api_base = base;
        }

        let selectors = if cli.selectors.is_empty() {
            file.selectors
        } else {
            Some(cli.selectors.clone())
        };

        Ok(Self {
            harvest,
            selectors,
            format: cli.format.or(file.format).map(Into::into).unwrap_or_default(),
            output: cli.output.clone().or(file.output),
            sort: cli.sort || file.sort.unwrap_or(false),
        })
    }
}
