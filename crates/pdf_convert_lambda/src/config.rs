//! Runtime configuration, read from the process environment.

use std::path::PathBuf;
use std::time::Duration;

use pdf_convert_core::storage_keys::DEFAULT_OUTPUT_PREFIX;
use pdf_convert_core::strategy::StrategyTable;
use pdf_convert_core::text_layout::PageLayout;
use thiserror::Error;

pub const OUTPUT_PREFIX_VAR: &str = "PDF_OUTPUT_PREFIX";
pub const OUTPUT_BUCKET_VAR: &str = "PDF_OUTPUT_BUCKET";
pub const ENGINE_PATH_VAR: &str = "OFFICE_ENGINE_PATH";
pub const ENGINE_ARGS_VAR: &str = "OFFICE_ENGINE_ARGS";
pub const ENGINE_TIMEOUT_VAR: &str = "OFFICE_ENGINE_TIMEOUT_SECS";
pub const OFFICE_EXTENSIONS_VAR: &str = "OFFICE_EXTENSIONS";
pub const SCRATCH_DIR_VAR: &str = "PDF_SCRATCH_DIR";

pub const DEFAULT_ENGINE_PROGRAM: &str = "libreoffice";
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive integer number of seconds, got '{value}'")]
    InvalidTimeout { name: &'static str, value: String },
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: String,
    /// Arguments placed before the conversion flags.
    pub extra_args: Vec<String>,
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_ENGINE_PROGRAM.to_string(),
            extra_args: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatcherConfig {
    pub output_prefix: String,
    /// Destination bucket; `None` writes back into the source bucket.
    pub output_bucket: Option<String>,
    pub extra_office_extensions: Vec<String>,
    pub scratch_dir: Option<PathBuf>,
    pub layout: PageLayout,
    pub engine: EngineConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            output_bucket: None,
            extra_office_extensions: Vec::new(),
            scratch_dir: None,
            layout: PageLayout::a4(),
            engine: EngineConfig::default(),
        }
    }
}

impl DispatcherConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(prefix) = lookup(OUTPUT_PREFIX_VAR) {
            // An explicitly empty prefix writes PDFs at the bucket root.
            config.output_prefix = prefix.trim().to_string();
        }
        config.output_bucket = read(OUTPUT_BUCKET_VAR);
        config.scratch_dir = read(SCRATCH_DIR_VAR).map(PathBuf::from);
        if let Some(extensions) = read(OFFICE_EXTENSIONS_VAR) {
            config.extra_office_extensions = parse_list(&extensions, ',');
        }

        if let Some(program) = lookup(ENGINE_PATH_VAR) {
            let program = program.trim();
            if program.is_empty() {
                return Err(ConfigError::Empty {
                    name: ENGINE_PATH_VAR,
                });
            }
            config.engine.program = program.to_string();
        }
        if let Some(args) = read(ENGINE_ARGS_VAR) {
            config.engine.extra_args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(timeout) = read(ENGINE_TIMEOUT_VAR) {
            config.engine.timeout = parse_timeout(ENGINE_TIMEOUT_VAR, &timeout)?;
        }

        Ok(config)
    }

    pub fn strategy_table(&self) -> StrategyTable {
        StrategyTable::default().with_office_extensions(&self.extra_office_extensions)
    }
}

pub fn parse_timeout(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(seconds) if seconds > 0 => Ok(Duration::from_secs(seconds)),
        _ => Err(ConfigError::InvalidTimeout {
            name,
            value: raw.to_string(),
        }),
    }
}

fn parse_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
