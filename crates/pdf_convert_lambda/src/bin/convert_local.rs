use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use pdf_convert_core::contract::SourceRef;
use pdf_convert_lambda::adapters::object_store::FsObjectStore;
use pdf_convert_lambda::adapters::office_engine::LibreOfficeEngine;
use pdf_convert_lambda::config::{DispatcherConfig, ENGINE_PATH_VAR, OUTPUT_PREFIX_VAR};
use pdf_convert_lambda::handlers::convert::ConversionDispatcher;
use pdf_convert_lambda::handlers::event::{handle_sources, summarize};
use pdf_convert_lambda::logging::init_cli_logging;
use tracing::error;

/// Convert objects from a directory-backed store, exactly as the Lambda would.
#[derive(Parser)]
#[command(name = "convert_local", version)]
struct Cli {
    /// Directory holding one sub-directory per bucket
    #[arg(long, env = "PDF_STORE_ROOT")]
    store_root: PathBuf,

    /// Bucket (sub-directory of the store root) holding the sources
    #[arg(long)]
    bucket: String,

    /// Object keys to convert, processed in order
    #[arg(required = true)]
    keys: Vec<String>,

    /// Output namespace prepended to generated PDF keys
    #[arg(long, env = OUTPUT_PREFIX_VAR)]
    output_prefix: Option<String>,

    /// Write PDFs into this bucket instead of the source bucket
    #[arg(long)]
    output_bucket: Option<String>,

    /// Office engine executable
    #[arg(long, env = ENGINE_PATH_VAR)]
    engine: Option<String>,

    /// Seconds before a running office engine is killed
    #[arg(long)]
    engine_timeout_secs: Option<u64>,

    /// Extra extensions routed to the office engine (comma separated)
    #[arg(long, value_delimiter = ',')]
    office_extensions: Vec<String>,

    /// Log debug events
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut DispatcherConfig) -> Result<(), String> {
        if let Some(prefix) = &self.output_prefix {
            config.output_prefix = prefix.clone();
        }
        if let Some(bucket) = &self.output_bucket {
            config.output_bucket = Some(bucket.clone());
        }
        if let Some(engine) = &self.engine {
            config.engine.program = engine.clone();
        }
        match self.engine_timeout_secs {
            Some(0) => return Err("--engine-timeout-secs must be greater than zero".to_string()),
            Some(seconds) => config.engine.timeout = Duration::from_secs(seconds),
            None => {}
        }
        config
            .extra_office_extensions
            .extend(self.office_extensions.iter().cloned());
        Ok(())
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_cli_logging(cli.verbose);

    let mut config = match DispatcherConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "invalid_configuration");
            return ExitCode::FAILURE;
        }
    };
    if let Err(message) = cli.apply(&mut config) {
        error!(error = %message, "invalid_arguments");
        return ExitCode::FAILURE;
    }

    let store = FsObjectStore::new(&cli.store_root);
    let engine = LibreOfficeEngine::new(config.engine.clone());
    let dispatcher = ConversionDispatcher::new(store, engine, &config);
    let sources = cli
        .keys
        .iter()
        .map(|key| SourceRef::new(cli.bucket.clone(), key.clone()))
        .collect();

    match handle_sources(sources, &dispatcher) {
        Ok(outcomes) => {
            let response = summarize(&outcomes);
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{json}"),
                Err(_) => println!("{}", response.body),
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error_kind = err.kind(), error = %err, "conversion_aborted");
            ExitCode::FAILURE
        }
    }
}
