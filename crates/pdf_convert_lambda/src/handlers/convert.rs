use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use pdf_convert_core::contract::{OutputRef, SourceRef};
use pdf_convert_core::storage_keys::{output_object_key, ObjectName};
use pdf_convert_core::strategy::{ConversionStrategy, StrategyTable};
use pdf_convert_core::text_layout::{render_text_pdf, PageLayout};
use tempfile::TempDir;
use tracing::{debug, error, info};

use crate::adapters::object_store::ObjectStore;
use crate::adapters::office_engine::OfficeEngine;
use crate::config::DispatcherConfig;
use crate::error::ConversionError;

const WORKDIR_PREFIX: &str = "pdf-convert-";
const ENGINE_INPUT_STEM: &str = "input";

/// Downloads one object, converts it to PDF and uploads the result.
///
/// The store and engine are injected; the dispatcher holds no other state, so
/// one instance can serve every invocation of a warm process.
pub struct ConversionDispatcher<S, E> {
    store: S,
    engine: E,
    strategies: StrategyTable,
    output_prefix: String,
    output_bucket: Option<String>,
    scratch_dir: Option<PathBuf>,
    layout: PageLayout,
}

impl<S, E> ConversionDispatcher<S, E>
where
    S: ObjectStore,
    E: OfficeEngine,
{
    pub fn new(store: S, engine: E, config: &DispatcherConfig) -> Self {
        Self {
            store,
            engine,
            strategies: config.strategy_table(),
            output_prefix: config.output_prefix.clone(),
            output_bucket: config.output_bucket.clone(),
            scratch_dir: config.scratch_dir.clone(),
            layout: config.layout,
        }
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }

    pub fn output_bucket_for<'a>(&'a self, source: &'a SourceRef) -> &'a str {
        self.output_bucket.as_deref().unwrap_or(&source.bucket)
    }

    pub fn output_ref(&self, source: &SourceRef) -> Result<OutputRef, ConversionError> {
        Ok(OutputRef {
            bucket: self.output_bucket_for(source).to_string(),
            key: output_object_key(&self.output_prefix, &source.key)?,
        })
    }

    pub fn strategy_for(&self, key: &str) -> Result<ConversionStrategy, ConversionError> {
        let name = ObjectName::parse(key)?;
        Ok(self.strategies.select(&name.normalized_extension()))
    }

    pub fn convert(&self, source: &SourceRef) -> Result<OutputRef, ConversionError> {
        let started_at = Instant::now();
        let result = self.convert_inner(source);
        match &result {
            Ok(output) => info!(
                bucket = %source.bucket,
                key = %source.key,
                output_bucket = %output.bucket,
                output_key = %output.key,
                duration_ms = started_at.elapsed().as_millis() as u64,
                "conversion_completed"
            ),
            Err(error) => error!(
                bucket = %source.bucket,
                key = %source.key,
                error_kind = error.kind(),
                error = %error,
                duration_ms = started_at.elapsed().as_millis() as u64,
                "conversion_failed"
            ),
        }
        result
    }

    fn convert_inner(&self, source: &SourceRef) -> Result<OutputRef, ConversionError> {
        let name = ObjectName::parse(&source.key)?;
        let extension = name.normalized_extension();
        let strategy = self.strategies.select(&extension);
        let output = self.output_ref(source)?;

        info!(
            bucket = %source.bucket,
            key = %source.key,
            strategy = strategy.as_str(),
            output_key = %output.key,
            "conversion_started"
        );

        let body = self
            .store
            .get_object(&source.bucket, &source.key)
            .map_err(|message| ConversionError::Fetch {
                bucket: source.bucket.clone(),
                key: source.key.clone(),
                message,
            })?;
        debug!(key = %source.key, bytes = body.len(), "source_fetched");

        let pdf = match strategy {
            ConversionStrategy::OfficeEngine => self.render_with_engine(source, &extension, &body)?,
            ConversionStrategy::Passthrough => body,
            ConversionStrategy::PlainTextLayout => {
                let rendered = render_text_pdf(&body, &self.layout)
                    .map_err(|error| ConversionError::from_layout(&source.key, error))?;
                debug!(
                    key = %source.key,
                    pages = rendered.page_count,
                    lines = rendered.line_count,
                    "text_laid_out"
                );
                rendered.bytes
            }
        };

        self.store
            .put_object(&output.bucket, &output.key, &pdf)
            .map_err(|message| ConversionError::Upload {
                bucket: output.bucket.clone(),
                key: output.key.clone(),
                message,
            })?;

        Ok(output)
    }

    /// Runs the engine on a local copy named `input.<extension>`.
    ///
    /// Object keys may be far longer than a file name is allowed to be, so the
    /// source basename never reaches the filesystem.
    fn render_with_engine(
        &self,
        source: &SourceRef,
        extension: &str,
        body: &[u8],
    ) -> Result<Vec<u8>, ConversionError> {
        let workdir = self.create_workdir()?;
        let source_dir = workdir.path().join("source");
        let output_dir = workdir.path().join("output");
        create_dir(&source_dir)?;
        create_dir(&output_dir)?;

        let input_path = source_dir.join(format!("{ENGINE_INPUT_STEM}.{extension}"));
        fs::write(&input_path, body)
            .map_err(|error| ConversionError::workspace(&input_path, error))?;

        let pdf_path = self
            .engine
            .convert_to_pdf(&input_path, &output_dir)
            .map_err(|error| ConversionError::Engine {
                key: source.key.clone(),
                source: error,
            })?;
        fs::read(&pdf_path).map_err(|error| ConversionError::workspace(&pdf_path, error))
    }

    fn create_workdir(&self) -> Result<TempDir, ConversionError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKDIR_PREFIX);
        match &self.scratch_dir {
            Some(root) => {
                create_dir(root)?;
                builder
                    .tempdir_in(root)
                    .map_err(|error| ConversionError::workspace(root, error))
            }
            None => builder
                .tempdir()
                .map_err(|error| ConversionError::workspace(std::env::temp_dir(), error)),
        }
    }
}

fn create_dir(path: &Path) -> Result<(), ConversionError> {
    fs::create_dir_all(path).map_err(|error| ConversionError::workspace(path, error))
}
