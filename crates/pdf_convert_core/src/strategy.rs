use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_OFFICE_EXTENSIONS: [&str; 3] = ["docx", "xlsx", "pptx"];

/// How a given input format becomes a PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionStrategy {
    /// Render through the external office engine.
    OfficeEngine,
    /// Input already is a PDF; upload it unchanged.
    Passthrough,
    /// Treat the input as UTF-8 text and lay it out page by page.
    PlainTextLayout,
}

impl ConversionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OfficeEngine => "office_engine",
            Self::Passthrough => "passthrough",
            Self::PlainTextLayout => "plain_text_layout",
        }
    }
}

/// Extension-keyed strategy lookup with a plain-text fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTable {
    by_extension: BTreeMap<String, ConversionStrategy>,
    fallback: ConversionStrategy,
}

impl Default for StrategyTable {
    fn default() -> Self {
        let mut by_extension = BTreeMap::new();
        for extension in DEFAULT_OFFICE_EXTENSIONS {
            by_extension.insert(extension.to_string(), ConversionStrategy::OfficeEngine);
        }
        by_extension.insert("pdf".to_string(), ConversionStrategy::Passthrough);
        Self {
            by_extension,
            fallback: ConversionStrategy::PlainTextLayout,
        }
    }
}

impl StrategyTable {
    /// Routes additional extensions to the office engine. `pdf` keeps passthrough.
    pub fn with_office_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for extension in extensions {
            let normalized = normalize_extension(extension.as_ref());
            if normalized.is_empty() || normalized == "pdf" {
                continue;
            }
            self.by_extension
                .insert(normalized, ConversionStrategy::OfficeEngine);
        }
        self
    }

    pub fn select(&self, extension: &str) -> ConversionStrategy {
        self.by_extension
            .get(&normalize_extension(extension))
            .copied()
            .unwrap_or(self.fallback)
    }

    pub fn office_extensions(&self) -> impl Iterator<Item = &str> {
        self.by_extension
            .iter()
            .filter(|(_, strategy)| **strategy == ConversionStrategy::OfficeEngine)
            .map(|(extension, _)| extension.as_str())
    }
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_ascii_lowercase()
}
