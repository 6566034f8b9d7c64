use thiserror::Error;

pub const DEFAULT_OUTPUT_PREFIX: &str = "afterConverted";
pub const PDF_EXTENSION: &str = "pdf";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("object key '{key}' has no file name")]
    MissingFileName { key: String },
    #[error("object key '{key}' ends in a relative path segment")]
    RelativeSegment { key: String },
}

/// The last path segment of an object key, split the way file names are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectName<'a> {
    pub basename: &'a str,
    pub stem: &'a str,
    pub extension: Option<&'a str>,
}

impl<'a> ObjectName<'a> {
    pub fn parse(key: &'a str) -> Result<Self, KeyError> {
        let basename = key.rsplit('/').next().unwrap_or(key);
        match basename {
            "" => {
                return Err(KeyError::MissingFileName {
                    key: key.to_string(),
                })
            }
            "." | ".." => {
                return Err(KeyError::RelativeSegment {
                    key: key.to_string(),
                })
            }
            _ => {}
        }

        // Leading dots mark hidden files, not an extension.
        let leading_dots = basename.len() - basename.trim_start_matches('.').len();
        let (stem, extension) = match basename[leading_dots..].rfind('.') {
            Some(offset) => {
                let split = leading_dots + offset;
                (&basename[..split], Some(&basename[split + 1..]))
            }
            None => (basename, None),
        };

        Ok(Self {
            basename,
            stem,
            extension,
        })
    }

    /// Lowercased text after the last dot, used to pick a conversion strategy.
    ///
    /// Unlike `extension`, a leading dot counts here, so an object named
    /// `.pdf` is still treated as a PDF. Empty when the name has no dot.
    pub fn normalized_extension(&self) -> String {
        self.basename
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn pdf_file_name(&self) -> String {
        format!("{}.{PDF_EXTENSION}", self.stem)
    }
}

pub fn normalized_prefix(prefix: &str) -> &str {
    prefix.trim_matches('/')
}

pub fn output_object_key(output_prefix: &str, source_key: &str) -> Result<String, KeyError> {
    let name = ObjectName::parse(source_key)?;
    let prefix = normalized_prefix(output_prefix);
    if prefix.is_empty() {
        Ok(name.pdf_file_name())
    } else {
        Ok(format!("{prefix}/{}", name.pdf_file_name()))
    }
}

/// Whether `key` already lives inside the output namespace.
pub fn is_output_key(output_prefix: &str, key: &str) -> bool {
    let prefix = normalized_prefix(output_prefix);
    if prefix.is_empty() {
        return false;
    }
    key.trim_start_matches('/')
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_output_key_from_nested_source() {
        let key = output_object_key(DEFAULT_OUTPUT_PREFIX, "uploads/2026/notes.txt")
            .expect("key should derive");
        assert_eq!(key, "afterConverted/notes.pdf");
    }

    #[test]
    fn output_key_ignores_extension_casing() {
        let key = output_object_key("afterConverted", "Report.DOCX").expect("key should derive");
        assert_eq!(key, "afterConverted/Report.pdf");
    }

    #[test]
    fn output_key_trims_prefix_slashes() {
        let key = output_object_key("/converted/pdf/", "a/b/deck.pptx").expect("key should derive");
        assert_eq!(key, "converted/pdf/deck.pdf");
    }

    #[test]
    fn empty_prefix_places_pdf_at_bucket_root() {
        let key = output_object_key("", "sheet.xlsx").expect("key should derive");
        assert_eq!(key, "sheet.pdf");
    }

    #[test]
    fn strips_only_final_extension() {
        let name = ObjectName::parse("backups/archive.tar.gz").expect("name should parse");
        assert_eq!(name.stem, "archive.tar");
        assert_eq!(name.normalized_extension(), "gz");
    }

    #[test]
    fn hidden_file_has_no_extension() {
        let name = ObjectName::parse("config/.env").expect("name should parse");
        assert_eq!(name.stem, ".env");
        assert_eq!(name.extension, None);
        assert_eq!(name.normalized_extension(), "env");
    }

    #[test]
    fn dot_named_documents_keep_their_format() {
        let name = ObjectName::parse("scans/.PDF").expect("name should parse");
        assert_eq!(name.normalized_extension(), "pdf");
        assert_eq!(name.pdf_file_name(), ".PDF.pdf");

        let name = ObjectName::parse(".docx").expect("name should parse");
        assert_eq!(name.normalized_extension(), "docx");
        assert_eq!(
            output_object_key(DEFAULT_OUTPUT_PREFIX, ".docx").expect("key should derive"),
            "afterConverted/.docx.pdf"
        );
    }

    #[test]
    fn key_without_extension_keeps_whole_basename() {
        let name = ObjectName::parse("docs/README").expect("name should parse");
        assert_eq!(name.basename, "README");
        assert_eq!(name.normalized_extension(), "");
        assert_eq!(name.pdf_file_name(), "README.pdf");
    }

    #[test]
    fn rejects_directory_like_keys() {
        assert_eq!(
            ObjectName::parse("uploads/"),
            Err(KeyError::MissingFileName {
                key: "uploads/".to_string()
            })
        );
        assert!(matches!(
            ObjectName::parse("uploads/.."),
            Err(KeyError::RelativeSegment { .. })
        ));
    }

    #[test]
    fn detects_keys_inside_output_namespace() {
        assert!(is_output_key("afterConverted", "afterConverted/notes.pdf"));
        assert!(is_output_key("afterConverted/", "/afterConverted/x/y.pdf"));
        assert!(!is_output_key("afterConverted", "afterConvertedX/notes.pdf"));
        assert!(!is_output_key("afterConverted", "uploads/afterConverted/notes.pdf"));
        assert!(!is_output_key("", "notes.pdf"));
    }
}
