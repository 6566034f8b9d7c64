use pdf_convert_core::contract::{source_refs, ConvertResponse, OutputRef, S3Event, SourceRef};
use pdf_convert_core::storage_keys::is_output_key;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::adapters::object_store::ObjectStore;
use crate::adapters::office_engine::OfficeEngine;
use crate::error::ConversionError;
use crate::handlers::convert::ConversionDispatcher;

/// What happened to one record of a notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Converted { source: SourceRef, output: OutputRef },
    Skipped { source: SourceRef, reason: String },
}

impl RecordOutcome {
    fn message(&self) -> String {
        match self {
            Self::Converted { source, output } => {
                format!("converted {} to {}", source.key, output.key)
            }
            Self::Skipped { source, reason } => format!("skipped {}: {reason}", source.key),
        }
    }
}

/// Converts every record of an S3 notification, in order, stopping at the first failure.
pub fn handle_s3_event<S, E>(
    event: &S3Event,
    dispatcher: &ConversionDispatcher<S, E>,
) -> Result<ConvertResponse, ConversionError>
where
    S: ObjectStore,
    E: OfficeEngine,
{
    let sources = source_refs(event)?;
    info!(records = sources.len(), "event_received");
    let outcomes = handle_sources(sources, dispatcher)?;
    Ok(summarize(&outcomes))
}

pub fn handle_sources<S, E>(
    sources: Vec<SourceRef>,
    dispatcher: &ConversionDispatcher<S, E>,
) -> Result<Vec<RecordOutcome>, ConversionError>
where
    S: ObjectStore,
    E: OfficeEngine,
{
    let mut outcomes = Vec::with_capacity(sources.len());
    for source in sources {
        outcomes.push(handle_record(source, dispatcher)?);
    }
    Ok(outcomes)
}

fn handle_record<S, E>(
    source: SourceRef,
    dispatcher: &ConversionDispatcher<S, E>,
) -> Result<RecordOutcome, ConversionError>
where
    S: ObjectStore,
    E: OfficeEngine,
{
    // Uploading into the watched bucket would otherwise retrigger this function.
    if dispatcher.output_bucket_for(&source) == source.bucket
        && is_output_key(dispatcher.output_prefix(), &source.key)
    {
        warn!(
            bucket = %source.bucket,
            key = %source.key,
            "record_skipped"
        );
        return Ok(RecordOutcome::Skipped {
            source,
            reason: "object is already in the output namespace".to_string(),
        });
    }

    let output = dispatcher.convert(&source)?;
    Ok(RecordOutcome::Converted { source, output })
}

pub fn summarize(outcomes: &[RecordOutcome]) -> ConvertResponse {
    let body = outcomes
        .iter()
        .map(RecordOutcome::message)
        .collect::<Vec<_>>()
        .join("\n");
    ConvertResponse::ok(body)
}

#[cfg(test)]
mod tests {
    use pdf_convert_core::contract::parse_s3_event;
    use serde_json::json;

    use crate::config::DispatcherConfig;
    use crate::handlers::convert::tests::{MemoryStore, RecordingEngine, ENGINE_PDF};

    use super::*;

    fn event_for(records: &[(&str, &str)]) -> S3Event {
        let records: Vec<_> = records
            .iter()
            .map(|(bucket, key)| {
                json!({
                    "eventSource": "aws:s3",
                    "eventName": "ObjectCreated:Put",
                    "s3": {"bucket": {"name": bucket}, "object": {"key": key}}
                })
            })
            .collect();
        parse_s3_event(json!({ "Records": records })).expect("event should parse")
    }

    #[test]
    fn converts_single_record_and_reports_keys() {
        let store = MemoryStore::with_object("sales", "sheet.xlsx", b"PK");
        let engine = RecordingEngine::default();
        let dispatcher = ConversionDispatcher::new(&store, &engine, &DispatcherConfig::default());

        let response = handle_s3_event(&event_for(&[("sales", "sheet.xlsx")]), &dispatcher)
            .expect("event should convert");

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "converted sheet.xlsx to afterConverted/sheet.pdf");
        assert_eq!(
            store.object("sales", "afterConverted/sheet.pdf").as_deref(),
            Some(ENGINE_PDF)
        );
    }

    #[test]
    fn processes_every_record_in_order() {
        let store = MemoryStore::with_object("sales", "a.txt", b"alpha");
        store.insert("sales", "b.pdf", b"%PDF-1.4 b");
        let engine = RecordingEngine::default();
        let dispatcher = ConversionDispatcher::new(&store, &engine, &DispatcherConfig::default());

        let response = handle_s3_event(
            &event_for(&[("sales", "a.txt"), ("sales", "b.pdf")]),
            &dispatcher,
        )
        .expect("event should convert");

        assert_eq!(
            response.body,
            "converted a.txt to afterConverted/a.pdf\nconverted b.pdf to afterConverted/b.pdf"
        );
        assert_eq!(store.puts().len(), 2);
    }

    #[test]
    fn decodes_url_encoded_keys_before_fetching() {
        let store = MemoryStore::with_object("sales", "q1 report.txt", b"totals");
        let engine = RecordingEngine::default();
        let dispatcher = ConversionDispatcher::new(&store, &engine, &DispatcherConfig::default());

        let response = handle_s3_event(&event_for(&[("sales", "q1+report.txt")]), &dispatcher)
            .expect("event should convert");

        assert_eq!(response.body, "converted q1 report.txt to afterConverted/q1 report.pdf");
    }

    #[test]
    fn skips_objects_already_in_output_namespace() {
        let store = MemoryStore::with_object("sales", "afterConverted/a.pdf", b"%PDF-1.4");
        let engine = RecordingEngine::default();
        let dispatcher = ConversionDispatcher::new(&store, &engine, &DispatcherConfig::default());

        let response =
            handle_s3_event(&event_for(&[("sales", "afterConverted/a.pdf")]), &dispatcher)
                .expect("skipped record is not an error");

        assert_eq!(response.status_code, 200);
        assert!(response.body.starts_with("skipped afterConverted/a.pdf"));
        assert!(store.puts().is_empty());
    }

    #[test]
    fn output_namespace_is_converted_when_writing_elsewhere() {
        let store = MemoryStore::with_object("sales", "afterConverted/a.txt", b"text");
        let engine = RecordingEngine::default();
        let config = DispatcherConfig {
            output_bucket: Some("archive".to_string()),
            ..DispatcherConfig::default()
        };
        let dispatcher = ConversionDispatcher::new(&store, &engine, &config);

        handle_s3_event(&event_for(&[("sales", "afterConverted/a.txt")]), &dispatcher)
            .expect("record should convert");

        assert_eq!(
            store.puts(),
            vec![("archive".to_string(), "afterConverted/a.pdf".to_string())]
        );
    }

    #[test]
    fn first_failure_stops_remaining_records() {
        let store = MemoryStore::with_object("sales", "ok.txt", b"fine");
        store.insert("sales", "bad.txt", &[0xC3, 0x28]);
        store.insert("sales", "later.txt", b"never reached");
        let engine = RecordingEngine::default();
        let dispatcher = ConversionDispatcher::new(&store, &engine, &DispatcherConfig::default());

        let error = handle_s3_event(
            &event_for(&[("sales", "ok.txt"), ("sales", "bad.txt"), ("sales", "later.txt")]),
            &dispatcher,
        )
        .expect_err("decode failure should abort");

        assert!(matches!(error, ConversionError::Decode { ref key, .. } if key == "bad.txt"));
        assert_eq!(
            store.puts(),
            vec![("sales".to_string(), "afterConverted/ok.pdf".to_string())]
        );
    }

    #[test]
    fn empty_notification_is_invalid() {
        let store = MemoryStore::default();
        let engine = RecordingEngine::default();
        let dispatcher = ConversionDispatcher::new(&store, &engine, &DispatcherConfig::default());

        let error = handle_s3_event(&S3Event::default(), &dispatcher)
            .expect_err("empty event should fail");
        assert!(matches!(error, ConversionError::InvalidEvent(_)));
    }

    #[test]
    fn outcomes_serialize_with_status_tag() {
        let outcome = RecordOutcome::Skipped {
            source: SourceRef::new("b", "afterConverted/x.pdf"),
            reason: "object is already in the output namespace".to_string(),
        };
        let value = serde_json::to_value(&outcome).expect("outcome should serialize");
        assert_eq!(value["status"], json!("skipped"));
        assert_eq!(value["source"]["key"], json!("afterConverted/x.pdf"));
    }
}
