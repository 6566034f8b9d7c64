use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const SUCCESS_STATUS_CODE: u16 = 200;

/// An uploaded object that should be converted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceRef {
    pub bucket: String,
    pub key: String,
}

impl SourceRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

/// Where the generated PDF was written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputRef {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3EventRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Object {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("malformed S3 event: {0}")]
    Malformed(String),
    #[error("S3 event contains no records")]
    NoRecords,
    #[error("record {index} has an empty bucket name")]
    EmptyBucket { index: usize },
    #[error("record {index} has an empty object key")]
    EmptyKey { index: usize },
    #[error("record {index} has an object key that is not valid percent-encoded UTF-8")]
    KeyEncoding { index: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConvertResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl ConvertResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status_code: SUCCESS_STATUS_CODE,
            body: body.into(),
        }
    }
}

pub fn parse_s3_event(payload: serde_json::Value) -> Result<S3Event, ContractError> {
    serde_json::from_value(payload).map_err(|error| ContractError::Malformed(error.to_string()))
}

/// Resolves every record of a notification into a decoded [`SourceRef`].
pub fn source_refs(event: &S3Event) -> Result<Vec<SourceRef>, ContractError> {
    if event.records.is_empty() {
        return Err(ContractError::NoRecords);
    }

    event
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let bucket = record.s3.bucket.name.trim();
            if bucket.is_empty() {
                return Err(ContractError::EmptyBucket { index });
            }
            let key = decode_object_key(&record.s3.object.key)
                .ok_or(ContractError::KeyEncoding { index })?;
            if key.is_empty() {
                return Err(ContractError::EmptyKey { index });
            }
            Ok(SourceRef::new(bucket, key))
        })
        .collect()
}

/// S3 notifications form-encode object keys: `+` is a space, `%XX` an escape.
pub fn decode_object_key(raw: &str) -> Option<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}
