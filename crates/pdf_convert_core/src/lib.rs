//! Shared document-conversion domain primitives.
//!
//! This crate owns the trigger contract, output key derivation, strategy
//! selection and the plain-text PDF layout. It intentionally excludes AWS SDK,
//! Lambda runtime and subprocess concerns, which live in `pdf_convert_lambda`.

pub mod contract;
pub mod storage_keys;
pub mod strategy;
pub mod text_layout;
