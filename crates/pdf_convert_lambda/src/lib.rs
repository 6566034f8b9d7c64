//! AWS-oriented adapters and handlers for S3-triggered PDF conversion.
//!
//! This crate owns runtime integration details (the Lambda handler, the
//! storage and office-engine adapters, configuration and logging). Key
//! derivation, the trigger contract, strategy selection and text layout live
//! in `pdf_convert_core`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
