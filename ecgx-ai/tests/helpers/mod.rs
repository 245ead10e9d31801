//! Test Helper Utilities
//!
//! Shared utilities for testing ecgx-ai

#![allow(dead_code)]

pub mod log_capture;
pub mod wfdb_fixture;

pub use log_capture::{capture_logs, LogCapture};
pub use wfdb_fixture::{synthetic_ecg, write_record, DatasetFixture, MetadataFixture};
