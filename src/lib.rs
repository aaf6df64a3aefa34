//! Autobuyer — marketplace purchase-outcome pipeline.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod engine;
pub mod error_codes;
pub mod notify;
pub mod pricing;
pub mod stats;
pub mod store;
pub mod types;
