//! Smartsheet API client.
//!
//! Blocking reqwest client (no Tokio runtime required). Covers what a
//! reconciliation run reads: workspace search, the sheets of a workspace,
//! and the full rows of one sheet.
//!
//! Read-only. No writes back to Smartsheet.

mod client;
mod wire;

pub use client::{SmartsheetClient, SmartsheetError, DEFAULT_API_BASE};
