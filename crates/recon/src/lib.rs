//! `scm-recon`: compliance reconciliation engine.
//!
//! Pure engine crate: receives tables already loaded by a file reader or the
//! hosted-sheet client, returns categorized comparison results. No network
//! or spreadsheet-format dependencies.

pub mod categorize;
pub mod compare;
pub mod config;
pub mod controls;
pub mod error;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod placeholder;
pub mod poam;
pub mod scan;
pub mod source;
pub mod strategy;
pub mod summary;
pub mod warning;

pub use categorize::{categorize, Categorized, Disposition};
pub use compare::{compare, CompareOptions};
pub use config::AnalysisConfig;
pub use controls::{ClientControls, ControlSet};
pub use error::ReconError;
pub use model::{
    ComparisonResult, ComplianceItem, ComplianceScanResult, FindingSet, MatchedRecord, RawValue,
    Row, Table,
};
pub use pipeline::{analyze, AnalysisReport, BenchmarkReport, Selection};
pub use source::{SheetRef, SheetSource, WorkspaceRef};
pub use strategy::{BenchmarkRegistry, BenchmarkStrategy};
pub use warning::{Warning, Warnings};
