//! Benchmark extraction strategies and the ordered registry that dispatches
//! rows to them.
//!
//! Each strategy owns one benchmark. For every row the registry asks the
//! strategies in registration order and the first one that recognizes the
//! row extracts it. Rows nobody recognizes are reported, never dropped.

mod postgres;
mod rhel;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use postgres::PostgresStrategy;
pub use rhel::RhelStrategy;
pub(crate) use rhel::RHEL_ID;

use crate::controls::ControlSet;
use crate::layout::{parse_should_fix, ItemLayout};
use crate::model::{benchmark_key, ComplianceItem, ComplianceScanResult, Row, Table};
use crate::placeholder::render;
use crate::poam::PoamLayout;
use crate::warning::{SkipReason, Warning, Warnings};

/// An item extracted from one sheet row, with placeholders that could not be
/// bound for the client.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub item: ComplianceItem,
    pub unresolved: Vec<String>,
}

pub trait BenchmarkStrategy: Send + Sync {
    /// Benchmark name, e.g. `RHEL 8.X`.
    fn name(&self) -> &str;

    /// Short prefix used for report sections.
    fn short_name(&self) -> &str;

    /// Canonical form of an identifier coming from any of this benchmark's
    /// sources. Both sides of a comparison go through it.
    fn normalize_id(&self, raw: &str) -> String {
        raw.trim().to_string()
    }

    /// Whether a (normalized or raw) identifier belongs to this benchmark.
    fn owns_id(&self, id: &str) -> bool;

    /// Approved-item side: does this strategy own the sheet row?
    fn recognizes(&self, row: &Row, layout: &ItemLayout) -> bool {
        let id = layout.compliance_id(row);
        !id.is_empty() && self.owns_id(&id)
    }

    /// Build the compliance item for a recognized row, substituting the
    /// client's control values into the rationale.
    fn extract(&self, row: &Row, layout: &ItemLayout, controls: &ControlSet) -> Extracted {
        let rationale_template = layout.text(row, &layout.deviation_rationale);
        let rendered = render(&rationale_template, controls);

        Extracted {
            item: ComplianceItem {
                compliance_id: self.normalize_id(&layout.compliance_id(row)),
                benchmark_name: self.name().to_string(),
                finding_description: layout.text(row, &layout.finding_description),
                srg_solution: layout.text(row, &layout.srg_solution),
                deviation_type: layout.text(row, &layout.deviation_type),
                rationale_template,
                deviation_rationale: rendered.text,
                supporting_documents: layout.text(row, &layout.supporting_documents),
                deviation_status: layout.text(row, &layout.deviation_status),
                should_fix: parse_should_fix(&layout.text(row, &layout.should_fix)),
                comments: layout.text(row, &layout.comments),
                additional_context: layout.text(row, &layout.additional_context),
            },
            unresolved: rendered.unresolved,
        }
    }

    /// POAM side: does this strategy own the tracking-artifact row?
    fn claims_finding(&self, row: &Row, layout: &PoamLayout) -> bool;

    /// Build the finding for a claimed POAM row.
    fn extract_finding(&self, row: &Row, layout: &PoamLayout) -> Option<ComplianceScanResult>;
}

/// Ordered set of strategies. Registration order is the dispatch tie-break.
#[derive(Clone, Default)]
pub struct BenchmarkRegistry {
    strategies: Vec<Arc<dyn BenchmarkStrategy>>,
}

impl std::fmt::Debug for BenchmarkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl BenchmarkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// RHEL first, then PostgreSQL.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(RhelStrategy::default());
        registry.register(PostgresStrategy::default());
        registry
    }

    pub fn register(&mut self, strategy: impl BenchmarkStrategy + 'static) {
        self.strategies.push(Arc::new(strategy));
    }

    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn strategies(&self) -> impl Iterator<Item = &dyn BenchmarkStrategy> {
        self.strategies.iter().map(|s| s.as_ref() as &dyn BenchmarkStrategy)
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategy by benchmark name, ignoring case, spaces and underscores.
    pub fn get(&self, name: &str) -> Option<&dyn BenchmarkStrategy> {
        let key = benchmark_key(name);
        self.strategies()
            .find(|s| benchmark_key(s.name()) == key)
    }

    /// A registry restricted to the named benchmarks, keeping registration
    /// order. Unknown names are ignored.
    pub fn scoped(&self, names: &[&str]) -> Self {
        let keys: Vec<String> = names.iter().map(|n| benchmark_key(n)).collect();
        Self {
            strategies: self
                .strategies
                .iter()
                .filter(|s| keys.contains(&benchmark_key(s.name())))
                .cloned()
                .collect(),
        }
    }

    pub fn dispatch_item(&self, row: &Row, layout: &ItemLayout) -> Option<&dyn BenchmarkStrategy> {
        self.strategies().find(|s| s.recognizes(row, layout))
    }

    pub fn dispatch_finding(&self, row: &Row, layout: &PoamLayout) -> Option<&dyn BenchmarkStrategy> {
        self.strategies().find(|s| s.claims_finding(row, layout))
    }

    /// The strategy that recognizes the most rows of a sheet, the earlier
    /// registered one on a tie. `None` when no row is recognized.
    pub fn owner_of_sheet(&self, table: &Table, layout: &ItemLayout) -> Option<&dyn BenchmarkStrategy> {
        let mut counts = vec![0usize; self.strategies.len()];
        for row in &table.rows {
            if let Some(i) = self.strategies().position(|s| s.recognizes(row, layout)) {
                counts[i] += 1;
            }
        }

        let mut best: Option<(usize, usize)> = None;
        for (i, n) in counts.into_iter().enumerate() {
            if n > 0 && best.map_or(true, |(_, top)| n > top) {
                best = Some((i, n));
            }
        }
        best.map(|(i, _)| self.strategies[i].as_ref() as &dyn BenchmarkStrategy)
    }

    /// Owner of a flat scan-result identifier.
    pub fn owner_of_id(&self, id: &str) -> Option<&dyn BenchmarkStrategy> {
        self.strategies().find(|s| s.owns_id(id))
    }

    /// Extract every row of a benchmark sheet, grouped by owning benchmark.
    ///
    /// Blank-id rows are skipped, unrecognized rows and unbound placeholders
    /// become warnings.
    pub fn classify_items(
        &self,
        table: &Table,
        layout: &ItemLayout,
        controls: &ControlSet,
        warnings: &mut Warnings,
    ) -> BTreeMap<String, Vec<ComplianceItem>> {
        let mut grouped: BTreeMap<String, Vec<ComplianceItem>> = BTreeMap::new();

        for (i, row) in table.rows.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            if layout.compliance_id(row).is_empty() {
                warnings.push(Warning::SkippedRow {
                    table: table.name.clone(),
                    row: i + 1,
                    reason: SkipReason::BlankComplianceId,
                });
                continue;
            }

            let Some(strategy) = self.dispatch_item(row, layout) else {
                warnings.push(Warning::UnrecognizedRow {
                    table: table.name.clone(),
                    row: i + 1,
                    summary: row.summary(),
                });
                continue;
            };

            let extracted = strategy.extract(row, layout, controls);
            for token in extracted.unresolved {
                warnings.push(Warning::UnresolvedPlaceholder {
                    benchmark: strategy.name().to_string(),
                    compliance_id: extracted.item.compliance_id.clone(),
                    token,
                });
            }
            grouped
                .entry(strategy.name().to_string())
                .or_default()
                .push(extracted.item);
        }

        grouped
    }
}
