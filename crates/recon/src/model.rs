use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Raw tabular input
// ---------------------------------------------------------------------------

/// A raw cell value as delivered by a file reader or the remote service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl RawValue {
    /// Text constructor that maps whitespace-only input to `Empty`.
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(s)
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) | Self::Bool(_) => false,
        }
    }

    /// Display form used for joins, substitution and report cells.
    /// Integral numbers drop the trailing `.0`.
    pub fn display(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Self::Bool(b) => b.to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::text(s)
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Header comparison used everywhere a column is looked up by name.
pub fn header_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// One row as an ordered list of (column, value) pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, RawValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, value: RawValue) {
        self.cells.push((column.into(), value));
    }

    /// Case-insensitive lookup; the first column with that name wins.
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.cells
            .iter()
            .find(|(name, _)| header_eq(name, column))
            .map(|(_, v)| v)
    }

    /// Trimmed display text of a column, empty when the column is absent.
    pub fn text(&self, column: &str) -> String {
        self.get(column)
            .map(|v| v.display().trim().to_string())
            .unwrap_or_default()
    }

    /// Same as [`Row::text`] for an optional column.
    pub fn text_opt(&self, column: Option<&str>) -> String {
        column.map(|c| self.text(c)).unwrap_or_default()
    }

    pub fn at(&self, index: usize) -> Option<&RawValue> {
        self.cells.get(index).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_blank())
    }

    /// Short human description for warnings: the first non-blank values.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = self
            .cells
            .iter()
            .filter(|(_, v)| !v.is_blank())
            .take(3)
            .map(|(_, v)| {
                let text = v.display();
                let text = text.trim();
                if text.chars().count() > 40 {
                    let cut: String = text.chars().take(40).collect();
                    format!("{cut}...")
                } else {
                    text.to_string()
                }
            })
            .collect();
        parts.join(" | ")
    }
}

/// A named table: header row plus data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>) -> Self {
        Self {
            name: name.into(),
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row positionally. Missing trailing values become `Empty`,
    /// values beyond the header are dropped.
    pub fn push_values(&mut self, values: Vec<RawValue>) {
        let mut values = values.into_iter();
        let mut row = Row::new();
        for header in &self.headers {
            row.push(header.clone(), values.next().unwrap_or(RawValue::Empty));
        }
        self.rows.push(row);
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| header_eq(h, column))
    }

    /// First header equal to any alias, trying aliases in order.
    pub fn find_column(&self, aliases: &[&str]) -> Option<&str> {
        aliases.iter().find_map(|alias| {
            self.headers
                .iter()
                .find(|h| header_eq(h, alias))
                .map(String::as_str)
        })
    }

    /// First header containing `needle` (case-insensitive) that does not
    /// contain `exclude` and is not listed in `skip`.
    pub fn find_column_containing(
        &self,
        needle: &str,
        exclude: Option<&str>,
        skip: &[&str],
    ) -> Option<&str> {
        let needle = needle.to_lowercase();
        let exclude = exclude.map(str::to_lowercase);
        self.headers
            .iter()
            .filter(|h| !skip.iter().any(|s| header_eq(h, s)))
            .find(|h| {
                let lower = h.to_lowercase();
                lower.contains(&needle)
                    && exclude.as_ref().map_or(true, |ex| !lower.contains(ex.as_str()))
            })
            .map(String::as_str)
    }

    /// Parse CSV text with a header row.
    pub fn from_csv_str(name: &str, data: &str) -> Result<Self, ReconError> {
        Self::from_csv_str_with_delimiter(name, data, b',')
    }

    pub fn from_csv_str_with_delimiter(
        name: &str,
        data: &str,
        delimiter: u8,
    ) -> Result<Self, ReconError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ReconError::Io(format!("{name}: CSV header error: {e}")))?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut table = Table::new(name, headers);
        for (i, record) in reader.records().enumerate() {
            let record =
                record.map_err(|e| ReconError::Io(format!("{name}: CSV row {}: {e}", i + 1)))?;
            table.push_values(record.iter().map(RawValue::from).collect());
        }
        Ok(table)
    }
}

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

/// One approved / deviation entry from a benchmark sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceItem {
    pub compliance_id: String,
    pub benchmark_name: String,
    pub finding_description: String,
    pub srg_solution: String,
    pub deviation_type: String,
    /// Rationale as written in the sheet, placeholders intact.
    pub rationale_template: String,
    /// Rationale after client substitution.
    pub deviation_rationale: String,
    pub supporting_documents: String,
    pub deviation_status: String,
    pub should_fix: bool,
    pub comments: String,
    pub additional_context: String,
}

/// One finding from the scan / tracking artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplianceScanResult {
    pub compliance_id: String,
    pub benchmark_name: String,
    pub description: String,
    pub status: String,
    pub severity: String,
    pub hostname: String,
    pub poam_id: String,
    pub srg_solution: String,
    pub os_type: String,
    pub needs_review: bool,
}

/// Compact benchmark key: lowercase with spaces and underscores removed.
pub fn benchmark_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Findings grouped by benchmark name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FindingSet {
    groups: BTreeMap<String, Vec<ComplianceScanResult>>,
}

impl FindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: ComplianceScanResult) {
        self.groups
            .entry(finding.benchmark_name.clone())
            .or_default()
            .push(finding);
    }

    /// Findings for a benchmark, matched by compact key so `RHEL 8.X`
    /// and `rhel_8.x` find the same group.
    pub fn for_benchmark(&self, name: &str) -> &[ComplianceScanResult] {
        let key = benchmark_key(name);
        self.groups
            .iter()
            .find(|(k, _)| benchmark_key(k) == key)
            .map(|(_, v)| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn benchmarks(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// A finding paired with the approved item sharing its compliance id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedRecord {
    pub item: ComplianceItem,
    pub finding: ComplianceScanResult,
}

impl MatchedRecord {
    /// Item description, falling back to the finding's.
    pub fn description(&self) -> &str {
        if self.item.finding_description.trim().is_empty() {
            &self.finding.description
        } else {
            &self.item.finding_description
        }
    }

    /// Remediation text from the finding source, falling back to the item's.
    pub fn srg_solution(&self) -> &str {
        if self.finding.srg_solution.trim().is_empty() {
            &self.item.srg_solution
        } else {
            &self.finding.srg_solution
        }
    }
}

/// Result of joining one benchmark's items against its findings.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonResult {
    pub benchmark: String,
    pub matched: Vec<MatchedRecord>,
    pub unmatched_findings: Vec<ComplianceScanResult>,
    pub unmatched_items: Vec<ComplianceItem>,
    /// False when unmatched items were not requested.
    pub unmatched_items_computed: bool,
}
