use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::ReconError;
use crate::model::{header_eq, Table};

/// Normalize a column name or placeholder token into a lookup key:
/// lowercase with whitespace, `_` and `-` removed.
pub fn placeholder_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// One placeholder binding for one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlValue {
    /// Column name as written in the controls table.
    pub placeholder: String,
    pub value: String,
}

/// Substitution values for a single client, keyed by normalized placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlSet {
    values: BTreeMap<String, ControlValue>,
}

impl ControlSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, placeholder: &str, value: impl Into<String>) {
        self.values.insert(
            placeholder_key(placeholder),
            ControlValue {
                placeholder: placeholder.trim().to_string(),
                value: value.into(),
            },
        );
    }

    /// Look up a token in any spelling of its placeholder name.
    pub fn get(&self, token: &str) -> Option<&str> {
        self.values
            .get(&placeholder_key(token))
            .map(|cv| cv.value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ControlValue> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for ControlSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut set = ControlSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Per-client substitution values from the Compensating Controls table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientControls {
    clients: BTreeMap<String, ControlSet>,
    skipped_rows: usize,
}

impl ClientControls {
    /// Build the client mapping from a controls table.
    ///
    /// Rows with a blank client are skipped. When a client appears more than
    /// once, later non-empty cells overwrite earlier ones; empty cells never
    /// create or clear a binding.
    pub fn extract(table: &Table, client_column: &str) -> Result<Self, ReconError> {
        let client_header = table
            .headers
            .iter()
            .find(|h| header_eq(h, client_column))
            .ok_or_else(|| ReconError::schema(&table.name, client_column))?;

        let mut controls = ClientControls::default();
        for (i, row) in table.rows.iter().enumerate() {
            let client = row.text(client_header);
            if client.is_empty() {
                log::debug!("{}: row {} has no client, skipped", table.name, i + 1);
                controls.skipped_rows += 1;
                continue;
            }

            let set = controls.clients.entry(client).or_default();
            for (column, value) in row.iter() {
                if header_eq(column, client_header) || value.is_blank() {
                    continue;
                }
                set.insert(column, value.display().trim());
            }
        }

        log::info!(
            "{}: extracted controls for {} client(s)",
            table.name,
            controls.clients.len()
        );
        Ok(controls)
    }

    /// Exact client match first, then a case-insensitive one.
    pub fn get(&self, client: &str) -> Option<&ControlSet> {
        let client = client.trim();
        self.clients.get(client).or_else(|| {
            self.clients
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(client))
                .map(|(_, set)| set)
        })
    }

    /// Client names, sorted.
    pub fn clients(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }
}
