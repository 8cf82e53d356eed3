// Excel import (xlsx, xlsm, xls, ods) for POAM workbooks

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use scm_recon::model::header_eq;
use scm_recon::{RawValue, Table};

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, String> {
    let workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file '{}': {}", path.display(), e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read one sheet into a table. `header_row` is 1-based; rows above it are
/// ignored. The sheet name is matched case-insensitively.
pub fn read_sheet(path: &Path, sheet: &str, header_row: usize) -> Result<Table, String> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file '{}': {}", path.display(), e))?;

    let names = workbook.sheet_names().to_vec();
    let actual = names
        .iter()
        .find(|n| header_eq(n, sheet))
        .cloned()
        .ok_or_else(|| {
            format!(
                "Sheet '{}' not found in '{}' (available: {})",
                sheet,
                path.display(),
                names.join(", ")
            )
        })?;

    let range = workbook
        .worksheet_range(&actual)
        .map_err(|e| format!("Failed to read sheet '{}': {}", actual, e))?;

    // Ranges start at the first used cell, not at A1
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let header_index = header_row.saturating_sub(1);
    if header_index < start_row as usize {
        return Err(format!(
            "Sheet '{}': header row {} is empty",
            actual, header_row
        ));
    }
    let skip = header_index - start_row as usize;

    let mut rows = range.rows().skip(skip);
    let header_cells = rows
        .next()
        .ok_or_else(|| format!("Sheet '{}': no header row at row {}", actual, header_row))?;

    let headers: Vec<String> = header_cells
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = to_raw(cell).display().trim().to_string();
            if name.is_empty() {
                format!("Column {}", i + start_col as usize + 1)
            } else {
                name
            }
        })
        .collect();

    let mut table = Table::new(actual.clone(), headers);
    for row in rows {
        table.push_values(row.iter().map(to_raw).collect());
    }

    log::debug!(
        "{}: read {} row(s) from sheet '{}'",
        path.display(),
        table.rows.len(),
        actual
    );
    Ok(table)
}

fn to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty => RawValue::Empty,
        Data::String(s) => RawValue::text(s.as_str()),
        Data::Float(n) => RawValue::Number(*n),
        Data::Int(n) => RawValue::Number(*n as f64),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::Error(e) => RawValue::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => RawValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::text(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;

    fn write_poam(path: &Path) {
        let mut wb = Workbook::new();
        let ws = wb.add_worksheet().set_name("Instructions").unwrap();
        ws.write_string(0, 0, "Read me").unwrap();

        let ws = wb.add_worksheet().set_name("Configuration Findings").unwrap();
        ws.write_string(0, 0, "Plan of Action").unwrap();
        for (col, h) in ["POAM ID", "Weakness Name", "Asset Identifier"].iter().enumerate() {
            ws.write_string(1, col as u16, *h).unwrap();
        }
        ws.write_string(2, 0, "V-1").unwrap();
        ws.write_string(2, 1, "RHEL-08-010030 audit").unwrap();
        ws.write_string(2, 2, "web-01").unwrap();
        ws.write_number(3, 0, 42.0).unwrap();
        wb.save(path).unwrap();
    }

    #[test]
    fn reads_sheet_below_title_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poam.xlsx");
        write_poam(&path);

        assert_eq!(
            sheet_names(&path).unwrap(),
            vec!["Instructions", "Configuration Findings"]
        );

        let table = read_sheet(&path, "configuration findings", 2).unwrap();
        assert_eq!(table.name, "Configuration Findings");
        assert_eq!(table.headers, vec!["POAM ID", "Weakness Name", "Asset Identifier"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].text("Weakness Name"), "RHEL-08-010030 audit");
        assert_eq!(table.rows[1].text("POAM ID"), "42");
        assert_eq!(table.rows[1].get("Asset Identifier"), Some(&RawValue::Empty));
    }

    #[test]
    fn unknown_sheet_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("poam.xlsx");
        write_poam(&path);

        let err = read_sheet(&path, "Findings", 1).unwrap_err();
        assert!(err.contains("available: Instructions, Configuration Findings"));
    }
}
