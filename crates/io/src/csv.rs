// CSV import for scan exports

use std::io::Read;
use std::path::Path;

use scm_recon::Table;

/// Read a CSV file into a table named after the file. The first record is
/// the header; the delimiter is sniffed.
pub fn read_table(path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Table::from_csv_str_with_delimiter(&name, &content, delimiter).map_err(|e| e.to_string())
}

const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];
const SNIFF_RECORDS: usize = 10;

/// Pick the delimiter under which the header splits into the most columns
/// and the next records keep that width. Quoted fields may span lines.
/// Falls back to comma.
fn sniff_delimiter(content: &str) -> u8 {
    DELIMITERS
        .iter()
        .enumerate()
        .filter_map(|(rank, &delim)| {
            let mut reader = csv::ReaderBuilder::new()
                .delimiter(delim)
                .has_headers(false)
                .flexible(true)
                .from_reader(content.as_bytes());
            let widths: Vec<usize> = reader
                .records()
                .take(SNIFF_RECORDS)
                .map_while(Result::ok)
                .map(|r| r.len())
                .collect();
            let header = *widths.first()?;
            if header < 2 {
                return None;
            }
            let ragged = widths.iter().filter(|&&w| w != header).count();
            Some((delim, (ragged == 0, header, std::cmp::Reverse(rank))))
        })
        .max_by_key(|(_, key)| *key)
        .map_or(b',', |(delim, _)| delim)
}

/// Read file and convert to UTF-8 if needed. Scanner exports saved from
/// Excel are often Windows-1252.
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}
