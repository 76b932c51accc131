// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Delimited text (CSV/TSV) parsing with delimiter auto-detection.

use docwerk_core::error::{DocwerkError, Result};

/// Candidate delimiters in tie-break order.
const CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];
/// Lines sampled when guessing the delimiter.
const SAMPLE_LINES: usize = 10;

/// Separator used when rendering a row as text.
pub const CELL_SEPARATOR: &str = " | ";

/// Guess the delimiter from the first few lines, ignoring quoted sections.
///
/// The winner is the candidate that appears most consistently: highest count
/// on the first non-empty line, preferring candidates whose count repeats on
/// the following lines. Falls back to `,`.
pub fn detect_delimiter(bytes: &[u8]) -> u8 {
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(64 * 1024)]);
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SAMPLE_LINES)
        .collect();
    let Some(first) = lines.first() else {
        return b',';
    };

    let mut best = (b',', 0usize, 0usize);
    for &candidate in &CANDIDATES {
        let count = count_unquoted(first, candidate);
        if count == 0 {
            continue;
        }
        let consistent = lines
            .iter()
            .skip(1)
            .filter(|l| count_unquoted(l, candidate) == count)
            .count();
        if (consistent, count) > (best.2, best.1) {
            best = (candidate, count, consistent);
        }
    }
    best.0
}

fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for &b in line.as_bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Parse all rows. Rows may have differing lengths.
pub fn parse_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>> {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(bytes))
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record
            .map_err(|err| DocwerkError::Malformed(format!("failed to read CSV record: {err}")))?;
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }
    Ok(rows)
}

/// Render delimited text with cells joined by ` | `, one row per line.
pub fn render(bytes: &[u8]) -> Result<String> {
    Ok(rows_to_text(&parse_rows(bytes)?))
}

pub fn rows_to_text(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|cell| cell.trim())
                .collect::<Vec<_>>()
                .join(CELL_SEPARATOR)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialise rows as comma-separated CSV.
pub fn rows_to_csv(rows: &[Vec<String>]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row)
            .map_err(|err| DocwerkError::Internal(format!("CSV encoding failed: {err}")))?;
    }
    writer
        .into_inner()
        .map_err(|err| DocwerkError::Internal(format!("CSV flush failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_common_delimiters() {
        assert_eq!(detect_delimiter(b"a,b,c\n1,2,3\n"), b',');
        assert_eq!(detect_delimiter(b"a;b;c\n1;2;3\n"), b';');
        assert_eq!(detect_delimiter(b"a\tb\n1\t2\n"), b'\t');
        assert_eq!(detect_delimiter(b"a|b\n1|2\n"), b'|');
        assert_eq!(detect_delimiter(b"single column\n"), b',');
    }

    #[test]
    fn quoted_delimiters_are_ignored() {
        assert_eq!(detect_delimiter(b"\"x,y,z\";b\n\"1,2,3\";4\n"), b';');
    }

    #[test]
    fn renders_cells_with_pipes() {
        let text = render(b"name;age\nAda; 36\n").unwrap();
        assert_eq!(text, "name | age\nAda | 36");
    }

    #[test]
    fn ragged_rows_are_accepted() {
        let rows = parse_rows(b"a,b,c\n1\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1"]]);
    }

    #[test]
    fn csv_output_quotes_when_needed() {
        let rows = vec![vec!["a,b".to_string(), "c".to_string()]];
        assert_eq!(rows_to_csv(&rows).unwrap(), b"\"a,b\",c\n");
    }
}
