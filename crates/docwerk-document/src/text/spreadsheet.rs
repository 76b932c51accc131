// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Workbooks (XLSX, XLS, ODS) read through calamine.

use std::fmt::Display;
use std::io::{Cursor, Read, Seek};

use calamine::{Data, Ods, Reader, Xls, Xlsx};
use docwerk_core::SupportedFormat;
use docwerk_core::error::{DocwerkError, Result};
use tracing::{debug, warn};

use super::delimited::rows_to_text;

/// One worksheet as rows of rendered cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Read every worksheet of the workbook.
pub fn read_sheets(bytes: &[u8], format: SupportedFormat) -> Result<Vec<Sheet>> {
    let cursor = Cursor::new(bytes);
    match format {
        SupportedFormat::Xlsx => {
            let workbook = Xlsx::new(cursor).map_err(|e| malformed("XLSX", e))?;
            collect_sheets(workbook)
        }
        SupportedFormat::Xls => {
            let workbook = Xls::new(cursor).map_err(|e| malformed("XLS", e))?;
            collect_sheets(workbook)
        }
        SupportedFormat::Ods => {
            let workbook = Ods::new(cursor).map_err(|e| malformed("ODS", e))?;
            collect_sheets(workbook)
        }
        other => Err(DocwerkError::UnsupportedFormat(format!(
            "{other} is not a workbook format"
        ))),
    }
}

/// Number of worksheets, without reading cell data.
pub fn sheet_count(bytes: &[u8], format: SupportedFormat) -> Result<usize> {
    let cursor = Cursor::new(bytes);
    let count = match format {
        SupportedFormat::Xlsx => Xlsx::new(cursor).map_err(|e| malformed("XLSX", e))?.sheet_names().len(),
        SupportedFormat::Xls => Xls::new(cursor).map_err(|e| malformed("XLS", e))?.sheet_names().len(),
        SupportedFormat::Ods => Ods::new(cursor).map_err(|e| malformed("ODS", e))?.sheet_names().len(),
        other => {
            return Err(DocwerkError::UnsupportedFormat(format!(
                "{other} is not a workbook format"
            )));
        }
    };
    Ok(count)
}

/// All sheets rendered as text: a `Sheet: <name>` header followed by rows
/// with cells joined by ` | `. Sheets are separated by a blank line.
pub fn workbook_text(bytes: &[u8], format: SupportedFormat) -> Result<String> {
    let sheets = read_sheets(bytes, format)?;
    Ok(sheets
        .iter()
        .map(|sheet| {
            let body = rows_to_text(&sheet.rows);
            if body.is_empty() {
                format!("Sheet: {}", sheet.name)
            } else {
                format!("Sheet: {}\n{}", sheet.name, body)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n"))
}

fn collect_sheets<RS, R>(mut workbook: R) -> Result<Vec<Sheet>>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: Display,
{
    let names = workbook.sheet_names();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        match workbook.worksheet_range(&name) {
            Ok(range) => {
                let rows = range
                    .rows()
                    .map(|row| row.iter().map(cell_to_string).collect())
                    .collect();
                sheets.push(Sheet { name, rows });
            }
            Err(err) => warn!(sheet = %name, %err, "skipping unreadable worksheet"),
        }
    }
    debug!(sheets = sheets.len(), "workbook read");
    Ok(sheets)
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERR:{e:?}"),
    }
}

fn malformed(kind: &str, err: impl Display) -> DocwerkError {
    DocwerkError::Malformed(format!("failed to open {kind} workbook: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_floats_render_without_fraction() {
        assert_eq!(cell_to_string(&Data::Float(3.0)), "3");
        assert_eq!(cell_to_string(&Data::Float(2.5)), "2.5");
        assert_eq!(cell_to_string(&Data::Bool(true)), "true");
        assert_eq!(cell_to_string(&Data::Empty), "");
    }

    #[test]
    fn garbage_workbook_is_malformed() {
        let err = read_sheets(b"not a workbook", SupportedFormat::Xlsx).unwrap_err();
        assert!(matches!(err, DocwerkError::Malformed(_)));
    }

    #[test]
    fn non_workbook_format_is_unsupported() {
        let err = sheet_count(b"a,b", SupportedFormat::Csv).unwrap_err();
        assert!(matches!(err, DocwerkError::UnsupportedFormat(_)));
    }
}
