use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{info, warn};

use crate::artifacts::assemble::{ArtifactError, FinalRow};
use crate::models::decision::DECISION_COLUMNS;
use crate::models::roster::CellValue;
use crate::roster::columns;

pub const SPREADSHEET_FILE: &str = "propuestas_resolucion.xlsx";

/// Longest string Excel accepts in one cell, in characters.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Writes the roster back out with the evidence column and the five
/// decision columns appended. Roster cells keep their original type.
pub fn write_spreadsheet(path: &Path, headers: &[String], rows: &[FinalRow]) -> Result<(), ArtifactError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    let evidence_col = headers.len();
    let mut col: u16 = 0;
    for header in headers
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(columns::EVIDENCE))
        .chain(DECISION_COLUMNS)
    {
        sheet.write_string_with_format(0, col, header, &bold)?;
        col += 1;
    }

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (c, cell) in row.enriched.row.cells.iter().enumerate().take(headers.len()) {
            write_cell(sheet, r, c as u16, cell)?;
        }
        let key = row.enriched.key();
        sheet.write_string(
            r,
            evidence_col as u16,
            cell_text(&row.enriched.evidence, key.as_str(), columns::EVIDENCE),
        )?;
        for (offset, (field, name)) in row.decision.fields().iter().zip(DECISION_COLUMNS).enumerate() {
            sheet.write_string(
                r,
                (evidence_col + 1 + offset) as u16,
                cell_text(field, key.as_str(), name),
            )?;
        }
    }

    workbook.save(path)?;
    info!("Wrote spreadsheet with {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Truncates `text` to [`MAX_CELL_CHARS`] on a char boundary.
fn cell_text<'a>(text: &'a str, key: &str, column: &str) -> &'a str {
    match text.char_indices().nth(MAX_CELL_CHARS) {
        None => text,
        Some((cut, _)) => {
            warn!(
                "Applicant {key}: {column} has {} characters, truncated to {MAX_CELL_CHARS} for the spreadsheet",
                text.chars().count()
            );
            &text[..cut]
        }
    }
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &CellValue) -> Result<(), XlsxError> {
    match cell {
        CellValue::Empty => Ok(()),
        CellValue::Text(s) => sheet.write_string(row, col, s).map(|_| ()),
        CellValue::Number(n) => sheet.write_number(row, col, *n).map(|_| ()),
        CellValue::Bool(b) => sheet.write_boolean(row, col, *b).map(|_| ()),
    }
}

#[cfg(test)]
mod tests {
    use calamine::{open_workbook_auto, Data, Reader};

    use super::*;
    use crate::models::decision::DecisionRecord;
    use crate::models::roster::EnrichedRow;
    use crate::roster::reader::build_roster;
    use crate::roster::reader::tests::{headers, row};

    fn final_rows() -> (Vec<String>, Vec<FinalRow>) {
        let roster = build_roster(
            headers(),
            vec![
                row("Ana", CellValue::Number(11111111.0), 0.8, 150000.0),
                row("Luis", CellValue::Text("22222222".to_string()), 0.3, 0.0),
            ],
        )
        .unwrap();
        let headers = roster.headers.clone();
        let rows = roster
            .rows
            .into_iter()
            .map(|r| {
                let label = if r.applicant.name == "Ana" { "Aprobada" } else { "Rechazada" };
                FinalRow {
                    decision: DecisionRecord::from_fields(
                        [label, "res", "$100.000", "motivo", "Carta; Cartola"].map(String::from),
                    ),
                    enriched: EnrichedRow {
                        evidence: format!("evidencia de {}", r.applicant.name),
                        row: r,
                    },
                }
            })
            .collect();
        (headers, rows)
    }

    #[test]
    fn test_spreadsheet_appends_evidence_and_decision_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SPREADSHEET_FILE);
        let (headers, rows) = final_rows();
        write_spreadsheet(&path, &headers, &rows).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let sheet: Vec<&[Data]> = range.rows().collect();
        assert_eq!(sheet.len(), 3);

        let header_row: Vec<String> = sheet[0].iter().map(|c| c.to_string()).collect();
        assert_eq!(header_row.len(), headers.len() + 6);
        assert_eq!(header_row[..headers.len()], headers[..]);
        assert_eq!(header_row[headers.len()], columns::EVIDENCE);
        assert_eq!(header_row[headers.len() + 1..], DECISION_COLUMNS.map(String::from)[..]);

        assert_eq!(sheet[1][0], Data::String("Ana".to_string()));
        assert_eq!(sheet[1][headers.len()], Data::String("evidencia de Ana".to_string()));
        assert_eq!(sheet[1][headers.len() + 1], Data::String("Aprobada".to_string()));
        assert_eq!(sheet[2][headers.len() + 1], Data::String("Rechazada".to_string()));
        assert_eq!(sheet[2][headers.len() + 5], Data::String("Carta; Cartola".to_string()));
    }

    #[test]
    fn test_oversized_evidence_is_truncated_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SPREADSHEET_FILE);
        let (headers, mut rows) = final_rows();
        rows[0].enriched.evidence = "ñ".repeat(40_000);
        rows[1].decision.resolution = "x".repeat(MAX_CELL_CHARS + 10);
        write_spreadsheet(&path, &headers, &rows).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let sheet: Vec<&[Data]> = range.rows().collect();
        assert_eq!(sheet[1][headers.len()], Data::String("ñ".repeat(MAX_CELL_CHARS)));
        assert_eq!(sheet[2][headers.len() + 2], Data::String("x".repeat(MAX_CELL_CHARS)));
    }

    #[test]
    fn test_cell_text_keeps_short_values_untouched() {
        assert_eq!(cell_text("corto", "1", "RESOLUCIÓN"), "corto");
        let exact = "a".repeat(MAX_CELL_CHARS);
        assert_eq!(cell_text(&exact, "1", "RESOLUCIÓN").len(), MAX_CELL_CHARS);
    }

    #[test]
    fn test_numeric_roster_cells_stay_numeric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SPREADSHEET_FILE);
        let (headers, rows) = final_rows();
        write_spreadsheet(&path, &headers, &rows).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        let sheet: Vec<&[Data]> = range.rows().collect();
        assert_eq!(sheet[1][1], Data::Float(11111111.0));
        assert_eq!(sheet[1][2], Data::Float(0.8));
        assert_eq!(sheet[2][1], Data::String("22222222".to_string()));
    }
}
