//! Roster ingestion: reads the first worksheet of the intake workbook and
//! checks every row into a typed [`Applicant`] once, up front.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::applicant::{parse_lenient_number, Applicant, ApplicantKey};
use crate::models::roster::{CellValue, Roster, RosterRow};
use crate::roster::columns;

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("roster has no header row")]
    NoHeader,

    #[error("roster is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("row {row}: identity column '{}' is empty", columns::KEY)]
    MissingKey { row: usize },

    #[error("row {row}: applicant key {key} already appears on row {first_row}")]
    DuplicateKey {
        key: ApplicantKey,
        row: usize,
        first_row: usize,
    },
}

/// Reads and validates the roster at `path`.
pub fn read_roster(path: &Path) -> Result<Roster, RosterError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(RosterError::NoWorksheet)??;

    let mut rows = range.rows().map(|row| row.iter().map(cell_value).collect::<Vec<_>>());
    let headers = rows
        .next()
        .ok_or(RosterError::NoHeader)?
        .iter()
        .map(|c| c.to_string().trim().to_string())
        .collect();

    let roster = build_roster(headers, rows.collect())?;
    info!("Read roster with {} applicants from {}", roster.len(), path.display());
    Ok(roster)
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| CellValue::Text(d.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => {
            warn!("Roster cell holds a spreadsheet error: {e:?}");
            CellValue::Empty
        }
    }
}

/// Validates headers and rows into a [`Roster`]. Data rows that are entirely
/// blank are skipped; `rows[0]` is spreadsheet row 2.
pub fn build_roster(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Roster, RosterError> {
    let index = ColumnIndex::new(&headers);

    let missing: Vec<String> = columns::REQUIRED
        .iter()
        .filter(|c| !index.contains(c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RosterError::MissingColumns(missing));
    }

    let mut first_seen: HashMap<ApplicantKey, usize> = HashMap::new();
    let mut roster_rows = Vec::with_capacity(rows.len());

    for (offset, mut cells) in rows.into_iter().enumerate() {
        let row_number = offset + 2;
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        cells.resize(headers.len(), CellValue::Empty);

        let applicant = index.applicant(&cells, row_number)?;
        if let Some(&first_row) = first_seen.get(&applicant.key) {
            return Err(RosterError::DuplicateKey {
                key: applicant.key,
                row: row_number,
                first_row,
            });
        }
        first_seen.insert(applicant.key.clone(), row_number);

        roster_rows.push(RosterRow {
            row_number,
            cells,
            applicant,
        });
    }

    Ok(Roster {
        headers,
        rows: roster_rows,
    })
}

/// Header name → column position.
struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    fn new(headers: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (i, header) in headers.iter().enumerate() {
            // First occurrence wins on duplicated headers.
            positions.entry(header.trim().to_string()).or_insert(i);
        }
        Self { positions }
    }

    fn contains(&self, column: &str) -> bool {
        self.positions.contains_key(column)
    }

    fn cell<'a>(&self, cells: &'a [CellValue], column: &str) -> Option<&'a CellValue> {
        self.positions.get(column).and_then(|&i| cells.get(i))
    }

    fn text(&self, cells: &[CellValue], column: &str) -> Option<String> {
        self.cell(cells, column)
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string().trim().to_string())
    }

    fn number(&self, cells: &[CellValue], column: &str, row: usize) -> Option<f64> {
        match self.cell(cells, column)? {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) if !s.trim().is_empty() => {
                let parsed = parse_lenient_number(s);
                if parsed.is_none() {
                    warn!("Row {row}: '{column}' value {s:?} is not a number; treating as absent");
                }
                parsed
            }
            _ => None,
        }
    }

    fn applicant(&self, cells: &[CellValue], row: usize) -> Result<Applicant, RosterError> {
        let key = match self.cell(cells, columns::KEY) {
            Some(CellValue::Number(n)) => Some(ApplicantKey::from_number(*n)),
            Some(other) => ApplicantKey::normalize(&other.to_string()),
            None => None,
        }
        .ok_or(RosterError::MissingKey { row })?;

        let name = self.text(cells, columns::NAME).unwrap_or_default();
        let mut applicant = Applicant::new(key, name);

        applicant.score = self.number(cells, columns::SCORE, row);
        applicant.overdue_debt = self
            .number(cells, columns::OVERDUE_DEBT, row)
            .unwrap_or(0.0);
        applicant.tuition_installment = self
            .number(cells, columns::TUITION_INSTALLMENT, row)
            .unwrap_or(0.0);
        applicant.enrollment_fee = self
            .number(cells, columns::ENROLLMENT_FEE, row)
            .unwrap_or(0.0);
        applicant.retention_plan = self
            .number(cells, columns::RETENTION_PLAN, row)
            .unwrap_or(0.0);

        let text_fields: [(&str, &mut String); 12] = [
            (columns::PRIOR_BENEFIT, &mut applicant.prior_benefit),
            (columns::MOTIVE, &mut applicant.motive),
            (columns::CAMPUS, &mut applicant.campus),
            (columns::PROGRAM, &mut applicant.program),
            (columns::ENROLLED_WITH_COURSES, &mut applicant.enrolled_with_courses),
            (columns::ENTRY_TERM, &mut applicant.entry_term),
            (columns::REQUEST_MOTIVE, &mut applicant.request_motive),
            (columns::LAST_BENEFIT_DATE, &mut applicant.last_benefit_date),
            (columns::SUBMITTED_AT, &mut applicant.submitted_at),
            (columns::CURRICULAR_PROGRESS, &mut applicant.curricular_progress),
            (columns::PPS, &mut applicant.pps),
            (columns::SOCIOECONOMIC_LEVEL, &mut applicant.socioeconomic_level),
        ];
        for (column, field) in text_fields {
            if let Some(value) = self.text(cells, column) {
                *field = value;
            }
        }

        Ok(applicant)
    }
}
