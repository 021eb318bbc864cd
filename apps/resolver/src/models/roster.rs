use std::fmt;

use serde::Serialize;

use crate::models::applicant::{Applicant, ApplicantKey};

/// A single roster cell, kept in its original type so the output
/// spreadsheet writes numbers back as numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One roster row: the untouched cells plus the typed view of them.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterRow {
    /// 1-based spreadsheet row number, for error messages.
    pub row_number: usize,
    pub cells: Vec<CellValue>,
    pub applicant: Applicant,
}

impl RosterRow {
    pub fn key(&self) -> &ApplicantKey {
        &self.applicant.key
    }
}

/// The ingested roster, in spreadsheet order.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub headers: Vec<String>,
    pub rows: Vec<RosterRow>,
}

impl Roster {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A roster row with its aggregated document evidence attached.
/// `evidence` is empty, never missing, when no folder matched.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub row: RosterRow,
    pub evidence: String,
}

impl EnrichedRow {
    pub fn key(&self) -> &ApplicantKey {
        self.row.key()
    }

    pub fn applicant(&self) -> &Applicant {
        &self.row.applicant
    }
}
