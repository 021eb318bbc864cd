use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized applicant identifier (the roster's `Folder` column, a RUT).
///
/// Roster cells and evidence folder names are both normalized through
/// [`ApplicantKey::normalize`] so that `12345678`, `12345678.0` and
/// `" 12345678 "` all join to the same applicant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicantKey(String);

impl ApplicantKey {
    /// Returns `None` when the raw value is blank after trimming.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let canonical = match trimmed.strip_suffix(".0") {
            Some(integral) if !integral.is_empty() && integral.chars().all(|c| c.is_ascii_digit()) => {
                integral
            }
            _ => trimmed,
        };
        Some(Self(canonical.to_string()))
    }

    /// Keys read from numeric spreadsheet cells.
    pub fn from_number(value: f64) -> Self {
        if value.fract() == 0.0 && value.abs() < 1e15 {
            Self(format!("{}", value as i64))
        } else {
            Self(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed view of one roster row, checked once at ingestion.
///
/// Mandatory columns are `name`, `key`, `score`, `overdue_debt`,
/// `prior_benefit` and `motive`. Every other field is optional in the
/// roster and defaults to [`NOT_AVAILABLE`] for text and `0` for money.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Applicant {
    pub key: ApplicantKey,
    pub name: String,
    /// PPE. `None` when the cell was blank or not a number.
    pub score: Option<f64>,
    pub overdue_debt: f64,
    pub prior_benefit: String,
    pub motive: String,

    pub campus: String,
    pub program: String,
    pub enrolled_with_courses: String,
    pub entry_term: String,
    pub request_motive: String,
    pub last_benefit_date: String,
    pub submitted_at: String,
    pub tuition_installment: f64,
    pub enrollment_fee: f64,
    pub curricular_progress: String,
    pub pps: String,
    pub socioeconomic_level: String,
    pub retention_plan: f64,
}

/// Placeholder for optional text fields missing from the roster.
pub const NOT_AVAILABLE: &str = "N/A";

impl Applicant {
    /// A minimal applicant with every optional field at its default.
    pub fn new(key: ApplicantKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            score: None,
            overdue_debt: 0.0,
            prior_benefit: NOT_AVAILABLE.to_string(),
            motive: NOT_AVAILABLE.to_string(),
            campus: NOT_AVAILABLE.to_string(),
            program: NOT_AVAILABLE.to_string(),
            enrolled_with_courses: NOT_AVAILABLE.to_string(),
            entry_term: NOT_AVAILABLE.to_string(),
            request_motive: NOT_AVAILABLE.to_string(),
            last_benefit_date: NOT_AVAILABLE.to_string(),
            submitted_at: NOT_AVAILABLE.to_string(),
            tuition_installment: 0.0,
            enrollment_fee: 0.0,
            curricular_progress: NOT_AVAILABLE.to_string(),
            pps: NOT_AVAILABLE.to_string(),
            socioeconomic_level: NOT_AVAILABLE.to_string(),
            retention_plan: 0.0,
        }
    }
}

/// Parses money and ratio cells that arrive as text, e.g. `"$150.000"`,
/// `"1.234.567,50"` or `"0,8"`.
///
/// A lone `.` or `,` followed by exactly three digits is read as a
/// thousands separator unless the integer part is `0`.
pub fn parse_lenient_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let dots = cleaned.matches('.').count();
    let commas = cleaned.matches(',').count();

    let normalized = match (dots, commas) {
        (0, 0) => cleaned,
        (_, 0) => resolve_single_separator(&cleaned, '.'),
        (0, _) => resolve_single_separator(&cleaned, ','),
        _ => {
            // Both present: whichever comes last is the decimal separator.
            let last_dot = cleaned.rfind('.').unwrap_or(0);
            let last_comma = cleaned.rfind(',').unwrap_or(0);
            let (thousands, decimal) = if last_dot > last_comma {
                (',', '.')
            } else {
                ('.', ',')
            };
            cleaned.replace(thousands, "").replace(decimal, ".")
        }
    };

    normalized.parse::<f64>().ok()
}

fn resolve_single_separator(value: &str, separator: char) -> String {
    let occurrences = value.matches(separator).count();
    if occurrences > 1 {
        return value.replace(separator, "");
    }
    let (integer, fraction) = value.split_once(separator).unwrap_or((value, ""));
    let integer_digits = integer.trim_start_matches('-');
    let is_thousands = fraction.len() == 3 && !integer_digits.is_empty() && integer_digits != "0";
    if is_thousands {
        format!("{integer}{fraction}")
    } else {
        format!("{integer}.{fraction}")
    }
}
