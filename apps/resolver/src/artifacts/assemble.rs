use thiserror::Error;

use crate::decision::Decisions;
use crate::models::applicant::ApplicantKey;
use crate::models::decision::DecisionRecord;
use crate::models::roster::EnrichedRow;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("no decision recorded for row {row} (applicant {key})")]
    MissingDecision { row: usize, key: ApplicantKey },

    #[error("spreadsheet write failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("deck write failed: {0}")]
    Deck(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An enriched roster row together with its decision.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalRow {
    pub enriched: EnrichedRow,
    pub decision: DecisionRecord,
}

/// Attaches each row's decision by key. Output order is roster order.
pub fn assemble(rows: Vec<EnrichedRow>, mut decisions: Decisions) -> Result<Vec<FinalRow>, ArtifactError> {
    rows.into_iter()
        .map(|enriched| {
            let decision = decisions
                .remove(enriched.key())
                .ok_or_else(|| ArtifactError::MissingDecision {
                    row: enriched.row.row_number,
                    key: enriched.key().clone(),
                })?;
            Ok(FinalRow { enriched, decision })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::decision::generator::tests::enriched;

    fn decision_for(key: &str) -> DecisionRecord {
        DecisionRecord::from_fields(["Aprobada", key, "N/A", "motivo", "doc"].map(String::from))
    }

    #[test]
    fn test_rows_keep_roster_order_and_own_decision() {
        let rows: Vec<EnrichedRow> = ["30", "10", "20"]
            .iter()
            .map(|k| enriched(k, Some(0.8), 1.0, &format!("evidencia {k}")))
            .collect();
        // Map iteration order is unrelated to roster order.
        let decisions: HashMap<_, _> = ["20", "30", "10"]
            .iter()
            .map(|k| (ApplicantKey::normalize(k).unwrap(), decision_for(k)))
            .collect();

        let out = assemble(rows, decisions).unwrap();
        assert_eq!(out.len(), 3);
        let keys: Vec<&str> = out.iter().map(|r| r.enriched.key().as_str()).collect();
        assert_eq!(keys, vec!["30", "10", "20"]);
        for row in &out {
            let key = row.enriched.key().as_str();
            assert_eq!(row.decision.resolution, key);
            assert_eq!(row.enriched.evidence, format!("evidencia {key}"));
        }
    }

    #[test]
    fn test_missing_decision_is_an_error() {
        let rows = vec![enriched("1", Some(0.8), 1.0, "")];
        let err = assemble(rows, HashMap::new()).unwrap_err();
        assert!(matches!(err, ArtifactError::MissingDecision { .. }));
        assert!(err.to_string().contains("applicant 1"));
    }
}
