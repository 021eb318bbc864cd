use serde::{Deserialize, Serialize};

use crate::models::applicant::ApplicantKey;

/// Literal recorded in place of a page analysis that could not be produced.
pub const ANALYSIS_FAILED: &str = "Analysis failed";

/// Every page analysis gathered for one applicant folder, in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    pub key: ApplicantKey,
    pub analyses: Vec<String>,
}

impl EvidenceRecord {
    pub fn new(key: ApplicantKey) -> Self {
        Self {
            key,
            analyses: Vec::new(),
        }
    }

    /// All analyses joined with a single space.
    pub fn joined(&self) -> String {
        self.analyses.join(" ")
    }

    pub fn failed_pages(&self) -> usize {
        self.analyses
            .iter()
            .filter(|a| a.as_str() == ANALYSIS_FAILED)
            .count()
    }
}
