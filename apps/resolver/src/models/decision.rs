use serde::{Deserialize, Serialize};

/// Output column names, in output order.
pub const DECISION_COLUMNS: [&str; 5] = [
    "Propuesta Resolución",
    "RESOLUCIÓN",
    "MONTO DE LA BECA",
    "MOTIVO DEL CASO",
    "DOCUMENTOS",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proposal {
    Approved,
    Rejected,
    Unparseable,
}

impl Proposal {
    /// Classifies the oracle's first field. Accepts the Spanish labels the
    /// prompt asks for and their English equivalents.
    pub fn classify(label: &str) -> Self {
        let lowered = label.trim().to_lowercase();
        if lowered.starts_with("aprobad") || lowered.starts_with("approved") {
            Proposal::Approved
        } else if lowered.starts_with("rechazad") || lowered.starts_with("rejected") {
            Proposal::Rejected
        } else {
            Proposal::Unparseable
        }
    }
}

/// The fixed five-field decision for one applicant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub proposal: Proposal,
    /// Field 0 exactly as the oracle wrote it.
    pub proposal_label: String,
    pub resolution: String,
    pub benefit_amount: String,
    pub case_reason: String,
    pub documents: Vec<String>,
}

impl DecisionRecord {
    pub fn from_fields(fields: [String; 5]) -> Self {
        let [proposal_label, resolution, benefit_amount, case_reason, documents] = fields;
        Self {
            proposal: Proposal::classify(&proposal_label),
            proposal_label,
            resolution,
            benefit_amount,
            case_reason,
            documents: split_documents(&documents),
        }
    }

    /// Placeholder recorded when the oracle could not be reached for a row.
    pub fn failed(reason: &str) -> Self {
        Self {
            proposal: Proposal::Unparseable,
            proposal_label: String::new(),
            resolution: format!("Decision failed: {reason}"),
            benefit_amount: String::new(),
            case_reason: String::new(),
            documents: Vec::new(),
        }
    }

    /// The record as output cells, in [`DECISION_COLUMNS`] order.
    pub fn fields(&self) -> [String; 5] {
        [
            self.proposal_label.clone(),
            self.resolution.clone(),
            self.benefit_amount.clone(),
            self.case_reason.clone(),
            self.documents.join("; "),
        ]
    }
}

fn split_documents(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(String::from)
        .collect()
}
