use std::collections::{HashMap, HashSet};

use tracing::{info, warn};

use crate::models::applicant::ApplicantKey;
use crate::models::evidence::EvidenceRecord;
use crate::models::roster::{EnrichedRow, Roster};

/// Left-joins evidence onto the roster by applicant key.
///
/// Every roster row appears exactly once, in roster order. Rows with no
/// matching folder get an empty evidence string.
pub fn merge_evidence(roster: Roster, evidence: Vec<EvidenceRecord>) -> Vec<EnrichedRow> {
    let mut by_key: HashMap<ApplicantKey, String> = HashMap::with_capacity(evidence.len());
    for record in evidence {
        let joined = record.joined();
        by_key
            .entry(record.key)
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(&joined);
            })
            .or_insert(joined);
    }

    let roster_keys: HashSet<&ApplicantKey> = roster.rows.iter().map(|r| r.key()).collect();
    let mut orphans: Vec<&ApplicantKey> = by_key.keys().filter(|k| !roster_keys.contains(k)).collect();
    if !orphans.is_empty() {
        orphans.sort();
        warn!(
            "{} document folders have no roster row: {}",
            orphans.len(),
            orphans
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    drop(roster_keys);

    let mut matched = 0usize;
    let enriched: Vec<EnrichedRow> = roster
        .rows
        .into_iter()
        .map(|row| {
            let evidence = match by_key.remove(row.key()) {
                Some(text) => {
                    matched += 1;
                    text
                }
                None => String::new(),
            };
            EnrichedRow { row, evidence }
        })
        .collect();

    info!(
        "Merged evidence: {} of {} roster rows matched a document folder",
        matched,
        enriched.len()
    );
    enriched
}
