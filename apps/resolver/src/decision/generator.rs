//! Decision Generator: one oracle call per enriched roster row.
//!
//! Flow per row: build_prompt → oracle.decide → parse_record.
//!
//! Results are returned keyed by applicant, so callers never depend on the
//! order in which calls complete. With `concurrency > 1` calls overlap, gated
//! by a semaphore; with `concurrency == 1` they run strictly in roster order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::FailurePolicy;
use crate::decision::checkpoint::Checkpoint;
use crate::decision::parser::parse_record;
use crate::decision::prompts::{DECISION_PROMPT_TEMPLATE, HEADER_LINE, SCORE_THRESHOLD};
use crate::llm_client::{DecisionOracle, LlmError};
use crate::models::applicant::{ApplicantKey, NOT_AVAILABLE};
use crate::models::decision::{DecisionRecord, Proposal};
use crate::models::roster::EnrichedRow;

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("decision oracle failed on row {row} (applicant {key}): {source}")]
    Oracle {
        row: usize,
        key: ApplicantKey,
        #[source]
        source: LlmError,
    },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] std::io::Error),

    #[error("decision task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub policy: FailurePolicy,
    pub concurrency: usize,
    pub checkpoint: Option<Checkpoint>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::FailFast,
            concurrency: 1,
            checkpoint: None,
        }
    }
}

pub type Decisions = HashMap<ApplicantKey, DecisionRecord>;

/// Builds the decision prompt for one row.
pub fn build_prompt(row: &EnrichedRow) -> String {
    let applicant = row.applicant();
    let score = applicant
        .score
        .map(format_plain)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let evidence = if row.evidence.trim().is_empty() {
        "Sin documentos analizados"
    } else {
        row.evidence.as_str()
    };

    let threshold = format_plain(SCORE_THRESHOLD);
    let overdue_debt = format_plain(applicant.overdue_debt);
    fill_template(
        DECISION_PROMPT_TEMPLATE,
        &[
            ("threshold", threshold.as_str()),
            ("header", HEADER_LINE),
            ("score", score.as_str()),
            ("name", applicant.name.as_str()),
            ("key", applicant.key.as_str()),
            ("campus", applicant.campus.as_str()),
            ("program", applicant.program.as_str()),
            ("enrolled_with_courses", applicant.enrolled_with_courses.as_str()),
            ("entry_term", applicant.entry_term.as_str()),
            ("request_motive", applicant.request_motive.as_str()),
            ("prior_benefit", applicant.prior_benefit.as_str()),
            ("last_benefit_date", applicant.last_benefit_date.as_str()),
            ("overdue_debt", overdue_debt.as_str()),
            ("motive", applicant.motive.as_str()),
            ("evidence", evidence),
        ],
    )
}

/// Replaces `{name}` slots in one left-to-right pass. Inserted values are
/// never rescanned; unknown slots are left as written.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let slot = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (close, *value))
        });
        match slot {
            Some((close, value)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Integral values print without a fractional part.
fn format_plain(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Calls the oracle once for `prompt` and parses its reply.
pub async fn decide(oracle: &dyn DecisionOracle, prompt: &str) -> Result<DecisionRecord, LlmError> {
    let reply = oracle.decide(prompt).await?;
    let record = parse_record(&reply);
    if record.proposal == Proposal::Unparseable {
        warn!("Decision reply has no recognizable proposal: {:?}", reply);
    }
    Ok(record)
}

/// Produces a decision for every row. Rows already present in the
/// checkpoint are not sent to the oracle again.
///
/// Under [`FailurePolicy::FailFast`] the first oracle failure aborts the
/// batch and names the row; under [`FailurePolicy::BestEffort`] the row gets
/// [`DecisionRecord::failed`] and the batch continues. Only oracle replies
/// are checkpointed.
pub async fn generate_decisions(
    rows: &[EnrichedRow],
    oracle: Arc<dyn DecisionOracle>,
    options: &GenerationOptions,
) -> Result<Decisions, DecisionError> {
    let mut decisions = match &options.checkpoint {
        Some(checkpoint) => checkpoint.load().await?,
        None => HashMap::new(),
    };
    let roster_keys: HashSet<&ApplicantKey> = rows.iter().map(|r| r.key()).collect();
    decisions.retain(|key, _| roster_keys.contains(key));

    let pending: Vec<&EnrichedRow> = rows
        .iter()
        .filter(|r| !decisions.contains_key(r.key()))
        .collect();
    info!(
        "Generating decisions for {} rows ({} restored from checkpoint)",
        pending.len(),
        rows.len() - pending.len()
    );

    if options.concurrency <= 1 {
        for row in pending {
            let outcome = decide(oracle.as_ref(), &build_prompt(row)).await;
            record_outcome(&mut decisions, row, outcome, options).await?;
        }
    } else {
        let semaphore = Arc::new(Semaphore::new(options.concurrency));
        let mut tasks = JoinSet::new();

        for (index, row) in pending.iter().enumerate() {
            let prompt = build_prompt(row);
            let oracle = Arc::clone(&oracle);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (index, decide(oracle.as_ref(), &prompt).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.map_err(|e| DecisionError::Task(e.to_string()))?;
            let row = pending[index];
            // Dropping `tasks` on error aborts the calls still in flight.
            record_outcome(&mut decisions, row, outcome, options).await?;
        }
    }

    Ok(decisions)
}

async fn record_outcome(
    decisions: &mut Decisions,
    row: &EnrichedRow,
    outcome: Result<DecisionRecord, LlmError>,
    options: &GenerationOptions,
) -> Result<(), DecisionError> {
    let record = match outcome {
        Ok(record) => {
            if let Some(checkpoint) = &options.checkpoint {
                checkpoint.append(row.key(), &record).await?;
            }
            record
        }
        // Placeholders stay out of the checkpoint so a resumed run retries them.
        Err(source) => match options.policy {
            FailurePolicy::FailFast => {
                return Err(DecisionError::Oracle {
                    row: row.row.row_number,
                    key: row.key().clone(),
                    source,
                });
            }
            FailurePolicy::BestEffort => {
                warn!(
                    "Decision for row {} (applicant {}) failed, recording placeholder: {source}",
                    row.row.row_number,
                    row.key()
                );
                DecisionRecord::failed(&source.to_string())
            }
        },
    };
    decisions.insert(row.key().clone(), record);
    Ok(())
}
