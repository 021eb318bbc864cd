//! Decision reply parser.
//!
//! Turns whatever the decision oracle returns into exactly five fields:
//!
//! 1. [`strip_header`] drops code fences and an echoed header line, then picks
//!    the first remaining non-blank line.
//! 2. [`tokenize`] splits that line on `-`.
//! 3. [`merge_overflow`] folds everything from field 4 onward back into the
//!    fifth field, so dashes inside free text never lose data.
//! 4. [`pad_underflow`] fills missing trailing fields with empty strings.
//!
//! Every field is trimmed last. None of these steps can fail.

use crate::decision::prompts::HEADER_MARKER;
use crate::models::decision::DecisionRecord;

pub const FIELD_COUNT: usize = 5;
pub const DELIMITER: char = '-';

/// Parses a raw oracle reply into exactly [`FIELD_COUNT`] trimmed fields.
pub fn parse_decision(reply: &str) -> [String; FIELD_COUNT] {
    let line = strip_header(reply);
    let fields = pad_underflow(merge_overflow(tokenize(line)));
    let mut out: [String; FIELD_COUNT] = Default::default();
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = field.trim().to_string();
    }
    out
}

/// Parses a raw oracle reply straight into a [`DecisionRecord`].
pub fn parse_record(reply: &str) -> DecisionRecord {
    DecisionRecord::from_fields(parse_decision(reply))
}

/// Picks the data line out of a possibly multi-line reply.
///
/// If the first meaningful line echoes the column header it is discarded and
/// the next one is used. Returns `""` when nothing is left.
pub fn strip_header(reply: &str) -> &str {
    let mut lines = reply
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("```"));

    match lines.next() {
        Some(first) if is_header(first) => lines.next().unwrap_or(""),
        Some(first) => first,
        None => "",
    }
}

/// A header echo starts with the marker as its own first field.
fn is_header(line: &str) -> bool {
    line.split(DELIMITER)
        .next()
        .is_some_and(|first| first.trim().to_lowercase() == HEADER_MARKER.to_lowercase())
}

pub fn tokenize(line: &str) -> Vec<String> {
    line.split(DELIMITER).map(String::from).collect()
}

/// Joins fields from index 4 onward with the delimiter into the fifth field.
pub fn merge_overflow(mut fields: Vec<String>) -> Vec<String> {
    if fields.len() > FIELD_COUNT {
        let tail = fields.split_off(FIELD_COUNT - 1);
        fields.push(tail.join(&DELIMITER.to_string()));
    }
    fields
}

/// Pads with empty strings up to [`FIELD_COUNT`].
pub fn pad_underflow(mut fields: Vec<String>) -> Vec<String> {
    if fields.len() < FIELD_COUNT {
        fields.resize(FIELD_COUNT, String::new());
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::prompts::HEADER_LINE;
    use crate::models::decision::Proposal;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_overflow_joins_tail_into_fifth_field() {
        assert_eq!(parse_decision("A-B-C-D-E-F"), ["A", "B", "C", "D", "E-F"]);
    }

    #[test]
    fn test_underflow_pads_with_empty_strings() {
        assert_eq!(parse_decision("A-B"), ["A", "B", "", "", ""]);
    }

    #[test]
    fn test_exact_five_fields_are_trimmed() {
        assert_eq!(
            parse_decision("  Aprobada - Se aprueba - $100.000 - Deuda - Cartola Hogar  "),
            ["Aprobada", "Se aprueba", "$100.000", "Deuda", "Cartola Hogar"]
        );
    }

    #[test]
    fn test_header_line_is_discarded() {
        let reply = format!("{HEADER_LINE}\nRechazada-No cumple PPE-N/A-PPE bajo-N/A");
        assert_eq!(
            parse_decision(&reply),
            ["Rechazada", "No cumple PPE", "N/A", "PPE bajo", "N/A"]
        );
    }

    #[test]
    fn test_marker_phrase_inside_data_line_is_kept() {
        assert_eq!(
            parse_decision("Rechazada-La Propuesta Resolución es rechazar-N/A-PPE bajo-N/A"),
            ["Rechazada", "La Propuesta Resolución es rechazar", "N/A", "PPE bajo", "N/A"]
        );
    }

    #[test]
    fn test_header_match_ignores_case_and_spacing() {
        let reply = "  propuesta resolución - resolución-monto-motivo-documentos\nAprobada-a-b-c-d";
        assert_eq!(parse_decision(reply)[0], "Aprobada");
    }

    #[test]
    fn test_header_only_reply_degrades_to_empty_fields() {
        assert_eq!(parse_decision(HEADER_LINE), ["", "", "", "", ""]);
    }

    #[test]
    fn test_code_fences_and_blank_lines_are_skipped() {
        let reply = format!("```\n\n{HEADER_LINE}\nAprobada-a-b-c-d\n```");
        assert_eq!(parse_decision(&reply)[0], "Aprobada");
    }

    #[test]
    fn test_only_first_data_line_is_parsed() {
        assert_eq!(
            parse_decision("Aprobada-a-b-c-d\nRechazada-x-y-z-w"),
            ["Aprobada", "a", "b", "c", "d"]
        );
    }

    #[test]
    fn test_empty_and_garbage_replies_still_yield_five_fields() {
        for reply in ["", "   ", "\n\n", "sin formato", "----------", "-"] {
            assert_eq!(parse_decision(reply).len(), FIELD_COUNT, "reply {reply:?}");
        }
        assert_eq!(parse_decision("sin formato"), ["sin formato", "", "", "", ""]);
        assert_eq!(parse_decision("------")[4], "--");
    }

    #[test]
    fn test_merge_overflow_leaves_short_input_alone() {
        assert_eq!(merge_overflow(strings(&["a", "b"])), strings(&["a", "b"]));
        assert_eq!(
            merge_overflow(strings(&["a", "b", "c", "d", "e", "f", "g"])),
            strings(&["a", "b", "c", "d", "e-f-g"])
        );
    }

    #[test]
    fn test_pad_underflow_leaves_full_input_alone() {
        let full = strings(&["a", "b", "c", "d", "e"]);
        assert_eq!(pad_underflow(full.clone()), full);
        assert_eq!(pad_underflow(vec![]), strings(&["", "", "", "", ""]));
    }

    #[test]
    fn test_overflow_keeps_dashes_inside_documents() {
        let record = parse_record(
            "Aprobada-Se aprueba-Monto a determinar-Cesantía-Carta; Certificado pre-escolar; Cartola",
        );
        assert_eq!(record.proposal, Proposal::Approved);
        assert_eq!(
            record.documents,
            vec!["Carta", "Certificado pre-escolar", "Cartola"]
        );
    }
}
