//! Display formatting for the deck.

const FUAS_MARKER: &str = "Postulación FUAS:";
const FUAS_UNSPECIFIED: &str = "No especificado";

/// `150000.0` → `$150,000`. Fractional amounts keep two decimals.
pub fn currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let amount = amount.abs();
    let rounded = (amount * 100.0).round() / 100.0;
    let whole = rounded.trunc() as u64;
    let cents = ((rounded - rounded.trunc()) * 100.0).round() as u64;

    if cents == 0 {
        format!("{sign}${}", group_thousands(whole))
    } else {
        format!("{sign}${}.{cents:02}", group_thousands(whole))
    }
}

pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Two decimals; `N/A` when absent.
pub fn ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => crate::models::applicant::NOT_AVAILABLE.to_string(),
    }
}

/// The FUAS application result the page analysis reports, i.e. the text
/// after `Postulación FUAS:` up to the next `.`.
pub fn fuas_application(evidence: &str) -> String {
    evidence
        .split_once(FUAS_MARKER)
        .map(|(_, rest)| rest.split('.').next().unwrap_or("").trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(FUAS_UNSPECIFIED)
        .to_string()
}

/// Substitutes `fallback` for blank text.
pub fn or_fallback<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.trim().is_empty() {
        fallback
    } else {
        text
    }
}
