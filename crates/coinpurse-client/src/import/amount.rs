use once_cell::sync::Lazy;
use regex::Regex;

static EUROPEAN_GROUPED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d{1,3}(?:\.\d{3})*,\d{2}$").unwrap());
static LEADING_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)").unwrap());

/// Reads a currency-formatted amount such as `$1,234.56`, `1.234,56 €` or
/// `-42`. `None` when no number can be recovered.
pub fn coerce_amount(raw: &str) -> Option<f64> {
    let kept = raw
        .chars()
        .filter(|character| character.is_ascii_digit() || matches!(character, '.' | '-' | '+' | ','))
        .collect::<String>();
    if kept.is_empty() {
        return None;
    }

    let normalized = if EUROPEAN_GROUPED_PATTERN.is_match(&kept) {
        kept.replace('.', "").replace(',', ".")
    } else {
        // Outside the European form a comma never marks decimals.
        kept.replace(',', "")
    };

    leading_number(&normalized)
}

fn leading_number(value: &str) -> Option<f64> {
    let matched = LEADING_NUMBER_PATTERN.find(value)?;
    let parsed = matched.as_str().parse::<f64>().ok()?;
    parsed.is_finite().then_some(parsed)
}
