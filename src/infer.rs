use crate::ast::{LoonValue, Reference};

/// Typed inference of a raw value token. First match wins:
///
/// 1. `[expr]` becomes an [`LoonValue::UnresolvedRef`] carrying the trimmed `expr`.
/// 2. `"text"` or `'text'` becomes the string between the quotes, verbatim.
/// 3. `true` / `false` in any case become booleans.
/// 4. Signed integers and decimals (with an optional exponent) become numbers.
/// 5. Anything else is the token itself as a string.
pub fn infer_value(token: &str) -> LoonValue {
    let token = token.trim();

    if let Some(inner) = strip_wrapping(token, '[', ']') {
        return LoonValue::UnresolvedRef(Reference::new(inner.trim()));
    }
    if let Some(inner) = strip_wrapping(token, '"', '"').or_else(|| strip_wrapping(token, '\'', '\'')) {
        return LoonValue::String(inner.to_string());
    }
    match token.to_lowercase().as_str() {
        "true" => return LoonValue::Boolean(true),
        "false" => return LoonValue::Boolean(false),
        _ => {}
    }
    if let Some(n) = parse_decimal(token) {
        return LoonValue::Number(n);
    }
    LoonValue::String(token.to_string())
}

fn strip_wrapping(token: &str, open: char, close: char) -> Option<&str> {
    if token.len() >= 2 {
        token.strip_prefix(open)?.strip_suffix(close)
    } else {
        None
    }
}

// `f64::from_str` also takes `inf`, `NaN` and friends, which are plain words in LOON.
fn parse_decimal(token: &str) -> Option<f64> {
    let plausible = token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !plausible {
        return None;
    }
    token.parse::<f64>().ok().filter(|n| n.is_finite())
}
