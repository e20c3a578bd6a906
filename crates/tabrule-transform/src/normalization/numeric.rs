//! Currency and amount normalization.

use tabrule_model::parse_f64;

/// Currency symbols removed before parsing an amount.
pub const CURRENCY_SYMBOLS: &[char] = &['$', '£', '€', '₹', '¥'];

/// Parse a currency-formatted amount such as `"-$1,234.50"`.
///
/// Currency symbols, thousands separators and inner whitespace are removed
/// and the sign is preserved. Accounting notation `(1,234.50)` is read as a
/// negative amount.
pub fn strip_currency(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    let (body, negated) = match trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    let parsed = parse_f64(&cleaned)?;
    Some(if negated { -parsed } else { parsed })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_symbols_and_separators() {
        assert_eq!(strip_currency("$1,234.50"), Some(1234.5));
        assert_eq!(strip_currency("£ 99"), Some(99.0));
        assert_eq!(strip_currency("₹1,00,000"), Some(100_000.0));
        assert_eq!(strip_currency("12.5"), Some(12.5));
    }

    #[test]
    fn preserves_sign() {
        assert_eq!(strip_currency("-$40.00"), Some(-40.0));
        assert_eq!(strip_currency("€-7"), Some(-7.0));
        assert_eq!(strip_currency("(1,000)"), Some(-1000.0));
    }

    #[test]
    fn rejects_non_amounts() {
        assert_eq!(strip_currency("USD"), None);
        assert_eq!(strip_currency("$"), None);
        assert_eq!(strip_currency(""), None);
    }
}
