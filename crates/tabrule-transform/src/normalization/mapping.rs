//! Code mapping transforms.

use std::collections::BTreeMap;

/// Map `CR`/`DR` codes to `Credit`/`Debit`, ignoring case.
///
/// Returns `None` for any other value; callers pass those through.
pub fn cr_dr(value: &str) -> Option<&'static str> {
    let code = value.trim();
    if code.eq_ignore_ascii_case("CR") {
        Some("Credit")
    } else if code.eq_ignore_ascii_case("DR") {
        Some("Debit")
    } else {
        None
    }
}

/// Keep only ASCII alphanumerics, uppercased. Empty results are `None`.
pub fn account_standardize(value: &str) -> Option<String> {
    let standardized: String = value
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (!standardized.is_empty()).then_some(standardized)
}

/// Exact lookup, falling back to a trimmed key.
pub fn lookup<'a>(mapping: &'a BTreeMap<String, String>, value: &str) -> Option<&'a str> {
    mapping
        .get(value)
        .or_else(|| mapping.get(value.trim()))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cr_dr_is_case_insensitive() {
        assert_eq!(cr_dr("CR"), Some("Credit"));
        assert_eq!(cr_dr(" dr "), Some("Debit"));
        assert_eq!(cr_dr("Unknown"), None);
    }

    #[test]
    fn account_numbers_are_standardized() {
        assert_eq!(account_standardize("ac-12 34/x").as_deref(), Some("AC1234X"));
        assert_eq!(account_standardize("--"), None);
    }

    #[test]
    fn lookup_trims_as_fallback() {
        let mapping = BTreeMap::from([("C".to_string(), "Credit".to_string())]);
        assert_eq!(lookup(&mapping, " C"), Some("Credit"));
        assert_eq!(lookup(&mapping, "X"), None);
    }
}
