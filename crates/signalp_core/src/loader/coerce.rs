//! Total cell coercions: malformed input becomes `None`, never an error.

use crate::model::decimal::Decimal;
use crate::model::stats::DomainCounts;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;

static DICT_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\{\s*(?:(?:'[^']*'|"[^"]*")\s*:\s*\d+\s*(?:,\s*(?:'[^']*'|"[^"]*")\s*:\s*\d+\s*)*,?\s*)?\}$"#)
        .expect("valid dict literal regex")
});
static DICT_ENTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:'([^']*)'|"([^"]*)")\s*:\s*(\d+)"#).expect("valid dict entry regex")
});

/// Parses a base-10 integer cell.
///
/// Surrounding whitespace is ignored and `_` may separate digits; empty,
/// fractional, non-numeric and `i64`-overflowing input yields `None`.
pub fn parse_int_or_null(raw: Option<&str>) -> Option<i64> {
    strip_digit_separators(raw?.trim())?.parse::<i64>().ok()
}

/// Parses an exact decimal cell; non-finite or malformed input yields `None`.
pub fn parse_decimal_or_null(raw: Option<&str>) -> Option<Decimal> {
    Decimal::parse(&strip_digit_separators(raw?.trim())?)
}

/// Removes single `_` separators between digits, as in `1_000`.
///
/// Returns `None` when an underscore is not surrounded by digits.
fn strip_digit_separators(text: &str) -> Option<Cow<'_, str>> {
    if !text.contains('_') {
        return Some(Cow::Borrowed(text));
    }
    let bytes = text.as_bytes();
    for (index, byte) in bytes.iter().enumerate() {
        if *byte != b'_' {
            continue;
        }
        let after_digit = index > 0 && bytes[index - 1].is_ascii_digit();
        let before_digit = bytes.get(index + 1).is_some_and(u8::is_ascii_digit);
        if !(after_digit && before_digit) {
            return None;
        }
    }
    Some(Cow::Owned(text.replace('_', "")))
}

/// Parses a domain → count mapping written as a JSON object or as a
/// single-quoted dict literal such as `{'PAS': 2, 'HisKA': 1}`.
pub fn parse_domain_counts_or_null(raw: Option<&str>) -> Option<DomainCounts> {
    let text = raw?.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(map) = serde_json::from_str::<BTreeMap<String, u64>>(text) {
        return Some(DomainCounts(map));
    }
    if !DICT_LITERAL_RE.is_match(text) {
        return None;
    }

    let mut counts = BTreeMap::new();
    for entry in DICT_ENTRY_RE.captures_iter(text) {
        let name = entry.get(1).or_else(|| entry.get(2))?.as_str();
        let count = entry.get(3)?.as_str().parse::<u64>().ok()?;
        counts.insert(name.to_string(), count);
    }
    Some(DomainCounts(counts))
}

#[cfg(test)]
mod tests {
    use super::{parse_decimal_or_null, parse_domain_counts_or_null, parse_int_or_null};
    use crate::model::decimal::Decimal;

    #[test]
    fn ints_tolerate_whitespace_and_reject_garbage() {
        assert_eq!(parse_int_or_null(Some(" 42 ")), Some(42));
        assert_eq!(parse_int_or_null(Some("-7")), Some(-7));
        assert_eq!(parse_int_or_null(Some("")), None);
        assert_eq!(parse_int_or_null(Some("3.5")), None);
        assert_eq!(parse_int_or_null(Some("n/a")), None);
        assert_eq!(parse_int_or_null(Some("99999999999999999999")), None);
        assert_eq!(parse_int_or_null(None), None);
    }

    #[test]
    fn underscores_between_digits_are_separators() {
        assert_eq!(parse_int_or_null(Some("1_000")), Some(1000));
        assert_eq!(parse_int_or_null(Some("-2_500_000")), Some(-2_500_000));
        assert_eq!(parse_int_or_null(Some("_1")), None);
        assert_eq!(parse_int_or_null(Some("1_")), None);
        assert_eq!(parse_int_or_null(Some("1__0")), None);
        assert_eq!(
            parse_decimal_or_null(Some("0.000_57")),
            Some(Decimal::new(57, 5))
        );
        assert_eq!(
            parse_decimal_or_null(Some("1_2.5e1_0")),
            Some(Decimal::new(125_000_000_000, 0))
        );
        assert_eq!(parse_decimal_or_null(Some("1._5")), None);
    }

    #[test]
    fn huge_exponents_never_panic() {
        assert_eq!(parse_decimal_or_null(Some("0.1e-9223372036854775807")), None);
        assert_eq!(parse_decimal_or_null(Some("1e9223372036854775807")), None);
        assert_eq!(parse_decimal_or_null(Some("1e-99999999999")), None);
    }

    #[test]
    fn decimals_are_exact_or_absent() {
        assert_eq!(
            parse_decimal_or_null(Some("0.00057")),
            Some(Decimal::new(57, 5))
        );
        assert_eq!(
            parse_decimal_or_null(Some("4.88e-07")),
            Some(Decimal::new(488, 9))
        );
        assert_eq!(parse_decimal_or_null(Some("NaN")), None);
        assert_eq!(parse_decimal_or_null(Some("inf")), None);
        assert_eq!(parse_decimal_or_null(Some("abc")), None);
        assert_eq!(parse_decimal_or_null(Some("  ")), None);
    }

    #[test]
    fn domain_counts_accept_json_and_dict_literals() {
        let from_json = parse_domain_counts_or_null(Some(r#"{"PAS": 2, "HisKA": 1}"#))
            .expect("json object");
        assert_eq!(from_json.get("PAS"), Some(2));
        assert_eq!(from_json.get("HisKA"), Some(1));

        let from_literal =
            parse_domain_counts_or_null(Some("{'PAS': 2, 'HisKA': 1}")).expect("dict literal");
        assert_eq!(from_literal, from_json);

        let empty = parse_domain_counts_or_null(Some("{}")).expect("empty dict");
        assert!(empty.is_empty());
    }

    #[test]
    fn domain_counts_reject_other_shapes() {
        assert_eq!(parse_domain_counts_or_null(Some("PAS:2")), None);
        assert_eq!(parse_domain_counts_or_null(Some("[1, 2]")), None);
        assert_eq!(parse_domain_counts_or_null(Some("{'PAS': -1}")), None);
        assert_eq!(parse_domain_counts_or_null(Some("")), None);
        assert_eq!(parse_domain_counts_or_null(None), None);
    }
}
