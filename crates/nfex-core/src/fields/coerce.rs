//! Value coercion for extracted NFe fields.
//!
//! All coercers are total: a value that cannot be converted yields a
//! type-appropriate default (`Decimal::ZERO` for currency, `None` for
//! dates) instead of an error.

use chrono::{NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

lazy_static! {
    /// Trailing UTC offset as NFe timestamps carry it: `-03:00` (the
    /// Brazilian legal offset) or any `+HH:MM`. Stripped, never converted.
    static ref TRAILING_OFFSET: Regex = Regex::new(r"(?:-03:00|\+\d{2}:\d{2})\s*$").unwrap();
}

/// Datetime formats tried in order; first full match wins.
const DATE_FORMATS: &[(&str, bool)] = &[
    ("%Y-%m-%dT%H:%M:%S", true),
    ("%Y-%m-%d %H:%M:%S", true),
    ("%d/%m/%Y %H:%M:%S", true),
    ("%Y-%m-%d", false),
    ("%d/%m/%Y", false),
    ("%Y%m%d", false),
];

/// Parse a Brazilian-formatted amount (e.g. `"1.234,56"`) into a `Decimal`.
///
/// Periods are thousands separators and are removed; the comma becomes the
/// decimal point. Anything that still fails to parse yields `Decimal::ZERO`
/// — currency coercion never raises to the caller.
pub fn coerce_currency(value: &str) -> Decimal {
    let normalized = value.trim().replace('.', "").replace(',', ".");
    Decimal::from_str(&normalized).unwrap_or(Decimal::ZERO)
}

/// Parse a date or datetime string, trying a fixed ordered format list.
///
/// A trailing UTC offset (`-03:00` or `+HH:MM`) is stripped first — the
/// local wall-clock time is kept as-is, not converted. Date-only formats
/// resolve to midnight. No format matches → `None`, never an error.
pub fn coerce_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        return None;
    }
    let stripped = TRAILING_OFFSET.replace(trimmed, "");
    let stripped = stripped.trim();

    for (fmt, has_time) in DATE_FORMATS {
        if *has_time {
            if let Ok(dt) = NaiveDateTime::parse_from_str(stripped, fmt) {
                return Some(dt);
            }
        } else if let Ok(d) = NaiveDate::parse_from_str(stripped, fmt) {
            return Some(d.and_hms_opt(0, 0, 0).unwrap_or_default());
        }
    }
    None
}

/// Format a Brazilian tax id: 14 digits as CNPJ (`NN.NNN.NNN/NNNN-NN`),
/// 11 digits as CPF (`NNN.NNN.NNN-NN`), anything else as the bare digit
/// string. Check digits are not validated.
pub fn format_document(value: &str) -> String {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        14 => format!(
            "{}.{}.{}/{}-{}",
            &digits[0..2],
            &digits[2..5],
            &digits[5..8],
            &digits[8..12],
            &digits[12..14]
        ),
        11 => format!(
            "{}.{}.{}-{}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..11]
        ),
        _ => digits,
    }
}

/// Trim and collapse internal whitespace runs; the literal `"None"` (any
/// case) normalizes to the empty string.
pub fn clean_text(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("none") {
        return String::new();
    }
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render an amount in Brazilian style (`R$ 1.234,56`).
pub fn format_currency_brl(amount: Decimal) -> String {
    let s = format!("{:.2}", amount);
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let (sign, integer_part) = match integer_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer_part),
    };

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    format!("R$ {sign}{formatted},{decimal_part}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_coerce_currency_brazilian() {
        assert_eq!(coerce_currency("1.234,56"), Decimal::from_str("1234.56").unwrap());
        assert_eq!(coerce_currency("1234,56"), Decimal::from_str("1234.56").unwrap());
        assert_eq!(coerce_currency(" 300,00 "), Decimal::from_str("300.00").unwrap());
        assert_eq!(
            coerce_currency("12.345.678,90"),
            Decimal::from_str("12345678.90").unwrap()
        );
    }

    #[test]
    fn test_coerce_currency_failure_defaults_to_zero() {
        assert_eq!(coerce_currency("abc"), Decimal::ZERO);
        assert_eq!(coerce_currency(""), Decimal::ZERO);
        assert_eq!(coerce_currency("None"), Decimal::ZERO);
    }

    #[test]
    fn test_coerce_currency_known_locale_quirk() {
        // Brazilian-only parsing: a plain English decimal loses its point.
        assert_eq!(coerce_currency("1.5"), Decimal::from(15));
    }

    #[test]
    fn test_coerce_datetime_strips_offset() {
        let dt = coerce_datetime("2024-03-15T10:00:00-03:00").unwrap();
        assert_eq!(dt.to_string(), "2024-03-15 10:00:00");

        let dt = coerce_datetime("2024-03-15T10:00:00+05:30").unwrap();
        assert_eq!(dt.to_string(), "2024-03-15 10:00:00");
    }

    #[test]
    fn test_coerce_datetime_format_ladder() {
        assert!(coerce_datetime("2024-03-15 10:00:00").is_some());
        assert!(coerce_datetime("15/03/2024 10:00:00").is_some());
        let d = coerce_datetime("15/03/2024").unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let d = coerce_datetime("20240315").unwrap();
        assert_eq!(d.date(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(coerce_datetime("2024-03-15").unwrap().time().to_string(), "00:00:00");
    }

    #[test]
    fn test_coerce_datetime_no_match_is_none() {
        assert_eq!(coerce_datetime("ontem"), None);
        assert_eq!(coerce_datetime(""), None);
        assert_eq!(coerce_datetime("None"), None);
    }

    #[test]
    fn test_coerce_datetime_roundtrip() {
        // A value already in canonical form round-trips to the same instant.
        let dt = coerce_datetime("2024-03-15T10:00:00").unwrap();
        let again = coerce_datetime(&dt.format("%Y-%m-%dT%H:%M:%S").to_string()).unwrap();
        assert_eq!(dt, again);
    }

    #[test]
    fn test_format_document_cnpj() {
        assert_eq!(format_document("12345678000195"), "12.345.678/0001-95");
        assert_eq!(format_document("12.345.678/0001-95"), "12.345.678/0001-95");
    }

    #[test]
    fn test_format_document_cpf() {
        assert_eq!(format_document("12345678901"), "123.456.789-01");
    }

    #[test]
    fn test_format_document_other_lengths_unformatted() {
        assert_eq!(format_document("1234"), "1234");
        assert_eq!(format_document("SEM CNPJ 99"), "99");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Acme   Ltda \n ME "), "Acme Ltda ME");
        assert_eq!(clean_text("None"), "");
        assert_eq!(clean_text("NONE"), "");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_format_currency_brl() {
        assert_eq!(
            format_currency_brl(Decimal::from_str("1234.56").unwrap()),
            "R$ 1.234,56"
        );
        assert_eq!(
            format_currency_brl(Decimal::from_str("12345678.90").unwrap()),
            "R$ 12.345.678,90"
        );
        assert_eq!(format_currency_brl(Decimal::ZERO), "R$ 0,00");
    }
}
