use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::debug;

// ── DateParser ────────────────────────────────────────────────────────────────

/// Best-effort date parsing for the formats found in government exports.
///
/// Day-first forms are tried before anything else ambiguous, since the
/// published sources use Australian conventions. This deliberately differs
/// from month-first inference: `01/02/2023` is 1 February, not 2 January.
pub struct DateParser;

impl DateParser {
    const DATE_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%d",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%Y/%m/%d",
        "%d.%m.%Y",
        "%d %b %Y",
        "%d %B %Y",
        "%d-%b-%Y",
    ];

    const DATETIME_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];

    /// Parse `raw` into a date. Unparseable or blank input yields `None`.
    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }

        // RFC 3339 with offset, e.g. a collection timestamp.
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Some(dt.date_naive());
        }

        for fmt in Self::DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(naive.date());
            }
        }

        for fmt in Self::DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }

        debug!("DateParser: could not parse date string \"{}\"", s);
        None
    }
}

// ── AmountParser ──────────────────────────────────────────────────────────────

/// Currency-amount coercion: strips symbols and separators, keeps the sign.
pub struct AmountParser {
    noise: Regex,
}

impl Default for AmountParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AmountParser {
    pub fn new() -> Self {
        Self {
            noise: Regex::new(r"[\s$£€,]").expect("regex is valid"),
        }
    }

    /// Parse a currency string such as `"$1,000.00"`, `"(250)"` or `"500"`.
    ///
    /// Returns `None` for blank, non-numeric, or non-finite input.
    pub fn parse(&self, raw: &str) -> Option<f64> {
        let mut s = self.noise.replace_all(raw, "").into_owned();
        if s.is_empty() {
            return None;
        }

        let upper = s.to_ascii_uppercase();
        if let Some(rest) = upper.strip_prefix("AUD") {
            s = rest.to_string();
        } else if let Some(rest) = upper.strip_suffix("AUD") {
            s = rest.to_string();
        }

        // Accounting notation: "(250.00)" is a negative amount.
        let negative = s.starts_with('(') && s.ends_with(')');
        if negative {
            s = s[1..s.len() - 1].to_string();
        }

        // Only plain decimal notation; rejects "NaN", "inf" and friends.
        let looks_numeric = s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'));
        if !looks_numeric {
            debug!("AmountParser: could not parse amount \"{}\"", raw);
            return None;
        }

        let value = s.parse::<f64>().ok()?;
        if !value.is_finite() {
            return None;
        }
        Some(if negative { -value } else { value })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── DateParser ───────────────────────────────────────────────────────────

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(DateParser::parse("2023-01-10"), Some(date(2023, 1, 10)));
    }

    #[test]
    fn test_parse_day_first_slash() {
        assert_eq!(DateParser::parse("05/03/2023"), Some(date(2023, 3, 5)));
        assert_eq!(DateParser::parse("01/02/2023"), Some(date(2023, 2, 1)));
    }

    #[test]
    fn test_parse_datetime_drops_time() {
        assert_eq!(
            DateParser::parse("2023-02-01 13:45:00"),
            Some(date(2023, 2, 1))
        );
        assert_eq!(
            DateParser::parse("2023-02-01T13:45:00"),
            Some(date(2023, 2, 1))
        );
    }

    #[test]
    fn test_parse_rfc3339() {
        assert_eq!(
            DateParser::parse("2024-07-01T09:30:00+10:00"),
            Some(date(2024, 7, 1))
        );
    }

    #[test]
    fn test_parse_month_name() {
        assert_eq!(DateParser::parse("7 Jul 2022"), Some(date(2022, 7, 7)));
        assert_eq!(DateParser::parse("14 August 2021"), Some(date(2021, 8, 14)));
    }

    #[test]
    fn test_parse_invalid_date_is_none() {
        assert_eq!(DateParser::parse(""), None);
        assert_eq!(DateParser::parse("   "), None);
        assert_eq!(DateParser::parse("not a date"), None);
        assert_eq!(DateParser::parse("2023-02-30"), None);
    }

    // ── AmountParser ─────────────────────────────────────────────────────────

    #[test]
    fn test_parse_currency_string() {
        let parser = AmountParser::new();
        assert_eq!(parser.parse("$1,000.00"), Some(1000.0));
        assert_eq!(parser.parse("2,000,000"), Some(2_000_000.0));
    }

    #[test]
    fn test_parse_plain_number_unchanged() {
        let parser = AmountParser::new();
        assert_eq!(parser.parse("500"), Some(500.0));
        assert_eq!(parser.parse("1234.5"), Some(1234.5));
    }

    #[test]
    fn test_parse_negative_amounts() {
        let parser = AmountParser::new();
        assert_eq!(parser.parse("-42.10"), Some(-42.1));
        assert_eq!(parser.parse("($250.00)"), Some(-250.0));
    }

    #[test]
    fn test_parse_aud_prefix_and_whitespace() {
        let parser = AmountParser::new();
        assert_eq!(parser.parse(" AUD 1 200.50 "), Some(1200.5));
        assert_eq!(parser.parse("£99"), Some(99.0));
    }

    #[test]
    fn test_parse_garbage_is_none() {
        let parser = AmountParser::new();
        assert_eq!(parser.parse(""), None);
        assert_eq!(parser.parse("$"), None);
        assert_eq!(parser.parse("N/A"), None);
        assert_eq!(parser.parse("NaN"), None);
        assert_eq!(parser.parse("inf"), None);
        assert_eq!(parser.parse("1.2.3"), None);
    }

    #[test]
    fn test_parse_overflow_is_none() {
        let parser = AmountParser::new();
        assert_eq!(parser.parse("1e999"), None);
    }
}
