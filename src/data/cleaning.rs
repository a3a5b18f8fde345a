//! Cleaning Rules Module
//! Pure, row-level normalization rules for the free-text fields of the export.

use super::columns::MISSING_AREA;
use thiserror::Error;

/// Suffix the export appends to capped lot areas.
const AREA_SUFFIX: &str = " m^2 or greater.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Malformed transaction period: {0:?}")]
    Period(String),
    #[error("Malformed area field: {0:?}")]
    Area(String),
    #[error("Not a number: {value:?}")]
    Number { value: String },
    #[error("Missing value")]
    Missing,
}

/// Normalize an area name into the join key shared by transactions and towns.
///
/// The branch order matters and mirrors the upstream formatting quirks:
/// 1. absent or empty input gives `"nan"`;
/// 2. anything from the first `(` onwards is cut and the rest lowercased;
/// 3. a trailing numeric character marks the last whitespace token as a block
///    qualifier, which is dropped before hyphens are stripped;
/// 4. otherwise spaces and hyphens are stripped.
///
/// Digits in the middle of a name are not treated specially.
pub fn normalize_area_name(raw: Option<&str>) -> String {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        return MISSING_AREA.to_string();
    };

    let area = match raw.find('(') {
        Some(idx) => raw[..idx].to_lowercase(),
        None => raw.to_string(),
    };

    match area.chars().last() {
        None => MISSING_AREA.to_string(),
        Some(last) if last.is_numeric() => {
            let tokens: Vec<&str> = area.split_whitespace().collect();
            let kept = &tokens[..tokens.len().saturating_sub(1)];
            kept.concat().replace('-', "").to_lowercase()
        }
        Some(_) => area.replace([' ', '-'], "").to_lowercase(),
    }
}

/// Restructure a period such as `"3rd quarter 2021"` into the sortable token `"2021-3"`.
pub fn normalize_period(text: &str) -> Result<String, ParseError> {
    let malformed = || ParseError::Period(text.to_string());

    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [head @ .., year] = tokens.as_slice() else {
        return Err(malformed());
    };
    if head.is_empty() || year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(malformed());
    }

    let quarter = leading_ordinal(head[0])
        .or_else(|| head.last().and_then(|token| single_digit(token)))
        .filter(|q| (1..=4).contains(q))
        .ok_or_else(malformed)?;

    Ok(format!("{year}-{quarter}"))
}

/// `"3rd"` -> 3, `"1"` -> 1
fn leading_ordinal(token: &str) -> Option<u32> {
    let mut chars = token.chars();
    let digit = chars.next()?.to_digit(10)?;
    chars.all(|c| c.is_alphabetic()).then_some(digit)
}

fn single_digit(token: &str) -> Option<u32> {
    let mut chars = token.chars();
    let digit = chars.next()?.to_digit(10)?;
    chars.next().is_none().then_some(digit)
}

/// Parse a lot-area field such as `"2,300 m^2 or greater."` into whole square metres.
pub fn parse_total_area(text: Option<&str>) -> Result<i64, ParseError> {
    let text = text.ok_or(ParseError::Missing)?;
    text.replace(AREA_SUFFIX, "")
        .replace(',', "")
        .trim()
        .parse::<i64>()
        .map_err(|_| ParseError::Area(text.to_string()))
}

/// Parse a numeric field that may carry thousands separators. `None` stays `None`.
pub fn parse_amount(text: Option<&str>) -> Result<Option<f64>, ParseError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let cleaned = text.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    cleaned
        .parse::<f64>()
        .map(Some)
        .map_err(|_| ParseError::Number {
            value: text.to_string(),
        })
}

/// Parse an integer code field, e.g. the city/town/ward/village code.
pub fn parse_code(text: Option<&str>) -> Result<i64, ParseError> {
    let text = text.ok_or(ParseError::Missing)?;
    text.trim().parse::<i64>().map_err(|_| ParseError::Number {
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_name_examples() {
        assert_eq!(normalize_area_name(Some("Shibuya-ku")), "shibuyaku");
        assert_eq!(normalize_area_name(Some("Nishi-ku 3")), "nishiku");
        assert_eq!(normalize_area_name(Some("")), "nan");
        assert_eq!(normalize_area_name(None), "nan");
        assert_eq!(normalize_area_name(Some("Naka(former)")), "naka");
    }

    #[test]
    fn area_name_parenthesis_then_suffix_rules() {
        assert_eq!(normalize_area_name(Some("Naka (former)")), "naka");
        assert_eq!(normalize_area_name(Some("Ginza 2(east)")), "ginza");
        assert_eq!(normalize_area_name(Some("(annex)")), "nan");
    }

    #[test]
    fn area_name_numeric_suffix_drops_last_token_only() {
        assert_eq!(normalize_area_name(Some("Kita Senju 12")), "kitasenju");
        assert_eq!(normalize_area_name(Some("3")), "");
    }

    #[test]
    fn area_name_mid_string_digits_are_kept() {
        assert_eq!(normalize_area_name(Some("Route 9 West")), "route9west");
    }

    #[test]
    fn area_name_output_is_lowercase_without_spaces_or_hyphens() {
        let inputs = [
            "Shibuya-ku",
            "Nishi Shinjuku",
            "Higashi-Ikebukuro 4",
            "Naka-Meguro (old)",
            "KAMI-OSAKI",
            "Toyosu 5-chome 2",
        ];
        for input in inputs {
            let out = normalize_area_name(Some(input));
            assert_eq!(out, out.to_lowercase(), "{input}");
            assert!(!out.contains(' ') && !out.contains('-'), "{input} -> {out}");
        }
    }

    #[test]
    fn area_name_is_deterministic() {
        let a = normalize_area_name(Some("Higashi-Ikebukuro 4"));
        let b = normalize_area_name(Some("Higashi-Ikebukuro 4"));
        assert_eq!(a, b);
        assert_eq!(a, "higashiikebukuro");
    }

    #[test]
    fn period_ordinal_form() {
        assert_eq!(normalize_period("3rd quarter 2021").unwrap(), "2021-3");
        assert_eq!(normalize_period("1st quarter 2019").unwrap(), "2019-1");
    }

    #[test]
    fn period_digit_before_year() {
        assert_eq!(normalize_period("Quarter 1 2021").unwrap(), "2021-1");
        assert_eq!(normalize_period("1 2021").unwrap(), "2021-1");
    }

    #[test]
    fn period_rejects_malformed_text() {
        for text in ["", "2021", "3rd quarter 21", "quarter 2021", "5th quarter 2021", "3rd quarter 2021x"] {
            assert_eq!(
                normalize_period(text),
                Err(ParseError::Period(text.to_string())),
                "{text:?}"
            );
        }
    }

    #[test]
    fn total_area_examples() {
        assert_eq!(parse_total_area(Some("150 m^2 or greater.")).unwrap(), 150);
        assert_eq!(parse_total_area(Some("2,300 m^2 or greater.")).unwrap(), 2300);
        assert_eq!(parse_total_area(Some("85")).unwrap(), 85);
    }

    #[test]
    fn total_area_rejects_unexpected_suffix() {
        assert_eq!(
            parse_total_area(Some("150 ha or greater.")),
            Err(ParseError::Area("150 ha or greater.".to_string()))
        );
        assert_eq!(parse_total_area(None), Err(ParseError::Missing));
    }

    #[test]
    fn amounts_and_codes() {
        assert_eq!(parse_amount(Some("12,000,000")).unwrap(), Some(12_000_000.0));
        assert_eq!(parse_amount(None).unwrap(), None);
        assert!(parse_amount(Some("n/a")).is_err());
        assert_eq!(parse_code(Some(" 13101 ")).unwrap(), 13101);
        assert_eq!(parse_code(None), Err(ParseError::Missing));
    }
}
