use std::fmt;

/// Format an amount as US currency with a spaced dollar sign.
/// Example: 1234.5 -> "$ 1,234.50", -20 -> "$ -20.00"
pub fn format_currency(value: f64) -> String {
    let value = finite_or_zero(value);
    let fixed = format!("{:.2}", value.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    // "-0.00" is not a thing on a schedule
    let negative = value < 0.0 && fixed != "0.00";
    let sign = if negative { "-" } else { "" };
    format!("$ {}{}.{}", sign, grouped, dec_part)
}

/// Format a percentage with two decimals and a trailing percent sign.
/// Example: -20.0 -> "-20.00%"
pub fn format_percentage(value: f64) -> String {
    let value = finite_or_zero(value);
    let fixed = format!("{:.2}", value);
    if fixed == "-0.00" {
        return "0.00%".to_string();
    }
    format!("{}%", fixed)
}

/// Parse an amount as written by [`format_currency`] or as a plain decimal.
/// Example: "$ 1,234.56" -> 1234.56, "-20" -> -20.0
pub fn parse_currency(input: &str) -> Result<f64, ParseAmountError> {
    let trimmed = input.trim();
    let without_symbol = trimmed.strip_prefix('$').unwrap_or(trimmed).trim_start();
    let digits: String = without_symbol.chars().filter(|c| *c != ',').collect();

    if digits.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let value: f64 = digits
        .parse()
        .map_err(|_| ParseAmountError::InvalidFormat(input.to_string()))?;
    if !value.is_finite() {
        return Err(ParseAmountError::InvalidFormat(input.to_string()));
    }
    Ok(value)
}

/// Strip commas and line breaks so free text cannot shift delimited columns.
pub fn sanitize_field(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, ',' | '\n' | '\r'))
        .collect()
}

/// Collapse NaN and infinities to zero.
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    InvalidFormat(String),
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "empty amount"),
            ParseAmountError::InvalidFormat(s) => write!(f, "invalid amount format: {}", s),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$ 0.00");
        assert_eq!(format_currency(42.1), "$ 42.10");
        assert_eq!(format_currency(999.999), "$ 1,000.00");
        assert_eq!(format_currency(1234.56), "$ 1,234.56");
        assert_eq!(format_currency(25000.0), "$ 25,000.00");
        assert_eq!(format_currency(1_000_000.99), "$ 1,000,000.99");
        assert_eq!(format_currency(-5000.0), "$ -5,000.00");
        assert_eq!(format_currency(-0.001), "$ 0.00");
    }

    #[test]
    fn test_format_currency_non_finite() {
        assert_eq!(format_currency(f64::NAN), "$ 0.00");
        assert_eq!(format_currency(f64::INFINITY), "$ 0.00");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(-20.0), "-20.00%");
        assert_eq!(format_percentage(12.346), "12.35%");
        assert_eq!(format_percentage(0.0), "0.00%");
        assert_eq!(format_percentage(-0.0001), "0.00%");
        assert_eq!(format_percentage(f64::NAN), "0.00%");
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$ 1,234.56"), Ok(1234.56));
        assert_eq!(parse_currency("$ -5,000.00"), Ok(-5000.0));
        assert_eq!(parse_currency("$1,000"), Ok(1000.0));
        assert_eq!(parse_currency("20000"), Ok(20000.0));
        assert_eq!(parse_currency(" 12.5 "), Ok(12.5));
    }

    #[test]
    fn test_parse_currency_invalid() {
        assert_eq!(parse_currency(""), Err(ParseAmountError::Empty));
        assert_eq!(parse_currency("$ "), Err(ParseAmountError::Empty));
        assert!(parse_currency("abc").is_err());
        assert!(parse_currency("12.34.56").is_err());
        assert!(parse_currency("inf").is_err());
    }

    #[test]
    fn test_currency_roundtrip_to_cents() {
        for value in [0.0, 0.01, 19.99, 1234.5, 25000.0, -874.25, 1_234_567.89] {
            let parsed = parse_currency(&format_currency(value)).unwrap();
            assert!((parsed - value).abs() < 0.005, "{} -> {}", value, parsed);
        }
    }

    #[test]
    fn test_sanitize_field() {
        assert_eq!(sanitize_field("Smith, Jr.\r\nApt 4"), "Smith Jr.Apt 4");
        assert_eq!(sanitize_field("plain"), "plain");
    }
}
