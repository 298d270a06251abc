//! Display formatting for table cells.
//!
//! Numbers are kept as `f64` in the engine and only turned into text here,
//! so the rendered figures always agree with the numeric state.

use serde::{Deserialize, Serialize};

/// Placeholder shown in cells that have no meaningful value.
pub const PLACEHOLDER: &str = "--";

/// A single table cell before formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    /// The literal `--`.
    Placeholder,
    /// Left unpopulated.
    Empty,
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

/// How a column's numbers are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSpec {
    /// Render in scientific notation.
    pub scientific: bool,
    /// Fixed number of decimals.
    pub round: Option<usize>,
    /// Insert a comma every three integer digits.
    pub group_thousands: bool,
    /// Style cells as positive or negative.
    pub signed: bool,
}

impl Default for FormatSpec {
    fn default() -> Self {
        Self {
            scientific: false,
            round: None,
            group_thousands: true,
            signed: false,
        }
    }
}

impl FormatSpec {
    /// Fixed decimals, or free-form when `None`.
    pub fn rounded(digits: Option<usize>) -> Self {
        Self {
            round: digits,
            ..Self::default()
        }
    }

    pub fn signed(mut self) -> Self {
        self.signed = true;
        self
    }
}

/// Sign class of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    Negative,
    Positive,
    /// Placeholder or non-numeric text.
    None,
}

impl Sign {
    /// CSS class for the sign, if any.
    pub fn css_class(&self) -> Option<&'static str> {
        match self {
            Sign::Negative => Some("negative"),
            Sign::Positive => Some("positive"),
            Sign::None => None,
        }
    }
}

/// Format a cell for display.
///
/// Numbers go through scientific notation (if flagged), then fixed-decimal
/// rounding (if flagged), then thousands grouping. Everything else passes
/// through unchanged.
pub fn format_for_display(value: &CellValue, spec: &FormatSpec) -> String {
    match value {
        CellValue::Number(n) => format_number(*n, spec),
        CellValue::Text(text) => text.clone(),
        CellValue::Placeholder => PLACEHOLDER.to_string(),
        CellValue::Empty => String::new(),
    }
}

fn format_number(n: f64, spec: &FormatSpec) -> String {
    if !n.is_finite() {
        return n.to_string();
    }
    // -0.0 would print as "-0.00" but classifies positive.
    let n = if n == 0.0 { 0.0 } else { n };

    let text = if spec.scientific {
        // With a rounding flag the mantissa carries the fixed decimals.
        to_exponential(n, spec.round)
    } else {
        match spec.round {
            Some(digits) => format!("{:.*}", digits, n),
            None => n.to_string(),
        }
    };

    if spec.group_thousands {
        group_thousands(&text)
    } else {
        text
    }
}

/// Scientific notation with an explicit exponent sign, e.g. `1.2345e+4`.
pub fn to_exponential(n: f64, digits: Option<usize>) -> String {
    let raw = match digits {
        Some(d) => format!("{:.*e}", d, n),
        None => format!("{:e}", n),
    };

    match raw.split_once('e') {
        Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
        _ => raw,
    }
}

/// Insert commas every three digits of the integer part of a numeric string.
///
/// Text whose integer part is not all digits is returned unchanged.
pub fn group_thousands(text: &str) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };

    let split_at = unsigned
        .find(|c: char| c == '.' || c == 'e' || c == 'E')
        .unwrap_or(unsigned.len());
    let (int_part, rest) = unsigned.split_at(split_at);

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return text.to_string();
    }

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}{}", sign, grouped, rest)
}

/// Parse displayed text back into a number, ignoring comma grouping.
pub fn parse_display(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Classify a cell as negative (`< 0`), positive (`>= 0`) or neither.
pub fn classify_sign(value: &CellValue) -> Sign {
    let number = match value {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(text) => parse_display(text),
        CellValue::Placeholder | CellValue::Empty => None,
    };

    match number {
        Some(n) if n.is_nan() => Sign::None,
        Some(n) if n < 0.0 => Sign::Negative,
        Some(_) => Sign::Positive,
        None => Sign::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn test_rounding_and_grouping() {
        let spec = FormatSpec::rounded(Some(2));
        assert_eq!(format_for_display(&1234567.891.into(), &spec), "1,234,567.89");
        assert_eq!(format_for_display(&(-1234.5).into(), &spec), "-1,234.50");
        assert_eq!(format_for_display(&999.0.into(), &spec), "999.00");
        assert_eq!(format_for_display(&0.0.into(), &FormatSpec::rounded(Some(0))), "0");
    }

    #[test]
    fn test_negative_zero_displays_as_zero() {
        let spec = FormatSpec::rounded(Some(2)).signed();
        let negative_zero = CellValue::Number(-0.0);
        assert_eq!(format_for_display(&negative_zero, &spec), "0.00");
        assert_eq!(classify_sign(&negative_zero), Sign::Positive);

        let scientific = FormatSpec {
            scientific: true,
            ..FormatSpec::default()
        };
        assert_eq!(format_for_display(&negative_zero, &scientific), "0e+0");
    }

    #[test]
    fn test_grouping_without_rounding() {
        let spec = FormatSpec::default();
        assert_eq!(format_for_display(&120000.0.into(), &spec), "120,000");
        assert_eq!(format_for_display(&20.0.into(), &spec), "20");
        assert_eq!(format_for_display(&1234.25.into(), &spec), "1,234.25");
    }

    #[test]
    fn test_scientific() {
        let spec = FormatSpec {
            scientific: true,
            ..FormatSpec::default()
        };
        assert_eq!(format_for_display(&12345.0.into(), &spec), "1.2345e+4");
        assert_eq!(format_for_display(&0.00012.into(), &spec), "1.2e-4");

        let rounded = FormatSpec {
            scientific: true,
            round: Some(2),
            ..FormatSpec::default()
        };
        assert_eq!(format_for_display(&123456.0.into(), &rounded), "1.23e+5");
    }

    #[test]
    fn test_non_numeric_passthrough() {
        let spec = FormatSpec::rounded(Some(2));
        assert_eq!(format_for_display(&CellValue::Placeholder, &spec), "--");
        assert_eq!(format_for_display(&"Springfield".into(), &spec), "Springfield");
        assert_eq!(format_for_display(&CellValue::Empty, &spec), "");
        assert_eq!(group_thousands("abc1234"), "abc1234");
    }

    #[test]
    fn test_format_round_trip() {
        let spec = FormatSpec::rounded(Some(2));
        for value in [0.0, 1.005, -98765.4321, 1234567.0, 0.125] {
            let text = format_for_display(&value.into(), &spec);
            let parsed = parse_display(&text).unwrap();
            assert!(close(parsed, value, 0.005 + 1e-9), "{} -> {}", value, text);
        }

        let scientific = FormatSpec {
            scientific: true,
            round: Some(3),
            ..FormatSpec::default()
        };
        for value in [12345.678, -0.000321, 7.0] {
            let text = format_for_display(&value.into(), &scientific);
            let parsed = parse_display(&text).unwrap();
            assert!(close(parsed, value, value.abs() * 1e-3), "{} -> {}", value, text);
        }
    }

    #[test]
    fn test_classify_sign() {
        assert_eq!(classify_sign(&(-0.5).into()), Sign::Negative);
        assert_eq!(classify_sign(&0.0.into()), Sign::Positive);
        assert_eq!(classify_sign(&12.0.into()), Sign::Positive);
        assert_eq!(classify_sign(&"-1,200.00".into()), Sign::Negative);
        assert_eq!(classify_sign(&CellValue::Placeholder), Sign::None);
        assert_eq!(classify_sign(&"--".into()), Sign::None);
        assert_eq!(classify_sign(&"Total".into()), Sign::None);
    }
}
