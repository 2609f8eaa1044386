//! Display and gateway conversions for monetary amounts.
//!
//! Amounts are kept as `f64` major units in storage. The gateway works in
//! integer minor units.

/// Formats an amount for display with two decimals and thousands separators.
/// Missing or non-finite amounts render as `"0"`.
pub fn format_currency(amount: Option<f64>) -> String {
    let Some(amount) = amount.filter(|a| a.is_finite()) else {
        return "0".to_string();
    };

    let minor = to_minor_units(amount);
    let sign = if minor < 0 { "-" } else { "" };
    let minor = minor.unsigned_abs();
    let digits = (minor / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{sign}{grouped}.{:02}", minor % 100)
}

/// Reads back a value produced by [`format_currency`].
pub fn parse_currency(text: &str) -> Option<f64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_minor_units(minor: i64) -> f64 {
    minor as f64 / 100.0
}
