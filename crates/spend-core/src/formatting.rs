//! Display helpers for money, counts and shares.

/// Fixed-precision number with comma thousands separators.
///
/// ```
/// use spend_core::formatting::format_number;
///
/// assert_eq!(format_number(2_001_500.0, 2), "2,001,500.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: u32) -> String {
    let fixed = format!("{:.*}", decimals as usize, value.abs());
    let (digits, fraction) = match fixed.split_once('.') {
        Some((digits, fraction)) => (digits, Some(fraction)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    // "-0.00" reads as noise in a report.
    if value < 0.0 && fixed.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        out.push('-');
    }
    out.push_str(&group_thousands(digits));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Dollar amount with cents, sign after the symbol: `$1,234.56`, `$-9.99`.
pub fn format_currency(amount: f64) -> String {
    format!("${}", format_number(amount, 2))
}

/// `part` as a percentage of `whole`, rounded; `0.0` for an empty whole.
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    checked_percentage(part, whole, decimal_places).unwrap_or(0.0)
}

/// `part` as a percentage of `whole`, or `None` when the share is undefined.
pub fn checked_percentage(part: f64, whole: f64, decimal_places: u32) -> Option<f64> {
    if whole == 0.0 || !whole.is_finite() {
        return None;
    }
    Some(round_to(part / whole * 100.0, decimal_places))
}

pub fn round_to(value: f64, decimal_places: u32) -> f64 {
    let scale = 10_f64.powi(decimal_places as i32);
    (value * scale).round() / scale
}

/// Record count with separators, e.g. `12,345`.
pub fn format_count(count: usize) -> String {
    group_thousands(&count.to_string())
}

/// Short axis label: `$1.2M`, `$350K`, `$90`.
pub fn format_compact_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    match amount.abs() {
        m if m >= 1e6 => format!("{sign}${:.1}M", m / 1e6),
        k if k >= 1e3 => format!("{sign}${:.0}K", k / 1e3),
        n => format!("{sign}${n:.0}"),
    }
}

fn group_thousands(digits: &str) -> String {
    let lead = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && i % 3 == lead {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
