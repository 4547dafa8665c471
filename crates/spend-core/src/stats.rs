// ── Percentile helper ─────────────────────────────────────────────────────────

/// Compute the `p`-th percentile of a **sorted** slice using standard linear
/// interpolation (the same algorithm used by NumPy's `percentile` function).
///
/// Returns `None` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> Option<f64> {
    let len = sorted_data.len();
    if len == 0 {
        return None;
    }
    if len == 1 {
        return Some(sorted_data[0]);
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return Some(sorted_data[lo]);
    }
    let frac = rank - lo as f64;
    Some(sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo]))
}

/// Sort a copy of `values` ascending. Values must be finite.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

// ── Descriptive statistics ────────────────────────────────────────────────────

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(&sorted(values), 50.0)
}

/// Sample standard deviation (n − 1 denominator).
///
/// Undefined for fewer than two values.
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let n = values.len() as f64;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Quartile fences for the classic interquartile-range outlier rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// `Q1 − 1.5·IQR` / `Q3 + 1.5·IQR` over `values`; `None` when empty.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let data = sorted(values);
        let q1 = percentile(&data, 25.0)?;
        let q3 = percentile(&data, 75.0)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            iqr,
            lower: q1 - 1.5 * iqr,
            upper: q3 + 1.5 * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
