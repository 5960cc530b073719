//! Median of a user's stored amount history.

/// Median of the given values. Empty input yields 0.0; even counts average
/// the two central values. The caller's list order does not matter.
pub fn median_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Best-effort parse of stored list entries; garbage reads as 0.0 so the
/// median never fails.
pub fn parse_amounts(raw: &[String]) -> Vec<f64> {
    raw.iter()
        .map(|s| s.parse::<f64>().unwrap_or(0.0))
        .collect()
}
