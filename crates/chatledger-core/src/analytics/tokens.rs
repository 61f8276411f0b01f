//! Fallback token estimator used when the model provider reports no usage.

/// Estimate tokens as `ceil(words * 1.3)`.
///
/// Words are runs of non-whitespace. Absent, empty and whitespace-only input
/// estimate to 0. Integer arithmetic keeps the rounding exact.
pub fn calculate_tokens(text: Option<&str>) -> u32 {
    let words = text.map_or(0, |t| t.split_whitespace().count()) as u64;
    let estimate = (words * 13).div_ceil(10);
    u32::try_from(estimate).unwrap_or(u32::MAX)
}
