/// round(100 * correct / total), half away from zero. An empty denominator scores 0.
pub fn ratio_score(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    ((200 * correct + total) / (2 * total)) as u8
}

/// round(100 * max(0, hits - false_positives) / expected), clamped to 0..=100.
/// False positives cost exactly as much as a missed positive.
pub fn flag_score(hits: usize, false_positives: usize, expected: usize) -> u8 {
    ratio_score(hits.saturating_sub(false_positives), expected)
}
