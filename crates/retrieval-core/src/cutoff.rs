/// Picks how many top documents to keep by finding the elbow in the fused
/// score curve.
///
/// `scores` must be sorted descending. Consecutive absolute differences are
/// compared against `0.8 x` their population standard deviation; the first
/// difference above that threshold marks the cutoff. A flat or evenly spaced
/// curve has zero deviation and cuts at 0 before clamping. With no elbow the
/// whole list is kept. The result is clamped into
/// `[min_k, min(max_k, scores.len())]`; fewer than two scores are returned
/// as-is since there are no differences to inspect.
pub fn adaptive_top_k(scores: &[f32], min_k: usize, max_k: usize) -> usize {
    let n = scores.len();
    if n < 2 {
        return n;
    }

    let diffs = scores
        .windows(2)
        .map(|pair| (pair[0] - pair[1]).abs())
        .collect::<Vec<_>>();
    let threshold = 0.8 * population_std_dev(&diffs);

    let elbow = diffs
        .iter()
        .position(|diff| *diff > threshold)
        .unwrap_or(if threshold == 0.0 { 0 } else { n });

    elbow.clamp(min_k, max_k.min(n))
}

fn population_std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance = values
        .iter()
        .map(|v| {
            let centered = v - mean;
            centered * centered
        })
        .sum::<f32>()
        / values.len() as f32;
    variance.sqrt()
}
