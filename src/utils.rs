use std::cmp::Ordering;

pub fn compute_cosine_similarity(vec1: &[f64], vec2: &[f64]) -> f64 {
    let dot: f64 = vec1.iter().zip(vec2).map(|(a, b)| a * b).sum();
    let norm1: f64 = (vec1.iter().map(|x| x * x).sum::<f64>()).sqrt();
    let norm2: f64 = (vec2.iter().map(|x| x * x).sum::<f64>()).sqrt();
    dot / (norm1 * norm2).max(1e-10)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Quantile with linear interpolation between the two closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}
