// src/ranker.rs
use serde::Serialize;
use std::cmp::Ordering;

pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scored {
    pub index: usize,
    pub score: f64,
}

/// Whether the row the scores were computed against takes part in the
/// ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMode {
    ExcludeAnchor(usize),
    All,
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Descending, with missing (or NaN) values after every present one.
fn descending_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a.filter(|v| !v.is_nan()), b.filter(|v| !v.is_nan())) {
        (Some(x), Some(y)) => descending(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sorts scores descending and keeps the first `top_n`. The sort is stable,
/// so equal scores keep their original row order.
pub fn rank(scores: &[f64], mode: RankMode, top_n: usize) -> Vec<Scored> {
    rank_with_tiebreak(scores, None, mode, top_n)
}

/// Like [`rank`], but ties on the primary score are broken by `secondary`
/// (descending) before falling back to row order.
pub fn rank_with_tiebreak(
    scores: &[f64],
    secondary: Option<&[f64]>,
    mode: RankMode,
    top_n: usize,
) -> Vec<Scored> {
    let mut ranked: Vec<Scored> = scores
        .iter()
        .enumerate()
        .filter(|(index, _)| mode != RankMode::ExcludeAnchor(*index))
        .map(|(index, &score)| Scored { index, score })
        .collect();

    ranked.sort_by(|a, b| {
        descending(a.score, b.score).then_with(|| match secondary {
            Some(keys) => descending(keys[a.index], keys[b.index]),
            None => Ordering::Equal,
        })
    });
    ranked.truncate(top_n);
    ranked
}

/// Re-sorts an already truncated ranking by a quality field, highest first.
/// Rows without a value go last; the sort is stable.
pub fn refine_by_quality(ranked: &mut [Scored], quality: impl Fn(usize) -> Option<f32>) {
    ranked.sort_by(|a, b| match (quality(a.index), quality(b.index)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Row order for a multi-key descending sort: the first key decides, later
/// keys break ties. Missing values sort last within their key.
pub fn rank_lexicographic(keys: &[Vec<Option<f64>>], top_n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| {
        keys[a]
            .iter()
            .zip(&keys[b])
            .map(|(x, y)| descending_missing_last(*x, *y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    order.truncate(top_n);
    order
}
