use std::cmp::Ordering;

/// Cosine similarity; zero-magnitude or mismatched vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

/// Scores every candidate against `query`, keeps those at or above `min_score`,
/// and returns at most `k` of them, best first.
pub fn rank_top_k<'a, T>(
    query: &[f32],
    candidates: impl IntoIterator<Item = (&'a [f32], T)>,
    k: usize,
    min_score: f32,
) -> Vec<(f32, T)> {
    let mut scored: Vec<(f32, T)> = candidates
        .into_iter()
        .map(|(v, item)| (cosine_similarity(query, v), item))
        .filter(|(score, _)| *score >= min_score)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(k);
    scored
}
