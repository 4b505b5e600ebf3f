//! Freshness selection: pick the candidate least similar to recent history.
//!
//! Similarity is token overlap with substring containment, so near-variants
//! ("flying" vs "fly") still count as repeats. A candidate's score is its
//! similarity to the *closest* history item — one near-duplicate is enough
//! to penalize it, however different the rest of the history is.

use rand::seq::IndexedRandom;

/// When no candidate clears the threshold, fall back to picking among this
/// many of the least-similar ones instead of failing.
const EXHAUSTED_POOL_FALLBACK: usize = 5;

fn tokens(s: &str) -> Vec<String> {
    s.split_whitespace()
        .map(|t| t.to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Overlap ratio of `candidate_tokens` against one history string:
/// matched tokens / candidate tokens, where a token matches if any history
/// token contains it or is contained by it.
fn overlap(candidate_tokens: &[String], recent: &str) -> f32 {
    if candidate_tokens.is_empty() {
        return 0.0;
    }
    let recent_tokens = tokens(recent);
    if recent_tokens.is_empty() {
        return 0.0;
    }
    let matched = candidate_tokens
        .iter()
        .filter(|ct| {
            recent_tokens
                .iter()
                .any(|rt| rt.contains(ct.as_str()) || ct.contains(rt.as_str()))
        })
        .count();
    matched as f32 / candidate_tokens.len() as f32
}

/// Similarity of `candidate` against the most similar item in
/// `recently_used`. 0.0 = no observed overlap, 1.0 = identical token set.
pub fn max_similarity(candidate: &str, recently_used: &[String]) -> f32 {
    let cand_tokens = tokens(candidate);
    recently_used
        .iter()
        .map(|r| overlap(&cand_tokens, r))
        .fold(0.0_f32, f32::max)
}

/// Pick a candidate that is maximally dissimilar to recent history.
///
/// Candidates scoring strictly below `threshold` form the fresh set; the
/// pick is uniform among them. If the pool is exhausted (nothing clears the
/// bar), the pick is uniform among the 5 lowest-scoring candidates — the
/// selector always returns something rather than blocking generation.
///
/// Returns `None` only for an empty candidate slice.
pub fn select<'a, T: AsRef<str>>(
    candidates: &'a [T],
    recently_used: &[String],
    threshold: f32,
) -> Option<&'a T> {
    if candidates.is_empty() {
        return None;
    }

    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| (i, max_similarity(c.as_ref(), recently_used)))
        .collect();

    let fresh: Vec<usize> = scored
        .iter()
        .filter(|(_, score)| *score < threshold)
        .map(|(i, _)| *i)
        .collect();

    let mut rng = rand::rng();
    let idx = if fresh.is_empty() {
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        let lowest: Vec<usize> = scored
            .iter()
            .take(EXHAUSTED_POOL_FALLBACK)
            .map(|(i, _)| *i)
            .collect();
        *lowest.choose(&mut rng)?
    } else {
        *fresh.choose(&mut rng)?
    };

    candidates.get(idx)
}
