//! Title-similarity math for near-duplicate detection.
//!
//! Titles are compared as lower-cased whitespace-tokenized bags of words;
//! tokens are trimmed to their alphanumeric core so punctuation does not
//! split otherwise-identical headlines.

use std::collections::HashMap;

/// Cosine similarity between the term-frequency vectors of two strings.
/// Returns 0.0 for empty inputs.
pub fn cosine_similarity(a: &str, b: &str) -> f64 {
    let tf_a = term_frequency(&tokenize(a));
    let tf_b = term_frequency(&tokenize(b));

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    for (word, count_a) in &tf_a {
        let count_b = tf_b.get(word).copied().unwrap_or(0);
        dot += (count_a * count_b) as f64;
        norm_a += (count_a * count_a) as f64;
    }

    let norm_b: f64 = tf_b.values().map(|c| (c * c) as f64).sum();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// True iff `candidate` is below the similarity threshold against every
/// already-admitted title.
pub fn is_unique_title(admitted: &[String], candidate: &str, threshold: f64) -> bool {
    admitted
        .iter()
        .all(|title| cosine_similarity(title, candidate) < threshold)
}

fn term_frequency(words: &[String]) -> HashMap<String, u64> {
    let mut tf = HashMap::new();
    for word in words {
        *tf.entry(word.clone()).or_insert(0) += 1;
    }
    tf
}

fn tokenize(s: &str) -> Vec<String> {
    s.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_titles_score_one() {
        let s = "Bitcoin hits new high";
        assert!((cosine_similarity(s, s) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn case_and_punctuation_are_ignored() {
        let a = "Bitcoin Hits New High!";
        let b = "bitcoin hits new high";
        assert!((cosine_similarity(a, b) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_titles_score_zero() {
        assert_eq!(cosine_similarity("ethereum merge", "solana outage"), 0.0);
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(cosine_similarity("", "bitcoin"), 0.0);
        assert_eq!(cosine_similarity("", ""), 0.0);
    }

    #[test]
    fn near_duplicates_cross_the_default_threshold() {
        let a = "Bitcoin hits new all time high today";
        let b = "Bitcoin hits new all time high";
        assert!(cosine_similarity(a, b) >= 0.85);
    }

    #[test]
    fn unrelated_titles_pass_uniqueness() {
        let admitted = vec![
            "Bitcoin hits new high".to_string(),
            "SEC delays ETF decision".to_string(),
        ];
        assert!(is_unique_title(&admitted, "Solana validator outage", 0.85));
        assert!(!is_unique_title(&admitted, "Bitcoin hits new high", 0.85));
    }
}
