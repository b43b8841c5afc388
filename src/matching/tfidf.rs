// src/matching/tfidf.rs
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("static token regex"));

/// Sparse, L2-normalized term weights keyed by vocabulary index.
pub type SparseVector = HashMap<usize, f64>;

/// TF-IDF over word tokens of two or more characters.
///
/// Raw term counts weighted by a smoothed idf, `ln((1 + n) / (1 + df)) + 1`,
/// then L2-normalized. Terms outside the fitted vocabulary are dropped.
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn fit<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();
        let mut n_documents = 0usize;

        for document in documents {
            n_documents += 1;
            let mut seen: Vec<usize> = analyze(document)
                .into_iter()
                .map(|term| {
                    let next = vocabulary.len();
                    let idx = *vocabulary.entry(term).or_insert(next);
                    if idx == document_frequency.len() {
                        document_frequency.push(0);
                    }
                    idx
                })
                .collect();
            seen.sort_unstable();
            seen.dedup();
            for idx in seen {
                document_frequency[idx] += 1;
            }
        }

        let idf = document_frequency
            .iter()
            .map(|&df| ((1.0 + n_documents as f64) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        Self { vocabulary, idf }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        let mut weights: SparseVector = HashMap::new();
        for term in analyze(text) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *weights.entry(idx).or_insert(0.0) += self.idf[idx];
            }
        }
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in weights.values_mut() {
                *w /= norm;
            }
        }
        weights
    }

    /// Cosine of the two transformed texts; 0 when either has no known terms.
    pub fn cosine_similarity(&self, a: &str, b: &str) -> f64 {
        let va = self.transform(a);
        let vb = self.transform(b);
        let (small, large) = if va.len() <= vb.len() { (&va, &vb) } else { (&vb, &va) };
        let dot: f64 = small
            .iter()
            .filter_map(|(idx, w)| large.get(idx).map(|other| w * other))
            .sum();
        dot.clamp(0.0, 1.0)
    }
}

fn analyze(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}
