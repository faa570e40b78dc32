//! TF-IDF vectors and cosine similarity.
//!
//! Matches the common default vectorizer: tokens are runs of two or more
//! word characters after lowercasing, idf is smoothed
//! (`ln((1 + n) / (1 + df)) + 1`), and each document vector is L2-normalized.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;

static TOKEN_PATTERN: OnceLock<Regex> = OnceLock::new();

fn token_pattern() -> &'static Regex {
    TOKEN_PATTERN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("static token pattern"))
}

pub fn analyze(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    token_pattern()
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Sparse term-index → weight.
pub type SparseVector = BTreeMap<usize, f64>;

#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn vocabulary and idf over `corpus`. Term indices follow sorted
    /// term order.
    pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Self {
        let mut df: BTreeMap<String, usize> = BTreeMap::new();
        for doc in corpus {
            let unique: HashSet<String> = analyze(doc.as_ref()).into_iter().collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let n = corpus.len() as f64;
        let mut vocabulary = HashMap::with_capacity(df.len());
        let mut idf = Vec::with_capacity(df.len());
        for (i, (term, count)) in df.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + count as f64)).ln() + 1.0);
            vocabulary.insert(term, i);
        }
        Self { vocabulary, idf }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }

    /// Raw counts × idf, L2-normalized. Out-of-vocabulary terms are dropped;
    /// a document with no known terms yields an empty vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut v = SparseVector::new();
        for term in analyze(text) {
            if let Some(&i) = self.vocabulary.get(&term) {
                *v.entry(i).or_insert(0.0) += 1.0;
            }
        }
        for (i, w) in v.iter_mut() {
            *w *= self.idf[*i];
        }
        let norm = norm(&v);
        if norm > 0.0 {
            for w in v.values_mut() {
                *w /= norm;
            }
        }
        v
    }
}

fn norm(v: &SparseVector) -> f64 {
    v.values().map(|w| w * w).sum::<f64>().sqrt()
}

/// Cosine of two sparse vectors; 0.0 when either has zero norm.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let dot: f64 = small
        .iter()
        .filter_map(|(i, x)| large.get(i).map(|y| x * y))
        .sum();
    let denom = norm(a) * norm(b);
    if denom == 0.0 {
        return 0.0;
    }
    (dot / denom).clamp(0.0, 1.0)
}

/// Fit once over `references ++ predictions`, then score each aligned pair.
/// The shorter list bounds the output.
pub fn tfidf_cosine_batch<S: AsRef<str>>(predictions: &[S], references: &[S]) -> Vec<f64> {
    let corpus: Vec<&str> = references
        .iter()
        .chain(predictions.iter())
        .map(AsRef::as_ref)
        .collect();
    let vectorizer = TfidfVectorizer::fit(&corpus);

    predictions
        .iter()
        .zip(references.iter())
        .map(|(p, r)| {
            cosine_similarity(
                &vectorizer.transform(r.as_ref()),
                &vectorizer.transform(p.as_ref()),
            )
        })
        .collect()
}
