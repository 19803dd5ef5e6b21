use crate::sentence::Sentence;

/// Token vector provider for the diversity samplers.
///
/// Implementations fill each token's vector; entity vectors are pooled from
/// token vectors downstream. This is the seam for plugging in pretrained
/// embeddings.
pub trait Embeddings {
    fn dimension(&self) -> usize;

    /// Fill token vectors in place. Tokens that already carry a vector are
    /// left untouched.
    fn embed(&self, sentences: &mut [Sentence]);
}

/// Deterministic feature-hashed character-n-gram embeddings.
///
/// Each token's padded lowercased form is decomposed into character n-grams;
/// every n-gram hashes to a signed bucket and the bucket sums are normalized
/// to unit length. No external model files, stable across runs, and similar
/// surface forms land near each other, which is all the diversity samplers
/// need.
#[derive(Debug, Clone)]
pub struct HashEmbeddings {
    dimension: usize,
    min_gram: usize,
    max_gram: usize,
}

impl Default for HashEmbeddings {
    fn default() -> Self {
        Self {
            dimension: 64,
            min_gram: 2,
            max_gram: 4,
        }
    }
}

impl HashEmbeddings {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            ..Self::default()
        }
    }

    pub fn with_gram_range(mut self, min_gram: usize, max_gram: usize) -> Self {
        self.min_gram = min_gram.max(1);
        self.max_gram = max_gram.max(self.min_gram);
        self
    }

    fn token_vector(&self, text: &str) -> Vec<f64> {
        let mut vector = vec![0.0; self.dimension];
        let padded = format!("^{}$", text.to_lowercase());
        let chars: Vec<char> = padded.chars().collect();

        let bump = |vector: &mut Vec<f64>, gram: &str| {
            let hash = fnv1a(gram.as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        };

        for n in self.min_gram..=self.max_gram {
            if chars.len() < n {
                break;
            }
            for window in chars.windows(n) {
                let gram: String = window.iter().collect();
                bump(&mut vector, &gram);
            }
        }
        bump(&mut vector, &padded);

        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

impl Embeddings for HashEmbeddings {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, sentences: &mut [Sentence]) {
        for sentence in sentences {
            for token in sentence.tokens_mut() {
                if token.vector().is_none() {
                    let vector = self.token_vector(token.text());
                    token.set_vector(vector);
                }
            }
        }
    }
}

/// Cosine similarity between two vectors; 0.0 when either has zero norm.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
