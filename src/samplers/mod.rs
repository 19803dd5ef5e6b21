//! Pool sampling strategies.
//!
//! A sampler ranks the pool by informativeness and selects up to a budget.
//! Uncertainty samplers read the tagger's per-sentence log-probabilities;
//! diversity samplers work over decoded entities and their vectors.

mod cluster_similarity;
mod combined;
mod distribute_similarity;
mod kmeans;
mod least_confidence;
mod max_norm_log_prob;
mod random;

pub use self::cluster_similarity::ClusterSimilaritySampler;
pub use self::combined::{CombinationMode, CombinationPair, CombinedSampler};
pub use self::distribute_similarity::DistributeSimilaritySampler;
pub use self::kmeans::KMeans;
pub use self::least_confidence::LeastConfidenceSampler;
pub use self::max_norm_log_prob::MaxNormLogProbSampler;
pub use self::random::RandomSampler;

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::embeddings::Embeddings;
use crate::error::{Error, Result};
use crate::sentence::Sentence;
use crate::tagger::SequenceTagger;

/// Collaborators a sampler may need during selection.
pub struct SampleContext<'a> {
    pub tagger: &'a dyn SequenceTagger,
    pub embeddings: &'a dyn Embeddings,
}

/// Query budget: a sentence count, or a token count for corpora where
/// annotation cost tracks tokens rather than sentences.
///
/// A zero budget still selects one sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryBudget {
    Sentences(usize),
    Tokens(usize),
}

/// A pool sampling strategy.
///
/// `select` returns indices into `pool` (at call time), most informative
/// first. The pool is mutable because selection generally requires scoring
/// it: predictions and embeddings are written through to the sentences.
pub trait Sampler {
    fn select(
        &self,
        pool: &mut [Sentence],
        budget: QueryBudget,
        ctx: &SampleContext<'_>,
    ) -> Result<Vec<usize>>;
}

/// Indices of `scores` sorted ascending; ties keep pool order.
pub(crate) fn rank_ascending(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Indices of `scores` sorted descending; ties keep pool order.
pub(crate) fn rank_descending(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
    });
    order
}

/// Cut a ranking down to the budget.
///
/// Sentence budgets take the top `n`; token budgets walk the ranking until
/// the cumulative token count reaches the budget, overshooting on the last
/// sentence. Either way at least one sentence is selected when the pool is
/// non-empty.
pub(crate) fn apply_budget(
    order: &[usize],
    pool: &[Sentence],
    budget: QueryBudget,
) -> Vec<usize> {
    if order.is_empty() {
        return Vec::new();
    }
    match budget {
        QueryBudget::Sentences(n) => order.iter().take(n.max(1)).copied().collect(),
        QueryBudget::Tokens(required) => {
            let required = required.max(1);
            let mut selected = Vec::new();
            let mut tokens = 0;
            for &index in order {
                selected.push(index);
                tokens += pool[index].len();
                if tokens >= required {
                    break;
                }
            }
            selected
        }
    }
}

/// A full random permutation of `0..len`, seedable for reproducibility.
pub(crate) fn shuffled_indices(len: usize, seed: Option<u64>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    order.shuffle(&mut rng);
    order
}

/// Per-sentence log-probabilities after a predict pass.
pub(crate) fn log_probabilities(pool: &[Sentence]) -> Result<Vec<f64>> {
    pool.iter()
        .map(|s| s.log_probability().ok_or(Error::NotPredicted))
        .collect()
}
