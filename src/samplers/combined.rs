use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::distribute_similarity::{dense_scores, DistributeSimilaritySampler};
use super::kmeans::KMeans;
use super::{
    apply_budget, log_probabilities, rank_ascending, ClusterSimilaritySampler, QueryBudget,
    SampleContext, Sampler,
};
use crate::entities::Entities;
use crate::error::{Error, Result};
use crate::sentence::Sentence;

/// Which uncertainty and diversity strategies a [`CombinedSampler`] pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinationPair {
    /// Least confidence + distribute similarity
    LcDs,
    /// Least confidence + cluster similarity
    LcCs,
    /// Max normalized log-probability + distribute similarity
    MnlpDs,
    /// Max normalized log-probability + cluster similarity
    MnlpCs,
}

impl CombinationPair {
    fn uses_clusters(self) -> bool {
        matches!(self, Self::LcCs | Self::MnlpCs)
    }
}

impl FromStr for CombinationPair {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lc_ds" => Ok(Self::LcDs),
            "lc_cs" => Ok(Self::LcCs),
            "mnlp_ds" => Ok(Self::MnlpDs),
            "mnlp_cs" => Ok(Self::MnlpCs),
            other => Err(Error::UnknownCombination(other.to_string())),
        }
    }
}

/// How the two strategies are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinationMode {
    /// The uncertainty sampler preselects twice the budget, the diversity
    /// sampler reranks the preselection.
    Series,
    /// Both score vectors are normalized and summed.
    Parallel,
}

impl FromStr for CombinationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "series" => Ok(Self::Series),
            "parallel" => Ok(Self::Parallel),
            other => Err(Error::UnknownCombinationMode(other.to_string())),
        }
    }
}

/// Uncertainty x diversity composition.
///
/// Scores are oriented so that lower always means more informative, which
/// lets both composition modes rank ascending.
#[derive(Debug, Clone)]
pub struct CombinedSampler {
    pair: CombinationPair,
    mode: CombinationMode,
    n_clusters: usize,
    random_state: Option<u64>,
}

impl CombinedSampler {
    pub fn new(pair: CombinationPair, mode: CombinationMode) -> Self {
        Self {
            pair,
            mode,
            n_clusters: 8,
            random_state: None,
        }
    }

    /// Parse the string configuration form, e.g. `("lc_ds", "series")`.
    pub fn parse(pair: &str, mode: &str) -> Result<Self> {
        Ok(Self::new(pair.parse()?, mode.parse()?))
    }

    /// Cluster count for the cluster-similarity half.
    pub fn with_n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters.max(1);
        self
    }

    /// Seed the k-means initialization for reproducible runs.
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Uncertainty scores with lower = more informative.
    fn uncertainty_scores(&self, pool: &[Sentence]) -> Result<Vec<f64>> {
        let log_probs = log_probabilities(pool)?;
        Ok(match self.pair {
            CombinationPair::LcDs | CombinationPair::LcCs => {
                // Negated least-confidence: exp(log P) - 1
                log_probs.iter().map(|lp| lp.exp() - 1.0).collect()
            }
            CombinationPair::MnlpDs | CombinationPair::MnlpCs => log_probs
                .iter()
                .zip(pool)
                .map(|(lp, s)| lp / s.len().max(1) as f64)
                .collect(),
        })
    }

    /// Diversity scores, already ascending-informative. `None` when the pool
    /// yielded no entities.
    fn diversity_scores(&self, pool: &[Sentence]) -> Result<Option<Vec<f64>>> {
        let mut entities = Entities::from_predictions(pool)?;
        if entities.is_empty() {
            return Ok(None);
        }
        let diversities = if self.pair.uses_clusters() {
            let dim = entities.iter().map(|e| e.vector.len()).max().unwrap_or(0);
            let mut data = Array2::<f64>::zeros((entities.len(), dim));
            for (i, entity) in entities.iter().enumerate() {
                for (j, &v) in entity.vector.iter().enumerate() {
                    data[[i, j]] = v;
                }
            }
            let mut kmeans = KMeans::new(self.n_clusters.min(entities.len()));
            if let Some(seed) = self.random_state {
                kmeans = kmeans.with_random_state(seed);
            }
            kmeans.fit(&data)?;
            if let Some(labels) = kmeans.labels() {
                entities.set_clusters(labels);
            }
            ClusterSimilaritySampler::sentence_diversities(&entities)
        } else {
            DistributeSimilaritySampler::sentence_diversities(&entities)
        };
        Ok(Some(dense_scores(&diversities, pool.len())))
    }
}

impl Sampler for CombinedSampler {
    fn select(
        &self,
        pool: &mut [Sentence],
        budget: QueryBudget,
        ctx: &SampleContext<'_>,
    ) -> Result<Vec<usize>> {
        if pool.is_empty() {
            return Ok(Vec::new());
        }
        ctx.tagger.predict(pool)?;
        ctx.embeddings.embed(pool);

        let uncertainty = self.uncertainty_scores(pool)?;
        let diversity = match self.diversity_scores(pool)? {
            Some(scores) => scores,
            // Without entities the diversity half has nothing to say.
            None => {
                let order = rank_ascending(&uncertainty);
                return Ok(apply_budget(&order, pool, budget));
            }
        };

        let order = match self.mode {
            CombinationMode::Series => {
                let preselected =
                    apply_budget(&rank_ascending(&uncertainty), pool, double(budget));
                let mut reranked = preselected;
                reranked.sort_by(|&a, &b| {
                    diversity[a]
                        .partial_cmp(&diversity[b])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                reranked
            }
            CombinationMode::Parallel => {
                let combined: Vec<f64> = normalize(&uncertainty)
                    .iter()
                    .zip(&normalize(&diversity))
                    .map(|(u, d)| u + d)
                    .collect();
                rank_ascending(&combined)
            }
        };
        Ok(apply_budget(&order, pool, budget))
    }
}

fn double(budget: QueryBudget) -> QueryBudget {
    match budget {
        QueryBudget::Sentences(n) => QueryBudget::Sentences((n * 2).max(2)),
        QueryBudget::Tokens(t) => QueryBudget::Tokens((t * 2).max(2)),
    }
}

/// Min-max normalization to `[0, 1]`; a constant vector maps to zeros.
fn normalize(scores: &[f64]) -> Vec<f64> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| (s - min) / range).collect()
}
