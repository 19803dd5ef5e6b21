use super::{apply_budget, log_probabilities, rank_descending, QueryBudget, SampleContext, Sampler};
use crate::error::Result;
use crate::sentence::Sentence;

/// Least-confidence sampling.
///
/// Scores each sentence `1 - exp(log P(y* | x))` — one minus the
/// probability of the Viterbi labeling — and queries the highest scores
/// first.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastConfidenceSampler;

impl LeastConfidenceSampler {
    pub fn new() -> Self {
        Self
    }

    pub fn scores(log_probs: &[f64]) -> Vec<f64> {
        log_probs.iter().map(|lp| 1.0 - lp.exp()).collect()
    }
}

impl Sampler for LeastConfidenceSampler {
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
        let scores = Self::scores(&log_probabilities(pool)?);
        let order = rank_descending(&scores);
        Ok(apply_budget(&order, pool, budget))
    }
}
