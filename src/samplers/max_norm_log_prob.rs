use super::{apply_budget, log_probabilities, rank_ascending, QueryBudget, SampleContext, Sampler};
use crate::error::Result;
use crate::sentence::Sentence;

/// Maximum normalized log-probability sampling.
///
/// Scores each sentence `log P(y* | x) / len(x)`. Length normalization keeps
/// long sentences from dominating the query purely by having more tokens to
/// be unsure about. Lowest scores are queried first.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxNormLogProbSampler;

impl MaxNormLogProbSampler {
    pub fn new() -> Self {
        Self
    }

    pub fn scores(log_probs: &[f64], lengths: &[usize]) -> Vec<f64> {
        log_probs
            .iter()
            .zip(lengths)
            .map(|(lp, &len)| lp / len.max(1) as f64)
            .collect()
    }
}

impl Sampler for MaxNormLogProbSampler {
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
        let lengths: Vec<usize> = pool.iter().map(Sentence::len).collect();
        let scores = Self::scores(&log_probabilities(pool)?, &lengths);
        let order = rank_ascending(&scores);
        Ok(apply_budget(&order, pool, budget))
    }
}
