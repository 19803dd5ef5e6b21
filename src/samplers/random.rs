use super::{apply_budget, shuffled_indices, QueryBudget, SampleContext, Sampler};
use crate::error::Result;
use crate::sentence::Sentence;

/// Uniform random sampling, the baseline every informed strategy is
/// measured against.
#[derive(Debug, Clone, Default)]
pub struct RandomSampler {
    seed: Option<u64>,
}

impl RandomSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the shuffle seed for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Sampler for RandomSampler {
    fn select(
        &self,
        pool: &mut [Sentence],
        budget: QueryBudget,
        _ctx: &SampleContext<'_>,
    ) -> Result<Vec<usize>> {
        if pool.is_empty() {
            return Ok(Vec::new());
        }
        let order = shuffled_indices(pool.len(), self.seed);
        Ok(apply_budget(&order, pool, budget))
    }
}
