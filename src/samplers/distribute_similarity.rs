use std::collections::BTreeMap;

use super::{apply_budget, rank_ascending, shuffled_indices, QueryBudget, SampleContext, Sampler};
use crate::embeddings::cosine_similarity;
use crate::entities::Entities;
use crate::error::Result;
use crate::sentence::Sentence;

/// Distribute-similarity sampling: label-level diversity.
///
/// Each decoded entity is scored by its minimum cosine similarity to the
/// other entities carrying the same label (1.0 when it is alone in its label
/// group); a sentence scores the mean over its entities. Low similarity
/// means the sentence brings entity shapes the pool has not covered, so the
/// lowest scores are queried first.
///
/// Falls back to random order when no entities were decoded at all.
#[derive(Debug, Clone, Default)]
pub struct DistributeSimilaritySampler {
    fallback_seed: Option<u64>,
}

impl DistributeSimilaritySampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed for the random fallback, for reproducible runs.
    pub fn with_fallback_seed(mut self, seed: u64) -> Self {
        self.fallback_seed = Some(seed);
        self
    }

    /// Per-sentence diversity scores over label groups.
    pub fn sentence_diversities(entities: &Entities) -> BTreeMap<usize, f64> {
        diversities_over_groups(entities, entities.group_by_label().into_values())
    }
}

/// Shared diversity rule: per entity, the minimum cosine similarity to the
/// other members of its group, 1.0 for a singleton; per sentence, the mean
/// over its entities.
pub(crate) fn diversities_over_groups(
    entities: &Entities,
    groups: impl IntoIterator<Item = Vec<usize>>,
) -> BTreeMap<usize, f64> {
    let ents = entities.entities();
    let mut per_entity = vec![1.0; ents.len()];

    for members in groups {
        for &i in &members {
            if members.len() > 1 {
                per_entity[i] = members
                    .iter()
                    .filter(|&&j| j != i)
                    .map(|&j| cosine_similarity(&ents[i].vector, &ents[j].vector))
                    .fold(f64::INFINITY, f64::min);
            }
        }
    }

    let mut scores = BTreeMap::new();
    for (sentence, members) in entities.group_by_sentence() {
        let mean = members.iter().map(|&i| per_entity[i]).sum::<f64>() / members.len() as f64;
        scores.insert(sentence, mean);
    }
    scores
}

/// Expand per-sentence diversity scores to a dense vector; sentences without
/// entities score 1.0 and so rank last.
pub(crate) fn dense_scores(diversities: &BTreeMap<usize, f64>, len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| diversities.get(&i).copied().unwrap_or(1.0))
        .collect()
}

impl Sampler for DistributeSimilaritySampler {
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

        let entities = Entities::from_predictions(pool)?;
        if entities.is_empty() {
            let order = shuffled_indices(pool.len(), self.fallback_seed);
            return Ok(apply_budget(&order, pool, budget));
        }

        let diversities = Self::sentence_diversities(&entities);
        let scores = dense_scores(&diversities, pool.len());
        let order = rank_ascending(&scores);
        Ok(apply_budget(&order, pool, budget))
    }
}
