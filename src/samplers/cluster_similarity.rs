use std::collections::BTreeMap;

use ndarray::Array2;

use super::distribute_similarity::{dense_scores, diversities_over_groups};
use super::kmeans::KMeans;
use super::{apply_budget, rank_ascending, shuffled_indices, QueryBudget, SampleContext, Sampler};
use crate::entities::Entities;
use crate::error::Result;
use crate::sentence::Sentence;

/// Cluster-similarity sampling: corpus-level diversity.
///
/// Entity vectors are clustered with k-means; each entity is then scored by
/// its minimum cosine similarity to the other members of its cluster (1.0
/// when alone), and a sentence scores the mean over its entities. Sentences
/// whose entities sit at the fringe of their clusters rank first.
///
/// Falls back to random order when no entities were decoded at all.
#[derive(Debug, Clone)]
pub struct ClusterSimilaritySampler {
    n_clusters: usize,
    random_state: Option<u64>,
    fallback_seed: Option<u64>,
}

impl ClusterSimilaritySampler {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            random_state: None,
            fallback_seed: None,
        }
    }

    /// Seed the k-means initialization for reproducible runs.
    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    /// Seed for the random fallback.
    pub fn with_fallback_seed(mut self, seed: u64) -> Self {
        self.fallback_seed = Some(seed);
        self
    }

    /// Per-sentence diversity scores over cluster groups. Requires cluster
    /// assignments on the entities.
    pub fn sentence_diversities(entities: &Entities) -> BTreeMap<usize, f64> {
        diversities_over_groups(entities, entities.group_by_cluster().into_values())
    }

    fn cluster(&self, entities: &mut Entities) -> Result<()> {
        let dim = entities
            .iter()
            .map(|e| e.vector.len())
            .max()
            .unwrap_or(0);
        let mut data = Array2::<f64>::zeros((entities.len(), dim));
        for (i, entity) in entities.iter().enumerate() {
            for (j, &v) in entity.vector.iter().enumerate() {
                data[[i, j]] = v;
            }
        }

        let mut kmeans = KMeans::new(self.n_clusters.min(entities.len()).max(1));
        if let Some(seed) = self.random_state {
            kmeans = kmeans.with_random_state(seed);
        }
        kmeans.fit(&data)?;
        if let Some(labels) = kmeans.labels() {
            entities.set_clusters(labels);
        }
        Ok(())
    }
}

impl Sampler for ClusterSimilaritySampler {
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

        let mut entities = Entities::from_predictions(pool)?;
        if entities.is_empty() {
            let order = shuffled_indices(pool.len(), self.fallback_seed);
            return Ok(apply_budget(&order, pool, budget));
        }

        self.cluster(&mut entities)?;
        let diversities = Self::sentence_diversities(&entities);
        let scores = dense_scores(&diversities, pool.len());
        let order = rank_ascending(&scores);
        Ok(apply_budget(&order, pool, budget))
    }
}
