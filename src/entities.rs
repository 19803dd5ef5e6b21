use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::sentence::Sentence;

/// One decoded span in a predicted sentence, with its pooled vector.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Index of the sentence within the scored slice
    pub sentence: usize,
    /// Entity index within the sentence
    pub index: usize,
    /// Token span, `start` inclusive, `end` exclusive
    pub start: usize,
    pub end: usize,
    pub label: String,
    pub text: String,
    /// Mean of the span's token vectors
    pub vector: Vec<f64>,
    /// Cluster assignment, set by the cluster-similarity sampler
    pub cluster: Option<usize>,
}

/// Flat entity collection with the grouping views the diversity samplers
/// work over. All groupings return indices into [`Entities::entities`].
#[derive(Debug, Clone, Default)]
pub struct Entities {
    entities: Vec<Entity>,
}

impl Entities {
    /// Decode entities from predicted spans, pooling token vectors.
    ///
    /// Requires every sentence to have been scored by a tagger and embedded;
    /// sentences lacking either are reported as errors rather than silently
    /// skipped.
    pub fn from_predictions(sentences: &[Sentence]) -> Result<Self> {
        let mut entities = Vec::new();
        for (sentence_index, sentence) in sentences.iter().enumerate() {
            if sentence.is_empty() {
                continue;
            }
            if sentence.log_probability().is_none() {
                return Err(Error::NotPredicted);
            }
            for (index, span) in sentence.predicted_spans().into_iter().enumerate() {
                let tokens = &sentence.tokens()[span.start..span.end];
                let mut vector: Option<Vec<f64>> = None;
                for token in tokens {
                    let tv = token.vector().ok_or(Error::NotEmbedded)?;
                    match &mut vector {
                        Some(acc) => {
                            for (a, v) in acc.iter_mut().zip(tv) {
                                *a += v;
                            }
                        }
                        None => vector = Some(tv.to_vec()),
                    }
                }
                let mut vector = vector.unwrap_or_default();
                let count = tokens.len() as f64;
                for v in &mut vector {
                    *v /= count;
                }
                let text = tokens
                    .iter()
                    .map(|t| t.text())
                    .collect::<Vec<_>>()
                    .join(" ");
                entities.push(Entity {
                    sentence: sentence_index,
                    index,
                    start: span.start,
                    end: span.end,
                    label: span.label,
                    text,
                    vector,
                    cluster: None,
                });
            }
        }
        Ok(Self { entities })
    }

    pub fn push(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Assign cluster numbers in entity order.
    pub fn set_clusters(&mut self, assignments: &[usize]) {
        for (entity, &cluster) in self.entities.iter_mut().zip(assignments) {
            entity.cluster = Some(cluster);
        }
    }

    pub fn group_by_sentence(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, entity) in self.entities.iter().enumerate() {
            groups.entry(entity.sentence).or_default().push(i);
        }
        groups
    }

    pub fn group_by_label(&self) -> BTreeMap<&str, Vec<usize>> {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, entity) in self.entities.iter().enumerate() {
            groups.entry(entity.label.as_str()).or_default().push(i);
        }
        groups
    }

    /// Entities grouped by cluster; entities without an assignment are
    /// left out.
    pub fn group_by_cluster(&self) -> BTreeMap<usize, Vec<usize>> {
        let mut groups: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (i, entity) in self.entities.iter().enumerate() {
            if let Some(cluster) = entity.cluster {
                groups.entry(cluster).or_default().push(i);
            }
        }
        groups
    }
}
