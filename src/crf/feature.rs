use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::dictionary::Dictionary;
use super::Instance;
use crate::error::{Error, Result};

/// Feature kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// State feature: (attribute, label) -> weight
    State,
    /// Transition feature: (prev_label, label) -> weight
    Transition,
}

/// A CRF feature descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub kind: FeatureKind,
    /// Source id (attribute id for state, previous label id for transition)
    pub src: u32,
    /// Target label id
    pub dst: u32,
    pub weight: f64,
}

/// Feature id lists for fast lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureRefs {
    pub fids: Vec<u32>,
}

/// The full feature space of a model: features plus lookup tables indexed by
/// attribute id (state features) and previous-label id (transition features).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureSet {
    pub features: Vec<Feature>,
    pub attr_refs: Vec<FeatureRefs>,
    pub label_refs: Vec<FeatureRefs>,
}

impl FeatureSet {
    /// Generate features from training instances.
    ///
    /// Features with weighted frequency >= `min_freq` are kept. State feature
    /// frequencies are weighted by attribute value and instance weight;
    /// transition features count occurrences weighted by instance weight.
    pub fn generate(
        instances: &[Instance],
        attrs: &Dictionary,
        labels: &Dictionary,
        min_freq: f64,
    ) -> Result<Self> {
        let num_labels = labels.len();
        let num_attrs = attrs.len();

        let mut state_counts: BTreeMap<(u32, u32), f64> = BTreeMap::new();
        let mut trans_counts: BTreeMap<(u32, u32), f64> = BTreeMap::new();

        for instance in instances {
            let weight = instance.weight;
            for (item, &label) in instance.items.iter().zip(&instance.labels) {
                for attr in item {
                    *state_counts.entry((attr.id, label)).or_insert(0.0) += attr.value * weight;
                }
            }
            for window in instance.labels.windows(2) {
                *trans_counts.entry((window[0], window[1])).or_insert(0.0) += weight;
            }
        }

        let mut features = Vec::new();
        let mut attr_refs = vec![FeatureRefs::default(); num_attrs];
        let mut label_refs = vec![FeatureRefs::default(); num_labels];

        for ((aid, lid), freq) in state_counts {
            if freq >= min_freq {
                let fid = next_fid(features.len())?;
                attr_refs[aid as usize].fids.push(fid);
                features.push(Feature {
                    kind: FeatureKind::State,
                    src: aid,
                    dst: lid,
                    weight: 0.0,
                });
            }
        }
        for ((prev, lid), freq) in trans_counts {
            if freq >= min_freq {
                let fid = next_fid(features.len())?;
                label_refs[prev as usize].fids.push(fid);
                features.push(Feature {
                    kind: FeatureKind::Transition,
                    src: prev,
                    dst: lid,
                    weight: 0.0,
                });
            }
        }

        Ok(Self {
            features,
            attr_refs,
            label_refs,
        })
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.features.iter().map(|f| f.weight).collect()
    }

    pub fn set_weights(&mut self, weights: &[f64]) {
        for (feature, &weight) in self.features.iter_mut().zip(weights) {
            feature.weight = weight;
        }
    }
}

fn next_fid(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::ModelState("feature id space exhausted".to_string()))
}
