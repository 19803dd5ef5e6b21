use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::context::Lattice;
use super::dictionary::Dictionary;
use super::feature::FeatureSet;
use super::{EncodedAttribute, Instance};
use crate::error::{Error, Result};
use crate::features::Attribute;

/// Tagging output for one sequence.
#[derive(Debug, Clone)]
pub struct TagResult {
    pub labels: Vec<String>,
    /// `log P(y* | x)` of the Viterbi labeling; always <= 0
    pub log_probability: f64,
}

/// A trained CRF: feature weights plus the interning dictionaries.
///
/// Small enough to serialize as JSON, so a trained tagger survives a process
/// restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrfModel {
    attrs: Dictionary,
    labels: Dictionary,
    features: FeatureSet,
}

impl CrfModel {
    pub(crate) fn from_parts(attrs: Dictionary, labels: Dictionary, features: FeatureSet) -> Self {
        Self {
            attrs,
            labels,
            features,
        }
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn num_attributes(&self) -> usize {
        self.attrs.len()
    }

    pub fn num_features(&self) -> usize {
        self.features.num_features()
    }

    pub fn label(&self, id: u32) -> Option<&str> {
        self.labels.value(id)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|(label, _)| label)
    }

    /// Predict the label sequence for an attribute sequence.
    ///
    /// Attributes unseen at training time are dropped from the input, the
    /// same way unknown observations score zero everywhere.
    pub fn tag<T: AsRef<[Attribute]>>(&self, xseq: &[T]) -> Result<TagResult> {
        if xseq.is_empty() {
            return Ok(TagResult {
                labels: Vec::new(),
                log_probability: 0.0,
            });
        }
        if self.labels.is_empty() {
            return Err(Error::ModelState("model has no labels".to_string()));
        }

        let mut instance = Instance::with_capacity(xseq.len());
        for item in xseq {
            let encoded: Vec<EncodedAttribute> = item
                .as_ref()
                .iter()
                .filter_map(|attr| {
                    self.attrs
                        .get(&attr.name)
                        .map(|id| EncodedAttribute::new(id, attr.value))
                })
                .collect();
            instance.push(encoded, 0);
        }

        let mut lattice = Lattice::new(self.labels.len(), instance.len());
        lattice.compute_scores(&instance, &self.features);
        let (label_ids, best_score) = lattice.viterbi(instance.len());
        let log_z = lattice.forward(instance.len());

        let mut labels = Vec::with_capacity(label_ids.len());
        for id in label_ids {
            let label = self
                .labels
                .value(id)
                .ok_or_else(|| Error::ModelState(format!("unknown label id {id}")))?;
            labels.push(label.to_string());
        }

        Ok(TagResult {
            labels,
            log_probability: best_score - log_z,
        })
    }

    /// Write the model as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Load a model written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let model = serde_json::from_reader(BufReader::new(file))?;
        Ok(model)
    }
}
