use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crf::{
    AveragedPerceptron, AveragedPerceptronParams, CrfModel, L2Sgd, L2SgdParams, Trainer,
    TrainingAlgorithm,
};
use crate::error::{Error, Result};
use crate::features::WindowFeatures;
use crate::sentence::Sentence;

/// Summary of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub instances: usize,
    pub labels: usize,
    pub attributes: usize,
    pub features: usize,
}

/// The model seam of the framework: anything that can be retrained on
/// labeled sentences and score unlabeled ones can drive the query loop.
pub trait SequenceTagger {
    /// (Re)train from scratch on the given labeled sentences.
    fn fit(&mut self, sentences: &[Sentence]) -> Result<TrainReport>;

    /// Assign predicted labels and the per-sentence log-probability
    /// `log P(y* | x)` of the Viterbi labeling.
    fn predict(&self, sentences: &mut [Sentence]) -> Result<()>;
}

/// Training algorithm selection for [`CrfTagger`].
#[derive(Debug, Clone)]
pub enum Algorithm {
    AveragedPerceptron(AveragedPerceptronParams),
    L2Sgd(L2SgdParams),
}

impl Default for Algorithm {
    fn default() -> Self {
        // Perceptron by default: the active-learning loop retrains from
        // scratch every round, so cheap epochs matter more than the last
        // fraction of likelihood.
        Self::AveragedPerceptron(AveragedPerceptronParams::default())
    }
}

/// Linear-chain CRF tagger over window features.
#[derive(Debug, Default)]
pub struct CrfTagger {
    algorithm: Algorithm,
    extractor: WindowFeatures,
    feature_minfreq: f64,
    model: Option<CrfModel>,
}

impl CrfTagger {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    /// Wrap an already-trained model.
    pub fn from_model(model: CrfModel) -> Self {
        Self {
            model: Some(model),
            ..Self::default()
        }
    }

    pub fn with_extractor(mut self, extractor: WindowFeatures) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_feature_minfreq(mut self, feature_minfreq: f64) -> Result<Self> {
        if feature_minfreq < 0.0 {
            return Err(Error::InvalidParameter {
                param: "feature_minfreq",
                message: "must be non-negative".to_string(),
            });
        }
        self.feature_minfreq = feature_minfreq;
        Ok(self)
    }

    pub fn model(&self) -> Option<&CrfModel> {
        self.model.as_ref()
    }

    /// Persist the trained model as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.model.as_ref().ok_or(Error::NotFitted)?.save(path)
    }

    /// Load a tagger from a model written by [`save`](Self::save).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_model(CrfModel::load(path)?))
    }

    fn fit_with<A: TrainingAlgorithm>(
        &self,
        mut trainer: Trainer<A>,
        sentences: &[Sentence],
    ) -> Result<CrfModel> {
        trainer.set_feature_minfreq(self.feature_minfreq)?;
        for sentence in sentences {
            if !sentence.is_labeled() {
                return Err(Error::MissingGoldLabels);
            }
            let xseq = self.extractor.extract(sentence);
            let yseq: Vec<&str> = sentence
                .tokens()
                .iter()
                .filter_map(|t| t.gold_label())
                .collect();
            trainer.append(&xseq, &yseq)?;
        }
        trainer.train()
    }
}

impl SequenceTagger for CrfTagger {
    fn fit(&mut self, sentences: &[Sentence]) -> Result<TrainReport> {
        if sentences.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }

        let model = match &self.algorithm {
            Algorithm::AveragedPerceptron(params) => {
                let mut trainer = Trainer::<AveragedPerceptron>::averaged_perceptron();
                *trainer.params_mut() = params.clone();
                self.fit_with(trainer, sentences)?
            }
            Algorithm::L2Sgd(params) => {
                let mut trainer = Trainer::<L2Sgd>::l2_sgd();
                *trainer.params_mut() = params.clone();
                self.fit_with(trainer, sentences)?
            }
        };

        let report = TrainReport {
            instances: sentences.len(),
            labels: model.num_labels(),
            attributes: model.num_attributes(),
            features: model.num_features(),
        };
        debug!(
            instances = report.instances,
            labels = report.labels,
            features = report.features,
            "tagger trained"
        );
        self.model = Some(model);
        Ok(report)
    }

    fn predict(&self, sentences: &mut [Sentence]) -> Result<()> {
        let model = self.model.as_ref().ok_or(Error::NotFitted)?;
        for sentence in sentences {
            let xseq = self.extractor.extract(sentence);
            let result = model.tag(&xseq)?;
            sentence.set_predictions(result.labels, result.log_probability);
        }
        Ok(())
    }
}
