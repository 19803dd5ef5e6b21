use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use super::context::Lattice;
use super::dictionary::Dictionary;
use super::feature::{FeatureKind, FeatureSet};
use super::model::CrfModel;
use super::{EncodedAttribute, Instance};
use crate::error::{Error, Result};
use crate::features::Attribute;

/// Training algorithm marker for Averaged Perceptron.
#[derive(Debug, Clone, Copy)]
pub struct AveragedPerceptron;

/// Training algorithm marker for L2-regularized SGD.
#[derive(Debug, Clone, Copy)]
pub struct L2Sgd;

/// Training algorithm interface.
pub trait TrainingAlgorithm: Sized {
    type Params: Default + std::fmt::Debug;

    fn run(trainer: &mut Trainer<Self>, features: &mut FeatureSet) -> Result<()>;
}

/// Averaged Perceptron training parameters.
#[derive(Debug, Clone)]
pub struct AveragedPerceptronParams {
    max_iterations: usize,
    epsilon: f64,
    shuffle_seed: Option<u64>,
}

impl Default for AveragedPerceptronParams {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            epsilon: 1e-5,
            shuffle_seed: None,
        }
    }
}

impl AveragedPerceptronParams {
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::InvalidParameter {
                param: "max_iterations",
                message: "must be at least 1".to_string(),
            });
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        if epsilon < 0.0 {
            return Err(Error::InvalidParameter {
                param: "epsilon",
                message: "must be non-negative".to_string(),
            });
        }
        self.epsilon = epsilon;
        Ok(())
    }

    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }

    pub fn set_shuffle_seed(&mut self, seed: Option<u64>) {
        self.shuffle_seed = seed;
    }
}

/// L2-SGD training parameters.
#[derive(Debug, Clone)]
pub struct L2SgdParams {
    c2: f64,
    max_iterations: usize,
    eta0: f64,
    delta: f64,
    shuffle_seed: Option<u64>,
}

impl Default for L2SgdParams {
    fn default() -> Self {
        Self {
            c2: 1.0,
            max_iterations: 100,
            eta0: 0.1,
            delta: 1e-6,
            shuffle_seed: None,
        }
    }
}

impl L2SgdParams {
    pub fn c2(&self) -> f64 {
        self.c2
    }

    pub fn set_c2(&mut self, c2: f64) -> Result<()> {
        if c2 < 0.0 {
            return Err(Error::InvalidParameter {
                param: "c2",
                message: "must be non-negative".to_string(),
            });
        }
        self.c2 = c2;
        Ok(())
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::InvalidParameter {
                param: "max_iterations",
                message: "must be at least 1".to_string(),
            });
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    pub fn eta0(&self) -> f64 {
        self.eta0
    }

    pub fn set_eta0(&mut self, eta0: f64) -> Result<()> {
        if eta0 <= 0.0 {
            return Err(Error::InvalidParameter {
                param: "eta0",
                message: "must be positive".to_string(),
            });
        }
        self.eta0 = eta0;
        Ok(())
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn set_delta(&mut self, delta: f64) -> Result<()> {
        if delta <= 0.0 {
            return Err(Error::InvalidParameter {
                param: "delta",
                message: "must be positive".to_string(),
            });
        }
        self.delta = delta;
        Ok(())
    }

    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }

    pub fn set_shuffle_seed(&mut self, seed: Option<u64>) {
        self.shuffle_seed = seed;
    }
}

/// CRF trainer: accumulates encoded instances and produces a [`CrfModel`].
#[derive(Debug)]
pub struct Trainer<A: TrainingAlgorithm> {
    instances: Vec<Instance>,
    attrs: Dictionary,
    labels: Dictionary,
    feature_minfreq: f64,
    params: A::Params,
}

impl<A: TrainingAlgorithm> Trainer<A> {
    pub fn new() -> Self {
        Self {
            instances: Vec::new(),
            attrs: Dictionary::new(),
            labels: Dictionary::new(),
            feature_minfreq: 0.0,
            params: A::Params::default(),
        }
    }

    pub fn params(&self) -> &A::Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut A::Params {
        &mut self.params
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn num_labels(&self) -> usize {
        self.labels.len()
    }

    pub fn num_attributes(&self) -> usize {
        self.attrs.len()
    }

    pub fn feature_minfreq(&self) -> f64 {
        self.feature_minfreq
    }

    pub fn set_feature_minfreq(&mut self, feature_minfreq: f64) -> Result<()> {
        if feature_minfreq < 0.0 {
            return Err(Error::InvalidParameter {
                param: "feature_minfreq",
                message: "must be non-negative".to_string(),
            });
        }
        self.feature_minfreq = feature_minfreq;
        Ok(())
    }

    /// Append training data
    pub fn append<I, L>(&mut self, xseq: &[I], yseq: &[L]) -> Result<()>
    where
        I: AsRef<[Attribute]>,
        L: AsRef<str>,
    {
        self.append_with_weight(xseq, yseq, 1.0)
    }

    /// Append weighted training data
    pub fn append_with_weight<I, L>(&mut self, xseq: &[I], yseq: &[L], weight: f64) -> Result<()>
    where
        I: AsRef<[Attribute]>,
        L: AsRef<str>,
    {
        if xseq.len() != yseq.len() {
            return Err(Error::InvalidParameter {
                param: "xseq",
                message: "xseq and yseq must have the same length".to_string(),
            });
        }
        if xseq.is_empty() {
            return Err(Error::InvalidParameter {
                param: "xseq",
                message: "empty sequences are not allowed".to_string(),
            });
        }

        let mut instance = Instance::with_capacity(xseq.len());
        instance.set_weight(weight);
        for (item, label) in xseq.iter().zip(yseq.iter()) {
            let encoded: Vec<EncodedAttribute> = item
                .as_ref()
                .iter()
                .map(|attr| EncodedAttribute::new(self.attrs.get_or_insert(&attr.name), attr.value))
                .collect();
            let lid = self.labels.get_or_insert(label.as_ref());
            instance.push(encoded, lid);
        }
        self.instances.push(instance);
        Ok(())
    }

    /// Clear all training data
    pub fn clear(&mut self) {
        self.instances.clear();
        self.attrs.clear();
        self.labels.clear();
    }

    /// Train and return the resulting model.
    pub fn train(&mut self) -> Result<CrfModel> {
        if self.instances.is_empty() {
            return Err(Error::EmptyTrainingSet);
        }

        let mut features = FeatureSet::generate(
            &self.instances,
            &self.attrs,
            &self.labels,
            self.feature_minfreq,
        )?;
        debug!(
            features = features.num_features(),
            labels = self.labels.len(),
            attributes = self.attrs.len(),
            instances = self.instances.len(),
            "generated feature space"
        );

        A::run(self, &mut features)?;

        Ok(CrfModel::from_parts(
            self.attrs.clone(),
            self.labels.clone(),
            features,
        ))
    }

    fn max_items(&self) -> usize {
        self.instances.iter().map(Instance::len).max().unwrap_or(0)
    }

    fn shuffle_rng(&self, seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl<A: TrainingAlgorithm> Default for Trainer<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// Feature counts of a label sequence: the observed side of both the
/// perceptron update and the SGD gradient.
fn feature_counts(instance: &Instance, labels: &[u32], features: &FeatureSet) -> Vec<f64> {
    let mut counts = vec![0.0; features.num_features()];

    for (t, item) in instance.items.iter().enumerate() {
        let label = labels[t];
        for attr in item {
            let aid = attr.id as usize;
            if aid < features.attr_refs.len() {
                for &fid in &features.attr_refs[aid].fids {
                    let feature = &features.features[fid as usize];
                    if feature.kind == FeatureKind::State && feature.dst == label {
                        counts[fid as usize] += attr.value;
                    }
                }
            }
        }
    }

    for t in 1..labels.len() {
        let prev = labels[t - 1];
        let label = labels[t];
        let prev_l = prev as usize;
        if prev_l < features.label_refs.len() {
            for &fid in &features.label_refs[prev_l].fids {
                let feature = &features.features[fid as usize];
                if feature.kind == FeatureKind::Transition
                    && feature.src == prev
                    && feature.dst == label
                {
                    counts[fid as usize] += 1.0;
                }
            }
        }
    }

    counts
}

impl TrainingAlgorithm for AveragedPerceptron {
    type Params = AveragedPerceptronParams;

    fn run(trainer: &mut Trainer<Self>, features: &mut FeatureSet) -> Result<()> {
        trainer.run_averaged_perceptron(features)
    }
}

impl Trainer<AveragedPerceptron> {
    /// Create a new Averaged Perceptron trainer
    pub fn averaged_perceptron() -> Self {
        Self::new()
    }

    /// Set maximum iterations (builder pattern)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Result<Self> {
        self.params.set_max_iterations(max_iterations)?;
        Ok(self)
    }

    /// Set convergence epsilon (builder pattern)
    pub fn with_epsilon(mut self, epsilon: f64) -> Result<Self> {
        self.params.set_epsilon(epsilon)?;
        Ok(self)
    }

    /// Set the shuffle seed (builder pattern)
    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.params.set_shuffle_seed(seed);
        self
    }

    fn run_averaged_perceptron(&mut self, features: &mut FeatureSet) -> Result<()> {
        let num_features = features.num_features();
        let num_instances = self.instances.len() as f64;

        let mut weights = vec![0.0; num_features];
        let mut summed_updates = vec![0.0; num_features];
        let mut c = 1.0;

        let max_iterations = self.params.max_iterations();
        let epsilon = self.params.epsilon();

        let mut lattice = Lattice::new(self.labels.len(), self.max_items());
        let mut order: Vec<usize> = (0..self.instances.len()).collect();
        let mut rng = self.shuffle_rng(self.params.shuffle_seed());

        for epoch in 0..max_iterations {
            let mut loss = 0.0;

            if order.len() > 1 {
                order.shuffle(&mut rng);
            }

            for &idx in &order {
                let instance = &self.instances[idx];
                let seq_len = instance.len();

                features.set_weights(&weights);
                lattice.compute_scores(instance, features);
                let (predicted, _score) = lattice.viterbi(seq_len);

                let num_diff = predicted
                    .iter()
                    .zip(&instance.labels)
                    .filter(|(p, l)| p != l)
                    .count();

                if num_diff > 0 {
                    let true_counts = feature_counts(instance, &instance.labels, features);
                    let pred_counts = feature_counts(instance, &predicted, features);
                    let instance_weight = instance.weight;

                    // w += true_features - predicted_features
                    for i in 0..num_features {
                        let delta = (true_counts[i] - pred_counts[i]) * instance_weight;
                        weights[i] += delta;
                        summed_updates[i] += c * delta;
                    }

                    // Loss is the ratio of wrongly predicted labels
                    loss += num_diff as f64 / seq_len as f64 * instance_weight;
                }

                c += 1.0;
            }

            let error_rate = if num_instances > 0.0 {
                loss / num_instances
            } else {
                0.0
            };
            debug!(epoch = epoch + 1, error_rate, "perceptron epoch");

            if error_rate < epsilon {
                debug!(epoch = epoch + 1, "converged");
                break;
            }
        }

        // Average the weights
        for i in 0..num_features {
            weights[i] -= summed_updates[i] / c;
        }
        features.set_weights(&weights);

        Ok(())
    }
}

impl TrainingAlgorithm for L2Sgd {
    type Params = L2SgdParams;

    fn run(trainer: &mut Trainer<Self>, features: &mut FeatureSet) -> Result<()> {
        trainer.run_l2_sgd(features)
    }
}

impl Trainer<L2Sgd> {
    /// Create a new L2-SGD trainer
    pub fn l2_sgd() -> Self {
        Self::new()
    }

    /// Set the L2 regularization coefficient (builder pattern)
    pub fn with_c2(mut self, c2: f64) -> Result<Self> {
        self.params.set_c2(c2)?;
        Ok(self)
    }

    /// Set maximum iterations (builder pattern)
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Result<Self> {
        self.params.set_max_iterations(max_iterations)?;
        Ok(self)
    }

    /// Set the initial learning rate (builder pattern)
    pub fn with_eta0(mut self, eta0: f64) -> Result<Self> {
        self.params.set_eta0(eta0)?;
        Ok(self)
    }

    /// Set the shuffle seed (builder pattern)
    pub fn with_shuffle_seed(mut self, seed: Option<u64>) -> Self {
        self.params.set_shuffle_seed(seed);
        self
    }

    fn run_l2_sgd(&mut self, features: &mut FeatureSet) -> Result<()> {
        let num_features = features.num_features();
        let n = self.instances.len() as f64;
        let c2 = self.params.c2();
        let eta0 = self.params.eta0();
        let delta = self.params.delta();

        let mut weights = vec![0.0; num_features];
        let mut lattice = Lattice::new(self.labels.len(), self.max_items());
        let mut order: Vec<usize> = (0..self.instances.len()).collect();
        let mut rng = self.shuffle_rng(self.params.shuffle_seed());

        let mut t = 0.0;
        let mut prev_log_likelihood = f64::NEG_INFINITY;

        for epoch in 0..self.params.max_iterations() {
            if order.len() > 1 {
                order.shuffle(&mut rng);
            }

            let mut log_likelihood = 0.0;
            for &idx in &order {
                let instance = &self.instances[idx];
                let seq_len = instance.len();
                let eta = eta0 / (1.0 + t / n);

                features.set_weights(&weights);
                lattice.compute_scores(instance, features);
                let log_z = lattice.forward(seq_len);
                lattice.backward(seq_len);

                log_likelihood += lattice.path_score(&instance.labels) - log_z;

                let expected = lattice.expected_counts(instance, features, log_z);
                let observed = feature_counts(instance, &instance.labels, features);

                let decay = 1.0 - eta * c2 / n;
                for i in 0..num_features {
                    weights[i] =
                        weights[i] * decay + eta * (observed[i] - expected[i]) * instance.weight;
                }
                t += 1.0;
            }

            debug!(epoch = epoch + 1, log_likelihood, "sgd epoch");

            let scale = log_likelihood.abs().max(1.0);
            if epoch > 0 && (log_likelihood - prev_log_likelihood).abs() < delta * scale {
                debug!(epoch = epoch + 1, "converged");
                break;
            }
            prev_log_likelihood = log_likelihood;
        }

        features.set_weights(&weights);
        Ok(())
    }
}
