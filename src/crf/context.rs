use ndarray::Array2;

use super::feature::{FeatureKind, FeatureSet};
use super::Instance;

/// Log-space lattice for a single instance: Viterbi decoding,
/// forward-backward, and feature expectations.
///
/// Matrices are allocated once per capacity and reused across instances.
/// `forward` overwrites the same scratch Viterbi uses, so capture the Viterbi
/// result before computing the partition function.
#[derive(Debug, Clone)]
pub struct Lattice {
    num_labels: usize,
    cap_items: usize,
    /// State scores, a `[T][L]` matrix
    state: Array2<f64>,
    /// Transition scores, a `[L][L]` matrix
    trans: Array2<f64>,
    /// Forward variables in log space; doubles as the Viterbi delta matrix
    alpha: Array2<f64>,
    /// Backward variables in log space
    beta: Array2<f64>,
    /// Viterbi backpointers
    backptr: Array2<usize>,
}

impl Lattice {
    pub fn new(num_labels: usize, cap_items: usize) -> Self {
        let cap = cap_items.max(1);
        Self {
            num_labels,
            cap_items: cap,
            state: Array2::zeros((cap, num_labels)),
            trans: Array2::zeros((num_labels, num_labels)),
            alpha: Array2::zeros((cap, num_labels)),
            beta: Array2::zeros((cap, num_labels)),
            backptr: Array2::zeros((cap, num_labels)),
        }
    }

    pub fn num_labels(&self) -> usize {
        self.num_labels
    }

    fn ensure_capacity(&mut self, items: usize) {
        if items > self.cap_items {
            self.cap_items = items;
            self.state = Array2::zeros((items, self.num_labels));
            self.alpha = Array2::zeros((items, self.num_labels));
            self.beta = Array2::zeros((items, self.num_labels));
            self.backptr = Array2::zeros((items, self.num_labels));
        }
    }

    /// Fill state and transition scores for an instance under the current
    /// feature weights.
    pub fn compute_scores(&mut self, instance: &Instance, features: &FeatureSet) {
        let seq_len = instance.len();
        self.ensure_capacity(seq_len);

        for t in 0..seq_len {
            for l in 0..self.num_labels {
                self.state[[t, l]] = 0.0;
            }
        }
        self.trans.fill(0.0);

        for (t, item) in instance.items.iter().enumerate() {
            for attr in item {
                let aid = attr.id as usize;
                if aid < features.attr_refs.len() {
                    for &fid in &features.attr_refs[aid].fids {
                        let feature = &features.features[fid as usize];
                        if feature.kind == FeatureKind::State {
                            self.state[[t, feature.dst as usize]] += feature.weight * attr.value;
                        }
                    }
                }
            }
        }

        for refs in &features.label_refs {
            for &fid in &refs.fids {
                let feature = &features.features[fid as usize];
                if feature.kind == FeatureKind::Transition {
                    self.trans[[feature.src as usize, feature.dst as usize]] += feature.weight;
                }
            }
        }
    }

    /// Viterbi decoding. Returns the best label sequence and its
    /// (unnormalized) log-space path score.
    pub fn viterbi(&mut self, seq_len: usize) -> (Vec<u32>, f64) {
        if seq_len == 0 || self.num_labels == 0 {
            return (Vec::new(), 0.0);
        }

        for l in 0..self.num_labels {
            self.alpha[[0, l]] = self.state[[0, l]];
        }
        for t in 1..seq_len {
            for l in 0..self.num_labels {
                let mut best = f64::NEG_INFINITY;
                let mut best_prev = 0;
                for prev in 0..self.num_labels {
                    let score = self.alpha[[t - 1, prev]] + self.trans[[prev, l]];
                    if score > best {
                        best = score;
                        best_prev = prev;
                    }
                }
                self.alpha[[t, l]] = best + self.state[[t, l]];
                self.backptr[[t, l]] = best_prev;
            }
        }

        let mut best = f64::NEG_INFINITY;
        let mut best_label = 0;
        for l in 0..self.num_labels {
            if self.alpha[[seq_len - 1, l]] > best {
                best = self.alpha[[seq_len - 1, l]];
                best_label = l;
            }
        }

        let mut labels = vec![0u32; seq_len];
        labels[seq_len - 1] = best_label as u32;
        let mut current = best_label;
        for t in (1..seq_len).rev() {
            current = self.backptr[[t, current]];
            labels[t - 1] = current as u32;
        }
        (labels, best)
    }

    /// Forward algorithm in log space; returns the log partition function.
    pub fn forward(&mut self, seq_len: usize) -> f64 {
        if seq_len == 0 || self.num_labels == 0 {
            return 0.0;
        }

        for l in 0..self.num_labels {
            self.alpha[[0, l]] = self.state[[0, l]];
        }
        let mut scratch = vec![0.0; self.num_labels];
        for t in 1..seq_len {
            for l in 0..self.num_labels {
                for prev in 0..self.num_labels {
                    scratch[prev] =
                        self.alpha[[t - 1, prev]] + self.trans[[prev, l]] + self.state[[t, l]];
                }
                self.alpha[[t, l]] = logsumexp(&scratch);
            }
        }

        for l in 0..self.num_labels {
            scratch[l] = self.alpha[[seq_len - 1, l]];
        }
        logsumexp(&scratch)
    }

    /// Backward algorithm in log space.
    pub fn backward(&mut self, seq_len: usize) {
        if seq_len == 0 || self.num_labels == 0 {
            return;
        }

        for l in 0..self.num_labels {
            self.beta[[seq_len - 1, l]] = 0.0;
        }
        let mut scratch = vec![0.0; self.num_labels];
        for t in (0..seq_len.saturating_sub(1)).rev() {
            for l in 0..self.num_labels {
                for next in 0..self.num_labels {
                    scratch[next] =
                        self.beta[[t + 1, next]] + self.trans[[l, next]] + self.state[[t + 1, next]];
                }
                self.beta[[t, l]] = logsumexp(&scratch);
            }
        }
    }

    /// Log-space score of an arbitrary label sequence under the current
    /// lattice scores.
    pub fn path_score(&self, labels: &[u32]) -> f64 {
        let mut score = 0.0;
        for (t, &label) in labels.iter().enumerate() {
            score += self.state[[t, label as usize]];
            if t > 0 {
                score += self.trans[[labels[t - 1] as usize, label as usize]];
            }
        }
        score
    }

    /// Log-likelihood `log P(y | x)` of the instance's gold labels.
    ///
    /// Recomputes scores internally; callers should not call
    /// [`compute_scores`](Self::compute_scores) immediately before this.
    pub fn log_likelihood(&mut self, instance: &Instance, features: &FeatureSet) -> f64 {
        self.compute_scores(instance, features);
        let log_z = self.forward(instance.len());
        self.path_score(&instance.labels) - log_z
    }

    /// Expected feature counts under the model distribution.
    ///
    /// Requires `forward` and `backward` to have run for this instance; the
    /// marginals are formed from alpha/beta on the fly.
    pub fn expected_counts(
        &self,
        instance: &Instance,
        features: &FeatureSet,
        log_z: f64,
    ) -> Vec<f64> {
        let seq_len = instance.len();
        let mut counts = vec![0.0; features.num_features()];

        for (t, item) in instance.items.iter().enumerate() {
            for attr in item {
                let aid = attr.id as usize;
                if aid < features.attr_refs.len() {
                    for &fid in &features.attr_refs[aid].fids {
                        let feature = &features.features[fid as usize];
                        if feature.kind == FeatureKind::State {
                            let l = feature.dst as usize;
                            let marginal =
                                (self.alpha[[t, l]] + self.beta[[t, l]] - log_z).exp();
                            counts[fid as usize] += marginal * attr.value;
                        }
                    }
                }
            }
        }

        for t in 1..seq_len {
            for refs in &features.label_refs {
                for &fid in &refs.fids {
                    let feature = &features.features[fid as usize];
                    if feature.kind == FeatureKind::Transition {
                        let i = feature.src as usize;
                        let j = feature.dst as usize;
                        let marginal = (self.alpha[[t - 1, i]]
                            + self.trans[[i, j]]
                            + self.state[[t, j]]
                            + self.beta[[t, j]]
                            - log_z)
                            .exp();
                        counts[fid as usize] += marginal;
                    }
                }
            }
        }

        counts
    }
}

/// Log-sum-exp trick for numerical stability.
///
/// Computes `log(sum(exp(values)))`; returns negative infinity for empty
/// input or when every value is negative infinity.
fn logsumexp(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max.is_infinite() {
        return max;
    }
    let sum: f64 = values.iter().map(|&v| (v - max).exp()).sum();
    max + sum.ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crf::{Dictionary, EncodedAttribute};

    fn tiny_setup() -> (Vec<Instance>, Dictionary, Dictionary) {
        let mut attrs = Dictionary::new();
        let mut labels = Dictionary::new();
        let a0 = attrs.get_or_insert("walk");
        let a1 = attrs.get_or_insert("shop");
        let sunny = labels.get_or_insert("sunny");
        let rainy = labels.get_or_insert("rainy");

        let mut instance = Instance::with_capacity(2);
        instance.push(vec![EncodedAttribute::new(a0, 1.0)], sunny);
        instance.push(vec![EncodedAttribute::new(a1, 1.0)], rainy);
        (vec![instance], attrs, labels)
    }

    #[test]
    fn test_logsumexp_stability() {
        assert_eq!(logsumexp(&[]), f64::NEG_INFINITY);
        let near = logsumexp(&[1000.0, 1000.0]);
        assert!((near - (1000.0 + 2f64.ln())).abs() < 1e-9);
    }

    #[test]
    fn test_viterbi_follows_state_scores() {
        let (instances, attrs, labels) = tiny_setup();
        let mut features = FeatureSet::generate(&instances, &attrs, &labels, 0.0).unwrap();
        // Push the gold configuration up by hand.
        let weights: Vec<f64> = features
            .features
            .iter()
            .map(|f| {
                if f.kind == FeatureKind::State && f.src == f.dst {
                    2.0
                } else {
                    0.0
                }
            })
            .collect();
        features.set_weights(&weights);

        let mut lattice = Lattice::new(labels.len(), 2);
        lattice.compute_scores(&instances[0], &features);
        let (path, score) = lattice.viterbi(2);
        assert_eq!(path, vec![0, 1]);
        assert!((score - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_log_probability_is_nonpositive_and_consistent() {
        let (instances, attrs, labels) = tiny_setup();
        let mut features = FeatureSet::generate(&instances, &attrs, &labels, 0.0).unwrap();
        let weights: Vec<f64> = (0..features.num_features()).map(|i| 0.1 * i as f64).collect();
        features.set_weights(&weights);

        let mut lattice = Lattice::new(labels.len(), 2);
        lattice.compute_scores(&instances[0], &features);
        let (path, best) = lattice.viterbi(2);
        let log_z = lattice.forward(2);

        let log_p = best - log_z;
        assert!(log_p <= 0.0);
        // The best path score must match path_score over the same labels.
        assert!((lattice.path_score(&path) - best).abs() < 1e-9);
    }

    #[test]
    fn test_expected_counts_sum_to_sequence_length() {
        // With a single always-on attribute per position, the state feature
        // expectations must sum to the sequence length.
        let mut attrs = Dictionary::new();
        let mut labels = Dictionary::new();
        let bias = attrs.get_or_insert("bias");
        let a = labels.get_or_insert("a");
        let b = labels.get_or_insert("b");

        let mut instance = Instance::with_capacity(3);
        instance.push(vec![EncodedAttribute::new(bias, 1.0)], a);
        instance.push(vec![EncodedAttribute::new(bias, 1.0)], b);
        instance.push(vec![EncodedAttribute::new(bias, 1.0)], a);

        let instances = vec![instance];
        let features = FeatureSet::generate(&instances, &attrs, &labels, 0.0).unwrap();
        let mut lattice = Lattice::new(labels.len(), 3);
        lattice.compute_scores(&instances[0], &features);
        let log_z = lattice.forward(3);
        lattice.backward(3);
        let expected = lattice.expected_counts(&instances[0], &features, log_z);

        let state_total: f64 = features
            .features
            .iter()
            .zip(&expected)
            .filter(|(f, _)| f.kind == FeatureKind::State)
            .map(|(_, &count)| count)
            .sum();
        assert!((state_total - 3.0).abs() < 1e-6);
    }
}
