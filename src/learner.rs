use serde::{Deserialize, Serialize};
use tracing::info;

use crate::corpus::{Corpus, Pool};
use crate::embeddings::Embeddings;
use crate::error::{Error, Result};
use crate::eval::{span_scores, SpanScores};
use crate::samplers::{QueryBudget, SampleContext, Sampler};
use crate::sentence::Sentence;
use crate::tagger::{SequenceTagger, TrainReport};

/// The annotator closing the query loop.
pub trait Oracle {
    /// Ensure the queried sentences carry gold labels.
    fn annotate(&self, sentences: &mut [Sentence]) -> Result<()>;
}

/// Simulation oracle for pools loaded from labeled files: the gold labels
/// are already on the sentences, so annotation only verifies they exist.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedOracle;

impl Oracle for SimulatedOracle {
    fn annotate(&self, sentences: &mut [Sentence]) -> Result<()> {
        for sentence in sentences.iter() {
            if !sentence.is_labeled() {
                return Err(Error::MissingGoldLabels);
            }
        }
        Ok(())
    }
}

/// Outcome of one teach round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: usize,
    /// Newly added sentences this round
    pub added: usize,
    /// Training set size after the round
    pub train_size: usize,
    /// Dev-set scores, when a dev split exists
    pub dev: Option<SpanScores>,
    pub train: TrainReport,
}

/// Pool-based active learner: owns the tagger, the sampler, and the growing
/// training set; the caller drives the query/annotate/teach loop.
pub struct ActiveLearner<T: SequenceTagger, S: Sampler> {
    tagger: T,
    sampler: S,
    embeddings: Box<dyn Embeddings>,
    train_set: Vec<Sentence>,
    dev_set: Vec<Sentence>,
    test_set: Vec<Sentence>,
    rounds: usize,
}

impl<T: SequenceTagger, S: Sampler> ActiveLearner<T, S> {
    /// Build a learner seeded with the corpus train split.
    pub fn new(tagger: T, sampler: S, embeddings: Box<dyn Embeddings>, corpus: Corpus) -> Self {
        Self {
            tagger,
            sampler,
            embeddings,
            train_set: corpus.train,
            dev_set: corpus.dev,
            test_set: corpus.test,
            rounds: 0,
        }
    }

    pub fn tagger(&self) -> &T {
        &self.tagger
    }

    pub fn train_set(&self) -> &[Sentence] {
        &self.train_set
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Train the tagger on the current training set.
    pub fn fit(&mut self) -> Result<TrainReport> {
        self.tagger.fit(&self.train_set)
    }

    /// Rank the pool with the sampler and split off the selected sentences.
    ///
    /// The selection is returned most informative first; the remainder stays
    /// in the pool.
    pub fn query(&self, pool: &mut Pool, budget: QueryBudget) -> Result<Vec<Sentence>> {
        let ctx = SampleContext {
            tagger: &self.tagger,
            embeddings: self.embeddings.as_ref(),
        };
        let selected = self.sampler.select(pool.sentences_mut(), budget, &ctx)?;
        info!(
            selected = selected.len(),
            remaining = pool.len() - selected.len(),
            "queried pool"
        );
        Ok(pool.take(&selected))
    }

    /// Merge newly annotated sentences into the training set and retrain.
    pub fn teach(&mut self, sentences: Vec<Sentence>) -> Result<RoundReport> {
        for sentence in &sentences {
            if !sentence.is_labeled() {
                return Err(Error::MissingGoldLabels);
            }
        }

        let added = sentences.len();
        for mut sentence in sentences {
            sentence.clear_predictions();
            self.train_set.push(sentence);
        }
        self.rounds += 1;

        let train = self.tagger.fit(&self.train_set)?;
        let dev = if self.dev_set.is_empty() {
            None
        } else {
            self.tagger.predict(&mut self.dev_set)?;
            Some(span_scores(&self.dev_set))
        };

        let report = RoundReport {
            round: self.rounds,
            added,
            train_size: self.train_set.len(),
            dev,
            train,
        };
        info!(
            round = report.round,
            added = report.added,
            train_size = report.train_size,
            dev_f1 = report.dev.as_ref().map(|d| d.f1),
            "teach round complete"
        );
        Ok(report)
    }

    /// Predict and score an arbitrary labeled set with the current model.
    pub fn evaluate(&self, sentences: &mut [Sentence]) -> Result<SpanScores> {
        self.tagger.predict(sentences)?;
        Ok(span_scores(sentences))
    }

    /// Score the held-out test split, when one was provided.
    pub fn evaluate_test(&mut self) -> Result<Option<SpanScores>> {
        if self.test_set.is_empty() {
            return Ok(None);
        }
        self.tagger.predict(&mut self.test_set)?;
        Ok(Some(span_scores(&self.test_set)))
    }
}
