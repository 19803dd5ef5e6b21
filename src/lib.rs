//! Pool-based active learning for sequence labeling
//!
//! This library implements the pool-based active-learning loop for
//! sequence-tagging tasks: load a small labeled seed corpus and a large
//! unlabeled pool, train a tagger, query the most informative pool
//! sentences with a sampler, annotate them, and retrain. A pure Rust
//! linear-chain CRF tagger ships in the box; any model implementing
//! [`SequenceTagger`] can drive the loop instead.
//!
//! # Examples
//!
//! ## The query loop
//!
//! ```no_run
//! use seqpool::samplers::{LeastConfidenceSampler, QueryBudget};
//! use seqpool::{
//!     ActiveLearner, ColumnMap, Corpus, CrfTagger, HashEmbeddings, Oracle, Pool, SimulatedOracle,
//! };
//!
//! let columns = ColumnMap::new().set(0, "text").set(1, "ner");
//! let corpus = Corpus::from_column_files(&columns, "ner", "data/seed.txt", None, None)?;
//! let mut pool = Pool::from_column_file("data/pool.txt", &columns, "ner")?;
//!
//! let mut learner = ActiveLearner::new(
//!     CrfTagger::default(),
//!     LeastConfidenceSampler::new(),
//!     Box::new(HashEmbeddings::default()),
//!     corpus,
//! );
//! learner.fit()?;
//!
//! for _ in 0..5 {
//!     let mut batch = learner.query(&mut pool, QueryBudget::Sentences(10))?;
//!     SimulatedOracle.annotate(&mut batch)?;
//!     let report = learner.teach(batch)?;
//!     println!("round {}: {} training sentences", report.round, report.train_size);
//! }
//! # Ok::<(), seqpool::Error>(())
//! ```
//!
//! ## Training and tagging directly
//!
//! ```no_run
//! use seqpool::{CrfTagger, SequenceTagger, Sentence, Token};
//!
//! let train = vec![Sentence::new(vec![
//!     Token::with_gold("Berlin", "B-LOC"),
//!     Token::with_gold("calling", "O"),
//! ])];
//! let mut tagger = CrfTagger::default();
//! tagger.fit(&train)?;
//!
//! let mut unseen = vec![Sentence::from_texts(&["visit", "Berlin"])];
//! tagger.predict(&mut unseen)?;
//! # Ok::<(), seqpool::Error>(())
//! ```

mod corpus;
mod embeddings;
mod entities;
mod error;
mod eval;
mod features;
mod learner;
mod sentence;
mod tagger;

/// Linear-chain CRF engine backing the built-in tagger
pub mod crf;
/// Pool sampling strategies
pub mod samplers;

// Re-export main types
pub use self::corpus::{ColumnMap, Corpus, Pool};
pub use self::embeddings::{cosine_similarity, Embeddings, HashEmbeddings};
pub use self::entities::{Entities, Entity};
pub use self::error::{Error, Result};
pub use self::eval::{span_scores, LabelTally, SpanScores};
pub use self::features::{Attribute, WindowFeatures};
pub use self::learner::{ActiveLearner, Oracle, RoundReport, SimulatedOracle};
pub use self::sentence::{LabeledSpan, Sentence, Token};
pub use self::tagger::{Algorithm, CrfTagger, SequenceTagger, TrainReport};

// Re-export the sampler interface for convenience
pub use self::samplers::{QueryBudget, SampleContext, Sampler};
