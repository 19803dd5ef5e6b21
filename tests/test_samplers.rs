use seqpool::samplers::{
    ClusterSimilaritySampler, CombinedSampler, DistributeSimilaritySampler,
    LeastConfidenceSampler, MaxNormLogProbSampler, QueryBudget, RandomSampler, SampleContext,
    Sampler,
};
use seqpool::{
    Embeddings, Error, Result, Sentence, SequenceTagger, TrainReport,
};

/// Scripted tagger: hands out fixed log-probabilities and labels, the
/// sampler-side stand-in for a trained model.
struct MockTagger {
    log_probs: Vec<f64>,
    labels: Option<Vec<Vec<&'static str>>>,
}

impl MockTagger {
    fn with_log_probs(log_probs: Vec<f64>) -> Self {
        Self {
            log_probs,
            labels: None,
        }
    }

    fn with_labels(log_probs: Vec<f64>, labels: Vec<Vec<&'static str>>) -> Self {
        Self {
            log_probs,
            labels: Some(labels),
        }
    }
}

impl SequenceTagger for MockTagger {
    fn fit(&mut self, _sentences: &[Sentence]) -> Result<TrainReport> {
        Ok(TrainReport {
            instances: 0,
            labels: 0,
            attributes: 0,
            features: 0,
        })
    }

    fn predict(&self, sentences: &mut [Sentence]) -> Result<()> {
        for (i, sentence) in sentences.iter_mut().enumerate() {
            let labels: Vec<String> = match &self.labels {
                Some(all) => all[i].iter().map(|l| l.to_string()).collect(),
                None => vec!["O".to_string(); sentence.len()],
            };
            sentence.set_predictions(labels, self.log_probs[i]);
        }
        Ok(())
    }
}

/// Fixed token vectors keyed by surface form; unknown tokens get a unit
/// vector.
struct MockEmbeddings {
    table: Vec<(&'static str, Vec<f64>)>,
}

impl Embeddings for MockEmbeddings {
    fn dimension(&self) -> usize {
        2
    }

    fn embed(&self, sentences: &mut [Sentence]) {
        for sentence in sentences {
            for token in sentence.tokens_mut() {
                if token.vector().is_some() {
                    continue;
                }
                let vector = self
                    .table
                    .iter()
                    .find(|(text, _)| *text == token.text())
                    .map(|(_, v)| v.clone())
                    .unwrap_or_else(|| vec![1.0, 0.0]);
                token.set_vector(vector);
            }
        }
    }
}

fn one_token_pool(n: usize) -> Vec<Sentence> {
    (0..n)
        .map(|i| Sentence::from_texts(&[format!("tok{i}")]))
        .collect()
}

fn no_embeddings() -> MockEmbeddings {
    MockEmbeddings { table: Vec::new() }
}

#[test]
fn test_least_confidence_queries_lowest_probability_first() {
    // Probabilities rise with the index, so uncertainty falls with it.
    let log_probs: Vec<f64> = (0..10).map(|i| -1.0 + 0.1 * i as f64).collect();
    let tagger = MockTagger::with_log_probs(log_probs);
    let embeddings = no_embeddings();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let mut pool = one_token_pool(10);
    let selected = LeastConfidenceSampler::new()
        .select(&mut pool, QueryBudget::Sentences(4), &ctx)
        .unwrap();
    assert_eq!(selected, vec![0, 1, 2, 3]);
}

#[test]
fn test_max_norm_log_prob_queries_lowest_normalized_score_first() {
    let log_probs = vec![-0.9, -0.8, -0.7, -0.6, -0.5, -0.4, -0.3, -0.2, -0.1, -0.05];
    let tagger = MockTagger::with_log_probs(log_probs);
    let embeddings = no_embeddings();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let mut pool = one_token_pool(10);
    let selected = MaxNormLogProbSampler::new()
        .select(&mut pool, QueryBudget::Sentences(4), &ctx)
        .unwrap();
    assert_eq!(selected, vec![0, 1, 2, 3]);
}

#[test]
fn test_zero_budget_still_selects_one() {
    let tagger = MockTagger::with_log_probs(vec![-0.5, -0.4]);
    let embeddings = no_embeddings();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let mut pool = one_token_pool(2);
    let selected = LeastConfidenceSampler::new()
        .select(&mut pool, QueryBudget::Sentences(0), &ctx)
        .unwrap();
    assert_eq!(selected.len(), 1);
}

#[test]
fn test_token_budget_selects_until_covered() {
    // Sentence lengths 4..=9: a 12-token budget needs between one and three.
    let tagger = MockTagger::with_log_probs(vec![-0.6; 6]);
    let embeddings = no_embeddings();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let mut pool: Vec<Sentence> = (0..6)
        .map(|i| {
            let texts: Vec<String> = (0..4 + i).map(|j| format!("w{i}_{j}")).collect();
            Sentence::from_texts(&texts)
        })
        .collect();

    let selected = LeastConfidenceSampler::new()
        .select(&mut pool, QueryBudget::Tokens(12), &ctx)
        .unwrap();
    assert!((1..=3).contains(&selected.len()));
    let total: usize = selected.iter().map(|&i| pool[i].len()).sum();
    assert!(total >= 12);
}

#[test]
fn test_random_sampler_is_seeded_and_exhaustive() {
    let tagger = MockTagger::with_log_probs(vec![0.0; 8]);
    let embeddings = no_embeddings();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let sampler = RandomSampler::new().with_seed(0);
    let mut pool_a = one_token_pool(8);
    let mut pool_b = one_token_pool(8);
    let a = sampler
        .select(&mut pool_a, QueryBudget::Sentences(8), &ctx)
        .unwrap();
    let b = sampler
        .select(&mut pool_b, QueryBudget::Sentences(8), &ctx)
        .unwrap();
    assert_eq!(a, b);

    let mut sorted = a.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..8).collect::<Vec<_>>());
}

fn diversity_fixture() -> (Vec<Sentence>, MockTagger, MockEmbeddings) {
    // Sentence 0 holds one PER and one LOC entity; sentence 1 holds two PER
    // entities whose vectors disagree. Sentence 2 has no entities.
    let pool = vec![
        Sentence::from_texts(&["anna", "x", "rome"]),
        Sentence::from_texts(&["otto", "y", "karl"]),
        Sentence::from_texts(&["z"]),
    ];
    let tagger = MockTagger::with_labels(
        vec![-0.5, -0.5, -0.5],
        vec![
            vec!["B-PER", "O", "B-LOC"],
            vec!["B-PER", "O", "B-PER"],
            vec!["O"],
        ],
    );
    let embeddings = MockEmbeddings {
        table: vec![
            ("anna", vec![-0.1, 0.1]),
            ("otto", vec![0.1, 0.1]),
            ("karl", vec![0.1, -0.1]),
            ("rome", vec![-0.1, -0.1]),
        ],
    };
    (pool, tagger, embeddings)
}

#[test]
fn test_distribute_similarity_prefers_diverse_sentences() {
    let (mut pool, tagger, embeddings) = diversity_fixture();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    // Sentence 1 scores -0.5, sentence 0 scores 0, sentence 2 has no
    // entities and ranks last.
    let selected = DistributeSimilaritySampler::new()
        .select(&mut pool, QueryBudget::Sentences(2), &ctx)
        .unwrap();
    assert_eq!(selected, vec![1, 0]);
}

#[test]
fn test_distribute_similarity_falls_back_to_random_without_entities() {
    let tagger = MockTagger::with_log_probs(vec![-0.5, -0.4, -0.3]);
    let embeddings = no_embeddings();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let mut pool = one_token_pool(3);
    let selected = DistributeSimilaritySampler::new()
        .with_fallback_seed(11)
        .select(&mut pool, QueryBudget::Sentences(2), &ctx)
        .unwrap();
    assert_eq!(selected.len(), 2);
    assert!(selected.iter().all(|&i| i < 3));
}

#[test]
fn test_cluster_similarity_selects_fringe_sentences() {
    // Six entities in two well-separated blobs; each sentence holds one.
    let pool: Vec<Sentence> = ["a1", "a2", "a3", "b1", "b2", "b3"]
        .iter()
        .map(|t| Sentence::from_texts(&[*t]))
        .collect();
    let tagger = MockTagger::with_labels(
        vec![-0.5; 6],
        vec![vec!["B-ENT"]; 6],
    );
    let embeddings = MockEmbeddings {
        table: vec![
            ("a1", vec![1.0, 2.0]),
            ("a2", vec![1.0, 4.0]),
            ("a3", vec![1.0, 0.0]),
            ("b1", vec![10.0, 2.0]),
            ("b2", vec![10.0, 4.0]),
            ("b3", vec![10.0, 0.0]),
        ],
    };
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let mut pool = pool;
    let selected = ClusterSimilaritySampler::new(2)
        .with_random_state(0)
        .select(&mut pool, QueryBudget::Sentences(2), &ctx)
        .unwrap();
    assert_eq!(selected.len(), 2);
    // The a-blob vectors spread much wider in cosine terms than the b-blob,
    // so both selections come from the a-blob.
    assert!(selected.iter().all(|&i| i < 3));
}

#[test]
fn test_combined_sampler_parse_validation() {
    assert!(matches!(
        CombinedSampler::parse("lcc_ds", "series"),
        Err(Error::UnknownCombination(_))
    ));
    assert!(matches!(
        CombinedSampler::parse("lc_ds", "mix"),
        Err(Error::UnknownCombinationMode(_))
    ));
    assert!(CombinedSampler::parse("lc_ds", "series").is_ok());
    assert!(CombinedSampler::parse("lc_cs", "parallel").is_ok());
    assert!(CombinedSampler::parse("mnlp_ds", "series").is_ok());
    assert!(CombinedSampler::parse("mnlp_cs", "parallel").is_ok());
}

#[test]
fn test_combined_series_selects_within_uncertain_candidates() {
    let (mut pool, tagger, embeddings) = diversity_fixture();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let selected = CombinedSampler::parse("lc_ds", "series")
        .unwrap()
        .select(&mut pool, QueryBudget::Sentences(1), &ctx)
        .unwrap();
    // With uniform uncertainty the diversity half decides: sentence 1.
    assert_eq!(selected, vec![1]);
}

#[test]
fn test_combined_parallel_sums_normalized_scores() {
    let (mut pool, tagger, embeddings) = diversity_fixture();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let selected = CombinedSampler::parse("lc_ds", "parallel")
        .unwrap()
        .select(&mut pool, QueryBudget::Sentences(2), &ctx)
        .unwrap();
    assert_eq!(selected, vec![1, 0]);
}

#[test]
fn test_empty_pool_selects_nothing() {
    let tagger = MockTagger::with_log_probs(Vec::new());
    let embeddings = no_embeddings();
    let ctx = SampleContext {
        tagger: &tagger,
        embeddings: &embeddings,
    };

    let mut pool: Vec<Sentence> = Vec::new();
    for sampler in [
        Box::new(RandomSampler::new()) as Box<dyn Sampler>,
        Box::new(LeastConfidenceSampler::new()),
        Box::new(MaxNormLogProbSampler::new()),
        Box::new(DistributeSimilaritySampler::new()),
        Box::new(ClusterSimilaritySampler::new(2)),
    ] {
        let selected = sampler
            .select(&mut pool, QueryBudget::Sentences(3), &ctx)
            .unwrap();
        assert!(selected.is_empty());
    }
}
