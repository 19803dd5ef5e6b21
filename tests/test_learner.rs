use std::io::Write;

use seqpool::samplers::{LeastConfidenceSampler, QueryBudget};
use seqpool::{
    ActiveLearner, ColumnMap, Corpus, CrfTagger, Error, HashEmbeddings, Oracle, Pool,
    SimulatedOracle,
};

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const SEED: &str = "\
went O
to O
berlin B-LOC

anna B-PER
slept O

otto B-PER
visited O
rome B-LOC

trains O
reach O
paris B-LOC
";

const DEV: &str = "\
anna B-PER
visited O
berlin B-LOC
";

const POOL: &str = "\
karl B-PER
went O
to O
rome B-LOC

rain O
fell O

maria B-PER
slept O

visited O
tokyo B-LOC
";

fn columns() -> ColumnMap {
    ColumnMap::new().set(0, "text").set(1, "ner")
}

fn build_learner() -> (ActiveLearner<CrfTagger, LeastConfidenceSampler>, Pool) {
    let seed = write_temp(SEED);
    let dev = write_temp(DEV);
    let pool_file = write_temp(POOL);

    let corpus =
        Corpus::from_column_files(&columns(), "ner", seed.path(), Some(dev.path()), None).unwrap();
    let pool = Pool::from_column_file(pool_file.path(), &columns(), "ner").unwrap();

    let learner = ActiveLearner::new(
        CrfTagger::default(),
        LeastConfidenceSampler::new(),
        Box::new(HashEmbeddings::default()),
        corpus,
    );
    (learner, pool)
}

#[test]
fn test_full_query_annotate_teach_loop() {
    let (mut learner, mut pool) = build_learner();
    let initial_train = learner.train_set().len();
    let initial_pool = pool.len();

    let report = learner.fit().unwrap();
    assert_eq!(report.instances, initial_train);
    assert!(report.labels >= 3);

    let oracle = SimulatedOracle;
    for round in 1..=2 {
        let mut batch = learner.query(&mut pool, QueryBudget::Sentences(1)).unwrap();
        assert_eq!(batch.len(), 1);
        oracle.annotate(&mut batch).unwrap();

        let report = learner.teach(batch).unwrap();
        assert_eq!(report.round, round);
        assert_eq!(report.added, 1);
        assert_eq!(report.train_size, initial_train + round);

        let dev = report.dev.expect("dev split configured");
        assert!((0.0..=1.0).contains(&dev.f1));
        assert!((0.0..=1.0).contains(&dev.token_accuracy));
    }

    assert_eq!(pool.len(), initial_pool - 2);
    assert_eq!(learner.rounds(), 2);
}

#[test]
fn test_token_budget_query() {
    let (mut learner, mut pool) = build_learner();
    learner.fit().unwrap();

    let batch = learner.query(&mut pool, QueryBudget::Tokens(5)).unwrap();
    let tokens: usize = batch.iter().map(|s| s.len()).sum();
    assert!(tokens >= 5 || pool.is_empty());
    assert!(!batch.is_empty());
}

#[test]
fn test_query_on_drained_pool_returns_nothing() {
    let (mut learner, mut pool) = build_learner();
    learner.fit().unwrap();

    let everything = learner
        .query(&mut pool, QueryBudget::Sentences(100))
        .unwrap();
    assert_eq!(everything.len(), 4);
    assert!(pool.is_empty());

    let nothing = learner.query(&mut pool, QueryBudget::Sentences(5)).unwrap();
    assert!(nothing.is_empty());
}

#[test]
fn test_teach_unlabeled_plain_text_batch_fails() {
    let (mut learner, _) = build_learner();
    learner.fit().unwrap();

    let plain = write_temp("some unlabeled words\n");
    let mut plain_pool = Pool::from_plain_text(plain.path()).unwrap();
    let batch = learner
        .query(&mut plain_pool, QueryBudget::Sentences(1))
        .unwrap();

    // Without an annotator filling in labels, teaching must refuse.
    assert!(matches!(
        learner.teach(batch),
        Err(Error::MissingGoldLabels)
    ));
}
