//! Simulated active-learning loop on a small synthetic NER corpus.
//!
//! Builds a labeled seed set, a labeled pool standing in for the annotator,
//! and a dev split, then runs a few query/teach rounds with least-confidence
//! sampling and prints the dev F1 trajectory.

use seqpool::samplers::{LeastConfidenceSampler, QueryBudget};
use seqpool::{
    ActiveLearner, Corpus, CrfTagger, HashEmbeddings, Oracle, Pool, Result, Sentence,
    SimulatedOracle, Token,
};

fn labeled(pairs: &[(&str, &str)]) -> Sentence {
    Sentence::new(
        pairs
            .iter()
            .map(|(text, label)| Token::with_gold(*text, *label))
            .collect(),
    )
}

fn templates(people: &[&str], places: &[&str]) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    for person in people {
        sentences.push(labeled(&[(person, "B-PER"), ("arrived", "O"), ("late", "O")]));
        sentences.push(labeled(&[(person, "B-PER"), ("slept", "O")]));
    }
    for place in places {
        sentences.push(labeled(&[("went", "O"), ("to", "O"), (place, "B-LOC")]));
        sentences.push(labeled(&[("leaving", "O"), (place, "B-LOC"), ("today", "O")]));
    }
    sentences
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let corpus = Corpus {
        train: templates(&["anna", "otto"], &["berlin", "rome"]),
        dev: templates(&["karl", "maria"], &["paris", "tokyo"]),
        test: Vec::new(),
    };
    let mut pool = Pool::from_sentences(templates(
        &["karl", "maria", "ivan", "lena"],
        &["paris", "tokyo", "oslo", "kyiv"],
    ));

    println!("Active learning demo");
    println!("====================\n");
    println!("Seed sentences:  {}", corpus.train.len());
    println!("Pool sentences:  {}\n", pool.len());

    let mut learner = ActiveLearner::new(
        CrfTagger::default(),
        LeastConfidenceSampler::new(),
        Box::new(HashEmbeddings::default()),
        corpus,
    );

    learner.fit()?;
    let oracle = SimulatedOracle;

    for _ in 0..4 {
        let mut batch = learner.query(&mut pool, QueryBudget::Sentences(2))?;
        oracle.annotate(&mut batch)?;
        let report = learner.teach(batch)?;

        let dev_f1 = report.dev.as_ref().map(|d| d.f1).unwrap_or(0.0);
        println!(
            "round {}: +{} sentences ({} total), dev F1 = {:.3}",
            report.round, report.added, report.train_size, dev_f1
        );
    }

    println!("\nPool sentences left: {}", pool.len());
    Ok(())
}
