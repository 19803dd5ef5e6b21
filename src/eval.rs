use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::sentence::Sentence;

/// Gold/predicted/correct span counts for one label.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct LabelTally {
    pub gold: usize,
    pub predicted: usize,
    pub correct: usize,
}

/// Span-level micro-averaged precision/recall/F1 plus token accuracy.
///
/// A predicted span counts as correct only on exact boundary and label
/// match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub token_accuracy: f64,
    pub per_label: BTreeMap<String, LabelTally>,
}

/// Score predicted labels against gold labels across a sentence slice.
pub fn span_scores(sentences: &[Sentence]) -> SpanScores {
    let mut per_label: BTreeMap<String, LabelTally> = BTreeMap::new();
    let mut gold_total = 0;
    let mut predicted_total = 0;
    let mut correct_total = 0;
    let mut token_total = 0;
    let mut token_correct = 0;

    for sentence in sentences {
        let gold = sentence.gold_spans();
        let predicted = sentence.predicted_spans();

        let gold_set: HashSet<_> = gold.iter().cloned().collect();
        for span in &gold {
            per_label.entry(span.label.clone()).or_default().gold += 1;
        }
        gold_total += gold.len();

        for span in &predicted {
            let tally = per_label.entry(span.label.clone()).or_default();
            tally.predicted += 1;
            if gold_set.contains(span) {
                tally.correct += 1;
                correct_total += 1;
            }
        }
        predicted_total += predicted.len();

        for token in sentence.tokens() {
            if let Some(gold_label) = token.gold_label() {
                token_total += 1;
                if token.predicted_label() == Some(gold_label) {
                    token_correct += 1;
                }
            }
        }
    }

    let precision = ratio(correct_total, predicted_total);
    let recall = ratio(correct_total, gold_total);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    SpanScores {
        precision,
        recall,
        f1,
        token_accuracy: ratio(token_correct, token_total),
        per_label,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
