//! Self-consistency scoring of a knowledge base.
//!
//! Every stored question is normalized again and matched against the full
//! question set, itself included. A resolved answer equal to the stored one
//! is a correct answer; a different answer counts as both a false positive
//! and a false negative; a miss is a false negative.

use std::fmt;

use tracing::debug;

use crate::knowledge::{KnowledgeBase, Lookup};
use crate::matcher::Matcher;
use crate::normalizer::TextNormalizer;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub total: usize,
    pub correct: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

pub fn evaluate(
    kb: &KnowledgeBase,
    normalizer: &dyn TextNormalizer,
    matcher: &Matcher,
) -> Evaluation {
    let mut eval = Evaluation {
        total: kb.len(),
        ..Evaluation::default()
    };

    for entry in kb.entries() {
        let query = normalizer.normalize(&entry.question);
        match matcher.lookup(&query, kb) {
            Lookup::Found { answer, .. } if answer == entry.answer => eval.correct += 1,
            Lookup::Found { question, .. } => {
                debug!(
                    "{:?} resolved through {:?} to a different answer",
                    entry.question, question
                );
                eval.false_positives += 1;
                eval.false_negatives += 1;
            }
            Lookup::NotFound => {
                debug!("{:?} does not match itself", entry.question);
                eval.false_negatives += 1;
            }
        }
    }

    eval
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

impl Evaluation {
    pub fn metrics(&self) -> EvaluationMetrics {
        let correct = self.correct as f64;
        let precision = ratio(correct, correct + self.false_positives as f64);
        let recall = ratio(correct, correct + self.false_negatives as f64);
        EvaluationMetrics {
            accuracy: ratio(correct, self.total as f64),
            precision,
            recall,
            f1: ratio(2.0 * precision * recall, precision + recall),
        }
    }
}

impl fmt::Display for EvaluationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Accuracy: {:.2}", self.accuracy)?;
        writeln!(f, "Precision: {:.2}", self.precision)?;
        writeln!(f, "Recall: {:.2}", self.recall)?;
        write!(f, "F1 Score: {:.2}", self.f1)
    }
}
