//! Unknown-entity gate over external classifier output.
//!
//! The gate does not run inference. It only decides whether a batch of
//! detections contains something confident that is not on the allow-list.

use crate::collector::types::Classification;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct ClassificationGate {
    allow_list: HashSet<String>,
    min_confidence: f32,
}

impl ClassificationGate {
    /// Labels are matched case-insensitively, ignoring surrounding whitespace.
    pub fn new<I, S>(allow_list: I, min_confidence: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            allow_list: allow_list
                .into_iter()
                .map(|s| normalize(s.as_ref()))
                .collect(),
            min_confidence,
        }
    }

    /// First detection, in classifier order, that warrants an unknown-entity alert.
    pub fn evaluate<'a>(&self, results: &'a [Classification]) -> Option<&'a Classification> {
        results.iter().find(|c| self.is_unknown(c))
    }

    pub fn is_unknown(&self, result: &Classification) -> bool {
        result.confidence > self.min_confidence
            && !self.allow_list.contains(&normalize(&result.label))
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}
