use std::collections::{HashMap, HashSet};

use crate::model::{AnswerRecord, CandidateRecord};

/// Gold answer a candidate text was attributed to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchedAnswer<'a> {
    Gold(&'a AnswerRecord),
    /// The question has no gold answers.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub text: String,
    pub matched: MatchedAnswer<'a>,
    pub similarity: f64,
    pub score: f64,
}

/// Scored candidates keyed by candidate text, iterated in first-seen order.
#[derive(Debug, Default)]
pub struct ScoredCandidates<'a> {
    entries: Vec<ScoredCandidate<'a>>,
    index: HashMap<String, usize>,
}

impl<'a> ScoredCandidates<'a> {
    #[cfg(test)]
    pub fn get(&self, text: &str) -> Option<&ScoredCandidate<'a>> {
        self.index.get(text).map(|position| &self.entries[*position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredCandidate<'a>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn insert_if_absent(&mut self, candidate: ScoredCandidate<'a>) {
        if self.index.contains_key(&candidate.text) {
            return;
        }
        self.index
            .insert(candidate.text.clone(), self.entries.len());
        self.entries.push(candidate);
    }

    /// Keeps the entry with the strictly greater similarity; ties keep the earlier one.
    fn upsert_best(&mut self, candidate: ScoredCandidate<'a>) {
        let Some(position) = self.index.get(&candidate.text).copied() else {
            self.insert_if_absent(candidate);
            return;
        };

        if candidate.similarity > self.entries[position].similarity {
            self.entries[position] = candidate;
        }
    }
}

/// Jaccard similarity of two token sets; two empty sets score 0.
pub fn jaccard<S: AsRef<str>>(left: &[S], right: &[S]) -> f64 {
    let left = left.iter().map(AsRef::as_ref).collect::<HashSet<&str>>();
    let right = right.iter().map(AsRef::as_ref).collect::<HashSet<&str>>();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }

    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

/// Attributes every distinct candidate text to its most similar gold answer.
pub fn score_candidates<'a>(
    candidates: &[CandidateRecord],
    gold_answers: &'a [AnswerRecord],
) -> ScoredCandidates<'a> {
    let mut scored = ScoredCandidates::default();

    for candidate in candidates {
        let text = candidate.text();

        if gold_answers.is_empty() {
            scored.insert_if_absent(ScoredCandidate {
                text,
                matched: MatchedAnswer::Empty,
                similarity: 0.0,
                score: candidate.score,
            });
            continue;
        }

        for answer in gold_answers {
            scored.upsert_best(ScoredCandidate {
                text: text.clone(),
                matched: MatchedAnswer::Gold(answer),
                similarity: jaccard(&candidate.tokens, &answer.tokens),
                score: candidate.score,
            });
        }
    }

    scored
}
