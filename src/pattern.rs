use std::collections::{HashMap, HashSet};

use regex::RegexBuilder;
use tracing::{debug, warn};

use crate::error::EvalError;
use crate::model::CandidateRecord;

/// Newswire source markers that identify document ids inside a pattern line.
const SOURCE_PREFIXES: &[&str] = &["XIE", "APW", "NYT"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPattern {
    pub regex: String,
    pub expected_docs: HashSet<String>,
}

/// Splits a pattern line into its regular expression and expected doc ids.
pub fn separate_docs(pattern_line: &str) -> AnswerPattern {
    let mut pattern_terms = Vec::<&str>::new();
    let mut expected_docs = HashSet::<String>::new();

    for term in pattern_line.split_whitespace() {
        if SOURCE_PREFIXES.iter().any(|prefix| term.contains(prefix)) {
            expected_docs.insert(term.to_lowercase());
        } else {
            pattern_terms.push(term);
        }
    }

    AnswerPattern {
        regex: pattern_terms.join(" "),
        expected_docs,
    }
}

/// Parses `qid pattern...` lines; the first line for a qid wins.
pub fn parse_pattern_file(text: &str) -> HashMap<String, String> {
    let mut patterns = HashMap::<String, String>::new();

    for line in text.lines() {
        let Some((qid, pattern)) = line.trim().split_once(' ') else {
            continue;
        };
        patterns
            .entry(qid.to_string())
            .or_insert_with(|| pattern.to_string());
    }

    patterns
}

/// Running accuracy over one pattern-evaluation pass.
#[derive(Debug, Default)]
pub struct PatternEvaluator {
    correct: usize,
    total: usize,
}

impl PatternEvaluator {
    /// Scores the top candidate of a question against its pattern line.
    ///
    /// A question with no candidate at all counts as evaluated and wrong.
    pub fn evaluate(
        &mut self,
        qid: &str,
        top: Option<&CandidateRecord>,
        pattern_line: &str,
    ) -> Result<bool, EvalError> {
        let pattern = separate_docs(pattern_line);
        let regex = RegexBuilder::new(&pattern.regex)
            .case_insensitive(true)
            .build()
            .map_err(|source| EvalError::InvalidPattern {
                qid: qid.to_string(),
                source,
            })?;

        let correct = top.is_some_and(|candidate| {
            let text = candidate.text();
            debug!(qid = %qid, doc_id = ?candidate.doc_id, candidate = %text, "pattern check");

            let from_expected_doc = candidate
                .doc_id
                .as_ref()
                .is_some_and(|doc_id| pattern.expected_docs.contains(doc_id));
            from_expected_doc && regex.is_match(&text)
        });

        self.total += 1;
        if correct {
            self.correct += 1;
        }
        Ok(correct)
    }

    /// Looks up the pattern for `qid`; a missing entry is logged and leaves the counters alone.
    pub fn evaluate_question(
        &mut self,
        qid: &str,
        top: Option<&CandidateRecord>,
        patterns: &HashMap<String, String>,
    ) -> Result<Option<bool>, EvalError> {
        let Some(pattern_line) = patterns.get(qid) else {
            warn!(qid = %qid, "pattern not found for question");
            return Ok(None);
        };

        self.evaluate(qid, top, pattern_line).map(Some)
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }
}
