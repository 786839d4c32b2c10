use std::collections::HashSet;
use std::io::Write;

use anyhow::{Context, Result};

use crate::model::Corpus;
use crate::scoring::{MatchedAnswer, ScoredCandidates};

pub const DEFAULT_THRESHOLD: f64 = 0.7;
pub const DEFAULT_RUN_TAG: &str = "TRECQA";
pub const UNJUDGED_PREFIX: &str = "unjudged";

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub threshold: f64,
    pub run_tag: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            run_tag: DEFAULT_RUN_TAG.to_string(),
        }
    }
}

/// Doc ids already written during one run-file session, across all questions.
#[derive(Debug, Default)]
pub struct SeenDocIds {
    doc_ids: HashSet<String>,
}

impl SeenDocIds {
    pub fn contains(&self, doc_id: &str) -> bool {
        self.doc_ids.contains(doc_id)
    }

    pub fn insert(&mut self, doc_id: &str) {
        self.doc_ids.insert(doc_id.to_string());
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }
}

/// Writes the ranked rows of one question and returns the doc ids emitted.
///
/// Rows are numbered by discovery position, so a dropped duplicate leaves a
/// gap in the rank column. Matches below the threshold (and questions with no
/// gold answers) become `unjudgedN` rows numbered from 1 within the question.
pub fn write_run<W: Write>(
    qid: &str,
    scored: &ScoredCandidates<'_>,
    seen: &mut SeenDocIds,
    config: &RunConfig,
    out: &mut W,
) -> Result<Vec<String>> {
    let mut emitted = Vec::<String>::new();
    let mut unjudged_count = 0_usize;

    for (index, candidate) in scored.iter().enumerate() {
        let rank = index + 1;

        let doc_id = match candidate.matched {
            MatchedAnswer::Gold(answer) if candidate.similarity >= config.threshold => {
                if seen.contains(&answer.answer_id) {
                    continue;
                }
                seen.insert(&answer.answer_id);
                answer.answer_id.clone()
            }
            _ => {
                unjudged_count += 1;
                format!("{UNJUDGED_PREFIX}{unjudged_count}")
            }
        };

        writeln!(
            out,
            "{qid} Q0 {doc_id} {rank} {} {}",
            candidate.score, config.run_tag
        )
        .with_context(|| format!("failed to write run row for question {qid}"))?;
        emitted.push(doc_id);
    }

    Ok(emitted)
}

/// Writes `qid 0 answer_id label` for every gold answer in corpus order.
pub fn write_qrels<W: Write>(corpus: &Corpus, out: &mut W) -> Result<usize> {
    let mut written = 0_usize;

    for qid in &corpus.qids {
        for answer in corpus.answers_for(qid) {
            writeln!(out, "{qid} 0 {} {}", answer.answer_id, answer.label)
                .with_context(|| format!("failed to write qrel row for question {qid}"))?;
            written += 1;
        }
    }

    Ok(written)
}

pub fn is_unjudged(doc_id: &str) -> bool {
    doc_id.contains(UNJUDGED_PREFIX)
}
