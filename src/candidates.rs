use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::model::CandidateRecord;
use crate::tokenize::Tokenizer;

/// One reranked passage as returned by the reranker collaborator.
///
/// Serialized as a bare JSON array, `[score, text]` or `[text, docid, score]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RerankedAnswer {
    Scored(f64, String),
    Sourced(String, String, f64),
}

impl RerankedAnswer {
    pub fn score(&self) -> f64 {
        match self {
            Self::Scored(score, _) | Self::Sourced(_, _, score) => *score,
        }
    }
}

/// Candidate lists as produced by the collaborators, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "candidates", rename_all = "snake_case")]
pub enum RawCandidates {
    /// Tab-delimited passages straight from retrieval.
    Lexical(Vec<String>),
    /// Reranker output; order is not guaranteed.
    Neural(Vec<RerankedAnswer>),
}

#[derive(Debug, Default)]
pub struct AdaptedCandidates {
    pub records: Vec<CandidateRecord>,
    pub rejected: Vec<EvalError>,
}

pub fn adapt(raw: RawCandidates, tokenizer: &Tokenizer) -> AdaptedCandidates {
    match raw {
        RawCandidates::Lexical(passages) => {
            let mut adapted = AdaptedCandidates::default();
            for passage in &passages {
                match adapt_passage(passage, tokenizer) {
                    Ok(record) => adapted.records.push(record),
                    Err(err) => adapted.rejected.push(err),
                }
            }
            adapted
        }
        RawCandidates::Neural(answers) => AdaptedCandidates {
            records: adapt_reranked(answers, tokenizer),
            rejected: Vec::new(),
        },
    }
}

/// Parses `text\tscore` or `text\tdocid\tscore`.
pub fn adapt_passage(raw: &str, tokenizer: &Tokenizer) -> Result<CandidateRecord, EvalError> {
    let lowered = raw.to_lowercase();
    let fields = lowered.split('\t').collect::<Vec<&str>>();

    let (text, doc_id, score) = match fields.as_slice() {
        [text, score] => (*text, None, *score),
        [text, doc_id, score] => (*text, Some(doc_id.trim().to_string()), *score),
        _ => {
            return Err(EvalError::MalformedCandidate {
                raw: raw.to_string(),
                fields: fields.len(),
            });
        }
    };

    let score = score
        .trim()
        .parse::<f64>()
        .map_err(|_| EvalError::InvalidScore {
            raw: score.to_string(),
        })?;

    Ok(CandidateRecord {
        tokens: tokenizer.tokenize(text),
        doc_id,
        score,
    })
}

/// Orders reranker output by descending score and normalizes it.
pub fn adapt_reranked(mut answers: Vec<RerankedAnswer>, tokenizer: &Tokenizer) -> Vec<CandidateRecord> {
    answers.sort_by(|left, right| right.score().total_cmp(&left.score()));

    answers
        .into_iter()
        .map(|answer| {
            let (text, doc_id, score) = match answer {
                RerankedAnswer::Scored(score, text) => (text, None, score),
                RerankedAnswer::Sourced(text, doc_id, score) => {
                    (text, Some(doc_id.trim().to_lowercase()), score)
                }
            };
            let sentence = text.split('\t').next().unwrap_or_default();

            CandidateRecord {
                tokens: tokenizer.tokenize(sentence),
                doc_id,
                score,
            }
        })
        .collect()
}
