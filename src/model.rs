use std::collections::HashMap;

use serde::Serialize;

/// `qid -> gold answers` in corpus order.
pub type GoldAnswerSet = HashMap<String, Vec<AnswerRecord>>;

/// `qid -> (answer_id -> label)`.
pub type RelevanceLabels = HashMap<String, HashMap<String, u8>>;

/// `qid -> doc ids` in the order they were written to the run file.
pub type PredictedLabels = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub answer_id: String,
    pub tokens: Vec<String>,
    pub label: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub qid: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    /// Question ids in the order their `<QApairs>` block first appeared.
    pub qids: Vec<String>,
    pub questions: HashMap<String, String>,
    pub gold_answers: GoldAnswerSet,
    pub relevance_labels: RelevanceLabels,
}

impl Corpus {
    /// Questions in encounter order; qids whose block carried no question line are skipped.
    pub fn questions(&self) -> impl Iterator<Item = Question> + '_ {
        self.qids.iter().filter_map(|qid| {
            self.questions.get(qid).map(|text| Question {
                qid: qid.clone(),
                text: text.clone(),
            })
        })
    }

    /// Qids whose block never carried a question line; they are left out of [`Self::questions`].
    pub fn qids_without_question(&self) -> impl Iterator<Item = &str> + '_ {
        self.qids
            .iter()
            .filter(|qid| !self.questions.contains_key(*qid))
            .map(String::as_str)
    }

    pub fn answers_for(&self, qid: &str) -> &[AnswerRecord] {
        self.gold_answers
            .get(qid)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn answer_count(&self) -> usize {
        self.gold_answers.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub tokens: Vec<String>,
    pub doc_id: Option<String>,
    pub score: f64,
}

impl CandidateRecord {
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PrecisionAtK {
    pub k: usize,
    pub precision: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationConfig {
    pub model: String,
    pub hits: usize,
    pub depth: usize,
    pub threshold: f64,
    pub run_tag: String,
    pub strict_labels: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationPaths {
    pub corpus_path: String,
    pub run_path: String,
    pub qrel_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub report_version: u32,
    pub generated_at: String,
    pub corpus_sha256: String,
    pub config: EvaluationConfig,
    pub paths: EvaluationPaths,
    pub question_count: usize,
    pub gold_answer_count: usize,
    pub evaluated_qids: Vec<String>,
    pub failed_qids: Vec<String>,
    pub rejected_candidate_count: usize,
    pub run_rows_written: usize,
    pub precision: Vec<PrecisionAtK>,
}
