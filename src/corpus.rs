use anyhow::{Context, Result};
use regex::Regex;

use crate::model::{AnswerRecord, Corpus};

/// Line-oriented reader for the TrecQA `<QApairs>` markup.
///
/// Marker lines annotate the line that follows them; anything that does not
/// fit the expected shape is skipped without error.
pub struct CorpusParser {
    qapairs: Regex,
    label: Regex,
}

impl CorpusParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            qapairs: Regex::new(r"^<QApairs id='(.*)'>")
                .context("failed to compile QApairs marker regex")?,
            label: Regex::new(r"^<(positive|negative)>")
                .context("failed to compile answer label regex")?,
        })
    }

    pub fn parse(&self, text: &str) -> Corpus {
        let mut corpus = Corpus::default();
        let mut current_qid: Option<String> = None;
        let mut answer_ordinal = 0_usize;
        let mut prev = "";

        for raw_line in text.lines() {
            let line = raw_line.trim();

            if let Some(captures) = self.qapairs.captures(line) {
                let qid = captures
                    .get(1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                answer_ordinal = 0;

                if !corpus.gold_answers.contains_key(&qid) {
                    corpus.qids.push(qid.clone());
                    corpus.gold_answers.insert(qid.clone(), Vec::new());
                }
                corpus.relevance_labels.entry(qid.clone()).or_default();
                current_qid = Some(qid);
            }

            if let Some(qid) = current_qid.as_deref() {
                if prev.starts_with("<question>") {
                    corpus
                        .questions
                        .entry(qid.to_string())
                        .or_insert_with(|| line.to_string());
                }

                if let Some(label) = self.answer_label(prev) {
                    answer_ordinal += 1;
                    let answer_id = format!("Q{qid}-A{answer_ordinal}");
                    let tokens = line
                        .split('\t')
                        .map(str::to_lowercase)
                        .collect::<Vec<String>>();

                    corpus
                        .relevance_labels
                        .entry(qid.to_string())
                        .or_default()
                        .insert(answer_id.clone(), label);
                    corpus
                        .gold_answers
                        .entry(qid.to_string())
                        .or_default()
                        .push(AnswerRecord {
                            answer_id,
                            tokens,
                            label,
                        });
                }
            }

            prev = line;
        }

        corpus
    }

    fn answer_label(&self, marker_line: &str) -> Option<u8> {
        let captures = self.label.captures(marker_line)?;
        match captures.get(1)?.as_str() {
            "positive" => Some(1),
            _ => Some(0),
        }
    }
}
