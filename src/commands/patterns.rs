use std::collections::HashMap;
use std::io::{self, Write};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::candidates::adapt;
use crate::cli::{ModelChoice, PatternArgs};
use crate::collaborators::{CandidateSource, FetchRequest};
use crate::commands::session::{build_candidate_source, load_corpus};
use crate::model::Corpus;
use crate::pattern::{PatternEvaluator, parse_pattern_file};
use crate::tokenize::Tokenizer;
use crate::util::{normalize_whitespace, read_text};

#[derive(Debug, Default)]
pub(crate) struct PatternOutcome {
    pub evaluator: PatternEvaluator,
    pub failed_qids: Vec<String>,
    pub invalid_pattern_qids: Vec<String>,
}

pub fn run(args: PatternArgs) -> Result<()> {
    let corpus = load_corpus(&args.input)?;
    let patterns = parse_pattern_file(&read_text(&args.pattern)?);
    info!(path = %args.pattern.display(), patterns = patterns.len(), "loaded answer patterns");

    let mut source = build_candidate_source(&args.collaborators, args.model == ModelChoice::Sm)?;
    let tokenizer = Tokenizer::new()?;
    let request = FetchRequest {
        strategy: args.model,
        num_hits: args.h0,
        depth: args.h1,
    };

    let outcome = evaluate_patterns(&corpus, &mut source, &tokenizer, request, &patterns)?;
    info!(
        correct = outcome.evaluator.correct(),
        total = outcome.evaluator.total(),
        failed = outcome.failed_qids.len(),
        invalid_patterns = outcome.invalid_pattern_qids.len(),
        "pattern evaluation finished"
    );

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "Accuracy: {}", outcome.evaluator.accuracy())?;
    output.flush()?;

    Ok(())
}

/// Checks the top-ranked candidate of every question against its answer pattern.
pub(crate) fn evaluate_patterns(
    corpus: &Corpus,
    source: &mut CandidateSource,
    tokenizer: &Tokenizer,
    request: FetchRequest,
    patterns: &HashMap<String, String>,
) -> Result<PatternOutcome> {
    let mut outcome = PatternOutcome::default();

    for question in corpus.questions() {
        let text = normalize_whitespace(&question.text);

        let raw = match source.fetch(&text, request) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(qid = %question.qid, error = %err, "candidate fetch failed; skipping question");
                outcome.failed_qids.push(question.qid);
                continue;
            }
        };

        let adapted = adapt(raw, tokenizer);
        for rejected in &adapted.rejected {
            warn!(qid = %question.qid, error = %rejected, "skipping malformed candidate");
        }

        match outcome
            .evaluator
            .evaluate_question(&question.qid, adapted.records.first(), patterns)
        {
            Ok(Some(correct)) => debug!(qid = %question.qid, correct, "pattern evaluated"),
            Ok(None) => {}
            Err(err) => {
                warn!(qid = %question.qid, error = %err, "skipping question with invalid pattern");
                outcome.invalid_pattern_qids.push(question.qid);
            }
        }
    }

    Ok(outcome)
}
