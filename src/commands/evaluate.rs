use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::candidates::adapt;
use crate::cli::{EvaluateArgs, ModelChoice};
use crate::collaborators::{CandidateSource, FetchRequest};
use crate::commands::session::{build_candidate_source, load_corpus};
use crate::model::{
    Corpus, EvaluationConfig, EvaluationPaths, EvaluationReport, PrecisionAtK, PredictedLabels,
};
use crate::precision::precision_report;
use crate::run_file::{RunConfig, SeenDocIds, write_qrels, write_run};
use crate::scoring::score_candidates;
use crate::tokenize::Tokenizer;
use crate::util::{create_text_writer, normalize_whitespace, now_utc_string, sha256_file, write_json_pretty};

const REPORT_VERSION: u32 = 1;

/// What one pass over the corpus produced, besides the run file itself.
#[derive(Debug, Default)]
pub(crate) struct EvaluationOutcome {
    pub predicted: PredictedLabels,
    pub evaluated_qids: Vec<String>,
    pub failed_qids: Vec<String>,
    pub rejected_candidates: usize,
    pub rows_written: usize,
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let corpus = load_corpus(&args.input)?;

    let mut qrel_out = create_text_writer(&args.qrel)?;
    let qrel_rows = write_qrels(&corpus, &mut qrel_out)?;
    qrel_out
        .flush()
        .with_context(|| format!("failed to flush {}", args.qrel.display()))?;
    info!(path = %args.qrel.display(), rows = qrel_rows, "wrote qrels");

    let mut source = build_candidate_source(&args.collaborators, args.model == ModelChoice::Sm)?;
    let tokenizer = Tokenizer::new()?;
    let request = FetchRequest {
        strategy: args.model,
        num_hits: args.hits,
        depth: args.k,
    };
    let run_config = RunConfig {
        threshold: args.threshold,
        run_tag: args.run_tag.clone(),
    };

    let run_path = args.output_path();
    let mut run_out = create_text_writer(&run_path)?;
    let outcome = evaluate_questions(
        &corpus,
        &mut source,
        &tokenizer,
        request,
        &run_config,
        &mut run_out,
    )?;
    run_out
        .flush()
        .with_context(|| format!("failed to flush {}", run_path.display()))?;

    info!(
        path = %run_path.display(),
        rows = outcome.rows_written,
        evaluated = outcome.evaluated_qids.len(),
        failed = outcome.failed_qids.len(),
        rejected_candidates = outcome.rejected_candidates,
        "wrote run file"
    );

    let precision = precision_report(
        &corpus.relevance_labels,
        &outcome.predicted,
        &args.depths,
        args.unknown_doc_policy(),
    )?;
    write_precision(&mut io::BufWriter::new(io::stdout().lock()), &precision)?;

    if let Some(report_path) = &args.report_path {
        let report = EvaluationReport {
            report_version: REPORT_VERSION,
            generated_at: now_utc_string(),
            corpus_sha256: sha256_file(&args.input)?,
            config: EvaluationConfig {
                model: args.model.as_str().to_string(),
                hits: args.hits,
                depth: args.k,
                threshold: args.threshold,
                run_tag: args.run_tag.clone(),
                strict_labels: args.strict_labels,
            },
            paths: EvaluationPaths {
                corpus_path: args.input.display().to_string(),
                run_path: run_path.display().to_string(),
                qrel_path: args.qrel.display().to_string(),
            },
            question_count: corpus.qids.len(),
            gold_answer_count: corpus.answer_count(),
            evaluated_qids: outcome.evaluated_qids,
            failed_qids: outcome.failed_qids,
            rejected_candidate_count: outcome.rejected_candidates,
            run_rows_written: outcome.rows_written,
            precision,
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote evaluation report");
    }

    Ok(())
}

/// Fetches, scores and writes every question of the corpus into one run file.
///
/// A collaborator failure only drops the affected question; it is recorded in
/// `failed_qids` and contributes nothing to the predictions.
pub(crate) fn evaluate_questions<W: Write>(
    corpus: &Corpus,
    source: &mut CandidateSource,
    tokenizer: &Tokenizer,
    request: FetchRequest,
    config: &RunConfig,
    out: &mut W,
) -> Result<EvaluationOutcome> {
    let mut outcome = EvaluationOutcome::default();
    let mut seen = SeenDocIds::default();

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
        outcome.rejected_candidates += adapted.rejected.len();

        let scored = score_candidates(&adapted.records, corpus.answers_for(&question.qid));
        debug!(qid = %question.qid, distinct_candidates = scored.len(), "scored candidates");
        let emitted = write_run(&question.qid, &scored, &mut seen, config, out)?;

        outcome.rows_written += emitted.len();
        outcome.predicted.insert(question.qid.clone(), emitted);
        outcome.evaluated_qids.push(question.qid);
    }

    debug!(distinct_answers = seen.len(), "run file session closed");
    Ok(outcome)
}

fn write_precision<W: Write>(out: &mut W, precision: &[PrecisionAtK]) -> Result<()> {
    for entry in precision {
        writeln!(out, "P@{}: {}", entry.k, entry.precision)?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests;
