use std::fs::OpenOptions;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::candidates::adapt;
use crate::cli::{JudgeArgs, ModelChoice};
use crate::collaborators::{CandidateSource, FetchRequest};
use crate::commands::session::{build_candidate_source, load_corpus};
use crate::model::{CandidateRecord, Corpus};
use crate::tokenize::Tokenizer;
use crate::util::{ensure_directory, normalize_whitespace, read_text};

const RULE_WIDTH: usize = 100;

/// Xorshift coin deciding which strategy is shown as list 1.
#[derive(Debug, Clone)]
pub(crate) struct CoinFlip {
    state: u64,
}

impl CoinFlip {
    pub(crate) fn seeded(seed: u64) -> Self {
        Self {
            state: seed.max(1),
        }
    }

    fn from_clock() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or(0x9e37_79b9_7f4a_7c15);
        Self::seeded(nanos)
    }

    pub(crate) fn next_bit(&mut self) -> u8 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        (self.state & 1) as u8
    }
}

/// Session settings shared by every question of one judging pass.
pub(crate) struct JudgeSession<'a> {
    pub tokenizer: &'a Tokenizer,
    pub num_hits: usize,
    pub depth: usize,
    /// Questions up to and including this qid were judged in an earlier session.
    pub resume_after: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct JudgeOutcome {
    pub judged_qids: Vec<String>,
    pub failed_qids: Vec<String>,
}

pub fn run(args: JudgeArgs) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::BufWriter::new(io::stdout().lock());

    let judge_name = match args.judge_name.clone() {
        Some(name) => name,
        None => prompt_judge_name(&mut input, &mut output)?,
    };

    let corpus = load_corpus(&args.input)?;
    let mut source = build_candidate_source(&args.collaborators, true)?;
    let tokenizer = Tokenizer::new()?;

    ensure_directory(&args.judgement_dir)?;
    let path = judgement_path(&args.judgement_dir, &judge_name, args.hits, args.k);
    let resume_after = last_judged_qid(&path)?;
    if let Some(qid) = &resume_after {
        writeln!(output, "You have assessed a few topics already")?;
        info!(path = %path.display(), last_qid = %qid, "resuming judgement session");
    }

    let mut judgements = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let session = JudgeSession {
        tokenizer: &tokenizer,
        num_hits: args.hits,
        depth: args.k,
        resume_after,
    };
    let outcome = judge_questions(
        &corpus,
        &mut source,
        &session,
        &mut CoinFlip::from_clock(),
        &mut input,
        &mut output,
        &mut judgements,
    )?;

    info!(
        path = %path.display(),
        judged = outcome.judged_qids.len(),
        failed = outcome.failed_qids.len(),
        "judgement session finished"
    );
    Ok(())
}

pub(crate) fn judgement_path(dir: &Path, judge_name: &str, hits: usize, k: usize) -> PathBuf {
    dir.join(format!("judgement.{judge_name}.TrecQa.h{hits}.k{k}.txt"))
}

/// First field of the last line of an existing judgement file.
pub(crate) fn last_judged_qid(path: &Path) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }

    let text = read_text(path)?;
    let last_qid = text
        .lines()
        .last()
        .and_then(|line| line.split_whitespace().next())
        .map(ToOwned::to_owned);
    if last_qid.is_none() {
        warn!(path = %path.display(), "judgement file is empty");
    }
    Ok(last_qid)
}

/// `model_choice` 0 shows the neural list first, so response 1 then means `sm`.
pub(crate) fn preferred_strategy(response: u8, model_choice: u8) -> ModelChoice {
    if (response + model_choice) % 2 == 0 {
        ModelChoice::Idf
    } else {
        ModelChoice::Sm
    }
}

pub(crate) fn judge_questions<R: BufRead, W: Write, J: Write>(
    corpus: &Corpus,
    source: &mut CandidateSource,
    session: &JudgeSession<'_>,
    coin: &mut CoinFlip,
    input: &mut R,
    output: &mut W,
    judgements: &mut J,
) -> Result<JudgeOutcome> {
    let mut outcome = JudgeOutcome::default();
    let mut skip_until = session.resume_after.clone();

    for question in corpus.questions() {
        if let Some(last_qid) = skip_until.as_deref() {
            if question.qid == last_qid {
                skip_until = None;
            }
            continue;
        }

        let text = normalize_whitespace(&question.text);
        writeln!(output, "\nQuestion: {text}")?;
        let model_choice = coin.next_bit();

        let lists = fetch_ranked(source, session, &text, ModelChoice::Sm).and_then(|neural| {
            fetch_ranked(source, session, &text, ModelChoice::Idf).map(|lexical| (neural, lexical))
        });
        let (neural, lexical) = match lists {
            Ok(lists) => lists,
            Err(err) => {
                warn!(qid = %question.qid, error = %err, "candidate fetch failed; skipping question");
                outcome.failed_qids.push(question.qid);
                continue;
            }
        };

        let (first, second) = if model_choice == 0 {
            (&neural, &lexical)
        } else {
            (&lexical, &neural)
        };
        write_answer_list(output, "Answer list1:", first)?;
        writeln!(output)?;
        write_answer_list(output, "Answer list2:", second)?;

        let response = prompt_preference(input, output)?;
        let preference = preferred_strategy(response, model_choice);
        writeln!(judgements, "{}\t{}", question.qid, preference.as_str())
            .and_then(|()| judgements.flush())
            .with_context(|| format!("failed to record judgement for question {}", question.qid))?;

        outcome.judged_qids.push(question.qid);
    }

    Ok(outcome)
}

fn fetch_ranked(
    source: &mut CandidateSource,
    session: &JudgeSession<'_>,
    question: &str,
    strategy: ModelChoice,
) -> Result<Vec<CandidateRecord>> {
    let raw = source.fetch(
        question,
        FetchRequest {
            strategy,
            num_hits: session.num_hits,
            depth: session.depth,
        },
    )?;
    Ok(adapt(raw, session.tokenizer).records)
}

fn write_answer_list<W: Write>(out: &mut W, title: &str, records: &[CandidateRecord]) -> Result<()> {
    writeln!(out, "\n{title}")?;
    writeln!(out, "{}", "*".repeat(RULE_WIDTH))?;
    for (index, record) in records.iter().enumerate() {
        writeln!(out, "{} {}", index + 1, record.text())?;
    }
    Ok(())
}

/// Asks until the judge answers `1` or `2`.
fn prompt_preference<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<u8> {
    loop {
        write!(output, "\nWhat ranked list do you prefer[1/2]:")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("failed to read judge input")? == 0 {
            bail!("input closed before a preference was given");
        }

        match line.trim() {
            "1" => return Ok(1),
            "2" => return Ok(2),
            _ => continue,
        }
    }
}

fn prompt_judge_name<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<String> {
    writeln!(output, "Enter your name:")?;
    output.flush()?;

    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read judge name")?;

    let name = line.trim();
    if name.is_empty() {
        bail!("a judge name is required to name the judgement file");
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests;
