use super::*;
use crate::cli::{DashWords, Punctuation};
use crate::collaborators::RerankFlags;
use crate::collaborators::stub::StubRetriever;
use crate::corpus::CorpusParser;
use crate::precision::{UnknownDocPolicy, precision_at_k};

const CORPUS: &str = "\
<QApairs id='1'>
<question>
What is X?
</question>
<positive>
X\tis\tY
</positive>
<negative>
X\tis\tZ
</negative>
</QApairs>
<QApairs id='2'>
<question>
Who wrote B?
</question>
<positive>
A\twrote\tB
</positive>
</QApairs>
";

fn corpus() -> Corpus {
    CorpusParser::new()
        .expect("corpus regexes should compile")
        .parse(CORPUS)
}

fn source(retriever: StubRetriever) -> CandidateSource {
    CandidateSource::new(
        Box::new(retriever),
        RerankFlags {
            punctuation: Punctuation::Keep,
            dash_words: DashWords::Keep,
        },
        "idx".to_string(),
    )
}

fn lexical_request() -> FetchRequest {
    FetchRequest {
        strategy: ModelChoice::Idf,
        num_hits: 20,
        depth: 10,
    }
}

fn evaluate(retriever: StubRetriever) -> (EvaluationOutcome, Vec<String>) {
    let corpus = corpus();
    let mut source = source(retriever);
    let tokenizer = Tokenizer::new().expect("tokenizer regexes should compile");
    let mut out = Vec::new();

    let outcome = evaluate_questions(
        &corpus,
        &mut source,
        &tokenizer,
        lexical_request(),
        &RunConfig::default(),
        &mut out,
    )
    .expect("evaluation should succeed");

    let lines = String::from_utf8(out)
        .expect("run output should be utf-8")
        .lines()
        .map(ToOwned::to_owned)
        .collect();
    (outcome, lines)
}

#[test]
fn writes_matched_and_unjudged_rows_per_question() {
    let retriever = StubRetriever::new()
        .with_passages("What is X?", &["X is Y\t3.0", "completely different text\t2.0"])
        .with_passages("Who wrote B?", &["A wrote B\t1.5"]);

    let (outcome, lines) = evaluate(retriever);

    assert_eq!(
        lines,
        vec![
            "1 Q0 Q1-A1 1 3 TRECQA",
            "1 Q0 unjudged1 2 2 TRECQA",
            "2 Q0 Q2-A1 1 1.5 TRECQA",
        ]
    );
    assert_eq!(outcome.evaluated_qids, vec!["1".to_string(), "2".to_string()]);
    assert!(outcome.failed_qids.is_empty());
    assert_eq!(outcome.rows_written, 3);
    assert_eq!(
        outcome.predicted.get("1"),
        Some(&vec!["Q1-A1".to_string(), "unjudged1".to_string()])
    );
}

#[test]
fn collaborator_failure_skips_only_that_question() {
    let retriever = StubRetriever::new()
        .with_passages("What is X?", &["X is Y\t3.0"])
        .failing_on("Who wrote B?");

    let (outcome, lines) = evaluate(retriever);

    assert_eq!(lines, vec!["1 Q0 Q1-A1 1 3 TRECQA"]);
    assert_eq!(outcome.evaluated_qids, vec!["1".to_string()]);
    assert_eq!(outcome.failed_qids, vec!["2".to_string()]);
    assert!(!outcome.predicted.contains_key("2"));
}

#[test]
fn malformed_passages_are_counted_and_skipped() {
    let retriever = StubRetriever::new()
        .with_passages("What is X?", &["no score at all", "X is Y\tnot-a-number", "X is Y\t1.0"])
        .with_passages("Who wrote B?", &[]);

    let (outcome, lines) = evaluate(retriever);

    assert_eq!(outcome.rejected_candidates, 2);
    assert_eq!(lines, vec!["1 Q0 Q1-A1 1 1 TRECQA"]);
    assert_eq!(outcome.predicted.get("2"), Some(&Vec::new()));
}

#[test]
fn predictions_feed_pooled_precision() {
    let retriever = StubRetriever::new()
        .with_passages("What is X?", &["X is Y\t3.0", "completely different text\t2.0"])
        .with_passages("Who wrote B?", &["A wrote B\t1.5"]);

    let (outcome, _) = evaluate(retriever);
    let corpus = corpus();

    let precision = precision_at_k(
        &corpus.relevance_labels,
        &outcome.predicted,
        5,
        UnknownDocPolicy::Zero,
    )
    .expect("every emitted id is labeled or unjudged");

    assert!((precision - 2.0 / 3.0).abs() < 1e-12, "unexpected precision: {precision}");
}

#[test]
fn precision_lines_use_classic_format() {
    let mut out = Vec::new();

    write_precision(
        &mut out,
        &[
            PrecisionAtK { k: 5, precision: 0.5 },
            PrecisionAtK { k: 10, precision: 0.0 },
        ],
    )
    .expect("write should succeed");

    assert_eq!(
        String::from_utf8(out).expect("utf-8"),
        "P@5: 0.5\nP@10: 0\n"
    );
}
