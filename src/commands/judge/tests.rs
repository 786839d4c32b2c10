use std::fs;
use std::io::Cursor;

use super::*;
use crate::cli::{DashWords, Punctuation};
use crate::collaborators::RerankFlags;
use crate::collaborators::stub::{StubReranker, StubRetriever};
use crate::corpus::CorpusParser;

const CORPUS: &str = "\
<QApairs id='1'>
<question>
What is X?
</question>
<QApairs id='2'>
<question>
Who wrote B?
</question>
<QApairs id='3'>
<question>
Where is C?
</question>
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
    .with_reranker(Box::new(StubReranker::reversing()))
}

fn full_retriever() -> StubRetriever {
    StubRetriever::new()
        .with_passages("What is X?", &["first x\t2.0", "second x\t1.0"])
        .with_passages("Who wrote B?", &["first b\t2.0", "second b\t1.0"])
        .with_passages("Where is C?", &["first c\t2.0", "second c\t1.0"])
}

struct JudgeRun {
    outcome: Result<JudgeOutcome>,
    shown: String,
    recorded: String,
}

fn judge(retriever: StubRetriever, resume_after: Option<&str>, answers: &str, seed: u64) -> JudgeRun {
    let tokenizer = Tokenizer::new().expect("tokenizer regexes should compile");
    let session = JudgeSession {
        tokenizer: &tokenizer,
        num_hits: 200,
        depth: 5,
        resume_after: resume_after.map(ToOwned::to_owned),
    };
    let mut input = Cursor::new(answers.as_bytes().to_vec());
    let mut shown = Vec::new();
    let mut recorded = Vec::new();

    let outcome = judge_questions(
        &corpus(),
        &mut source(retriever),
        &session,
        &mut CoinFlip::seeded(seed),
        &mut input,
        &mut shown,
        &mut recorded,
    );

    JudgeRun {
        outcome,
        shown: String::from_utf8(shown).expect("prompt output should be utf-8"),
        recorded: String::from_utf8(recorded).expect("judgements should be utf-8"),
    }
}

#[test]
fn coin_is_deterministic_per_seed_and_yields_both_sides() {
    let mut left = CoinFlip::seeded(42);
    let mut right = CoinFlip::seeded(42);

    let flips = (0..64).map(|_| left.next_bit()).collect::<Vec<u8>>();
    let replay = (0..64).map(|_| right.next_bit()).collect::<Vec<u8>>();

    assert_eq!(flips, replay);
    assert!(flips.contains(&0) && flips.contains(&1), "coin never changed sides");
    assert!(CoinFlip::seeded(0).next_bit() <= 1);
}

#[test]
fn preference_undoes_the_blinding() {
    assert_eq!(preferred_strategy(1, 0), ModelChoice::Sm);
    assert_eq!(preferred_strategy(2, 0), ModelChoice::Idf);
    assert_eq!(preferred_strategy(1, 1), ModelChoice::Idf);
    assert_eq!(preferred_strategy(2, 1), ModelChoice::Sm);
}

#[test]
fn judgement_file_name_carries_judge_and_settings() {
    assert_eq!(
        judgement_path(Path::new("out"), "ana", 200, 5),
        PathBuf::from("out/judgement.ana.TrecQa.h200.k5.txt")
    );
}

#[test]
fn last_judged_qid_reads_the_final_line() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("judgement.ana.TrecQa.h200.k5.txt");

    assert_eq!(last_judged_qid(&path).expect("missing file is fine"), None);

    fs::write(&path, "").expect("write empty file");
    assert_eq!(last_judged_qid(&path).expect("empty file is fine"), None);

    fs::write(&path, "1\tidf\n2\tsm\n").expect("write judgements");
    assert_eq!(
        last_judged_qid(&path).expect("file should be readable"),
        Some("2".to_string())
    );
}

#[test]
fn records_one_preference_per_question() {
    let seed = 7;
    let mut coin = CoinFlip::seeded(seed);
    let choices = (0..3).map(|_| coin.next_bit()).collect::<Vec<u8>>();

    let run = judge(full_retriever(), None, "1\nmaybe\n2\n1\n", seed);
    let outcome = run.outcome.expect("judging should succeed");

    assert_eq!(
        outcome.judged_qids,
        vec!["1".to_string(), "2".to_string(), "3".to_string()]
    );
    let expected = [("1", 1), ("2", 2), ("3", 1)]
        .iter()
        .zip(&choices)
        .map(|((qid, response), choice)| {
            format!("{qid}\t{}\n", preferred_strategy(*response, *choice).as_str())
        })
        .collect::<String>();
    assert_eq!(run.recorded, expected);
    assert_eq!(run.shown.matches("What ranked list do you prefer[1/2]:").count(), 4);
}

#[test]
fn neural_list_is_shown_first_when_the_coin_lands_on_zero() {
    let seed = (1..1000)
        .find(|seed| CoinFlip::seeded(*seed).next_bit() == 0)
        .expect("some seed lands on zero");

    let run = judge(full_retriever(), Some("2"), "1\n", seed);
    run.outcome.expect("judging should succeed");

    let list1 = run.shown.find("Answer list1:").expect("list 1 shown");
    let list2 = run.shown.find("Answer list2:").expect("list 2 shown");
    let neural_top = run.shown.find("1 second c").expect("reranked order shown");
    let lexical_top = run.shown.find("1 first c").expect("retrieval order shown");
    assert!(list1 < neural_top && neural_top < list2, "neural list should come first");
    assert!(list2 < lexical_top, "lexical list should come second");
    assert_eq!(run.recorded, "3\tsm\n");
}

#[test]
fn resume_skips_through_the_last_judged_question() {
    let run = judge(full_retriever(), Some("1"), "2\n2\n", 3);
    let outcome = run.outcome.expect("judging should succeed");

    assert_eq!(outcome.judged_qids, vec!["2".to_string(), "3".to_string()]);
    assert!(!run.shown.contains("What is X?"));
}

#[test]
fn failed_fetch_skips_without_prompting() {
    let retriever = StubRetriever::new()
        .with_passages("What is X?", &["first x\t2.0"])
        .failing_on("Who wrote B?")
        .with_passages("Where is C?", &["first c\t2.0"]);

    let run = judge(retriever, None, "1\n1\n", 11);
    let outcome = run.outcome.expect("judging should succeed");

    assert_eq!(outcome.judged_qids, vec!["1".to_string(), "3".to_string()]);
    assert_eq!(outcome.failed_qids, vec!["2".to_string()]);
    assert_eq!(run.recorded.lines().count(), 2);
}

#[test]
fn closed_input_aborts_the_session() {
    let run = judge(full_retriever(), None, "", 5);

    let err = run.outcome.expect_err("no preference can be read");
    assert!(err.to_string().contains("input closed"), "unexpected error: {err}");
    assert!(run.recorded.is_empty());
}
