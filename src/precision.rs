use crate::error::EvalError;
use crate::model::{PrecisionAtK, PredictedLabels, RelevanceLabels};
use crate::run_file::is_unjudged;

pub const DEFAULT_DEPTHS: &[usize] = &[5, 10, 15, 20, 50, 100];

/// How a predicted doc id without a gold label is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownDocPolicy {
    /// Counts as not relevant.
    #[default]
    Zero,
    /// Aborts the computation with [`EvalError::KeyLookup`].
    Fail,
}

/// Pooled precision over the first `k` predictions of every question.
///
/// Lists shorter than `k` are not padded. Questions without any gold labels
/// still count their predictions in the denominator.
pub fn precision_at_k(
    actual: &RelevanceLabels,
    predicted: &PredictedLabels,
    k: usize,
    policy: UnknownDocPolicy,
) -> Result<f64, EvalError> {
    let mut total_count = 0_usize;
    let mut hits = 0_u64;

    for (qid, doc_ids) in predicted {
        let judged = actual.get(qid).filter(|labels| !labels.is_empty());

        for doc_id in doc_ids.iter().take(k) {
            total_count += 1;

            let Some(labels) = judged else {
                continue;
            };
            if is_unjudged(doc_id) {
                continue;
            }

            match (labels.get(doc_id), policy) {
                (Some(label), _) => hits += u64::from(*label),
                (None, UnknownDocPolicy::Zero) => {}
                (None, UnknownDocPolicy::Fail) => {
                    return Err(EvalError::KeyLookup {
                        qid: qid.clone(),
                        doc_id: doc_id.clone(),
                    });
                }
            }
        }
    }

    if total_count == 0 {
        return Ok(0.0);
    }
    Ok(hits as f64 / total_count as f64)
}

pub fn precision_report(
    actual: &RelevanceLabels,
    predicted: &PredictedLabels,
    depths: &[usize],
    policy: UnknownDocPolicy,
) -> Result<Vec<PrecisionAtK>, EvalError> {
    depths
        .iter()
        .map(|&k| {
            precision_at_k(actual, predicted, k, policy).map(|precision| PrecisionAtK { k, precision })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn labels(entries: &[(&str, &[(&str, u8)])]) -> RelevanceLabels {
        entries
            .iter()
            .map(|(qid, rows)| {
                (
                    qid.to_string(),
                    rows.iter()
                        .map(|(doc_id, label)| (doc_id.to_string(), *label))
                        .collect::<HashMap<String, u8>>(),
                )
            })
            .collect()
    }

    fn predicted(entries: &[(&str, &[&str])]) -> PredictedLabels {
        entries
            .iter()
            .map(|(qid, doc_ids)| {
                (
                    qid.to_string(),
                    doc_ids.iter().map(|doc_id| doc_id.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn short_list_is_not_padded() {
        let actual = labels(&[("1", &[("Q1-A1", 1), ("Q1-A2", 0)])]);
        let run = predicted(&[("1", &["Q1-A1", "Q1-A2", "unjudged1"])]);

        let value = precision_at_k(&actual, &run, 5, UnknownDocPolicy::Zero)
            .expect("precision should compute");
        assert!((value - 1.0 / 3.0).abs() < 1e-12, "unexpected precision: {value}");
    }

    #[test]
    fn cutoff_limits_each_question() {
        let actual = labels(&[
            ("1", &[("Q1-A1", 1), ("Q1-A2", 1)]),
            ("2", &[("Q2-A1", 1)]),
        ]);
        let run = predicted(&[
            ("1", &["unjudged1", "Q1-A1", "Q1-A2"]),
            ("2", &["Q2-A1", "unjudged1"]),
        ]);

        let at_one = precision_at_k(&actual, &run, 1, UnknownDocPolicy::Zero)
            .expect("precision should compute");
        assert_eq!(at_one, 0.5);

        let at_three = precision_at_k(&actual, &run, 3, UnknownDocPolicy::Zero)
            .expect("precision should compute");
        assert_eq!(at_three, 3.0 / 5.0);
    }

    #[test]
    fn empty_predictions_score_zero() {
        let actual = labels(&[("1", &[("Q1-A1", 1)])]);
        let run = predicted(&[("1", &[])]);

        assert_eq!(
            precision_at_k(&actual, &run, 10, UnknownDocPolicy::Fail).expect("no lookups"),
            0.0
        );
        assert_eq!(
            precision_at_k(&actual, &PredictedLabels::new(), 10, UnknownDocPolicy::Zero)
                .expect("no lookups"),
            0.0
        );
    }

    #[test]
    fn unlabeled_question_counts_in_denominator_only() {
        let actual = labels(&[("1", &[("Q1-A1", 1)]), ("2", &[])]);
        let run = predicted(&[("1", &["Q1-A1"]), ("2", &["Q9-A9", "unjudged1"])]);

        let value = precision_at_k(&actual, &run, 10, UnknownDocPolicy::Fail)
            .expect("unlabeled question must not trigger lookups");
        assert!((value - 1.0 / 3.0).abs() < 1e-12, "unexpected precision: {value}");
    }

    #[test]
    fn unknown_doc_id_follows_policy() {
        let actual = labels(&[("1", &[("Q1-A1", 1)])]);
        let run = predicted(&[("1", &["Q1-A1", "Q1-A7"])]);

        let lenient = precision_at_k(&actual, &run, 10, UnknownDocPolicy::Zero)
            .expect("zero policy never fails");
        assert_eq!(lenient, 0.5);

        let err = precision_at_k(&actual, &run, 10, UnknownDocPolicy::Fail)
            .expect_err("fail policy should reject unknown doc id");
        assert!(
            matches!(err, EvalError::KeyLookup { ref doc_id, .. } if doc_id == "Q1-A7"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn report_covers_every_depth_within_bounds() {
        let actual = labels(&[("1", &[("Q1-A1", 1), ("Q1-A2", 0)])]);
        let run = predicted(&[("1", &["Q1-A2", "Q1-A1", "unjudged1", "unjudged2"])]);

        let report = precision_report(&actual, &run, DEFAULT_DEPTHS, UnknownDocPolicy::Zero)
            .expect("report should compute");

        assert_eq!(
            report.iter().map(|row| row.k).collect::<Vec<usize>>(),
            DEFAULT_DEPTHS.to_vec()
        );
        for row in &report {
            assert!((0.0..=1.0).contains(&row.precision));
            assert_eq!(row.precision, 0.25);
        }
    }
}
