use thiserror::Error;

/// Recoverable failures raised by the evaluation core.
///
/// Command code converts these into `anyhow::Error` when they are fatal; the
/// per-question loops match on them to skip and keep going.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Candidate string did not split into `text\tscore` or `text\tdocid\tscore`
    #[error("malformed candidate: expected 2 or 3 tab-separated fields, found {fields}: {raw:?}")]
    MalformedCandidate { raw: String, fields: usize },
    /// Candidate score field is not a float
    #[error("candidate score is not a number: {raw:?}")]
    InvalidScore { raw: String },
    /// Predicted doc id has no gold relevance label
    #[error("no relevance label for {doc_id} under question {qid}")]
    KeyLookup { qid: String, doc_id: String },
    /// Pattern line did not compile as a regular expression
    #[error("invalid answer pattern for question {qid}")]
    InvalidPattern {
        qid: String,
        #[source]
        source: regex::Error,
    },
    #[error("{collaborator} did not answer within {timeout_ms} ms")]
    CollaboratorTimeout {
        collaborator: &'static str,
        timeout_ms: u64,
    },
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },
}
