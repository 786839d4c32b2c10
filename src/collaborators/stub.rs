use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, anyhow};

use super::{RerankFlags, Reranker, Retrieval, Retriever};
use crate::candidates::RerankedAnswer;
use crate::error::EvalError;

/// In-memory retriever keyed by question text.
#[derive(Default)]
pub(crate) struct StubRetriever {
    responses: HashMap<String, Retrieval>,
    failing: Vec<String>,
    calls: Rc<Cell<usize>>,
}

impl StubRetriever {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_passages(mut self, question: &str, passages: &[&str]) -> Self {
        self.responses.insert(
            question.to_string(),
            Retrieval {
                passages: passages.iter().map(|value| value.to_string()).collect(),
                idf: HashMap::from([("x".to_string(), 1.5)]),
            },
        );
        self
    }

    pub(crate) fn failing_on(mut self, question: &str) -> Self {
        self.failing.push(question.to_string());
        self
    }

    pub(crate) fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

impl Retriever for StubRetriever {
    fn retrieve(&mut self, question: &str, _num_hits: usize, depth: usize) -> Result<Retrieval> {
        self.calls.set(self.calls.get() + 1);

        if self.failing.iter().any(|value| value == question) {
            return Err(EvalError::CollaboratorTimeout {
                collaborator: "retrieval",
                timeout_ms: 10,
            }
            .into());
        }

        let mut retrieval = self
            .responses
            .get(question)
            .cloned()
            .ok_or_else(|| anyhow!("no stub passages for question: {question}"))?;
        retrieval.passages.truncate(depth);
        Ok(retrieval)
    }
}

/// Reranker that scores passages by position and returns them in reverse.
pub(crate) struct StubReranker;

impl StubReranker {
    pub(crate) fn reversing() -> Self {
        Self
    }
}

impl Reranker for StubReranker {
    fn rerank(
        &mut self,
        _question: &str,
        passages: &[String],
        _idf: &HashMap<String, f64>,
        _flags: RerankFlags,
    ) -> Result<Vec<RerankedAnswer>> {
        Ok(passages
            .iter()
            .enumerate()
            .map(|(index, passage)| RerankedAnswer::Scored(index as f64, passage.clone()))
            .rev()
            .collect())
    }
}
