use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, anyhow};

use super::{Retrieval, Retriever};
use crate::util::read_text;

/// Precomputed retrieval output keyed by question text, for offline runs.
#[derive(Debug, Default)]
pub struct FixtureRetriever {
    retrievals: HashMap<String, Retrieval>,
}

impl FixtureRetriever {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_text(path)?;
        let retrievals: HashMap<String, Retrieval> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        Ok(Self { retrievals })
    }

    pub fn len(&self) -> usize {
        self.retrievals.len()
    }
}

impl Retriever for FixtureRetriever {
    fn retrieve(&mut self, question: &str, _num_hits: usize, depth: usize) -> Result<Retrieval> {
        let mut retrieval = self
            .retrievals
            .get(question)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture passages for question: {question}"))?;
        retrieval.passages.truncate(depth);
        Ok(retrieval)
    }
}
