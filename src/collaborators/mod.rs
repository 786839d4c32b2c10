//! Boundary to the retrieval engine and the neural reranker.
//!
//! Both collaborators are explicit handles built once per command and owned
//! by a [`CandidateSource`], which also consults the optional candidate cache.

mod cache;
mod fixture;
mod process;
#[cfg(test)]
pub(crate) mod stub;

use std::collections::HashMap;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidates::{RawCandidates, RerankedAnswer};
use crate::cli::{DashWords, ModelChoice, Punctuation};

pub use cache::{CandidateCache, cache_key};
pub use fixture::FixtureRetriever;
pub use process::{ProcessReranker, ProcessRetriever, RerankerResources};

/// Ranked passages for one question plus the term idf table used by the reranker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Retrieval {
    #[serde(default)]
    pub passages: Vec<String>,
    #[serde(default)]
    pub idf: HashMap<String, f64>,
}

pub trait Retriever {
    fn retrieve(&mut self, question: &str, num_hits: usize, depth: usize) -> Result<Retrieval>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RerankFlags {
    pub punctuation: Punctuation,
    pub dash_words: DashWords,
}

pub trait Reranker {
    fn rerank(
        &mut self,
        question: &str,
        passages: &[String],
        idf: &HashMap<String, f64>,
        flags: RerankFlags,
    ) -> Result<Vec<RerankedAnswer>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub strategy: ModelChoice,
    pub num_hits: usize,
    pub depth: usize,
}

pub struct CandidateSource {
    retriever: Box<dyn Retriever>,
    reranker: Option<Box<dyn Reranker>>,
    cache: Option<CandidateCache>,
    flags: RerankFlags,
    index_key: String,
}

impl CandidateSource {
    pub fn new(retriever: Box<dyn Retriever>, flags: RerankFlags, index_key: String) -> Self {
        Self {
            retriever,
            reranker: None,
            cache: None,
            flags,
            index_key,
        }
    }

    pub fn with_reranker(mut self, reranker: Box<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_cache(mut self, cache: CandidateCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn fetch(&mut self, question: &str, request: FetchRequest) -> Result<RawCandidates> {
        let key = self
            .cache
            .is_some()
            .then(|| self.cache_key(question, request));

        if let Some(key) = key.as_deref()
            && let Some(cache) = self.cache.as_ref()
            && let Some(cached) = cache.load(key)?
        {
            debug!(strategy = request.strategy.as_str(), "candidate cache hit");
            return Ok(cached);
        }

        let candidates = self.fetch_uncached(question, request)?;

        if let Some(key) = key.as_deref()
            && let Some(cache) = self.cache.as_ref()
        {
            cache.store(key, question, request.strategy.as_str(), &candidates)?;
        }

        Ok(candidates)
    }

    fn fetch_uncached(&mut self, question: &str, request: FetchRequest) -> Result<RawCandidates> {
        let retrieval = self
            .retriever
            .retrieve(question, request.num_hits, request.depth)?;

        match request.strategy {
            ModelChoice::Idf => Ok(RawCandidates::Lexical(retrieval.passages)),
            ModelChoice::Sm => {
                let Some(reranker) = self.reranker.as_mut() else {
                    bail!("neural strategy requested but no reranker was configured");
                };
                let passages = reranker_passages(&retrieval.passages);
                let answers = reranker.rerank(question, &passages, &retrieval.idf, self.flags)?;
                Ok(RawCandidates::Neural(answers))
            }
        }
    }

    fn cache_key(&self, question: &str, request: FetchRequest) -> String {
        let strategy = match request.strategy {
            ModelChoice::Idf => request.strategy.as_str().to_string(),
            ModelChoice::Sm => format!(
                "{}:{}:{}",
                request.strategy.as_str(),
                self.flags.punctuation.as_str(),
                self.flags.dash_words.as_str()
            ),
        };
        cache_key(
            &self.index_key,
            &strategy,
            request.num_hits,
            request.depth,
            question,
        )
    }
}

/// Strips the score from `text\tscore` passages; `text\tdocid\tscore` passages
/// go through whole so the reranker can echo the doc id back.
fn reranker_passages(passages: &[String]) -> Vec<String> {
    passages
        .iter()
        .map(|passage| match passage.split('\t').collect::<Vec<&str>>().as_slice() {
            [text, _score] => (*text).to_string(),
            _ => passage.clone(),
        })
        .collect()
}
