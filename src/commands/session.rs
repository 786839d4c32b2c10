use std::path::Path;

use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::cli::CollaboratorArgs;
use crate::collaborators::{
    CandidateCache, CandidateSource, FixtureRetriever, ProcessReranker, ProcessRetriever,
    RerankFlags, RerankerResources, Retriever,
};
use crate::corpus::CorpusParser;
use crate::model::Corpus;
use crate::util::read_text;

pub(crate) fn load_corpus(path: &Path) -> Result<Corpus> {
    let text = read_text(path)?;
    let corpus = CorpusParser::new()?.parse(&text);

    info!(
        path = %path.display(),
        qids = corpus.qids.len(),
        questions = corpus.questions.len(),
        gold_answers = corpus.answer_count(),
        "loaded corpus"
    );
    for qid in corpus.qids_without_question() {
        warn!(qid = %qid, "question block has no question text; it will not be evaluated");
    }

    Ok(corpus)
}

/// Builds the collaborator handles once for the whole command.
///
/// The reranker is only started when `neural` is set; both model files must
/// then be present.
pub(crate) fn build_candidate_source(
    args: &CollaboratorArgs,
    neural: bool,
) -> Result<CandidateSource> {
    let retriever: Box<dyn Retriever> = match (&args.candidates_path, &args.retrieval_command) {
        (Some(path), _) => {
            let fixture = FixtureRetriever::load(path)?;
            info!(path = %path.display(), questions = fixture.len(), "using fixture retrieval");
            Box::new(fixture)
        }
        (None, Some(program)) => Box::new(ProcessRetriever::new(
            program.clone(),
            args.retrieval_args.clone(),
            args.index.clone(),
            args.timeout_ms,
        )),
        (None, None) => {
            bail!("either --retrieval-command or --candidates-path must be provided")
        }
    };

    let flags = RerankFlags {
        punctuation: args.punctuation,
        dash_words: args.dash_words,
    };
    let mut source = CandidateSource::new(retriever, flags, args.index.clone());

    if neural {
        let Some(program) = args.reranker_command.clone() else {
            bail!("the sm model needs --reranker-command");
        };
        let (Some(model_file), Some(w2v_cache)) = (&args.qa_model_file, &args.w2v_cache) else {
            bail!("the sm model needs --w2v-cache and --qa-model-file");
        };

        let reranker = ProcessReranker::new(
            program,
            args.reranker_args.clone(),
            RerankerResources {
                model_file: model_file.clone(),
                w2v_cache: w2v_cache.clone(),
                index: args.index.clone(),
            },
            args.timeout_ms,
        )?;
        source = source.with_reranker(Box::new(reranker));
    }

    if let Some(path) = &args.cache_db {
        source = source.with_cache(CandidateCache::open(path)?);
    }

    Ok(source)
}
