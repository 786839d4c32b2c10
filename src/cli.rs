use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::precision::{DEFAULT_DEPTHS, UnknownDocPolicy};
use crate::run_file::{DEFAULT_RUN_TAG, DEFAULT_THRESHOLD};

#[derive(Parser, Debug)]
#[command(
    name = "trecqa-eval",
    version,
    about = "Answer-sentence-selection evaluation over the TrecQA corpus"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a run file and qrels, then report precision at several depths.
    Evaluate(EvaluateArgs),
    /// Score the top answer of each question against regex answer patterns.
    Patterns(PatternArgs),
    /// Collect blinded pairwise preferences between the two strategies.
    Judge(JudgeArgs),
    /// Write only the qrel file for a corpus.
    Qrels(QrelsArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ModelChoice {
    Idf,
    Sm,
}

impl ModelChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idf => "idf",
            Self::Sm => "sm",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Punctuation {
    Keep,
    Remove,
}

impl Punctuation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Remove => "remove",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum DashWords {
    Keep,
    Split,
}

impl DashWords {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Split => "split",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CollaboratorArgs {
    /// Retrieval index handed to both collaborators.
    #[arg(long)]
    pub index: String,

    #[arg(long)]
    pub retrieval_command: Option<PathBuf>,

    #[arg(long = "retrieval-arg", allow_hyphen_values = true)]
    pub retrieval_args: Vec<String>,

    /// JSON fixture of precomputed passages, used instead of a retrieval process.
    #[arg(long, conflicts_with = "retrieval_command")]
    pub candidates_path: Option<PathBuf>,

    #[arg(long)]
    pub reranker_command: Option<PathBuf>,

    #[arg(long = "reranker-arg", allow_hyphen_values = true)]
    pub reranker_args: Vec<String>,

    #[arg(long)]
    pub w2v_cache: Option<PathBuf>,

    #[arg(long)]
    pub qa_model_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Punctuation::Keep)]
    pub punctuation: Punctuation,

    #[arg(long, value_enum, default_value_t = DashWords::Keep)]
    pub dash_words: DashWords,

    /// Per-request collaborator timeout; 0 disables it.
    #[arg(long, default_value_t = 120_000)]
    pub timeout_ms: u64,

    #[arg(long)]
    pub cache_db: Option<PathBuf>,
}

impl CollaboratorArgs {
    /// Flags the neural reranker needs but were not given.
    pub fn missing_neural_resources(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.w2v_cache.is_none() {
            missing.push("--w2v-cache");
        }
        if self.qa_model_file.is_none() {
            missing.push("--qa-model-file");
        }
        missing
    }
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// TrecQA corpus file.
    #[arg(long)]
    pub input: PathBuf,

    /// Defaults to `run.qa.{model}.h{hits}.k{k}.txt`.
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long, default_value = "qrels.txt")]
    pub qrel: PathBuf,

    #[arg(long, default_value_t = 20)]
    pub hits: usize,

    #[arg(long, default_value_t = 10)]
    pub k: usize,

    #[arg(long, value_enum, default_value_t = ModelChoice::Idf)]
    pub model: ModelChoice,

    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    #[arg(long, default_value = DEFAULT_RUN_TAG)]
    pub run_tag: String,

    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_DEPTHS.to_vec())]
    pub depths: Vec<usize>,

    /// Fail when a predicted doc id has no gold label instead of counting it as 0.
    #[arg(long, default_value_t = false)]
    pub strict_labels: bool,

    #[arg(long)]
    pub report_path: Option<PathBuf>,

    #[command(flatten)]
    pub collaborators: CollaboratorArgs,
}

impl EvaluateArgs {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!(
                "run.qa.{}.h{}.k{}.txt",
                self.model.as_str(),
                self.hits,
                self.k
            ))
        })
    }

    pub fn unknown_doc_policy(&self) -> UnknownDocPolicy {
        if self.strict_labels {
            UnknownDocPolicy::Fail
        } else {
            UnknownDocPolicy::Zero
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PatternArgs {
    #[arg(long)]
    pub input: PathBuf,

    /// Lines of `qid pattern...`.
    #[arg(long)]
    pub pattern: PathBuf,

    #[arg(long, default_value_t = 1000)]
    pub h0: usize,

    #[arg(long, default_value_t = 100)]
    pub h1: usize,

    #[arg(long, value_enum, default_value_t = ModelChoice::Idf)]
    pub model: ModelChoice,

    #[command(flatten)]
    pub collaborators: CollaboratorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct JudgeArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value_t = 200)]
    pub hits: usize,

    #[arg(long, default_value_t = 5)]
    pub k: usize,

    /// Prompted on the terminal when absent.
    #[arg(long)]
    pub judge_name: Option<String>,

    #[arg(long, default_value = ".")]
    pub judgement_dir: PathBuf,

    #[command(flatten)]
    pub collaborators: CollaboratorArgs,
}

#[derive(Args, Debug, Clone)]
pub struct QrelsArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long, default_value = "qrels.txt")]
    pub qrel: PathBuf,
}
