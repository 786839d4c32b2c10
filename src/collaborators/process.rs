use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{RerankFlags, Reranker, Retrieval, Retriever};
use crate::candidates::RerankedAnswer;
use crate::error::EvalError;

/// Long-lived child process answering one JSON line per request line.
///
/// A process that times out or exits is killed and dropped; the next request
/// starts a fresh one.
struct JsonLineProcess {
    collaborator: &'static str,
    program: PathBuf,
    args: Vec<String>,
    timeout_ms: u64,
    session: Option<ProcessSession>,
}

struct ProcessSession {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<std::io::Result<String>>,
}

impl JsonLineProcess {
    fn new(collaborator: &'static str, program: PathBuf, args: Vec<String>, timeout_ms: u64) -> Self {
        Self {
            collaborator,
            program,
            args,
            timeout_ms,
            session: None,
        }
    }

    fn request<Req: Serialize, Resp: DeserializeOwned>(&mut self, request: &Req) -> Result<Resp> {
        let payload = serde_json::to_string(request)
            .with_context(|| format!("failed to serialize {} request", self.collaborator))?;

        let mut session = match self.session.take() {
            Some(session) => session,
            None => self.spawn()?,
        };

        let line = match session.exchange(&payload, self.collaborator, self.timeout_ms) {
            Ok(line) => line,
            Err(err) => {
                warn!(
                    collaborator = self.collaborator,
                    error = %err,
                    "stopping collaborator process"
                );
                return Err(err.into());
            }
        };
        self.session = Some(session);

        serde_json::from_str(&line)
            .with_context(|| format!("failed to parse {} response", self.collaborator))
    }

    fn spawn(&self) -> Result<ProcessSession> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| {
                format!(
                    "failed to start {} process: {}",
                    self.collaborator,
                    self.program.display()
                )
            })?;

        let stdin = child
            .stdin
            .take()
            .with_context(|| format!("{} process has no stdin", self.collaborator))?;
        let stdout = child
            .stdout
            .take()
            .with_context(|| format!("{} process has no stdout", self.collaborator))?;

        let (sender, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                if sender.send(line).is_err() {
                    break;
                }
            }
        });

        info!(
            collaborator = self.collaborator,
            program = %self.program.display(),
            pid = child.id(),
            "started collaborator process"
        );

        Ok(ProcessSession {
            child,
            stdin,
            lines,
        })
    }
}

impl ProcessSession {
    fn exchange(
        &mut self,
        payload: &str,
        collaborator: &'static str,
        timeout_ms: u64,
    ) -> Result<String, EvalError> {
        writeln!(self.stdin, "{payload}")
            .and_then(|()| self.stdin.flush())
            .map_err(|err| EvalError::Collaborator {
                collaborator,
                message: format!("failed to send request: {err}"),
            })?;

        let received = if timeout_ms == 0 {
            self.lines
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            self.lines.recv_timeout(Duration::from_millis(timeout_ms))
        };

        match received {
            Ok(Ok(line)) => Ok(line),
            Ok(Err(err)) => Err(EvalError::Collaborator {
                collaborator,
                message: format!("failed to read response: {err}"),
            }),
            Err(RecvTimeoutError::Timeout) => Err(EvalError::CollaboratorTimeout {
                collaborator,
                timeout_ms,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(EvalError::Collaborator {
                collaborator,
                message: "process exited before answering".to_string(),
            }),
        }
    }
}

impl Drop for ProcessSession {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn ensure_no_error(collaborator: &'static str, error: Option<String>) -> Result<()> {
    if let Some(message) = error {
        return Err(EvalError::Collaborator {
            collaborator,
            message,
        }
        .into());
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RetrievalRequest<'a> {
    index: &'a str,
    question: &'a str,
    num_hits: usize,
    depth: usize,
}

#[derive(Debug, Deserialize)]
struct RetrievalResponse {
    #[serde(default)]
    passages: Vec<String>,
    #[serde(default)]
    idf: HashMap<String, f64>,
    #[serde(default)]
    error: Option<String>,
}

/// Retrieval engine running as a separate process.
pub struct ProcessRetriever {
    process: JsonLineProcess,
    index: String,
}

impl ProcessRetriever {
    pub fn new(program: PathBuf, args: Vec<String>, index: String, timeout_ms: u64) -> Self {
        Self {
            process: JsonLineProcess::new("retrieval", program, args, timeout_ms),
            index,
        }
    }
}

impl Retriever for ProcessRetriever {
    fn retrieve(&mut self, question: &str, num_hits: usize, depth: usize) -> Result<Retrieval> {
        let response: RetrievalResponse = self.process.request(&RetrievalRequest {
            index: &self.index,
            question,
            num_hits,
            depth,
        })?;
        ensure_no_error("retrieval", response.error)?;

        Ok(Retrieval {
            passages: response.passages,
            idf: response.idf,
        })
    }
}

/// Model files the neural reranker loads at startup.
#[derive(Debug, Clone)]
pub struct RerankerResources {
    pub model_file: PathBuf,
    pub w2v_cache: PathBuf,
    pub index: String,
}

#[derive(Debug, Serialize)]
struct RerankFlagsPayload {
    punctuation: &'static str,
    dash_words: &'static str,
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    question: &'a str,
    passages: &'a [String],
    idf: &'a HashMap<String, f64>,
    flags: RerankFlagsPayload,
    model_file: String,
    w2v_cache: String,
    index: &'a str,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    #[serde(default)]
    answers: Vec<RerankedAnswer>,
    #[serde(default)]
    error: Option<String>,
}

/// Neural reranker running as a separate process, loaded once per command.
pub struct ProcessReranker {
    process: JsonLineProcess,
    resources: RerankerResources,
}

impl ProcessReranker {
    pub fn new(
        program: PathBuf,
        args: Vec<String>,
        resources: RerankerResources,
        timeout_ms: u64,
    ) -> Result<Self> {
        for path in [&resources.model_file, &resources.w2v_cache] {
            if !path.exists() {
                bail!("reranker resource not found: {}", path.display());
            }
        }

        Ok(Self {
            process: JsonLineProcess::new("reranker", program, args, timeout_ms),
            resources,
        })
    }
}

impl Reranker for ProcessReranker {
    fn rerank(
        &mut self,
        question: &str,
        passages: &[String],
        idf: &HashMap<String, f64>,
        flags: RerankFlags,
    ) -> Result<Vec<RerankedAnswer>> {
        let response: RerankResponse = self.process.request(&RerankRequest {
            question,
            passages,
            idf,
            flags: RerankFlagsPayload {
                punctuation: flags.punctuation.as_str(),
                dash_words: flags.dash_words.as_str(),
            },
            model_file: self.resources.model_file.display().to_string(),
            w2v_cache: self.resources.w2v_cache.display().to_string(),
            index: &self.resources.index,
        })?;
        ensure_no_error("reranker", response.error)?;

        Ok(response.answers)
    }
}
