// Query pipeline module
// One question in, one answer out: retrieve passages, then hand them to the answer engine


use std::io::{self, BufRead, Write};

use tracing::{debug, warn};

use crate::answer::AnswerEngine;
use crate::config::settings::DEFAULT_TOP_K;
use crate::embeddings::EmbeddingProvider;
use crate::retriever::{Resolution, Retriever};
use crate::source::DocumentSource;
use crate::{QaError, Result};

pub const PROMPT: &str = "Ask a question (or type 'exit' to quit)";
const EXIT_COMMAND: &str = "exit";

pub struct QueryPipeline<S, E, A> {
    retriever: Retriever<S, E>,
    engine: A,
    top_k: usize,
}

impl<S, E, A> QueryPipeline<S, E, A>
where
    S: DocumentSource,
    E: EmbeddingProvider,
    A: AnswerEngine,
{
    #[inline]
    pub fn new(retriever: Retriever<S, E>, engine: A) -> Self {
        Self {
            retriever,
            engine,
            top_k: DEFAULT_TOP_K as usize,
        }
    }

    #[inline]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub fn retriever(&self) -> &Retriever<S, E> {
        &self.retriever
    }

    /// Bring the retriever to `Ready`, loading or building the index
    #[inline]
    pub fn resolve(&mut self) -> Result<Resolution> {
        self.retriever.resolve()
    }

    /// Answer a single question.
    ///
    /// # Errors
    /// `InvalidQuery` for a blank question, `Unavailable` when the retriever has no
    /// index, and `Upstream` for any answer engine failure. Embedding failures for the
    /// question itself pass through unchanged.
    #[inline]
    pub fn answer(&self, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(QaError::InvalidQuery("question is empty".to_string()));
        }

        let passages = self.retriever.retrieve(question, self.top_k)?;
        debug!("Retrieved {} passages for question", passages.len());

        self.engine
            .generate(question, &passages)
            .map_err(|e| match e {
                QaError::Upstream(message) => QaError::Upstream(message),
                other => QaError::Upstream(other.to_string()),
            })
    }

    /// Read questions line by line and write one answer (or error) per question.
    ///
    /// Stops on `exit` or end of input and returns how many questions were answered.
    #[inline]
    pub fn run_interactive<R: BufRead, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> io::Result<usize> {
        let mut answered = 0;
        let mut line = String::new();

        loop {
            writeln!(output, "{}", PROMPT)?;
            write!(output, "> ")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                break;
            }

            let question = line.trim();
            if question.eq_ignore_ascii_case(EXIT_COMMAND) {
                break;
            }
            if question.is_empty() {
                continue;
            }

            match self.answer(question) {
                Ok(answer) => {
                    writeln!(output, "{}", answer)?;
                    answered += 1;
                }
                Err(e) => {
                    warn!("Query failed: {}", e);
                    writeln!(output, "Error: {}", e)?;
                }
            }
            writeln!(output)?;
        }

        Ok(answered)
    }
}
