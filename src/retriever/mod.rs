// Retriever module
// Resolves a usable index (load from disk, else build from the document source)
// and answers nearest-neighbour queries against it


use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::embeddings::EmbeddingProvider;
use crate::index::{EmbeddedDocument, IndexStore, VectorIndex};
use crate::source::DocumentSource;
use crate::{QaError, Result};

/// A retrieved document as handed to the answer engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub id: String,
    pub text: String,
    pub source: String,
}

impl From<&EmbeddedDocument> for Passage {
    fn from(document: &EmbeddedDocument) -> Self {
        Self {
            id: document.id.clone(),
            text: document.text.clone(),
            source: document.source.clone(),
        }
    }
}

/// Lifecycle of the retriever's index
#[derive(Debug, Clone, PartialEq)]
pub enum RetrieverState {
    /// No index yet; the next `resolve` loads or builds one
    Resolving,
    /// Index loaded or built; queries are served
    Ready(VectorIndex),
    /// Building failed; terminal
    Unavailable(String),
}

/// How the retriever reached `Ready`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Loaded,
    Built,
    AlreadyReady,
}

pub struct Retriever<S, E> {
    source: S,
    embedder: E,
    store: IndexStore,
    state: RetrieverState,
    show_progress: bool,
}

impl<S, E> Retriever<S, E>
where
    S: DocumentSource,
    E: EmbeddingProvider,
{
    #[inline]
    pub fn new(source: S, embedder: E, store: IndexStore) -> Self {
        Self {
            source,
            embedder,
            store,
            state: RetrieverState::Resolving,
            show_progress: false,
        }
    }

    /// Show a spinner on stderr while the index is being built
    #[inline]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    #[inline]
    pub fn state(&self) -> &RetrieverState {
        &self.state
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, RetrieverState::Ready(_))
    }

    #[inline]
    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    /// The index being served, once ready
    #[inline]
    pub fn index(&self) -> Option<&VectorIndex> {
        match &self.state {
            RetrieverState::Ready(index) => Some(index),
            _ => None,
        }
    }

    /// Drive the state machine out of `Resolving`.
    ///
    /// Loads the persisted index; if there is none (or it is unreadable) builds a new
    /// one from the document source and persists it.
    ///
    /// # Errors
    /// `Unavailable` when no index could be built. The retriever stays unavailable.
    #[inline]
    pub fn resolve(&mut self) -> Result<Resolution> {
        let resolution = match &self.state {
            RetrieverState::Ready(_) => Resolution::AlreadyReady,
            RetrieverState::Unavailable(reason) => {
                return Err(QaError::Unavailable(reason.clone()));
            }
            RetrieverState::Resolving => match self.load_compatible() {
                Ok(index) => {
                    self.state = RetrieverState::Ready(index);
                    Resolution::Loaded
                }
                Err(e) if e.is_missing_index() => {
                    warn!("No usable index ({}), building a new one", e);
                    self.state = self.build_state();
                    Resolution::Built
                }
                Err(e) => return Err(e),
            },
        };

        match &self.state {
            RetrieverState::Ready(_) => Ok(resolution),
            RetrieverState::Unavailable(reason) => Err(QaError::Unavailable(reason.clone())),
            RetrieverState::Resolving => Err(QaError::Unavailable(
                "index resolution did not complete".to_string(),
            )),
        }
    }

    /// Rebuild the index from the document source, ignoring anything on disk.
    ///
    /// Returns the number of indexed documents.
    #[inline]
    pub fn rebuild(&mut self) -> Result<usize> {
        self.state = self.build_state();

        match &self.state {
            RetrieverState::Ready(index) => Ok(index.len()),
            RetrieverState::Unavailable(reason) => Err(QaError::Unavailable(reason.clone())),
            RetrieverState::Resolving => Err(QaError::Unavailable(
                "index rebuild did not complete".to_string(),
            )),
        }
    }

    /// Embed `query` and return the `k` closest documents, nearest first
    #[inline]
    pub fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let index = match &self.state {
            RetrieverState::Ready(index) => index,
            RetrieverState::Unavailable(reason) => {
                return Err(QaError::Unavailable(reason.clone()));
            }
            RetrieverState::Resolving => {
                return Err(QaError::Unavailable(
                    "index has not been resolved".to_string(),
                ));
            }
        };

        let query_vector = self.embedder.embed(query)?;
        let passages = index
            .search(&query_vector, k)?
            .into_iter()
            .map(|neighbor| Passage::from(neighbor.document))
            .collect();

        Ok(passages)
    }

    /// Load the persisted index, treating one built for another embedding dimension as unusable
    fn load_compatible(&self) -> Result<VectorIndex> {
        let index = self.store.load()?;
        let expected = self.embedder.dimension();

        match index.dimension() {
            Some(dimension) if dimension == expected => Ok(index),
            found => Err(QaError::CorruptIndex {
                path: self.store.path(),
                reason: format!(
                    "index dimension {} does not match embedding dimension {}",
                    found.unwrap_or_default(),
                    expected
                ),
            }),
        }
    }

    fn build_state(&self) -> RetrieverState {
        let spinner = self.spinner();
        let built = self.build_index(&spinner);
        spinner.finish_and_clear();

        match built {
            Ok(index) => {
                if let Err(e) = self.store.save(&index) {
                    warn!(
                        "Failed to persist index to {}: {}; continuing with in-memory index",
                        self.store.path().display(),
                        e
                    );
                }
                RetrieverState::Ready(index)
            }
            Err(e) => {
                error!("Index build failed: {}", e);
                let reason = match e {
                    QaError::Unavailable(reason) => reason,
                    other => other.to_string(),
                };
                RetrieverState::Unavailable(reason)
            }
        }
    }

    fn build_index(&self, spinner: &ProgressBar) -> Result<VectorIndex> {
        spinner.set_message("Fetching documents...");
        let documents = self.source.list_documents()?;
        if documents.is_empty() {
            return Err(QaError::Unavailable(
                "document source returned no documents".to_string(),
            ));
        }

        spinner.set_message(format!("Embedding {} documents...", documents.len()));
        let texts: Vec<String> = documents.iter().map(|doc| doc.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        if vectors.len() != documents.len() {
            return Err(QaError::Upstream(format!(
                "Embedding provider returned {} vectors for {} documents",
                vectors.len(),
                documents.len()
            )));
        }

        let source = self.source.source_tag().to_string();
        let embedded = documents
            .into_iter()
            .zip(vectors)
            .map(|(doc, vector)| EmbeddedDocument {
                id: doc.id,
                text: doc.text,
                vector,
                source: source.clone(),
            })
            .collect();

        let mut index = VectorIndex::with_dimension(self.embedder.dimension());
        index.add(embedded)?;

        info!(
            "Built index with {} documents of dimension {}",
            index.len(),
            index.dimension().unwrap_or_default()
        );
        Ok(index)
    }

    fn spinner(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}
