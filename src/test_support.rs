// Deterministic collaborators for unit tests

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use crate::answer::AnswerEngine;
use crate::embeddings::EmbeddingProvider;
use crate::retriever::Passage;
use crate::source::{DocumentSource, RawDocument};
use crate::{QaError, Result};

/// Serves a fixed document list and counts how often it was asked
pub struct StubSource {
    documents: Vec<RawDocument>,
    failure: Option<fn() -> QaError>,
    calls: Cell<usize>,
}

impl StubSource {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            failure: None,
            calls: Cell::new(0),
        }
    }

    pub fn fruit() -> Self {
        Self::new(vec![
            RawDocument::new("1", "apple"),
            RawDocument::new("2", "banana"),
            RawDocument::new("3", "cherry"),
        ])
    }

    pub fn failing(failure: fn() -> QaError) -> Self {
        Self {
            documents: Vec::new(),
            failure: Some(failure),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl DocumentSource for StubSource {
    fn source_tag(&self) -> &str {
        "stub"
    }

    fn list_documents(&self) -> Result<Vec<RawDocument>> {
        self.calls.set(self.calls.get() + 1);
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(self.documents.clone()),
        }
    }
}

/// Looks vectors up by exact text and counts embedded texts
pub struct StubEmbedder {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
    embedded: Cell<usize>,
}

impl StubEmbedder {
    pub fn new(dimension: usize, vectors: &[(&str, Vec<f32>)]) -> Self {
        Self {
            dimension,
            vectors: vectors
                .iter()
                .map(|(text, vector)| ((*text).to_string(), vector.clone()))
                .collect(),
            embedded: Cell::new(0),
        }
    }

    pub fn fruit() -> Self {
        Self::new(
            2,
            &[
                ("apple", vec![1.0, 0.0]),
                ("banana", vec![0.0, 1.0]),
                ("cherry", vec![0.9, 0.1]),
                ("which fruit is reddish?", vec![0.95, 0.05]),
                ("something yellow", vec![0.1, 0.9]),
            ],
        )
    }

    pub fn embedded(&self) -> usize {
        self.embedded.get()
    }
}

impl EmbeddingProvider for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embedded.set(self.embedded.get() + 1);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| QaError::Transport(format!("no stub vector for {:?}", text)))
    }
}

/// Records every call and echoes the passage ids back
pub struct StubAnswerEngine {
    failure: Option<fn() -> QaError>,
    calls: RefCell<Vec<(String, Vec<Passage>)>>,
}

impl StubAnswerEngine {
    pub fn new() -> Self {
        Self {
            failure: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(failure: fn() -> QaError) -> Self {
        Self {
            failure: Some(failure),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<Passage>)> {
        self.calls.borrow().clone()
    }
}

impl AnswerEngine for StubAnswerEngine {
    fn generate(&self, question: &str, passages: &[Passage]) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((question.to_string(), passages.to_vec()));
        if let Some(failure) = self.failure {
            return Err(failure());
        }
        let ids: Vec<&str> = passages.iter().map(|p| p.id.as_str()).collect();
        Ok(format!("answer from [{}]", ids.join(", ")))
    }
}
