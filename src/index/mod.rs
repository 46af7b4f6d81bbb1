// Vector index module
// Flat in-memory index with exact Euclidean nearest-neighbour search, plus its on-disk store

pub mod store;


use tracing::debug;

use crate::{QaError, Result};

pub use store::{INDEX_FILE_NAME, IndexStore, IndexSummary};

/// A source document together with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDocument {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    /// Where the document came from, e.g. "SharePoint"
    pub source: String,
}

/// One search hit: a stored document and its distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub document: &'a EmbeddedDocument,
    pub distance: f32,
}

/// Append-only vector index. Every stored vector has the same dimension,
/// fixed by the first vector ever added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorIndex {
    dimension: Option<usize>,
    documents: Vec<EmbeddedDocument>,
}

impl VectorIndex {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index whose dimension is already fixed
    #[inline]
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            documents: Vec::new(),
        }
    }

    #[inline]
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[inline]
    pub fn documents(&self) -> &[EmbeddedDocument] {
        &self.documents
    }

    /// Append documents. Either all of them are inserted or none are.
    ///
    /// # Errors
    /// `DimensionMismatch` if any vector disagrees with the index dimension
    /// (or with the first vector of the batch when the index has none yet).
    #[inline]
    pub fn add(&mut self, documents: Vec<EmbeddedDocument>) -> Result<()> {
        let Some(first) = documents.first() else {
            return Ok(());
        };

        let expected = self.dimension.unwrap_or(first.vector.len());
        if expected == 0 {
            return Err(QaError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }

        if let Some(bad) = documents.iter().find(|doc| doc.vector.len() != expected) {
            return Err(QaError::DimensionMismatch {
                expected,
                actual: bad.vector.len(),
            });
        }

        debug!(
            "Adding {} vectors of dimension {} to index",
            documents.len(),
            expected
        );

        self.dimension = Some(expected);
        self.documents.extend(documents);
        Ok(())
    }

    /// Return up to `k` stored documents ordered by ascending distance to `query`.
    /// At equal distance the most recently added document ranks first.
    ///
    /// # Errors
    /// `EmptyIndex` when nothing has been stored, `DimensionMismatch` when the
    /// query length differs from the index dimension.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor<'_>>> {
        let Some(dimension) = self.dimension.filter(|_| !self.documents.is_empty()) else {
            return Err(QaError::EmptyIndex);
        };

        if query.len() != dimension {
            return Err(QaError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }

        if k == 0 {
            return Ok(Vec::new());
        }

        let mut ranked: Vec<(usize, Neighbor<'_>)> = self
            .documents
            .iter()
            .enumerate()
            .map(|(position, document)| {
                (
                    position,
                    Neighbor {
                        document,
                        distance: euclidean_distance(&document.vector, query),
                    },
                )
            })
            .collect();

        ranked.sort_by(|(a_pos, a), (b_pos, b)| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| b_pos.cmp(a_pos))
        });

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(_, neighbor)| neighbor)
            .collect())
    }
}

/// L2 distance between two equal-length vectors
#[inline]
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(lhs, rhs)| {
            let diff = lhs - rhs;
            diff * diff
        })
        .sum::<f32>()
        .sqrt()
}
