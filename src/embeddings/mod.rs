// Embeddings module
// The embedding capability the index is built from, and its OpenAI implementation

pub mod openai;

use crate::Result;

pub use openai::OpenAiEmbeddings;

/// Maps text to a fixed-length vector.
///
/// `dimension` must stay constant for the lifetime of the provider; every vector
/// returned by `embed` and `embed_batch` has exactly that length.
pub trait EmbeddingProvider {
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, returning vectors in input order
    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

impl<T: EmbeddingProvider + ?Sized> EmbeddingProvider for &T {
    #[inline]
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed(text)
    }

    #[inline]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        (**self).embed_batch(texts)
    }
}
