use crate::error::Result;

/// Maps text into the catalog's embedding space.
///
/// Implementations must be deterministic for a fixed model: the same text
/// always yields the same vector. Empty input is rejected with
/// [`Error::Encoding`](crate::error::Error::Encoding).
pub trait Encoder: Send + Sync {
    fn dim(&self) -> usize;
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Do any deferred setup now instead of on the first `encode`.
    fn warm_up(&self) -> Result<()> { Ok(()) }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}
