//! Encoder whose expensive construction is deferred to first use.
//!
//! Construction runs at most once per successful initialization: callers that
//! arrive while it is in flight block on the same cell and then share the
//! result. A failed initialization leaves the cell empty, so a later call
//! tries again.

use once_cell::sync::OnceCell;

use moodtune_core::error::{Error, Result};
use moodtune_core::traits::Encoder;

type Init = Box<dyn Fn() -> anyhow::Result<Box<dyn Encoder>> + Send + Sync>;

pub struct LazyEncoder {
    cell: OnceCell<Box<dyn Encoder>>,
    init: Init,
    dim: usize,
}

impl LazyEncoder {
    /// `dim` is the declared output width; the built encoder must agree with it.
    pub fn new<F>(dim: usize, init: F) -> Self
    where
        F: Fn() -> anyhow::Result<Box<dyn Encoder>> + Send + Sync + 'static,
    {
        Self { cell: OnceCell::new(), init: Box::new(init), dim }
    }

    pub fn is_initialized(&self) -> bool { self.cell.get().is_some() }

    fn inner(&self) -> Result<&dyn Encoder> {
        self.cell
            .get_or_try_init(|| {
                tracing::info!(dim = self.dim, "initializing encoder");
                let encoder = (self.init)().map_err(|e| Error::Encoding(format!("encoder initialization failed: {e:#}")))?;
                if encoder.dim() != self.dim {
                    return Err(Error::Encoding(format!(
                        "encoder produces {} dimensions but {} were declared",
                        encoder.dim(),
                        self.dim
                    )));
                }
                Ok(encoder)
            })
            .map(|e| &**e)
    }
}

impl Encoder for LazyEncoder {
    fn dim(&self) -> usize { self.dim }

    fn warm_up(&self) -> Result<()> { self.inner().map(|_| ()) }

    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() { return Err(Error::Encoding("empty input".into())); }
        let v = self.inner()?.encode(text)?;
        if v.len() != self.dim {
            return Err(Error::Encoding(format!("expected {} dimensions, got {}", self.dim, v.len())));
        }
        Ok(v)
    }
}
