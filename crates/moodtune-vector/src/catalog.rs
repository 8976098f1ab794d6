//! Immutable song catalog aligned with its precomputed embedding matrix.
//!
//! Metadata comes from a CSV file (one row per song, `name`, `artists` and
//! `clean_lyrics` or `lyrics` columns) and vectors from a 2-D `.npy` array in
//! the same row order. Both are validated against each other and against the
//! encoder's dimension before the store exists; after that nothing mutates it.

use std::path::Path;

use candle_core::{DType, Tensor};
use serde::Deserialize;

use moodtune_core::error::{Error, Result};
use moodtune_core::types::Song;

/// Row-major `rows x dim` matrix of finite `f32`, with cached row norms.
///
/// Norms are kept in `f64`: a row of finite `f32` values can still have a
/// Euclidean norm beyond `f32::MAX`.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    data: Vec<f32>,
    norms: Vec<f64>,
    rows: usize,
    dim: usize,
}

impl EmbeddingMatrix {
    pub fn from_flat(data: Vec<f32>, rows: usize, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::DataIntegrity("embedding dimension must be at least 1".into()));
        }
        if data.len() != rows * dim {
            return Err(Error::DataIntegrity(format!(
                "matrix holds {} values, expected {rows} x {dim}",
                data.len()
            )));
        }
        if let Some(pos) = data.iter().position(|x| !x.is_finite()) {
            return Err(Error::DataIntegrity(format!("non-finite value in row {}", pos / dim)));
        }
        let norms = data.chunks_exact(dim).map(l2_norm).collect();
        Ok(Self { data, norms, rows, dim })
    }

    /// Every row must have exactly `dim` entries.
    pub fn from_rows(rows: Vec<Vec<f32>>, dim: usize) -> Result<Self> {
        let n = rows.len();
        let mut data = Vec::with_capacity(n * dim);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dim {
                return Err(Error::DataIntegrity(format!(
                    "embedding row {i} has {} values, expected {dim}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Self::from_flat(data, n, dim)
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn dim(&self) -> usize { self.dim }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        (i < self.rows).then(|| &self.data[i * self.dim..(i + 1) * self.dim])
    }

    /// Euclidean norm of row `i`, computed once at construction.
    pub fn norm(&self, i: usize) -> Option<f64> { self.norms.get(i).copied() }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ { self.data.chunks_exact(self.dim) }
}

pub(crate) fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

#[derive(Debug)]
pub struct CatalogStore {
    songs: Vec<Song>,
    vectors: EmbeddingMatrix,
}

impl CatalogStore {
    /// Load metadata and vectors from disk. `dim` is the encoder's output width.
    pub fn load(metadata_path: &Path, embeddings_path: &Path, dim: usize) -> Result<Self> {
        let songs = read_songs(metadata_path)?;
        let vectors = read_matrix(embeddings_path)?;
        let store = Self::from_matrix(songs, vectors, dim)?;
        tracing::info!(
            songs = store.len(),
            dim,
            metadata = %metadata_path.display(),
            embeddings = %embeddings_path.display(),
            "catalog loaded"
        );
        Ok(store)
    }

    pub fn from_parts(songs: Vec<Song>, rows: Vec<Vec<f32>>, dim: usize) -> Result<Self> {
        let vectors = EmbeddingMatrix::from_rows(rows, dim)?;
        Self::from_matrix(songs, vectors, dim)
    }

    pub fn from_matrix(songs: Vec<Song>, vectors: EmbeddingMatrix, dim: usize) -> Result<Self> {
        if songs.len() != vectors.rows() {
            return Err(Error::DataIntegrity(format!(
                "{} songs but {} embedding rows",
                songs.len(),
                vectors.rows()
            )));
        }
        if vectors.dim() != dim {
            return Err(Error::DataIntegrity(format!(
                "embeddings have {} dimensions, encoder produces {dim}",
                vectors.dim()
            )));
        }
        if songs.is_empty() {
            return Err(Error::DataIntegrity("catalog is empty".into()));
        }
        Ok(Self { songs, vectors })
    }

    pub fn get(&self, index: usize) -> Result<&Song> {
        self.songs.get(index).ok_or(Error::IndexOutOfRange { index, len: self.songs.len() })
    }

    pub fn vectors(&self) -> &EmbeddingMatrix { &self.vectors }
    pub fn songs(&self) -> &[Song] { &self.songs }
    pub fn len(&self) -> usize { self.songs.len() }
    pub fn is_empty(&self) -> bool { self.songs.is_empty() }
    pub fn dim(&self) -> usize { self.vectors.dim() }
}

#[derive(Debug, Deserialize)]
struct SongRow {
    name: String,
    artists: String,
    #[serde(default)]
    clean_lyrics: Option<String>,
    #[serde(default)]
    lyrics: Option<String>,
}

impl SongRow {
    fn into_song(self, prefer_clean: bool) -> Song {
        let lyrics = if prefer_clean { self.clean_lyrics } else { self.lyrics };
        Song::new(self.name, self.artists, lyrics.unwrap_or_default())
    }
}

/// Read song rows from a CSV file with a header line.
///
/// Rows are deserialized by header name; other columns are ignored. The
/// `clean_lyrics` column wins over `lyrics` when both exist.
pub fn read_songs(path: &Path) -> Result<Vec<Song>> {
    let integrity = |e: csv::Error| Error::DataIntegrity(format!("{}: {e}", path.display()));
    let mut reader = csv::Reader::from_path(path).map_err(integrity)?;
    let headers = reader.headers().map_err(integrity)?;
    let prefer_clean = headers.iter().any(|h| h == "clean_lyrics");
    if !prefer_clean && !headers.iter().any(|h| h == "lyrics") {
        return Err(Error::DataIntegrity(format!("{}: missing 'lyrics' column", path.display())));
    }

    let songs = reader
        .deserialize::<SongRow>()
        .map(|row| row.map(|r| r.into_song(prefer_clean)).map_err(integrity))
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(rows = songs.len(), path = %path.display(), "read song metadata");
    Ok(songs)
}

/// Read a 2-D float `.npy` array (f16, bf16, f32 or f64) as an [`EmbeddingMatrix`].
///
/// Values are converted to `f32`.
pub fn read_matrix(path: &Path) -> Result<EmbeddingMatrix> {
    let integrity = |e: candle_core::Error| Error::DataIntegrity(format!("{}: {e}", path.display()));
    let tensor = Tensor::read_npy(path).map_err(integrity)?;
    if !matches!(tensor.dtype(), DType::F32 | DType::F64 | DType::F16 | DType::BF16) {
        return Err(Error::DataIntegrity(format!(
            "{}: expected a float array, found {:?}",
            path.display(),
            tensor.dtype()
        )));
    }
    let (rows, dim) = tensor.dims2().map_err(|_| {
        Error::DataIntegrity(format!("{}: expected a 2-D array, found shape {:?}", path.display(), tensor.dims()))
    })?;
    let data = tensor
        .to_dtype(DType::F32)
        .and_then(|t| t.flatten_all())
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(integrity)?;
    EmbeddingMatrix::from_flat(data, rows, dim)
}
