//! In-memory song catalog and exhaustive cosine ranking.

pub mod catalog;
pub mod search;

pub use catalog::{read_matrix, read_songs, CatalogStore, EmbeddingMatrix};
pub use search::{cosine_similarity, SimilarityRanker};
