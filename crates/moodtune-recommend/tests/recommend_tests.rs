use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use candle_core::{Device, Tensor};
use moodtune_core::config::Settings;
use moodtune_core::error::{Error, Result};
use moodtune_core::traits::Encoder;
use moodtune_core::types::Song;
use moodtune_embed::{HashingEncoder, LazyEncoder};
use moodtune_recommend::{MoodRecommender, RecommendError};
use moodtune_vector::CatalogStore;

/// Encoder with a fixed phrase → vector table that counts its calls.
struct TableEncoder {
    table: HashMap<&'static str, Vec<f32>>,
    calls: AtomicUsize,
    dim: usize,
}

impl TableEncoder {
    fn new(dim: usize, entries: &[(&'static str, Vec<f32>)]) -> Self {
        Self { table: entries.iter().cloned().collect(), calls: AtomicUsize::new(0), dim }
    }
}

impl Encoder for TableEncoder {
    fn dim(&self) -> usize { self.dim }
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.table.get(text).cloned().ok_or_else(|| Error::Encoding(format!("unknown phrase {text:?}")))
    }
}

fn three_song_catalog() -> Arc<CatalogStore> {
    let songs = vec![
        Song::new("Walking on Sunshine", "Katrina and the Waves", "I'm walking on sunshine"),
        Song::new("Someone Like You", "Adele", "Never mind, I'll find someone like you"),
        Song::new("Happy Tears", "Mixed", "smiling through the rain"),
    ];
    let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]];
    Arc::new(CatalogStore::from_parts(songs, rows, 2).unwrap())
}

fn recommender(encoder: Arc<TableEncoder>) -> MoodRecommender {
    MoodRecommender::new(three_song_catalog(), encoder).unwrap()
}

#[test]
fn ranks_catalog_by_query_similarity() {
    let encoder = Arc::new(TableEncoder::new(2, &[("happy", vec![1.0, 0.0])]));
    let rec = recommender(encoder).with_top_k(2);

    let scored = rec.recommend_scored("happy").unwrap();
    assert_eq!(scored.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 2]);
    assert!((scored[0].score - 1.0).abs() < 1e-6);
    assert!((scored[1].score - 0.7071).abs() < 1e-3);

    let songs = rec.recommend("happy").unwrap();
    assert_eq!(songs[0].name, "Walking on Sunshine");
    assert_eq!(songs[1].name, "Happy Tears");
}

#[test]
fn default_top_k_clamps_to_catalog_size() {
    let encoder = Arc::new(TableEncoder::new(2, &[("sad", vec![0.0, 1.0])]));
    let rec = recommender(encoder);
    assert_eq!(rec.top_k(), 5);
    let songs = rec.recommend("sad").unwrap();
    assert_eq!(songs.len(), 3);
    assert_eq!(songs[0].artists, "Adele");
}

#[test]
fn empty_query_never_reaches_encoder() {
    let encoder = Arc::new(TableEncoder::new(2, &[]));
    let rec = recommender(Arc::clone(&encoder));
    assert_eq!(rec.recommend(""), Err(RecommendError::EmptyQuery));
    assert_eq!(rec.recommend("   \n"), Err(RecommendError::EmptyQuery));
    assert_eq!(encoder.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn encoder_failure_is_a_retrieval_error() {
    let encoder = Arc::new(TableEncoder::new(2, &[]));
    let rec = recommender(encoder);
    assert!(matches!(rec.recommend("unknown mood"), Err(RecommendError::Retrieval(_))));
}

#[test]
fn wrong_width_vector_is_an_internal_error() {
    struct Liar;
    impl Encoder for Liar {
        fn dim(&self) -> usize { 2 }
        fn encode(&self, _text: &str) -> Result<Vec<f32>> { Ok(vec![1.0, 0.0, 0.0]) }
    }
    let rec = MoodRecommender::new(three_song_catalog(), Arc::new(Liar)).unwrap();
    assert!(matches!(rec.recommend("anything"), Err(RecommendError::Internal(_))));
}

#[test]
fn zero_top_k_is_an_internal_error() {
    let encoder = Arc::new(TableEncoder::new(2, &[("happy", vec![1.0, 0.0])]));
    let rec = recommender(encoder).with_top_k(0);
    assert!(matches!(rec.recommend("happy"), Err(RecommendError::Internal(_))));
}

#[test]
fn encoder_catalog_width_mismatch_fails_construction() {
    let err = MoodRecommender::new(three_song_catalog(), Arc::new(HashingEncoder::new(3))).err().unwrap();
    assert!(matches!(err, Error::DataIntegrity(_)));
}

#[test]
fn repeated_queries_are_deterministic() {
    let songs: Vec<Song> = (0..40).map(|i| Song::new(format!("song {i}"), "x", format!("lyric {i}"))).collect();
    let encoder = HashingEncoder::new(32);
    let rows = songs.iter().map(|s| encoder.encode(&s.lyrics).unwrap()).collect();
    let catalog = Arc::new(CatalogStore::from_parts(songs, rows, 32).unwrap());
    let rec = MoodRecommender::new(catalog, Arc::new(encoder)).unwrap();

    let first = rec.recommend_scored("lyric 7 feeling").unwrap();
    let second = rec.recommend_scored("lyric 7 feeling").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[test]
fn shared_across_threads() {
    let encoder = Arc::new(TableEncoder::new(2, &[("happy", vec![1.0, 0.0]), ("sad", vec![0.0, 1.0])]));
    let rec = recommender(encoder);
    std::thread::scope(|s| {
        let a = s.spawn(|| rec.recommend("happy").unwrap());
        let b = s.spawn(|| rec.recommend("sad").unwrap());
        assert_eq!(a.join().unwrap()[0].name, "Walking on Sunshine");
        assert_eq!(b.join().unwrap()[0].name, "Someone Like You");
    });
}

#[test]
fn from_settings_loads_files_and_uses_fake_encoder() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = tmp.path().join("songs.csv");
    std::fs::write(&csv, "name,artists,clean_lyrics\nDance,DJ,dance all night\nBlue,Singer,crying alone\n").unwrap();

    let encoder = HashingEncoder::new(64);
    let rows: Vec<f32> = ["dance all night", "crying alone"]
        .iter()
        .flat_map(|t| encoder.encode(t).unwrap())
        .collect();
    let npy = tmp.path().join("emb.npy");
    Tensor::from_vec(rows, (2, 64), &Device::Cpu).unwrap().write_npy(&npy).unwrap();

    let mut settings = Settings::default();
    settings.catalog.metadata_path = csv;
    settings.catalog.embeddings_path = npy;
    settings.model.dim = 64;
    settings.model.fake = true;
    settings.recommend.top_k = 1;

    let rec = MoodRecommender::from_settings(&settings).unwrap();
    assert_eq!(rec.catalog().len(), 2);
    let songs = rec.recommend("crying alone tonight").unwrap();
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].name, "Blue");
}

#[test]
fn warm_up_initializes_the_lazy_encoder_once() {
    let inits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&inits);
    let encoder = Arc::new(LazyEncoder::new(2, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HashingEncoder::new(2)) as Box<dyn Encoder>)
    }));
    let recommender = MoodRecommender::new(three_song_catalog(), encoder.clone()).unwrap();

    assert!(!encoder.is_initialized());
    recommender.warm_up().unwrap();
    assert!(encoder.is_initialized());
    recommender.warm_up().unwrap();
    recommender.recommend("sunny day").unwrap();
    assert_eq!(inits.load(Ordering::SeqCst), 1);
}

#[test]
fn warm_up_failure_is_a_retrieval_error() {
    let encoder = Arc::new(LazyEncoder::new(2, || anyhow::bail!("no model files")));
    let recommender = MoodRecommender::new(three_song_catalog(), encoder).unwrap();
    assert!(matches!(recommender.warm_up(), Err(RecommendError::Retrieval(m)) if m.contains("no model files")));
}
