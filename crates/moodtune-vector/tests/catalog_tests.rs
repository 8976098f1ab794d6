use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{Device, Tensor};
use moodtune_core::error::Error;
use moodtune_core::types::Song;
use moodtune_vector::{read_songs, CatalogStore};

fn write_npy(dir: &Path, name: &str, data: &[f32], shape: &[usize]) -> PathBuf {
    let path = dir.join(name);
    Tensor::from_slice(data, shape, &Device::Cpu).unwrap().write_npy(&path).unwrap();
    path
}

fn write_csv(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("songs.csv");
    fs::write(&path, body).unwrap();
    path
}

const THREE_SONGS: &str = "\
,name,artists,lyrics,clean_lyrics
0,Sunny,['Ray'],RAW,here comes the sun
1,Rainy,\"['Ann', 'Bo']\",RAW,\"grey skies, wet streets\"
2,Windy,Cy,RAW,
";

#[test]
fn load_aligns_songs_with_rows() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), THREE_SONGS);
    let npy = write_npy(tmp.path(), "emb.npy", &[1.0, 0.0, 0.0, 1.0, 0.7, 0.7], &[3, 2]);

    let store = CatalogStore::load(&csv, &npy, 2).expect("load");
    assert_eq!(store.len(), 3);
    assert_eq!(store.dim(), 2);
    assert_eq!(store.get(1).unwrap().name, "Rainy");
    assert_eq!(store.get(1).unwrap().lyrics, "grey skies, wet streets", "clean_lyrics preferred");
    assert_eq!(store.get(1).unwrap().artist_list(), vec!["Ann", "Bo"]);
    assert_eq!(store.get(2).unwrap().lyrics, "");
    assert_eq!(store.vectors().row(2), Some(&[0.7f32, 0.7][..]));
}

#[test]
fn f64_matrices_are_accepted() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), THREE_SONGS);
    let path = tmp.path().join("emb64.npy");
    Tensor::from_slice(&[1.0f64, 0.0, 0.0, 1.0, 0.5, 0.5], (3, 2), &Device::Cpu).unwrap().write_npy(&path).unwrap();
    let store = CatalogStore::load(&csv, &path, 2).expect("load f64");
    assert_eq!(store.vectors().row(2), Some(&[0.5f32, 0.5][..]));
}

#[test]
fn row_count_mismatch_is_data_integrity() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), THREE_SONGS);
    let npy = write_npy(tmp.path(), "emb.npy", &[1.0, 0.0, 0.0, 1.0], &[2, 2]);
    assert!(matches!(CatalogStore::load(&csv, &npy, 2), Err(Error::DataIntegrity(_))));
}

#[test]
fn encoder_dimension_mismatch_is_data_integrity() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), THREE_SONGS);
    let npy = write_npy(tmp.path(), "emb.npy", &[0.0; 9], &[3, 3]);
    let err = CatalogStore::load(&csv, &npy, 384).unwrap_err();
    assert!(matches!(err, Error::DataIntegrity(ref m) if m.contains("384")), "{err}");
}

#[test]
fn one_dimensional_array_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), THREE_SONGS);
    let npy = write_npy(tmp.path(), "flat.npy", &[0.0; 6], &[6]);
    assert!(matches!(CatalogStore::load(&csv, &npy, 2), Err(Error::DataIntegrity(_))));
}

#[test]
fn missing_files_are_data_integrity() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), THREE_SONGS);
    let absent = tmp.path().join("absent.npy");
    assert!(matches!(CatalogStore::load(&csv, &absent, 2), Err(Error::DataIntegrity(_))));
    assert!(matches!(read_songs(&tmp.path().join("absent.csv")), Err(Error::DataIntegrity(_))));
}

#[test]
fn missing_lyrics_column_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), "name,artists\nA,B\n");
    let err = read_songs(&csv).unwrap_err();
    assert!(err.to_string().contains("lyrics"), "{err}");
}

#[test]
fn plain_lyrics_column_is_used_when_clean_is_absent() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), "name,artists,lyrics\nA,B,words\n");
    assert_eq!(read_songs(&csv).unwrap(), vec![Song::new("A", "B", "words")]);
}

#[test]
fn empty_catalog_is_rejected() {
    let err = CatalogStore::from_parts(vec![], vec![], 2).unwrap_err();
    assert!(matches!(err, Error::DataIntegrity(_)));
}

#[test]
fn ragged_rows_are_rejected() {
    let songs = vec![Song::new("a", "x", ""), Song::new("b", "y", "")];
    let err = CatalogStore::from_parts(songs, vec![vec![1.0, 0.0], vec![1.0]], 2).unwrap_err();
    assert!(matches!(err, Error::DataIntegrity(_)));
}

#[test]
fn get_out_of_range() {
    let store = CatalogStore::from_parts(vec![Song::new("a", "x", "")], vec![vec![1.0]], 1).unwrap();
    assert!(matches!(store.get(1), Err(Error::IndexOutOfRange { index: 1, len: 1 })));
}

#[test]
fn missing_name_column_is_data_integrity() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), "title,artists,lyrics\nA,B,words\n");
    let err = read_songs(&csv).unwrap_err();
    assert!(matches!(err, Error::DataIntegrity(ref m) if m.contains("name")), "{err}");
}

#[test]
fn extra_columns_are_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), "id,lyrics,popularity,artists,name\n7,words,81,B,A\n");
    assert_eq!(read_songs(&csv).unwrap(), vec![Song::new("A", "B", "words")]);
}

#[test]
fn f16_matrices_are_widened() {
    let tmp = tempfile::tempdir().unwrap();
    let csv = write_csv(tmp.path(), THREE_SONGS);
    let path = tmp.path().join("emb16.npy");
    Tensor::from_slice(&[1.0f32, 0.0, 0.0, 1.0, 0.5, 0.5], (3, 2), &Device::Cpu)
        .and_then(|t| t.to_dtype(candle_core::DType::F16))
        .unwrap()
        .write_npy(&path)
        .unwrap();
    let store = CatalogStore::load(&csv, &path, 2).expect("load f16");
    assert_eq!(store.vectors().row(2), Some(&[0.5f32, 0.5][..]));
}
