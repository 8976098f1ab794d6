//! Domain types shared by the catalog, ranker and recommender.

use serde::{Deserialize, Serialize};

/// Number of lyric characters shown in an excerpt.
pub const EXCERPT_CHARS: usize = 200;
/// Marker appended to every excerpt.
pub const ELLIPSIS: &str = "...";

/// One catalog entry as read from the metadata source.
///
/// Songs carry no explicit id: a song's identity is its row position in the
/// catalog, which is stable for the life of the process. `lyrics` is kept
/// for display only; ranking uses the precomputed vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub artists: String,
    pub lyrics: String,
}

impl Song {
    pub fn new(name: impl Into<String>, artists: impl Into<String>, lyrics: impl Into<String>) -> Self {
        Self { name: name.into(), artists: artists.into(), lyrics: lyrics.into() }
    }

    /// First [`EXCERPT_CHARS`] characters of the lyrics followed by [`ELLIPSIS`].
    ///
    /// Counts Unicode scalar values, not bytes, and ignores word boundaries.
    pub fn lyrics_excerpt(&self) -> String {
        let mut out: String = self.lyrics.chars().take(EXCERPT_CHARS).collect();
        out.push_str(ELLIPSIS);
        out
    }

    /// Split the delimited `artists` field into names.
    ///
    /// Accepts both a bare name (`Adele`) and the list form found in Spotify
    /// exports (`['Ed Sheeran', 'Justin Bieber']`). Commas inside quotes do not split.
    pub fn artist_list(&self) -> Vec<String> {
        let s = self.artists.trim();
        let s = s.strip_prefix('[').unwrap_or(s);
        let s = s.strip_suffix(']').unwrap_or(s);

        let mut names = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        for c in s.chars() {
            match (quote, c) {
                (None, '\'' | '"') => quote = Some(c),
                (Some(q), c) if c == q => quote = None,
                (None, ',') => names.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        names.push(current);
        names.into_iter().map(|n| n.trim().to_string()).filter(|n| !n.is_empty()).collect()
    }
}

/// A ranked song with its catalog row and cosine score.
///
/// Higher `score` is better; scores lie in `[-1, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredSong {
    pub index: usize,
    pub score: f32,
    pub song: Song,
}

/// Ordered result of one query, best first.
pub type RankedResult = Vec<ScoredSong>;
