//! Terminal rendering of recommendations and the mood → GIF lookup.

use std::io::{self, Write};

use serde::Serialize;

use moodtune_core::types::ScoredSong;

/// One row of the lookup: any keyword found in the query selects `url`.
#[derive(Debug, Clone)]
pub struct MoodAsset {
    pub keywords: Vec<String>,
    pub url: String,
}

impl MoodAsset {
    pub fn new(keywords: &[&str], url: &str) -> Self {
        Self { keywords: keywords.iter().map(|k| k.to_lowercase()).collect(), url: url.to_string() }
    }
}

/// Ordered keyword table; first matching row wins, `fallback` otherwise.
#[derive(Debug, Clone)]
pub struct MoodAssets {
    entries: Vec<MoodAsset>,
    fallback: String,
}

impl MoodAssets {
    pub fn new(entries: Vec<MoodAsset>, fallback: impl Into<String>) -> Self {
        Self { entries, fallback: fallback.into() }
    }

    /// Case-insensitive substring match against the raw query.
    pub fn lookup(&self, query: &str) -> &str {
        let mood = query.to_lowercase();
        self.entries
            .iter()
            .find(|e| e.keywords.iter().any(|k| mood.contains(k.as_str())))
            .map_or(self.fallback.as_str(), |e| e.url.as_str())
    }
}

impl Default for MoodAssets {
    fn default() -> Self {
        Self::new(
            vec![
                MoodAsset::new(&["happy"], "https://media1.giphy.com/media/v1.Y2lkPTc5MGI3NjExZ3R3cHYzcHFnMTlodjJmMnZ5MHdpdDdza2h1Z3FlM3d2OTdzNHlheiZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/11sBLVxNs7v6WA/giphy.gif"),
                MoodAsset::new(&["sad"], "https://media.giphy.com/media/d2lcHJTG5Tscg/giphy.gif"),
                MoodAsset::new(&["love"], "https://media.giphy.com/media/xT0xeJpnrWC4XWblEk/giphy.gif"),
                MoodAsset::new(&["angry"], "https://media4.giphy.com/media/v1.Y2lkPTc5MGI3NjExc3l0Ync1YXQ2bjlxeWRwenA2azZlc3lzcXFzdXJibXdmcTEzdWl1MyZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/11tTNkNy1SdXGg/giphy.gif"),
                MoodAsset::new(&["irritated", "annoyed"], "https://media4.giphy.com/media/v1.Y2lkPTc5MGI3NjExZHR1bXRjcTRkOXFybng3dmR5MmZ2YmJobTNtOW9ra3o0YmUxYjJ4dCZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/sYVgIV5N0EutwxVfDh/giphy.gif"),
                MoodAsset::new(&["dance"], "https://media1.giphy.com/media/v1.Y2lkPTc5MGI3NjExdjE5OXpzdTdnczQxdXBjNm1sMG84NWE4MXE0cjk0a3QzYnFqcHpscSZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/8IqEMUfybiNri/giphy.gif"),
                MoodAsset::new(&["relaxed", "calm"], "https://media2.giphy.com/media/v1.Y2lkPTc5MGI3NjExZDk2bGdreXZqNnZqbjZpY3AyaGpvNGlpYmVicDU1dzdjbng1bDU4NCZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/3o6vXJZlfNfAYysryo/giphy.gif"),
                MoodAsset::new(&["motivated", "workout"], "https://media3.giphy.com/media/v1.Y2lkPTc5MGI3NjExYWhxMGxqY2EzbHZwcmhvZHMxNTQxaDZhcmQyM2p1MXh1dGU3djl2cCZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/26BRq9PYFLeJl3WLu/giphy.gif"),
            ],
            "https://media4.giphy.com/media/v1.Y2lkPTc5MGI3NjExYjFpbnRydHp2ZDVmdGU2Z3ltbHl2cXE1bWRpZmplM2I0Nml4dmxkdyZlcD12MV9pbnRlcm5hbF9naWZfYnlfaWQmY3Q9Zw/8ExdHaMMOeJUc/giphy.gif",
        )
    }
}

/// What the presentation layer shows per song.
#[derive(Debug, Serialize)]
pub struct SongView<'a> {
    pub name: &'a str,
    pub artists: Vec<String>,
    pub excerpt: String,
    pub score: f32,
}

impl<'a> From<&'a ScoredSong> for SongView<'a> {
    fn from(s: &'a ScoredSong) -> Self {
        Self { name: &s.song.name, artists: s.song.artist_list(), excerpt: s.song.lyrics_excerpt(), score: s.score }
    }
}

#[derive(Debug, Serialize)]
struct Response<'a> {
    query: &'a str,
    gif: &'a str,
    songs: Vec<SongView<'a>>,
}

pub fn render_text<W: Write>(out: &mut W, gif: &str, results: &[ScoredSong]) -> io::Result<()> {
    writeln!(out, "Here are your top vibe-matching songs! 💃🕺")?;
    writeln!(out, "🎬 {gif}")?;
    writeln!(out)?;
    for s in results {
        writeln!(out, "### 🎵 {}", s.song.name)?;
        writeln!(out, "**Artist:** {}", s.song.artist_list().join(", "))?;
        writeln!(out, "> {}", s.song.lyrics_excerpt())?;
        writeln!(out, "---")?;
    }
    Ok(())
}

pub fn render_json<W: Write>(out: &mut W, query: &str, gif: &str, results: &[ScoredSong]) -> anyhow::Result<()> {
    let response = Response { query, gif, songs: results.iter().map(SongView::from).collect() };
    serde_json::to_writer_pretty(&mut *out, &response)?;
    writeln!(out)?;
    Ok(())
}
