use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use moodtune_core::config::{Config, Settings};
use moodtune_embed::EncoderKind;
use moodtune_recommend::{MoodRecommender, RecommendError};

mod present;

use present::{render_json, render_text, MoodAssets};

#[derive(Debug, Parser)]
#[command(name = "moodtune", version, about = "Find songs whose lyrics match your mood")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file to use instead of ./config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Recommend songs for one mood description
    Recommend {
        /// Mood, vibe or situation, e.g. "happy dance" or "sad love"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        /// Number of songs to return (overrides recommend.top_k)
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Read one mood per line from stdin until EOF
    Interactive {
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
    /// Load the catalog and encoder and report what was found
    Check,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("moodtune=info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load_from(cli.config.as_deref()).context("loading configuration")?;
    let mut settings = config.settings()?;

    match cli.command {
        Commands::Recommend { query, top_k, json } => {
            apply_top_k(&mut settings, top_k)?;
            let recommender = build(&settings)?;
            let query = query.join(" ");
            let results = recommender.recommend_scored(&query)?;
            let gif = MoodAssets::default().lookup(&query).to_string();
            let mut out = io::stdout().lock();
            if json { render_json(&mut out, &query, &gif, &results)?; } else { render_text(&mut out, &gif, &results)?; }
        }
        Commands::Interactive { top_k } => {
            apply_top_k(&mut settings, top_k)?;
            let recommender = build(&settings)?;
            interactive(&recommender, &MoodAssets::default())?;
        }
        Commands::Check => {
            let recommender = build(&settings)?;
            println!("env:        {}", config.env_name());
            println!("songs:      {}", recommender.catalog().len());
            println!("dimension:  {}", recommender.catalog().dim());
            println!("encoder:    {}", EncoderKind::from_settings(&settings.model));
            recommender.warm_up().context("encoder failed to initialize")?;
            println!("✅ catalog and encoder agree");
        }
    }
    Ok(())
}

fn apply_top_k(settings: &mut Settings, top_k: Option<usize>) -> Result<()> {
    match top_k {
        Some(0) => bail!("--top-k must be at least 1"),
        Some(k) => settings.recommend.top_k = k,
        None => {}
    }
    Ok(())
}

fn build(settings: &Settings) -> Result<MoodRecommender> {
    MoodRecommender::from_settings(settings).with_context(|| {
        format!(
            "loading catalog from {} and {}",
            settings.catalog.metadata_path.display(),
            settings.catalog.embeddings_path.display()
        )
    })
}

/// Each line is an independent request; per-query errors are reported and the loop continues.
fn interactive(recommender: &MoodRecommender, assets: &MoodAssets) -> Result<()> {
    let stdin = io::stdin();
    let mut out = io::stdout().lock();
    write!(out, "mood> ")?;
    out.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        match recommender.recommend_scored(&line) {
            Ok(results) => render_text(&mut out, assets.lookup(&line), &results)?,
            Err(e @ RecommendError::EmptyQuery) => writeln!(out, "{e}")?,
            Err(e) => {
                tracing::error!(error = %e, "query failed");
                writeln!(out, "❌ {e}")?;
            }
        }
        write!(out, "mood> ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}
