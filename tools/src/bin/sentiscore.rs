//! Score whitespace-separated sentences from stdin against a sentiment
//! lexicon.

use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use libsentiment_core::{Lexicon, Sentiment};

#[derive(Parser)]
#[command(about = "Print VADER sentiment scores for sentences from stdin")]
struct Args {
    /// Sentiment dictionary (term<TAB>valence per line).
    dictionary: std::path::PathBuf,

    /// Emoji map (emoji<TAB>phrase per line).
    emojis: std::path::PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let lexicon = Lexicon::load(&args.dictionary, &args.emojis)
        .context("loading the sentiment lexicon")?;
    eprintln!(
        "loaded {} terms, {} emojis",
        lexicon.dict_size(),
        lexicon.emoji_count()
    );
    let analyzer = Sentiment::new(Arc::new(lexicon));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        let scores = analyzer.analyze(&words);
        println!(
            "compound={:+.4} pos={:.3} neu={:.3} neg={:.3}  {line}",
            scores.compound, scores.positive, scores.neutral, scores.negative
        );
    }
    Ok(())
}
