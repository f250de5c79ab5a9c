//! Tag whitespace-separated sentences from stdin with a CRF model.
//!
//! One sentence per line; the decoded label is appended to each token.

use std::io::{self, BufRead};

use anyhow::Context;
use clap::Parser;

#[derive(Parser)]
#[command(about = "POS-tag sentences from stdin with a trained CRF model")]
struct Args {
    /// Model file trained with the Wapiti toolkit.
    model: std::path::PathBuf,

    /// Decode with forward-backward posteriors instead of Viterbi.
    #[arg(long)]
    posterior: bool,

    /// Treat the model as a pure maximum-entropy model.
    #[arg(long)]
    maxent: bool,

    /// Input tokens already carry a label in their last column.
    #[arg(long)]
    force: bool,

    /// Also print the per-token scores along the decoded path.
    #[arg(long)]
    score: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut tagger = crftag::Tagger::new();
    tagger.set_posterior_decoding(args.posterior);
    tagger.set_pure_maxent_mode(args.maxent);
    tagger.set_partly_labeled_input(args.force);
    tagger
        .load_model(&args.model)
        .with_context(|| format!("loading {}", args.model.display()))?;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            println!();
            continue;
        }
        match tagger.label_with_scores(&mut tokens) {
            Ok((_, scores)) if args.score => {
                for (token, score) in tokens.iter().zip(&scores) {
                    println!("{token}\t{score:.6}");
                }
            }
            Ok(_) => println!("{}", tokens.join("\n")),
            Err(e) => eprintln!("skipping sentence: {e}"),
        }
        println!();
    }
    Ok(())
}
