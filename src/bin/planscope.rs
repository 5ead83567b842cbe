//! Planscope CLI - run the ad-plan inference pipeline over one session export
//!
//! Reads a raw viewing-session CSV, writes the labeled-accounts CSV, the
//! augmented-sessions CSV, a run-metadata JSON sidecar and the one-page
//! SVG report into the output directory.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_logger::Env;

use planscope::types::HybridLabel;
use planscope::{RunConfig, DEFAULT_SEED, PIPELINE_VERSION};

/// Planscope - classify streaming accounts as ad-supported or ad-free
#[derive(Parser)]
#[command(name = "planscope")]
#[command(version = PIPELINE_VERSION)]
#[command(about = "Infer ad-plan labels from viewing-session logs", long_about = None)]
struct Cli {
    /// Raw session CSV to ingest
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving all outputs (created if absent)
    #[arg(short, long, default_value = "planscope-out")]
    out_dir: PathBuf,

    /// Seed for k-means and t-SNE
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = RunConfig::new(&cli.input, &cli.out_dir).with_seed(cli.seed);
    match planscope::run(&config) {
        Ok(outcome) => {
            let ad_supported = outcome
                .accounts
                .iter()
                .filter(|account| {
                    matches!(
                        account.hybrid_label,
                        HybridLabel::AdSupported | HybridLabel::VeryLikelyAdSupported
                    )
                })
                .count();
            println!(
                "labeled {} accounts ({} ad-supported, {} ad-free)",
                outcome.accounts.len(),
                ad_supported,
                outcome.accounts.len() - ad_supported,
            );
            println!("  accounts: {}", outcome.labeled_csv.display());
            println!("  sessions: {}", outcome.augmented_csv.display());
            println!("  metadata: {}", outcome.metadata.display());
            println!("  report:   {}", outcome.report.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("planscope: {err}");
            ExitCode::FAILURE
        }
    }
}
