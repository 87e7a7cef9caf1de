//! SQI Batch - beat quality analysis of many recordings from the command line

mod input;
mod report;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use sqi_processing::{analyze_batch, QualityConfig, QualityProfile};
use std::path::PathBuf;
use tracing::{info, Level};

use report::BatchReport;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    Standard,
    Strict,
    Lenient,
}

impl From<ProfileArg> for QualityProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Standard => QualityProfile::Standard,
            ProfileArg::Strict => QualityProfile::Strict,
            ProfileArg::Lenient => QualityProfile::Lenient,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Template-based signal quality analysis of PPG/ECG beat trains")]
struct Args {
    /// Recording JSON files ({name, fps, lpad, samples, ibeats})
    recordings: Vec<PathBuf>,

    /// Threshold profile
    #[arg(long, value_enum, default_value_t = ProfileArg::Standard)]
    profile: ProfileArg,

    /// Full configuration JSON, overrides --profile
    #[arg(long)]
    config: Option<PathBuf>,

    /// Add this many synthetic recordings to the batch
    #[arg(long, default_value_t = 0)]
    simulate: usize,

    /// Seed of the synthetic recordings
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Recordings analyzed at once
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Report path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<QualityConfig> {
    match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Ok(QualityConfig::from_json(&json)?)
        }
        None => Ok(QualityConfig::for_profile(args.profile.into())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    if args.recordings.is_empty() && args.simulate == 0 {
        bail!("no recordings given; pass JSON files or --simulate <n>");
    }

    let config = load_config(&args)?;
    let profile = config.profile;

    let mut jobs = args
        .recordings
        .iter()
        .map(|path| input::load_recording(path))
        .collect::<Result<Vec<_>>>()?;
    jobs.extend(input::simulate(args.simulate, args.seed)?);

    info!(recordings = jobs.len(), profile = ?profile, "starting batch");
    let outcomes = analyze_batch(jobs, config, args.concurrency).await;
    let report = BatchReport::new(profile, outcomes);

    for line in report.summary_lines() {
        eprintln!("{}", line);
    }
    eprintln!(
        "{} of {} recordings analyzed, {:.1}% of beats flagged",
        report.summary.analyzed,
        report.summary.recordings,
        100.0 * report.summary.flagged_fraction()
    );

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", json),
    }

    Ok(())
}
