use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use num_traits::cast::ToPrimitive;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use structopt::StructOpt;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;

mod angles;
mod assessment;
mod config;
mod engine;
mod error;
mod geometry;
mod pose;
mod report;
mod rules;
mod side;
mod source;

#[derive(structopt::StructOpt)]
struct AnalyzeOpt {
    /// Keypoint JSON files, or directories containing them.
    #[structopt(required = true)]
    paths: Vec<PathBuf>,

    /// Body side to measure: left, right or auto.
    #[structopt(long, default_value = "auto")]
    side: assessment::SideChoice,

    /// Number of files analyzed in parallel.
    #[structopt(short, long, default_value = "1")]
    jobs: usize,

    /// Print one JSON object per file instead of a text summary.
    #[structopt(long)]
    json: bool,

    #[structopt(long)]
    show_progress: bool,
}

#[derive(structopt::StructOpt)]
enum Command {
    /// Assess posture from exported keypoints
    Analyze(AnalyzeOpt),
    /// Print the effective angle config as TOML
    ShowConfig {
        /// Only show this angle, e.g. knee_angle.
        angle: Option<angles::AngleName>,
    },
}

#[derive(structopt::StructOpt)]
struct Opt {
    /// TOML file with per-angle targets, tolerances and remedies.
    #[structopt(short, long)]
    config: Option<PathBuf>,

    /// Override an angle: <angle>=<target>[,<tolerance>]. May be repeated.
    #[structopt(short = "-s", long = "set")]
    overrides: Vec<config::ConfigOverride>,

    #[structopt(short, long, default_value = "info", env = "RUST_LOG")]
    log_level: tracing_subscriber::filter::EnvFilter,

    #[structopt(subcommand)]
    command: Command,
}

fn run_analyze(opt: AnalyzeOpt, shared: rules::SharedConfig) -> Result<()> {
    let files = source::keypoint_files(&opt.paths).context("failed collecting input files")?;
    if files.is_empty() {
        return Err(anyhow!("no keypoint files found in {:?}", opt.paths));
    }
    info!(message = "analyzing", files = files.len(), jobs = opt.jobs);

    let running = Arc::new(AtomicBool::new(true));
    let running_ctrl_c = running.clone();

    ctrlc::set_handler(move || {
        running_ctrl_c.store(false, Ordering::SeqCst);
    })
    .context("failed setting Ctrl-C handler")?;

    let pb = if opt.show_progress {
        let len = files
            .len()
            .to_u64()
            .ok_or_else(|| anyhow!("failed to convert file count to u64"))?;
        Some(
            ProgressBar::new(len).with_style(
                ProgressStyle::default_bar()
                    .template("{prefix:.bold.dim} {bar:40} {pos}/{len} {wide_msg}"),
            ),
        )
    } else {
        None
    };

    let engine = engine::Engine::new(source::KeypointFileSource, shared, opt.side);
    let results = engine.run(&files, opt.jobs, &running, |path| {
        if let Some(pb) = &pb {
            pb.set_message(path.display().to_string());
            pb.inc(1);
        }
    })?;

    if let Some(pb) = &pb {
        pb.finish_and_clear();
    }

    if results.len() < files.len() {
        warn!(
            message = "interrupted before all files were analyzed",
            skipped = files.len() - results.len()
        );
    }

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(report) if opt.json => println!("{}", report.to_json()?),
            Ok(report) => print!("{}", report),
            Err(e) => {
                failed += 1;
                error!(message = "failed to analyze file", path = ?path, error = %e);
            }
        }
    }

    if failed > 0 {
        warn!(message = "some files could not be analyzed", failed);
    }

    Ok(())
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    tracing::subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(opt.log_level),
    )?;

    let table = match &opt.config {
        Some(path) => config::ConfigFile::load(path)
            .and_then(config::ConfigFile::into_table)
            .with_context(|| format!("failed loading angle config from {:?}", path))?,
        None => rules::AngleConfigTable::default(),
    };
    let shared = rules::SharedConfig::new(table);
    config::apply_overrides(&shared, &opt.overrides).context("failed applying overrides")?;

    match opt.command {
        Command::Analyze(analyze_opt) => run_analyze(analyze_opt, shared),
        Command::ShowConfig { angle: None } => {
            print!("{}", config::render(&shared.snapshot()?)?);
            Ok(())
        }
        Command::ShowConfig { angle: Some(name) } => match shared.get(name)? {
            Some(record) => {
                let table = std::iter::once((name, record)).collect();
                print!("{}", config::render(&table)?);
                Ok(())
            }
            None => Err(anyhow!("{} is disabled in the current config", name)),
        },
    }
}
