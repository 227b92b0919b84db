// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod cli;

use std::fmt;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::Args;
use edgetrace_graph::{diff, DiffOutcome, EngineError};

/// Sampling cadence for the progress spinner, matching the recommended 4 samples/sec.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Exit codes per the engine's CLI contract: 0 success, 1 usage, 2 bad input files,
/// 3 internal.
enum AppError {
    BadInput(EngineError),
    Internal(anyhow::Error),
}

impl AppError {
    fn exit_code(&self) -> u8 {
        match self {
            AppError::BadInput(_) => 2,
            AppError::Internal(_) => 3,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadInput(err) => write!(f, "{err}"),
            AppError::Internal(err) => write!(f, "{err:#}"),
        }
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::BadInput(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.into())
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(1);
        }
    };

    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "edgetrace=warn",
        1 => "edgetrace=info,edgetrace_graph=info",
        _ => "edgetrace=debug,edgetrace_graph=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), AppError> {
    let (sup_dir, sub_dir) = args.directories();
    let max_iterations = args.max_iterations;

    let iteration_count = Arc::new(AtomicU64::new(0));
    let cancel_flag = Arc::new(AtomicBool::new(false));

    let solver_iterations = Arc::clone(&iteration_count);
    let solver_cancel = Arc::clone(&cancel_flag);
    let handle = thread::spawn(move || diff(&sup_dir, &sub_dir, max_iterations, &solver_iterations, &solver_cancel));

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .expect("static progress template is valid")
            .tick_chars("/-\\| "),
    );
    while !handle.is_finished() {
        let n = iteration_count.load(Ordering::Relaxed);
        bar.set_message(format!("diffing ({n}/{max_iterations} iterations)"));
        bar.tick();
        thread::sleep(PROGRESS_INTERVAL);
    }
    bar.set_message("saving");
    let outcome = handle
        .join()
        .map_err(|_| anyhow::anyhow!("diff solver thread panicked"))??;
    bar.finish_and_clear();

    let iterations = outcome.iterations();
    let cancelled = outcome.was_cancelled();
    let edge_count = outcome.edges().len();
    write_output(args, &outcome)?;
    info!(iterations, cancelled, edges = edge_count, "diff complete");

    Ok(())
}

fn write_output(args: &Args, outcome: &DiffOutcome) -> Result<(), AppError> {
    let mut object = serde_json::Map::with_capacity(outcome.edges().len());
    for (&(source, target), result) in outcome.edges() {
        object.insert(
            format!("{source}-{target}"),
            serde_json::json!({ "value": result.value, "relevant": result.relevant }),
        );
    }
    let rendered = serde_json::to_string_pretty(&serde_json::Value::Object(object))
        .map_err(|err| anyhow::Error::from(err))?;

    match &args.out {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }
    Ok(())
}
