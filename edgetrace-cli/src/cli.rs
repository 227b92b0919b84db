// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::PathBuf;

use clap::Parser;

/// Diff two static call graph reports and score every supergraph edge by how responsible
/// it is for the extra reachable code the supergraph has that the subgraph doesn't.
#[derive(Debug, Parser)]
#[command(name = "edgetrace", version, about)]
pub struct Args {
    /// Report directory for the larger build (contains methods.csv, invokes.csv, targets.csv).
    pub sup_dir: PathBuf,

    /// Report directory for the smaller build being compared against.
    pub sub_dir: PathBuf,

    /// Upper bound on solver iterations.
    #[arg(long, default_value_t = 1000)]
    pub max_iterations: u64,

    /// Treat `sup_dir` as the smaller report and `sub_dir` as the larger one.
    #[arg(long)]
    pub swap: bool,

    /// Write the edge map to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Returns `(sup_dir, sub_dir)` honoring `--swap`.
    pub fn directories(&self) -> (PathBuf, PathBuf) {
        if self.swap {
            (self.sub_dir.clone(), self.sup_dir.clone())
        } else {
            (self.sup_dir.clone(), self.sub_dir.clone())
        }
    }
}
