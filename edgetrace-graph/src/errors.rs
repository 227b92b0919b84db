// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;
use std::path::PathBuf;

/// Which of the three per-graph report tables an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTable {
    Methods,
    Invokes,
    Targets,
}

impl ReportTable {
    pub(crate) fn file_name(self) -> &'static str {
        match self {
            ReportTable::Methods => "methods.csv",
            ReportTable::Invokes => "invokes.csv",
            ReportTable::Targets => "targets.csv",
        }
    }
}

impl fmt::Display for ReportTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Everything that can go wrong while reading reports and building a call graph.
///
/// Solving and emitting never fail: once two `CallGraph`s are built, the only terminal
/// outcomes are a completed or a cancelled diff (see [`crate::diff::DiffOutcome`]).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{table} is missing required column `{column}`")]
    BadSchema {
        table: ReportTable,
        column: &'static str,
    },

    #[error("{table} row {row}: cannot parse `{value}` as {expected}")]
    ParseError {
        table: ReportTable,
        row: u64,
        value: String,
        expected: &'static str,
    },

    #[error("{table} row {row}: duplicate {kind} id {id}")]
    DuplicateId {
        table: ReportTable,
        row: u64,
        kind: &'static str,
        id: i64,
    },

    #[error("{table} row {row}: unknown {referent} id {id}")]
    DanglingRef {
        table: ReportTable,
        row: u64,
        referent: &'static str,
        id: i64,
    },

    #[error("failed to read {table} at {}", path.display())]
    Io {
        table: ReportTable,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type EngineResult<T> = Result<T, EngineError>;
