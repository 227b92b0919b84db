// Copyright (c) The Edgetrace Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streams the three tabular report files (`methods.csv`, `invokes.csv`, `targets.csv`) that
//! make up one call graph into untyped-but-checked row records. The graph builder
//! (`crate::graph`) is the only consumer of these row types; nothing downstream of it ever
//! sees a CSV record.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{EngineError, EngineResult, ReportTable};
use crate::invoke::InvokeRow;
use crate::method::MethodId;

#[derive(Debug, Clone)]
pub(crate) struct MethodRow {
    pub(crate) id: MethodId,
    pub(crate) name: String,
    pub(crate) declared_type: String,
    pub(crate) parameters: String,
    pub(crate) return_type: String,
    pub(crate) flags: String,
    pub(crate) is_entry_point: bool,
    pub(crate) display: String,
}

#[derive(Debug, Clone)]
pub(crate) struct TargetRow {
    pub(crate) invoke_id: i64,
    pub(crate) target_id: MethodId,
}

pub(crate) fn read_methods(dir: &Path) -> EngineResult<Vec<MethodRow>> {
    const COLUMNS: &[&str] = &[
        "Id",
        "Name",
        "Type",
        "Parameters",
        "Return",
        "Flags",
        "IsEntryPoint",
        "Display",
    ];
    let table = ReportTable::Methods;
    let (mut reader, path) = open(table, dir)?;
    let idx = column_index(table, &header(table, &mut reader, &path)?, COLUMNS)?;

    let mut rows = Vec::new();
    let mut row_num = 0u64;
    for record in reader.records() {
        row_num += 1;
        let record = record.map_err(|source| io_error(table, &path, source))?;
        rows.push(MethodRow {
            id: parse_int(table, row_num, field(table, row_num, &record, idx[0])?)?,
            name: field(table, row_num, &record, idx[1])?.to_string(),
            declared_type: field(table, row_num, &record, idx[2])?.to_string(),
            parameters: field(table, row_num, &record, idx[3])?.to_string(),
            return_type: field(table, row_num, &record, idx[4])?.to_string(),
            flags: field(table, row_num, &record, idx[5])?.to_string(),
            is_entry_point: parse_bool(table, row_num, field(table, row_num, &record, idx[6])?)?,
            display: field(table, row_num, &record, idx[7])?.to_string(),
        });
    }
    debug!(rows = rows.len(), table = %table, "read report table");
    Ok(rows)
}

pub(crate) fn read_invokes(dir: &Path) -> EngineResult<Vec<InvokeRow>> {
    const COLUMNS: &[&str] = &["Id", "MethodId", "BytecodeIndexes", "TargetId", "IsDirect"];
    let table = ReportTable::Invokes;
    let (mut reader, path) = open(table, dir)?;
    let idx = column_index(table, &header(table, &mut reader, &path)?, COLUMNS)?;

    let mut rows = Vec::new();
    let mut row_num = 0u64;
    for record in reader.records() {
        row_num += 1;
        let record = record.map_err(|source| io_error(table, &path, source))?;
        rows.push(InvokeRow {
            id: parse_int(table, row_num, field(table, row_num, &record, idx[0])?)?,
            method_id: parse_int(table, row_num, field(table, row_num, &record, idx[1])?)?,
            target_id: parse_int(table, row_num, field(table, row_num, &record, idx[3])?)?,
            is_direct: parse_bool(table, row_num, field(table, row_num, &record, idx[4])?)?,
        });
    }
    debug!(rows = rows.len(), table = %table, "read report table");
    Ok(rows)
}

pub(crate) fn read_targets(dir: &Path) -> EngineResult<Vec<TargetRow>> {
    const COLUMNS: &[&str] = &["InvokeId", "TargetId"];
    let table = ReportTable::Targets;
    let (mut reader, path) = open(table, dir)?;
    let idx = column_index(table, &header(table, &mut reader, &path)?, COLUMNS)?;

    let mut rows = Vec::new();
    let mut row_num = 0u64;
    for record in reader.records() {
        row_num += 1;
        let record = record.map_err(|source| io_error(table, &path, source))?;
        rows.push(TargetRow {
            invoke_id: parse_int(table, row_num, field(table, row_num, &record, idx[0])?)?,
            target_id: parse_int(table, row_num, field(table, row_num, &record, idx[1])?)?,
        });
    }
    debug!(rows = rows.len(), table = %table, "read report table");
    Ok(rows)
}

fn open(table: ReportTable, dir: &Path) -> EngineResult<(csv::Reader<std::fs::File>, PathBuf)> {
    let path = dir.join(table.file_name());
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .map_err(|source| io_error(table, &path, source))?;
    Ok((reader, path))
}

fn header(
    table: ReportTable,
    reader: &mut csv::Reader<std::fs::File>,
    path: &Path,
) -> EngineResult<csv::StringRecord> {
    reader
        .headers()
        .map(Clone::clone)
        .map_err(|source| io_error(table, path, source))
}

/// Resolves each required column name to its position in the header row. Columns present
/// in the header but not in `required` are ignored, per the report format's "unknown
/// columns are ignored" rule.
fn column_index(
    table: ReportTable,
    headers: &csv::StringRecord,
    required: &[&'static str],
) -> EngineResult<Vec<usize>> {
    required
        .iter()
        .map(|&column| {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or(EngineError::BadSchema { table, column })
        })
        .collect()
}

fn field<'r>(
    table: ReportTable,
    row: u64,
    record: &'r csv::StringRecord,
    idx: usize,
) -> EngineResult<&'r str> {
    record.get(idx).ok_or(EngineError::ParseError {
        table,
        row,
        value: String::new(),
        expected: "a value in every required column",
    })
}

fn parse_int(table: ReportTable, row: u64, raw: &str) -> EngineResult<i64> {
    raw.trim().parse::<i64>().map_err(|_| EngineError::ParseError {
        table,
        row,
        value: raw.to_string(),
        expected: "a 64-bit integer",
    })
}

fn parse_bool(table: ReportTable, row: u64, raw: &str) -> EngineResult<bool> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(EngineError::ParseError {
            table,
            row,
            value: other.to_string(),
            expected: "\"true\" or \"false\"",
        }),
    }
}

fn io_error(table: ReportTable, path: &Path, source: csv::Error) -> EngineError {
    use std::io::ErrorKind;
    let message = source.to_string();
    match source.into_kind() {
        csv::ErrorKind::Io(source) => EngineError::Io {
            table,
            path: path.to_path_buf(),
            source,
        },
        _ => EngineError::Io {
            table,
            path: path.to_path_buf(),
            source: std::io::Error::new(ErrorKind::InvalidData, message),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use assert_matches::assert_matches;

    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).expect("write fixture file");
    }

    #[test]
    fn reads_methods_and_normalizes_booleans() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "methods.csv",
            "Id,Name,Type,Parameters,Return,Flags,IsEntryPoint,Display\n\
             1,main,App,empty,void,public static,true,App.main()\n\
             2,helper,App,int,void,private,false,App.helper(int)\n",
        );
        let rows = read_methods(dir.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, 1);
        assert!(rows[0].is_entry_point);
        assert_eq!(rows[1].parameters, "int");
        assert!(!rows[1].is_entry_point);
    }

    #[test]
    fn ignores_unknown_columns() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "methods.csv",
            "Id,Name,Type,Parameters,Return,Flags,IsEntryPoint,Display,Extra\n\
             1,main,App,empty,void,public,true,App.main(),unused\n",
        );
        let rows = read_methods(dir.path()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn missing_required_column_is_bad_schema() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "methods.csv",
            "Id,Name,Type,Parameters,Return,Flags,Display\n1,main,App,empty,void,public,App.main()\n",
        );
        let err = read_methods(dir.path()).unwrap_err();
        assert_matches!(
            err,
            EngineError::BadSchema { table: ReportTable::Methods, column: "IsEntryPoint" }
        );
    }

    #[test]
    fn malformed_boolean_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "methods.csv",
            "Id,Name,Type,Parameters,Return,Flags,IsEntryPoint,Display\n\
             1,main,App,empty,void,public,yes,App.main()\n",
        );
        let err = read_methods(dir.path()).unwrap_err();
        assert_matches!(
            err,
            EngineError::ParseError { table: ReportTable::Methods, row: 1, .. }
        );
    }

    #[test]
    fn missing_report_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_methods(dir.path()).unwrap_err();
        assert_matches!(err, EngineError::Io { table: ReportTable::Methods, .. });
    }

    #[test]
    fn reads_targets_with_multiple_rows_per_invoke() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "targets.csv",
            "InvokeId,TargetId\n1,10\n1,11\n2,12\n",
        );
        let rows = read_targets(dir.path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].invoke_id, 1);
        assert_eq!(rows[1].target_id, 11);
    }
}
