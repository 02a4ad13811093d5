//! Loader for local delimited data files and the table parser it shares
//! with the web loader
//!
//! Supports comma separated `.csv` and tab separated `.tab`/`.tsv`/`.txt`
//! files, with either a plain header row, a header with `flags#name` prefixes,
//! or the three-row header (names, types, flags) written by the canvas
//! application.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::debug;

use crate::errors::{Result, data_load_error};

use super::DataLoader;
use super::table::{DataTable, Variable, VariableKind, VariableRole};

/// Non-numeric columns with more distinct values than this become strings
const MAX_DISCRETE_VALUES: usize = 100;

const MISSING_VALUES: &[&str] = &["", "?", "~", "NA", "nan", "NaN"];

/// Reads data sources from the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTableLoader;

impl DataLoader for LocalTableLoader {
    fn load(&self, source: &str) -> Result<DataTable> {
        if is_remote(source) {
            return Err(data_load_error(source, "remote sources need the web loader"));
        }

        let path = Path::new(source);
        if !path.is_file() {
            return Err(data_load_error(source, "file not found"));
        }

        let delimiter = delimiter_for(path)
            .ok_or_else(|| data_load_error(source, "unsupported file format"))?;
        let bytes = fs::read(path).map_err(|e| data_load_error(source, &e.to_string()))?;
        let text = decode_text(&bytes);

        let table = parse_table(&text, delimiter).map_err(|e| data_load_error(source, &e))?;
        debug!(
            "Loaded {} rows and {} columns from {source}",
            table.row_count,
            table.variables.len()
        );
        Ok(table)
    }
}

/// Whether a source names a remote resource rather than a file
pub(crate) fn is_remote(source: &str) -> bool {
    source.contains("://")
}

fn delimiter_for(path: &Path) -> Option<u8> {
    delimiter_for_extension(path.extension()?.to_str()?)
}

pub(crate) fn delimiter_for_extension(extension: &str) -> Option<u8> {
    match extension.to_lowercase().as_str() {
        "csv" => Some(b','),
        "tab" | "tsv" | "txt" => Some(b'\t'),
        _ => None,
    }
}

/// Decodes file bytes: BOM first, then UTF-8, then Windows-1252
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_length)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_length..]);
        return text.into_owned();
    }
    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text.into_owned(),
        None => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Declared column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclaredKind {
    Auto,
    Continuous,
    Discrete,
    String,
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    kind: DeclaredKind,
    role: Option<VariableRole>,
    ignored: bool,
}

/// Builds a table from delimited text
///
/// Quoted cells may span lines. Blank records are skipped.
pub(crate) fn parse_table(text: &str, delimiter: u8) -> std::result::Result<DataTable, String> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    if rows.is_empty() {
        return Err("no header row".to_string());
    }
    let header = rows.remove(0);

    let mut columns: Vec<Column> = header.iter().map(|cell| column_from_header(cell)).collect();

    if rows.len() >= 2 && is_type_row(&rows[0]) && is_flag_row(&rows[1]) {
        for (index, column) in columns.iter_mut().enumerate() {
            let declared = rows[0].get(index).map(String::as_str).unwrap_or_default();
            let flags = rows[1].get(index).map(String::as_str).unwrap_or_default();
            column.kind = declared_kind(declared);
            apply_flags(column, flags);
        }
        rows.drain(..2);
    }

    let mut variables = Vec::new();
    for (index, column) in columns.iter().enumerate() {
        if column.ignored || (column.name.is_empty() && column.kind == DeclaredKind::Auto) {
            continue;
        }
        let cells: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get(index))
            .map(|cell| cell.as_str())
            .filter(|cell| !MISSING_VALUES.contains(cell))
            .collect();
        let kind = resolve_kind(column.kind, &cells);
        let role = column.role.unwrap_or(match kind {
            VariableKind::String => VariableRole::Meta,
            _ => VariableRole::Attribute,
        });
        variables.push(Variable {
            name: column.name.clone(),
            kind,
            role,
        });
    }

    Ok(DataTable {
        row_count: rows.len(),
        variables,
    })
}

/// Header cell, possibly in `flags#name` form (`C#age`, `cD#target`, `m#id`)
fn column_from_header(cell: &str) -> Column {
    let mut column = Column {
        name: cell.to_string(),
        kind: DeclaredKind::Auto,
        role: None,
        ignored: false,
    };

    if let Some((prefix, name)) = cell.split_once('#') {
        if !prefix.is_empty() && prefix.chars().all(|c| "cmiwCDST".contains(c)) {
            column.name = name.to_string();
            for flag in prefix.chars() {
                match flag {
                    'c' => column.role = Some(VariableRole::Class),
                    'm' => column.role = Some(VariableRole::Meta),
                    'i' => column.ignored = true,
                    'C' | 'T' => column.kind = DeclaredKind::Continuous,
                    'D' => column.kind = DeclaredKind::Discrete,
                    'S' => column.kind = DeclaredKind::String,
                    _ => {}
                }
            }
        }
    }
    column
}

const TYPE_WORDS: &[&str] = &[
    "c", "continuous", "d", "discrete", "s", "string", "t", "time", "",
];
const FLAG_WORDS: &[&str] = &["class", "c", "meta", "m", "ignore", "i", "weight", "w", ""];

fn is_type_row(row: &[String]) -> bool {
    row.iter().all(|cell| {
        let cell = cell.to_lowercase();
        TYPE_WORDS.contains(&cell.as_str())
    }) && row.iter().any(|cell| !cell.is_empty())
}

fn is_flag_row(row: &[String]) -> bool {
    row.iter().all(|cell| {
        cell.split_whitespace()
            .all(|flag| FLAG_WORDS.contains(&flag.to_lowercase().as_str()))
    })
}

fn declared_kind(word: &str) -> DeclaredKind {
    match word.to_lowercase().as_str() {
        "c" | "continuous" | "t" | "time" => DeclaredKind::Continuous,
        "d" | "discrete" => DeclaredKind::Discrete,
        "s" | "string" => DeclaredKind::String,
        _ => DeclaredKind::Auto,
    }
}

fn apply_flags(column: &mut Column, flags: &str) {
    for flag in flags.split_whitespace() {
        match flag.to_lowercase().as_str() {
            "class" | "c" => column.role = Some(VariableRole::Class),
            "meta" | "m" => column.role = Some(VariableRole::Meta),
            "ignore" | "i" => column.ignored = true,
            _ => {}
        }
    }
}

fn resolve_kind(declared: DeclaredKind, cells: &[&str]) -> VariableKind {
    let distinct = || -> Vec<String> {
        cells
            .iter()
            .map(|cell| cell.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    };

    match declared {
        DeclaredKind::Continuous => VariableKind::Continuous,
        DeclaredKind::String => VariableKind::String,
        DeclaredKind::Discrete => VariableKind::Discrete { values: distinct() },
        DeclaredKind::Auto => {
            if cells.iter().all(|cell| cell.parse::<f64>().is_ok()) {
                VariableKind::Continuous
            } else {
                let values = distinct();
                if values.len() <= MAX_DISCRETE_VALUES {
                    VariableKind::Discrete { values }
                } else {
                    VariableKind::String
                }
            }
        }
    }
}
