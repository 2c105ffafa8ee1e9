//! Alignment export of haplotype tables.
//!
//! Every format materialises the table's haplotypes against the reference and
//! fills a text template. Templates may reference `{n_tax}`, `{n_char}` and
//! `{data}`; any other `{...}` placeholder is left in place.

mod fasta;
mod nexus;
mod phylip;

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;

use thiserror::Error;

use crate::genomics::{haplotypes_to_sequences, MaterializeError};
use crate::table::{column, HaplotypeTable, TableError};

pub use fasta::{render_fasta, FASTA_TEMPLATE};
pub use nexus::{render_nexus, NEXUS_TEMPLATE};
pub use phylip::{render_phylip, PHYLIP_TEMPLATE};

/// Errors raised while exporting.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Required columns or cells are missing.
    #[error(transparent)]
    Table(#[from] TableError),

    /// Haplotypes could not be applied to the reference.
    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    /// Nothing to export.
    #[error("cannot export an empty haplotype table")]
    EmptyTable,

    /// Format name not recognised.
    #[error("unknown export format '{0}' (expected fasta, nexus or phylip)")]
    UnknownFormat(String),

    /// Output could not be written.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// FASTA, one record per read (rows repeated by count).
    Fasta,
    /// NEXUS data block.
    Nexus,
    /// Sequential PHYLIP.
    Phylip,
}

impl ExportFormat {
    /// Built-in template of the format.
    pub fn default_template(self) -> &'static str {
        match self {
            ExportFormat::Fasta => FASTA_TEMPLATE,
            ExportFormat::Nexus => NEXUS_TEMPLATE,
            ExportFormat::Phylip => PHYLIP_TEMPLATE,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fasta" | "fa" => Ok(ExportFormat::Fasta),
            "nexus" | "nex" => Ok(ExportFormat::Nexus),
            "phylip" | "phy" => Ok(ExportFormat::Phylip),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Fasta => "fasta",
            ExportFormat::Nexus => "nexus",
            ExportFormat::Phylip => "phylip",
        };
        f.write_str(name)
    }
}

/// Render `table` in `format`, using `template` instead of the built-in one
/// when given.
pub fn render(
    format: ExportFormat,
    table: &HaplotypeTable,
    reference: &str,
    template: Option<&str>,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Fasta => render_fasta(table, reference, template),
        ExportFormat::Nexus => render_nexus(table, reference, template),
        ExportFormat::Phylip => render_phylip(table, reference, template),
    }
}

/// Render and write `table` in `format`.
pub fn write<W: Write>(
    writer: &mut W,
    format: ExportFormat,
    table: &HaplotypeTable,
    reference: &str,
    template: Option<&str>,
) -> Result<(), ExportError> {
    writer.write_all(render(format, table, reference, template)?.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Aligned sequences of every row plus the row ids, after checking that the
/// table has the `haplotype` and `id` columns and at least one row.
///
/// With `repeat_by_count`, a row with count `n` yields `n` sequences and `n`
/// copies of its id.
pub(crate) fn aligned_rows(
    table: &HaplotypeTable,
    reference: &str,
    repeat_by_count: bool,
) -> Result<(Vec<String>, Vec<String>), ExportError> {
    table.require_columns(&[column::HAPLOTYPE, column::ID])?;
    if table.is_empty() {
        return Err(ExportError::EmptyTable);
    }

    let mut ids = Vec::with_capacity(table.len());
    let mut counts = Vec::with_capacity(table.len());
    for (row, record) in table.records.iter().enumerate() {
        let id = record.id.clone().ok_or(TableError::MissingValue {
            column: column::ID,
            row,
        })?;
        let copies = if repeat_by_count && table.has_column(column::COUNT) {
            record.count.ok_or(TableError::MissingValue {
                column: column::COUNT,
                row,
            })?
        } else {
            1
        };
        ids.extend(std::iter::repeat(id).take(copies as usize));
        counts.push(copies);
    }

    let sequences =
        haplotypes_to_sequences(reference, table.haplotypes(), Some(counts.as_slice()))?;
    Ok((ids, sequences))
}

/// Taxon name as written by NEXUS and PHYLIP: `:` becomes `|`, `;` becomes `.`.
pub fn taxon_name(id: &str) -> String {
    id.replace(':', "|").replace(';', ".")
}

/// Name/sequence rows with names left-justified to the longest name.
pub(crate) fn justified_rows(indent: &str, names: &[String], sequences: &[String]) -> String {
    let width = names.iter().map(|name| name.chars().count()).max().unwrap_or(0);
    names
        .iter()
        .zip(sequences)
        .map(|(name, sequence)| format!("{indent}{:<width$} {sequence}", taxon_name(name)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Substitute `{name}` placeholders in one pass; unknown names stay verbatim.
pub(crate) fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let replaced = tail.find('}').and_then(|close| {
            let key = &tail[1..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match replaced {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
