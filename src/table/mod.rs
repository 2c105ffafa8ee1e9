//! Tabular haplotype data: CSV input/output, column checks and the row
//! transformations used before export.
//!
//! A [`HaplotypeTable`] keeps the known columns of its source file in their
//! original order, so a read/write cycle preserves the layout. Columns outside
//! [`column::ALL`] are dropped on read.

mod filter;
mod record;
mod sample;
mod writers;

use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::haplotype::FormatError;

pub use record::{column, HaplotypeRecord};
pub use sample::DEFAULT_RANDOM_STATE;
pub use writers::{write_changes, write_haplotype_counts, write_mutation_frequencies};

/// Errors raised while reading, checking or transforming tables.
#[derive(Debug, Error)]
pub enum TableError {
    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Output could not be flushed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required column is absent.
    #[error("table is missing required column '{0}'")]
    MissingColumn(String),

    /// A required cell is empty.
    #[error("row {row} has no value in column '{column}'")]
    MissingValue {
        /// Column name.
        column: &'static str,
        /// Zero-based row index.
        row: usize,
    },

    /// More rows were requested than the table holds.
    #[error("cannot sample {requested} rows from a table of {rows}")]
    SampleTooLarge {
        /// Requested number of rows.
        requested: usize,
        /// Rows available.
        rows: usize,
    },

    /// Row counts are not usable as sampling weights.
    #[error("invalid sampling weights: {0}")]
    Weights(#[from] rand::distributions::WeightedError),

    /// A haplotype cell could not be parsed.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Haplotype rows together with the columns they carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HaplotypeTable {
    /// Known columns present in the table, in output order.
    pub columns: Vec<String>,
    /// Table rows.
    pub records: Vec<HaplotypeRecord>,
}

impl HaplotypeTable {
    /// Table with the given columns and rows.
    pub fn new<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        records: Vec<HaplotypeRecord>,
    ) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            records,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `name` is one of the table's columns.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|column| column == name)
    }

    /// Fail with [`TableError::MissingColumn`] for the first absent column.
    pub fn require_columns(&self, names: &[&str]) -> Result<(), TableError> {
        match names.iter().find(|name| !self.has_column(name)) {
            Some(name) => Err(TableError::MissingColumn((*name).to_string())),
            None => Ok(()),
        }
    }

    /// Append `name` to the columns unless already present.
    pub fn add_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    /// Haplotype strings in row order.
    pub fn haplotypes(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|record| record.haplotype.as_str())
    }

    /// Parse a CSV table; the `haplotype` column is mandatory.
    pub fn read_csv<R: io::Read>(reader: R) -> Result<Self, TableError> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut columns = Vec::new();
        for header in headers.iter() {
            if column::ALL.contains(&header) {
                columns.push(header.to_string());
            } else {
                debug!(column = header, "dropping unknown column");
            }
        }

        let mut table = Self::new(columns, Vec::new());
        table.require_columns(&[column::HAPLOTYPE])?;
        for record in reader.deserialize() {
            table.records.push(record?);
        }
        Ok(table)
    }

    /// Read a CSV table from `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(io::BufReader::new(file))
    }

    /// Write the table as CSV with its own column order.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), TableError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for record in &self.records {
            writer.write_record(self.columns.iter().map(|column| record.field(column)))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INPUT: &str = "haplotype,count,extra,time\n\
                         1:A->G,3,x,0\n\
                         consensus,5,y,1.5\n";

    #[test]
    fn known_columns_survive_a_round_trip() {
        let table = HaplotypeTable::read_csv(INPUT.as_bytes()).unwrap();
        assert_eq!(table.columns, vec!["haplotype", "count", "time"]);
        assert_eq!(table.records[1].time, Some(1.5));

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "haplotype,count,time\n1:A->G,3,0\nconsensus,5,1.5\n"
        );
    }

    #[test]
    fn haplotype_column_is_mandatory() {
        let result = HaplotypeTable::read_csv("count\n3\n".as_bytes());
        assert!(matches!(result, Err(TableError::MissingColumn(name)) if name == "haplotype"));
    }

    #[test]
    fn require_columns_names_the_first_gap() {
        let table = HaplotypeTable::read_csv(INPUT.as_bytes()).unwrap();
        assert!(table.require_columns(&["haplotype", "count"]).is_ok());
        assert!(matches!(
            table.require_columns(&["haplotype", "id", "lineage"]),
            Err(TableError::MissingColumn(name)) if name == "id"
        ));
    }
}
