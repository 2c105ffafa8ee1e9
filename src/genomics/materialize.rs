//! Reconstruction of aligned sequences from haplotypes.
//!
//! Every reference position becomes a cell holding its base plus any bases
//! inserted after it. Once all haplotypes are applied, each column is padded
//! with `-` to the widest cell in that column so that rows line up.
//!
//! Deletions are not rendered: the reference base stays in place. Only
//! substitutions reach the numeric matrix and frequency exports.

use thiserror::Error;

use crate::haplotype::{
    haplotype_to_list, Change, FormatError, Haplotype, Mutation, Nucleotide, NUM_NUCLEOTIDES,
};

/// Gap character used to pad insertion columns.
pub const GAP: char = '-';

/// Errors raised while materialising haplotypes.
#[derive(Debug, Error)]
pub enum MaterializeError {
    /// Haplotype or reference could not be parsed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A change is anchored beyond the reference.
    #[error("change at position {position} lies outside the reference (length {len})")]
    PositionOutOfRange {
        /// Anchor position of the change.
        position: usize,
        /// Reference length.
        len: usize,
    },

    /// Fewer counts than haplotypes were supplied.
    #[error("no count supplied for haplotype {index}")]
    MissingCount {
        /// Index of the haplotype without a count.
        index: usize,
    },

    /// Frequencies need at least one haplotype.
    #[error("cannot compute frequencies without haplotypes")]
    NoHaplotypes,
}

#[derive(Debug, Clone)]
struct Cell {
    base: char,
    inserted: String,
}

impl Cell {
    fn width(&self) -> usize {
        1 + self.inserted.chars().count()
    }
}

fn changes_in_order(haplotype: impl Into<Haplotype>) -> Result<Vec<Change>, FormatError> {
    let mut changes = haplotype_to_list(haplotype)?;
    changes.sort_by_key(|change| change.position);
    Ok(changes)
}

fn out_of_range(position: usize, len: usize) -> MaterializeError {
    MaterializeError::PositionOutOfRange { position, len }
}

fn encode_reference(reference: &str) -> Result<Vec<Nucleotide>, FormatError> {
    reference.chars().map(Nucleotide::from_symbol).collect()
}

/// Render haplotypes as equal-length aligned sequences.
///
/// With `counts`, haplotype `i` is emitted `counts[i]` times in a row.
pub fn haplotypes_to_sequences<I>(
    reference: &str,
    haplotypes: I,
    counts: Option<&[u64]>,
) -> Result<Vec<String>, MaterializeError>
where
    I: IntoIterator,
    I::Item: Into<Haplotype>,
{
    let template: Vec<Cell> = reference
        .chars()
        .map(|base| Cell {
            base,
            inserted: String::new(),
        })
        .collect();
    if template.is_empty() {
        return Ok(Vec::new());
    }

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (index, haplotype) in haplotypes.into_iter().enumerate() {
        let copies = match counts {
            Some(counts) => *counts
                .get(index)
                .ok_or(MaterializeError::MissingCount { index })?,
            None => 1,
        };

        let mut cells = template.clone();
        for change in changes_in_order(haplotype)? {
            let len = cells.len();
            let cell = cells
                .get_mut(change.position)
                .ok_or_else(|| out_of_range(change.position, len))?;
            match change.mutation {
                Mutation::Substitution { to, .. } => cell.base = to.as_char(),
                Mutation::Insertion(bases) => cell.inserted.push_str(&bases),
                Mutation::Deletion(_) => {}
            }
        }

        for _ in 0..copies {
            rows.push(cells.clone());
        }
    }

    let mut widths = vec![1usize; template.len()];
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.width());
        }
    }

    Ok(rows
        .iter()
        .map(|row| {
            let mut sequence = String::with_capacity(widths.iter().sum());
            for (cell, &width) in row.iter().zip(&widths) {
                sequence.push(cell.base);
                sequence.push_str(&cell.inserted);
                sequence.extend(std::iter::repeat(GAP).take(width - cell.width()));
            }
            sequence
        })
        .collect())
}

/// Render haplotypes as rows of nucleotide codes (A=0, T=1, C=2, G=3).
/// Only substitutions are applied.
pub fn haplotypes_to_matrix<I>(
    reference: &str,
    haplotypes: I,
) -> Result<Vec<Vec<u8>>, MaterializeError>
where
    I: IntoIterator,
    I::Item: Into<Haplotype>,
{
    let encoded: Vec<u8> = encode_reference(reference)?
        .into_iter()
        .map(Nucleotide::code)
        .collect();
    if encoded.is_empty() {
        return Ok(Vec::new());
    }

    let mut matrix = Vec::new();
    for haplotype in haplotypes {
        let mut row = encoded.clone();
        for change in changes_in_order(haplotype)? {
            if let Mutation::Substitution { to, .. } = change.mutation {
                let len = row.len();
                *row
                    .get_mut(change.position)
                    .ok_or_else(|| out_of_range(change.position, len))? = to.code();
            }
        }
        matrix.push(row);
    }
    Ok(matrix)
}

/// Per-position nucleotide frequencies across haplotypes.
///
/// Positions a haplotype leaves untouched count towards the reference base,
/// so every row sums to one.
pub fn haplotypes_to_frequencies<I>(
    reference: &str,
    haplotypes: I,
) -> Result<Vec<[f64; NUM_NUCLEOTIDES]>, MaterializeError>
where
    I: IntoIterator,
    I::Item: Into<Haplotype>,
{
    let encoded = encode_reference(reference)?;
    let mut counts = vec![[0.0f64; NUM_NUCLEOTIDES]; encoded.len()];

    let mut total = 0usize;
    for haplotype in haplotypes {
        total += 1;
        for change in changes_in_order(haplotype)? {
            if let Mutation::Substitution { to, .. } = change.mutation {
                let len = counts.len();
                counts
                    .get_mut(change.position)
                    .ok_or_else(|| out_of_range(change.position, len))?[to.index()] += 1.0;
            }
        }
    }
    if total == 0 {
        return Err(MaterializeError::NoHaplotypes);
    }

    let total = total as f64;
    for (row, reference_base) in counts.iter_mut().zip(encoded) {
        let observed: f64 = row.iter().sum();
        row[reference_base.index()] += total - observed;
        for value in row.iter_mut() {
            *value /= total;
        }
    }
    Ok(counts)
}
