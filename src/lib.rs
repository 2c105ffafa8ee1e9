//! # Haplotype analysis for viral deep sequencing
//!
//! This library turns aligned reads of a viral population into haplotypes and
//! back into aligned sequences for phylogenetic tools.
//!
//! ## Pipeline
//!
//! 1. **Alignment parsing**: walk each read's CIGAR against the reference and
//!    record substitutions, insertions and deletions with their qualities
//! 2. **Aggregation**: group the changes of each read into a haplotype string
//!    and count identical haplotypes
//! 3. **Representation**: convert haplotypes between string, list, set and
//!    position-keyed forms
//! 4. **Materialisation**: apply haplotypes to the reference to rebuild
//!    aligned sequences, integer matrices or frequency profiles
//! 5. **Export**: write FASTA, NEXUS or PHYLIP alignments
//!
//! ## Usage Example
//!
//! ```
//! use phynalysis::haplotype::{haplotype_to_list, haplotype_to_string};
//! use phynalysis::genomics::haplotypes_to_sequences;
//!
//! let changes = haplotype_to_list("12:A->G;3:iTT").unwrap();
//! assert_eq!(changes[0].position, 3);
//! assert_eq!(haplotype_to_string(changes), "3:iTT;12:A->G");
//!
//! let sequences = haplotypes_to_sequences("AAAA", ["", "1:iTTT"], None).unwrap();
//! assert_eq!(sequences, vec!["AA---AA", "AATTTAA"]);
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod export; // Alignment file renderers
pub mod genomics; // Reads, CIGAR walk, aggregation, materialisation
pub mod haplotype; // Change codec and haplotype representations
pub mod table; // CSV haplotype tables

pub use genomics::{
    changes_from_alignment, count_haplotypes, haplotypes_to_sequences, AlignedRead, ChangeTable,
    ParserConfig,
};
pub use haplotype::{parse_change, Change, Haplotype, Mutation, Nucleotide};
pub use table::{HaplotypeRecord, HaplotypeTable};

use thiserror::Error;

/// Any error raised by the library.
#[derive(Error, Debug)]
pub enum PhynalysisError {
    /// Malformed change or haplotype string.
    #[error(transparent)]
    Format(#[from] haplotype::FormatError),

    /// Alignment could not be walked.
    #[error(transparent)]
    Parser(#[from] genomics::ParserError),

    /// Haplotypes could not be applied to the reference.
    #[error(transparent)]
    Materialize(#[from] genomics::MaterializeError),

    /// Consensus could not be built.
    #[error(transparent)]
    Consensus(#[from] genomics::ConsensusError),

    /// Reference or alignment input failed.
    #[error(transparent)]
    Io(#[from] genomics::IoError),

    /// Haplotype table failed to load or transform.
    #[error(transparent)]
    Table(#[from] table::TableError),

    /// Export failed.
    #[error(transparent)]
    Export(#[from] export::ExportError),
}

/// Result alias using [`PhynalysisError`].
pub type Result<T, E = PhynalysisError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Change> {
        Ok(parse_change(text)?)
    }

    #[test]
    fn module_errors_convert_into_crate_error() {
        let err = parse("x:A->G").unwrap_err();
        assert!(matches!(err, PhynalysisError::Format(_)));
        assert!(parse("4:del2").is_ok());
    }
}
