//! Alignment-side processing: reading BAM input, walking CIGARs into change
//! tables, counting haplotypes and rendering them back into sequences.

mod aggregate;
mod consensus;
mod io;
mod materialize;
mod parser;
mod types;

pub use aggregate::{count_haplotypes, mutation_frequencies, HaplotypeCount, MutationFrequency};
pub use consensus::{
    consensus_sequence, Consensus, ConsensusConfig, ConsensusError, DEFAULT_ERRORS_PER_GENOME,
    DEFAULT_MAJORITY,
};
pub use io::{aligned_read_from_record, parse_reference, read_alignment, read_reference, IoError};
pub use materialize::{
    haplotypes_to_frequencies, haplotypes_to_matrix, haplotypes_to_sequences, MaterializeError,
    GAP,
};
pub use parser::{
    changes_from_alignment, changes_from_read, extract_block_id, ChangeRecord, ChangeTable,
    ParserConfig, ParserError, DEFAULT_QUALITY, DELETION_QUALITY,
};
pub use types::{AlignedRead, CigarOp, CigarOpKind};
