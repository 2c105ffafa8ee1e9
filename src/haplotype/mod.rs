//! Haplotype data model: single changes, their string codec, and the four
//! interchangeable haplotype representations.

mod change;
mod distance;
mod nucleotide;
mod repr;

pub use change::{format_change, parse_change, Change, FormatError, Mutation};
pub use distance::{closest_ancestor, haplotype_distance, set_distance};
pub use nucleotide::{Nucleotide, NUM_NUCLEOTIDES};
pub use repr::{
    haplotype_to_dict, haplotype_to_list, haplotype_to_set, haplotype_to_string, join_changes,
    Haplotype, HaplotypeList, HaplotypeMap, HaplotypeSet, CHANGE_SEPARATOR, CONSENSUS,
};
