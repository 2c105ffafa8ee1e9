//! Interchangeable haplotype representations.
//!
//! A haplotype is the set of changes separating a genome from the reference.
//! It travels through the toolbox in one of four shapes:
//!
//! - string: `"10:G->A;15:iATTA;3004:G->A"`
//! - list: ordered changes
//! - set: unordered, de-duplicated changes
//! - map: position → mutation (assumes unique positions)
//!
//! The empty string, an absent value and the tokens `consensus`, `wt` and
//! `wildtype` all denote the reference itself.

use std::collections::{BTreeMap, HashSet};

use super::{parse_change, Change, FormatError, Mutation};

/// Ordered list form.
pub type HaplotypeList = Vec<Change>;
/// Set form.
pub type HaplotypeSet = HashSet<Change>;
/// Position-keyed form.
pub type HaplotypeMap = BTreeMap<usize, Mutation>;

/// Canonical string for the reference haplotype.
pub const CONSENSUS: &str = "consensus";

const REFERENCE_TOKENS: [&str; 3] = [CONSENSUS, "wt", "wildtype"];

/// Separator between changes in the string form.
pub const CHANGE_SEPARATOR: char = ';';

/// Haplotype in any of its representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Haplotype {
    /// Absent value; the reference.
    Consensus,
    /// `;`-joined string form.
    Text(String),
    /// Ordered list form.
    List(HaplotypeList),
    /// Set form.
    Set(HaplotypeSet),
    /// Position-keyed form.
    Map(HaplotypeMap),
}

impl Haplotype {
    /// Returns `true` when the value denotes the reference (no changes).
    pub fn is_reference(&self) -> bool {
        match self {
            Haplotype::Consensus => true,
            Haplotype::Text(text) => is_reference_token(text),
            Haplotype::List(list) => list.is_empty(),
            Haplotype::Set(set) => set.is_empty(),
            Haplotype::Map(map) => map.is_empty(),
        }
    }

    /// Returns `true` when any change is an insertion.
    pub fn has_insertion(&self) -> Result<bool, FormatError> {
        let found = match self {
            Haplotype::Consensus => false,
            Haplotype::Text(text) if is_reference_token(text) => false,
            Haplotype::Text(text) => parse_changes(text)?
                .iter()
                .any(|change| change.mutation.is_insertion()),
            Haplotype::List(list) => list.iter().any(|c| c.mutation.is_insertion()),
            Haplotype::Set(set) => set.iter().any(|c| c.mutation.is_insertion()),
            Haplotype::Map(map) => map.values().any(Mutation::is_insertion),
        };
        Ok(found)
    }
}

impl From<&str> for Haplotype {
    fn from(value: &str) -> Self {
        Haplotype::Text(value.to_string())
    }
}

impl From<String> for Haplotype {
    fn from(value: String) -> Self {
        Haplotype::Text(value)
    }
}

impl From<&String> for Haplotype {
    fn from(value: &String) -> Self {
        Haplotype::Text(value.clone())
    }
}

impl From<Option<&str>> for Haplotype {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Haplotype::Consensus, Haplotype::from)
    }
}

impl From<HaplotypeList> for Haplotype {
    fn from(value: HaplotypeList) -> Self {
        Haplotype::List(value)
    }
}

impl From<HaplotypeSet> for Haplotype {
    fn from(value: HaplotypeSet) -> Self {
        Haplotype::Set(value)
    }
}

impl From<HaplotypeMap> for Haplotype {
    fn from(value: HaplotypeMap) -> Self {
        Haplotype::Map(value)
    }
}

impl From<&Haplotype> for Haplotype {
    fn from(value: &Haplotype) -> Self {
        value.clone()
    }
}

fn is_reference_token(text: &str) -> bool {
    text.is_empty() || REFERENCE_TOKENS.contains(&text)
}

fn parse_changes(text: &str) -> Result<HaplotypeList, FormatError> {
    text.split(CHANGE_SEPARATOR).map(parse_change).collect()
}

fn sort_by_position(mut changes: HaplotypeList) -> HaplotypeList {
    changes.sort_by_key(|change| change.position);
    changes
}

fn sorted_set(set: HaplotypeSet) -> HaplotypeList {
    let mut changes: HaplotypeList = set.into_iter().collect();
    changes.sort();
    changes
}

fn map_to_list(map: HaplotypeMap) -> HaplotypeList {
    map.into_iter()
        .map(|(position, mutation)| Change::new(position, mutation))
        .collect()
}

/// Convert to the list form.
///
/// A list input is returned as given, without re-ordering. Every other form
/// yields changes sorted ascending by position.
pub fn haplotype_to_list(haplotype: impl Into<Haplotype>) -> Result<HaplotypeList, FormatError> {
    let haplotype = haplotype.into();
    if haplotype.is_reference() {
        return Ok(HaplotypeList::new());
    }

    Ok(match haplotype {
        Haplotype::Consensus => HaplotypeList::new(),
        Haplotype::List(list) => list,
        Haplotype::Text(text) => sort_by_position(parse_changes(&text)?),
        Haplotype::Set(set) => sorted_set(set),
        Haplotype::Map(map) => map_to_list(map),
    })
}

/// Convert to the set form.
pub fn haplotype_to_set(haplotype: impl Into<Haplotype>) -> Result<HaplotypeSet, FormatError> {
    let haplotype = haplotype.into();
    if haplotype.is_reference() {
        return Ok(HaplotypeSet::new());
    }

    Ok(match haplotype {
        Haplotype::Consensus => HaplotypeSet::new(),
        Haplotype::Set(set) => set,
        Haplotype::Text(text) => parse_changes(&text)?.into_iter().collect(),
        Haplotype::List(list) => list.into_iter().collect(),
        Haplotype::Map(map) => map_to_list(map).into_iter().collect(),
    })
}

/// Convert to the position-keyed form.
///
/// Duplicate positions collapse silently; the last change in input order
/// wins (sets are visited in sorted order).
pub fn haplotype_to_dict(haplotype: impl Into<Haplotype>) -> Result<HaplotypeMap, FormatError> {
    let haplotype = haplotype.into();
    if haplotype.is_reference() {
        return Ok(HaplotypeMap::new());
    }

    let changes = match haplotype {
        Haplotype::Map(map) => return Ok(map),
        Haplotype::Consensus => HaplotypeList::new(),
        Haplotype::Text(text) => parse_changes(&text)?,
        Haplotype::List(list) => list,
        Haplotype::Set(set) => sorted_set(set),
    };

    Ok(changes
        .into_iter()
        .map(|change| (change.position, change.mutation))
        .collect())
}

/// Convert to the string form.
///
/// An empty haplotype renders as `consensus`; a string input is returned as
/// given; every other form is joined in ascending position order.
pub fn haplotype_to_string(haplotype: impl Into<Haplotype>) -> String {
    let changes = match haplotype.into() {
        Haplotype::Text(text) if !text.is_empty() => return text,
        Haplotype::Text(_) | Haplotype::Consensus => return CONSENSUS.to_string(),
        Haplotype::List(list) => sort_by_position(list),
        Haplotype::Set(set) => sorted_set(set),
        Haplotype::Map(map) => map_to_list(map),
    };
    join_changes(&changes)
}

/// Join already-ordered changes into the string form.
pub fn join_changes(changes: &[Change]) -> String {
    if changes.is_empty() {
        return CONSENSUS.to_string();
    }
    changes
        .iter()
        .map(Change::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::haplotype::Nucleotide;

    const TEXT: &str = "10:G->A;15:iATTA;3004:G->A";

    fn g_to_a() -> Mutation {
        Mutation::substitution(Nucleotide::G, Nucleotide::A)
    }

    fn as_list() -> HaplotypeList {
        vec![
            Change::new(10, g_to_a()),
            Change::new(15, Mutation::Insertion("ATTA".to_string())),
            Change::new(3004, g_to_a()),
        ]
    }

    #[test]
    fn string_parses_into_sorted_list() {
        assert_eq!(haplotype_to_list(TEXT).unwrap(), as_list());
        assert_eq!(
            haplotype_to_list("3004:G->A;10:G->A;15:iATTA").unwrap(),
            as_list()
        );
    }

    #[test]
    fn list_input_is_not_reordered() {
        let mut reversed = as_list();
        reversed.reverse();
        assert_eq!(haplotype_to_list(reversed.clone()).unwrap(), reversed);
    }

    #[test]
    fn every_form_renders_the_same_string() {
        let set: HaplotypeSet = as_list().into_iter().collect();
        let map = haplotype_to_dict(TEXT).unwrap();

        assert_eq!(haplotype_to_string(TEXT), TEXT);
        assert_eq!(haplotype_to_string(as_list()), TEXT);
        assert_eq!(haplotype_to_string(set.clone()), TEXT);
        assert_eq!(haplotype_to_string(map.clone()), TEXT);
        assert_eq!(haplotype_to_list(set).unwrap(), as_list());
        assert_eq!(haplotype_to_list(map).unwrap(), as_list());
    }

    #[test]
    fn dict_keeps_last_duplicate() {
        let map = haplotype_to_dict("4:A->G;4:A->T").unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map[&4], Mutation::substitution(Nucleotide::A, Nucleotide::T));
    }

    #[test]
    fn sentinels_are_empty() {
        for sentinel in ["", "consensus", "wt", "wildtype"] {
            assert!(haplotype_to_list(sentinel).unwrap().is_empty());
            assert!(haplotype_to_set(sentinel).unwrap().is_empty());
            assert!(haplotype_to_dict(sentinel).unwrap().is_empty());
        }
        assert!(haplotype_to_list(None::<&str>).unwrap().is_empty());
        assert_eq!(haplotype_to_string(HaplotypeList::new()), CONSENSUS);
        assert_eq!(haplotype_to_string(""), CONSENSUS);
        assert_eq!(haplotype_to_string("wt"), "wt");
    }

    #[test]
    fn insertion_detection_uses_parsed_changes() {
        assert!(Haplotype::from(TEXT).has_insertion().unwrap());
        assert!(!Haplotype::from("1:A->T").has_insertion().unwrap());
        assert!(!Haplotype::from("wildtype").has_insertion().unwrap());
        assert!(Haplotype::from("1:zz").has_insertion().is_err());
    }
}
