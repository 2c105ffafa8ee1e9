use super::{haplotype_to_set, FormatError, Haplotype, HaplotypeSet};

/// Number of changes present in exactly one of the two haplotypes.
pub fn haplotype_distance(
    left: impl Into<Haplotype>,
    right: impl Into<Haplotype>,
) -> Result<usize, FormatError> {
    let left = haplotype_to_set(left)?;
    let right = haplotype_to_set(right)?;
    Ok(set_distance(&left, &right))
}

/// Symmetric difference size of two change sets.
pub fn set_distance(left: &HaplotypeSet, right: &HaplotypeSet) -> usize {
    left.symmetric_difference(right).count()
}

/// Index of the ancestor closest to `descendant`. The first ancestor wins on
/// ties; `None` when there are no ancestors.
pub fn closest_ancestor(descendant: &HaplotypeSet, ancestors: &[HaplotypeSet]) -> Option<usize> {
    ancestors
        .iter()
        .enumerate()
        .min_by_key(|(idx, ancestor)| (set_distance(descendant, ancestor), *idx))
        .map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_counts_unshared_changes() {
        assert_eq!(haplotype_distance("1:A->G;5:iTT", "1:A->G").unwrap(), 1);
        assert_eq!(haplotype_distance("1:A->G", "2:A->G").unwrap(), 2);
        assert_eq!(haplotype_distance("consensus", "").unwrap(), 0);
    }

    #[test]
    fn closest_ancestor_prefers_first_on_ties() {
        let ancestors = vec![
            haplotype_to_set("1:A->G;2:A->T").unwrap(),
            haplotype_to_set("1:A->G").unwrap(),
            haplotype_to_set("3:A->G").unwrap(),
        ];
        let descendant = haplotype_to_set("1:A->G;3:A->G").unwrap();
        assert_eq!(closest_ancestor(&descendant, &ancestors), Some(1));
        assert_eq!(closest_ancestor(&descendant, &[]), None);
    }
}
