use serde::{Deserialize, Serialize};

/// Column names understood by [`HaplotypeTable`](super::HaplotypeTable).
pub mod column {
    /// Haplotype string.
    pub const HAPLOTYPE: &str = "haplotype";
    /// Number of reads carrying the haplotype.
    pub const COUNT: &str = "count";
    /// Row identifier used as taxon name on export.
    pub const ID: &str = "id";
    /// Sampling time; `0` marks ancestral rows.
    pub const TIME: &str = "time";
    /// Compartment the sample was taken from.
    pub const COMPARTMENT: &str = "compartment";
    /// Replicate number within the compartment.
    pub const REPLICATE: &str = "replicate";
    /// Block identifier carried over from read names.
    pub const BLOCK_ID: &str = "block_id";
    /// Lineage number combining replicate and compartment.
    pub const LINEAGE: &str = "lineage";
    /// Closest ancestral haplotype of a descendant row.
    pub const CLOSEST_ANCESTOR: &str = "closest_ancestor";
    /// Sample the row was counted in; frequencies are relative to it.
    pub const SAMPLE_NAME: &str = "sample_name";

    /// All known columns in canonical order.
    pub const ALL: [&str; 10] = [
        HAPLOTYPE,
        COUNT,
        ID,
        TIME,
        COMPARTMENT,
        REPLICATE,
        BLOCK_ID,
        LINEAGE,
        CLOSEST_ANCESTOR,
        SAMPLE_NAME,
    ];
}

/// One row of a haplotype table. Every column except `haplotype` is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HaplotypeRecord {
    /// Haplotype string.
    pub haplotype: String,
    /// Read count.
    pub count: Option<u64>,
    /// Taxon identifier.
    pub id: Option<String>,
    /// Sampling time.
    pub time: Option<f64>,
    /// Compartment number.
    pub compartment: Option<i64>,
    /// Replicate number.
    pub replicate: Option<i64>,
    /// Block identifier.
    pub block_id: Option<String>,
    /// Lineage number.
    pub lineage: Option<i64>,
    /// Closest ancestral haplotype.
    pub closest_ancestor: Option<String>,
    /// Sample name.
    pub sample_name: Option<String>,
}

impl HaplotypeRecord {
    /// Row with only a haplotype and its count.
    pub fn new(haplotype: impl Into<String>, count: u64) -> Self {
        Self {
            haplotype: haplotype.into(),
            count: Some(count),
            ..Self::default()
        }
    }

    /// Cell value of `column` as written to CSV; empty when unset or unknown.
    pub fn field(&self, column: &str) -> String {
        fn text<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        match column {
            column::HAPLOTYPE => self.haplotype.clone(),
            column::COUNT => text(&self.count),
            column::ID => text(&self.id),
            column::TIME => text(&self.time),
            column::COMPARTMENT => text(&self.compartment),
            column::REPLICATE => text(&self.replicate),
            column::BLOCK_ID => text(&self.block_id),
            column::LINEAGE => text(&self.lineage),
            column::CLOSEST_ANCESTOR => text(&self.closest_ancestor),
            column::SAMPLE_NAME => text(&self.sample_name),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_render_like_csv_cells() {
        let record = HaplotypeRecord {
            time: Some(10.0),
            replicate: Some(2),
            ..HaplotypeRecord::new("1:A->G", 4)
        };
        assert_eq!(record.field(column::HAPLOTYPE), "1:A->G");
        assert_eq!(record.field(column::COUNT), "4");
        assert_eq!(record.field(column::TIME), "10");
        assert_eq!(record.field(column::REPLICATE), "2");
        assert_eq!(record.field(column::ID), "");
        assert_eq!(record.field("unknown"), "");
    }
}
