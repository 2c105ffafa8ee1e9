use super::{aligned_rows, fill_template, justified_rows, ExportError};
use crate::table::HaplotypeTable;

/// Built-in NEXUS template.
pub const NEXUS_TEMPLATE: &str = "#NEXUS

BEGIN DATA;
    DIMENSIONS NTAX={n_tax} NCHAR={n_char};
    FORMAT MISSING=? GAP=- DATATYPE=DNA;
    MATRIX
{data}
    ;
END;
";

const ROW_INDENT: &str = "        ";

/// Render a haplotype table as a NEXUS data block, one taxon per row.
pub fn render_nexus(
    table: &HaplotypeTable,
    reference: &str,
    template: Option<&str>,
) -> Result<String, ExportError> {
    let (ids, sequences) = aligned_rows(table, reference, false)?;
    let data = justified_rows(ROW_INDENT, &ids, &sequences);

    let n_tax = sequences.len().to_string();
    let n_char = sequences.first().map_or(0, String::len).to_string();
    Ok(fill_template(
        template.unwrap_or(NEXUS_TEMPLATE),
        &[
            ("n_tax", n_tax.as_str()),
            ("n_char", n_char.as_str()),
            ("data", data.as_str()),
        ],
    ))
}
