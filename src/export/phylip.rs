use super::{aligned_rows, fill_template, justified_rows, ExportError};
use crate::table::HaplotypeTable;

/// Built-in PHYLIP template.
pub const PHYLIP_TEMPLATE: &str = "{n_tax} {n_char}\n{data}\n";

/// Render a haplotype table as sequential PHYLIP.
///
/// Taxa are named by their zero-based row index; the `id` column is still
/// required.
pub fn render_phylip(
    table: &HaplotypeTable,
    reference: &str,
    template: Option<&str>,
) -> Result<String, ExportError> {
    let (_, sequences) = aligned_rows(table, reference, false)?;
    let names: Vec<String> = (0..sequences.len()).map(|row| row.to_string()).collect();
    let data = justified_rows("", &names, &sequences);

    let n_tax = sequences.len().to_string();
    let n_char = sequences.first().map_or(0, String::len).to_string();
    Ok(fill_template(
        template.unwrap_or(PHYLIP_TEMPLATE),
        &[
            ("n_tax", n_tax.as_str()),
            ("n_char", n_char.as_str()),
            ("data", data.as_str()),
        ],
    ))
}
