use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

/// Trimmed cell texts of one table row
pub type RawRow = Vec<String>;

/// Rows of the first table in the document that has any non-empty row
///
/// Station pages embed layout and navigation tables around the data table,
/// so tables without cells are passed over. Scanning stops at the first
/// table with content. Returns an empty vector when no table qualifies.
#[instrument(skip(html), fields(html_size = html.len()))]
pub fn extract_rows(html: &str) -> Vec<RawRow> {
    let document = Html::parse_document(html);
    let table_selector = Selector::parse("table").expect("table selector is valid");
    let row_selector = Selector::parse("tr").expect("row selector is valid");
    let cell_selector = Selector::parse("td, th").expect("cell selector is valid");

    for (index, table) in document.select(&table_selector).enumerate() {
        let rows: Vec<RawRow> = table
            .select(&row_selector)
            .map(|tr| tr.select(&cell_selector).map(cell_text).collect::<RawRow>())
            .filter(|row| !row.is_empty())
            .collect();

        if rows.is_empty() {
            debug!("Table {} has no rows with cells, skipping", index);
            continue;
        }

        debug!("Using table {} with {} rows", index, rows.len());
        return rows;
    }

    debug!("No table with cell content found");
    Vec::new()
}

/// Text of a cell with each text fragment trimmed, so "12<br>m" reads "12m"
fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().map(str::trim).collect()
}
