// Extraction of station observations from published HTML tables
//
// Two steps, both pure functions over already-fetched page text:
// - table: locate the data table and pull out trimmed cell text per row
// - station_record: interpret those rows as timestamped observations

pub mod station_record;
pub mod table;

pub use station_record::{build_observations, parse_row, RowError};
pub use table::{extract_rows, RawRow};
