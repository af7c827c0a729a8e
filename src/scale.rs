//! Global bar scale shared by every column.

use crate::table::Table;

/// Maximum parsed value field across all tables that have data; 0 when nothing is numeric.
///
/// Always computed from scratch: closing or failing a column can lower the maximum.
pub fn global_max<'a>(tables: impl IntoIterator<Item = &'a Table>) -> f64 {
    tables
        .into_iter()
        .filter(|table| table.has_data())
        .flat_map(Table::values)
        .fold(0.0, f64::max)
}
