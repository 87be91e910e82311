//! Row extraction seam

use crate::error::Result;
use crate::loader::TableSpec;
use crate::types::Row;

/// Anything that can produce a full snapshot of a table
///
/// Implementations select exactly `table.source_columns`, in declared order,
/// with no filtering or ordering clause. Failures are reported as
/// [`Error::Extraction`](crate::Error::Extraction).
pub trait RowSource {
    /// Read every row of `table`
    fn extract(&self, table: &TableSpec) -> Result<Vec<Row>>;
}
