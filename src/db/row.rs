use std::collections::BTreeMap;

use crate::db::schema::ID_COLUMN;
use crate::db::value::Value;

/// One schema-conformant record: column name to cell value.
///
/// Every row in a table carries exactly the current schema's columns,
/// including the generated [`ID_COLUMN`].
pub type Row = BTreeMap<String, Value>;

/// The generated identifier of a row, when present and well-formed.
pub(crate) fn id_of(row: &Row) -> Option<&str> {
    match row.get(ID_COLUMN) {
        Some(Value::Str(id)) => Some(id),
        _ => None,
    }
}
