use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::error::TableError;
use crate::db::filter::{Condition, SortOrder, apply_sort, apply_where};
use crate::db::id::{IdGenerator, UuidGenerator};
use crate::db::normalize::normalize;
use crate::db::row::{Row, id_of};
use crate::db::schema::{Column, ColumnSpec, ID_COLUMN, Schema};
use crate::db::value::Value;

/// Result of [`Table::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    pub updated_count: usize,
}

/// Result of [`Table::delete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub deleted_count: usize,
}

/// The logical serialized form of a table: resolved column definitions
/// plus the rows exactly as stored.
///
/// [`Table::from_payload`] trusts the rows as already schema-conformant;
/// no re-normalization happens on load. Any codec that round-trips this
/// shape losslessly can persist a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePayload {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

/// An in-memory table: a schema plus an ordered collection of rows.
///
/// Rows stay conformant to the schema through every operation: inserts
/// are normalized, updates merge a sanitized patch, and schema mutations
/// rewrite every existing row in the same pass. Mutating operations build
/// the next row collection in full and then swap it in; rows handed out
/// by read paths are copies, never references into table storage.
///
/// Not designed for concurrent mutators — a host sharing one table across
/// threads must serialize access externally.
///
/// # Example
///
/// ```
/// use rowbase::{ColumnSpec, Table, parse_where};
///
/// let mut table = Table::new(vec![
///     ColumnSpec::named("name"),
///     ColumnSpec::named("email"),
/// ]);
///
/// table.insert(serde_json::json!({"name": "Alice", "email": "a@x"})).unwrap();
///
/// let found = table
///     .find_first(&parse_where(&serde_json::json!({"name": "Alice"})).unwrap(), &[])
///     .unwrap();
/// assert!(found.is_some());
/// ```
pub struct Table {
    schema: Schema,
    rows: Vec<Row>,
    ids: Box<dyn IdGenerator>,
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.schema)
            .field("rows", &self.rows)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Table rows={} columns={}>",
            self.rows.len(),
            self.schema.len()
        )
    }
}

impl Table {
    /// Creates an empty table governed by the given columns.
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self::with_id_generator(columns, Box::new(UuidGenerator))
    }

    /// Creates an empty table with a caller-supplied id source.
    pub fn with_id_generator(columns: Vec<ColumnSpec>, ids: Box<dyn IdGenerator>) -> Self {
        Self {
            schema: Schema::new(columns),
            rows: Vec::new(),
            ids,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The stored rows, in insertion order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inserts a row built from a raw JSON object.
    ///
    /// The payload is normalized against the schema: unknown fields are
    /// dropped, absent columns get their defaults, and a fresh id is
    /// assigned (any client-supplied `_id` is replaced). Returns a copy
    /// of the stored row.
    pub fn insert(&mut self, raw: serde_json::Value) -> Result<Row, TableError> {
        let serde_json::Value::Object(fields) = raw else {
            return Err(TableError::InvalidQuery(
                "insert payload must be an object".to_string(),
            ));
        };

        let row = normalize(&self.schema, fields, Some(self.ids.next_id()));
        debug!(id = id_of(&row), total = self.rows.len() + 1, "row inserted");
        self.rows.push(row.clone());
        Ok(row)
    }

    /// Returns copies of all rows matching `clauses`, in `sort` order.
    pub fn find(
        &self,
        clauses: &[(String, Condition)],
        sort: &[(String, SortOrder)],
    ) -> Result<Vec<Row>, TableError> {
        let mut rows = apply_where(&self.schema, self.rows.clone(), clauses)?;
        apply_sort(&self.schema, &mut rows, sort)?;
        Ok(rows)
    }

    /// Returns the first matching row, or `None` on no match.
    pub fn find_first(
        &self,
        clauses: &[(String, Condition)],
        sort: &[(String, SortOrder)],
    ) -> Result<Option<Row>, TableError> {
        Ok(self.find(clauses, sort)?.into_iter().next())
    }

    /// Merges a sanitized patch into every row matching `clauses`.
    ///
    /// The match set is pinned by id before any mutation. The patch goes
    /// through normalization in patch mode (unknown fields dropped, values
    /// coerced, no default back-fill) and can never touch `_id`. Fields
    /// absent from the patch are left as they were.
    pub fn update(
        &mut self,
        clauses: &[(String, Condition)],
        patch: serde_json::Value,
    ) -> Result<UpdateResult, TableError> {
        let serde_json::Value::Object(fields) = patch else {
            return Err(TableError::InvalidQuery(
                "update patch must be an object".to_string(),
            ));
        };

        let mut patch = normalize(&self.schema, fields, None);
        patch.remove(ID_COLUMN);

        let matched = self.matching_ids(clauses)?;

        let mut rows = self.rows.clone();
        let mut updated_count = 0;
        for row in &mut rows {
            let is_match = id_of(row).is_some_and(|id| matched.contains(id));
            if is_match {
                for (key, value) in &patch {
                    row.insert(key.clone(), value.clone());
                }
                updated_count += 1;
            }
        }

        self.rows = rows;
        debug!(updated_count, "rows updated");
        Ok(UpdateResult { updated_count })
    }

    /// Removes every row matching `clauses`.
    pub fn delete(&mut self, clauses: &[(String, Condition)]) -> Result<DeleteResult, TableError> {
        let matched = self.matching_ids(clauses)?;

        let mut kept = Vec::with_capacity(self.rows.len());
        let mut deleted_count = 0;
        for row in self.rows.clone() {
            if id_of(&row).is_some_and(|id| matched.contains(id)) {
                deleted_count += 1;
            } else {
                kept.push(row);
            }
        }

        self.rows = kept;
        debug!(deleted_count, "rows deleted");
        Ok(DeleteResult { deleted_count })
    }

    /// Ids of the rows matching `clauses`, fixed before any mutation so
    /// the mutation itself cannot change the match set mid-operation.
    fn matching_ids(&self, clauses: &[(String, Condition)]) -> Result<BTreeSet<String>, TableError> {
        Ok(apply_where(&self.schema, self.rows.clone(), clauses)?
            .iter()
            .filter_map(|row| id_of(row).map(str::to_owned))
            .collect())
    }

    /// Appends a column and sets `default` on every existing row.
    ///
    /// The default is honored verbatim — `0`, `""` and `false` are real
    /// defaults, only `Value::Null` means "no default". Adding a column
    /// that already exists replaces its default and resets the column in
    /// every row. `_id` cannot be added over.
    pub fn add_column(&mut self, name: &str, default: Value) {
        if name == ID_COLUMN {
            return;
        }

        let mut rows = self.rows.clone();
        self.schema.add_column(name, default.clone());
        for row in &mut rows {
            row.insert(name.to_owned(), default.clone());
        }
        self.rows = rows;
        debug!(column = name, "column added");
    }

    /// Removes a column from the schema and from every row. No-op when
    /// the column is absent or is `_id`.
    pub fn remove_column(&mut self, name: &str) {
        if !self.schema.remove_column(name) {
            return;
        }

        let mut rows = self.rows.clone();
        for row in &mut rows {
            row.remove(name);
        }
        self.rows = rows;
        debug!(column = name, "column removed");
    }

    /// Renames a column, carrying each row's value over. No-op under the
    /// same conditions as [`Schema::rename_column`]: absent source,
    /// identical names, `_id`, or a name collision.
    pub fn rename_column(&mut self, old: &str, new: &str) {
        if !self.schema.rename_column(old, new) {
            return;
        }

        let mut rows = self.rows.clone();
        for row in &mut rows {
            if let Some(value) = row.remove(old) {
                row.insert(new.to_owned(), value);
            }
        }
        self.rows = rows;
        debug!(from = old, to = new, "column renamed");
    }

    /// Snapshots the table into its logical payload shape.
    pub fn to_payload(&self) -> TablePayload {
        TablePayload {
            columns: self.schema.columns().to_vec(),
            rows: self.rows.clone(),
        }
    }

    /// Reconstructs a table from a payload.
    ///
    /// Round-trip trust: rows are taken as already conformant and are not
    /// re-normalized.
    pub fn from_payload(payload: TablePayload) -> Self {
        Self {
            schema: Schema::from_columns(payload.columns),
            rows: payload.rows,
            ids: Box::new(UuidGenerator),
        }
    }

    /// Encodes the table as a JSON payload string.
    pub fn serialize(&self) -> Result<String, TableError> {
        Ok(serde_json::to_string(&self.to_payload())?)
    }

    /// Decodes a table from a JSON payload string.
    pub fn load(payload: &str) -> Result<Self, TableError> {
        Ok(Self::from_payload(serde_json::from_str(payload)?))
    }
}
