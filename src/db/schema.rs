use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::db::value::Value;

/// Reserved identifier column present in every schema, always first.
pub const ID_COLUMN: &str = "_id";

/// Symbolic default-value vocabulary for column declarations.
///
/// Resolved into a concrete [`Value`] once at schema construction, not
/// dispatched per row. Parses case-insensitively from its aliases, so
/// configuration layers can say `"list"` or `"null"` directly.
///
/// # Example
///
/// ```
/// use rowbase::{ColumnDefault, Value};
///
/// assert_eq!("list".parse::<ColumnDefault>().unwrap(), ColumnDefault::EmptyList);
/// assert_eq!(ColumnDefault::EmptyList.resolve(), Value::List(vec![]));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ColumnDefault {
    /// No default; fields absent at insert become null.
    #[strum(serialize = "null", serialize = "none")]
    None,

    /// An empty sequence.
    #[strum(serialize = "list")]
    EmptyList,

    /// An empty mapping.
    #[strum(serialize = "map", serialize = "mapping")]
    EmptyMap,

    True,
    False,
}

impl ColumnDefault {
    /// Resolves the symbolic default to the value stored in rows.
    pub fn resolve(self) -> Value {
        match self {
            ColumnDefault::None => Value::Null,
            ColumnDefault::EmptyList => Value::List(Vec::new()),
            ColumnDefault::EmptyMap => Value::Map(BTreeMap::new()),
            ColumnDefault::True => Value::Bool(true),
            ColumnDefault::False => Value::Bool(false),
        }
    }
}

/// Declaration of a single column, as passed to table construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub default: ColumnDefault,
}

impl ColumnSpec {
    pub fn new(name: &str, default: ColumnDefault) -> Self {
        Self {
            name: name.to_owned(),
            default,
        }
    }

    /// Column with no default value.
    pub fn named(name: &str) -> Self {
        Self::new(name, ColumnDefault::None)
    }
}

/// A resolved column: its name plus the default back-filled into rows
/// that omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub default: Value,
}

/// The ordered set of columns governing every row of a table.
///
/// Invariants: column names are unique, and [`ID_COLUMN`] is always
/// present and never removable or renamable. Mutation goes through the
/// owning [`Table`](crate::Table), which rewrites existing rows in the
/// same pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Builds a schema from column declarations.
    ///
    /// Duplicate names are collapsed: the later declaration's default
    /// wins, the first occurrence keeps its position. `_id` is prepended
    /// unless already declared.
    pub fn new(specs: Vec<ColumnSpec>) -> Self {
        let mut columns: Vec<Column> = Vec::with_capacity(specs.len() + 1);
        for spec in specs {
            let default = spec.default.resolve();
            match columns.iter_mut().find(|col| col.name == spec.name) {
                Some(existing) => existing.default = default,
                None => columns.push(Column {
                    name: spec.name,
                    default,
                }),
            }
        }

        let mut schema = Self { columns };
        schema.ensure_id_column();
        schema
    }

    /// Rebuilds a schema from resolved columns, as found in a payload.
    pub(crate) fn from_columns(columns: Vec<Column>) -> Self {
        let mut schema = Self { columns };
        schema.ensure_id_column();
        schema
    }

    fn ensure_id_column(&mut self) {
        if !self.contains(ID_COLUMN) {
            self.columns.insert(
                0,
                Column {
                    name: ID_COLUMN.to_owned(),
                    default: Value::Null,
                },
            );
        }
    }

    /// The ordered column definitions.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|col| col.name.as_str())
    }

    /// The default value for a column, if the column exists.
    pub fn default_of(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .find(|col| col.name == name)
            .map(|col| &col.default)
    }

    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    /// Appends a column, or overwrites the default of an existing one.
    ///
    /// Back-filling rows is the table's job.
    pub(crate) fn add_column(&mut self, name: &str, default: Value) {
        match self.columns.iter_mut().find(|col| col.name == name) {
            Some(existing) => existing.default = default,
            None => self.columns.push(Column {
                name: name.to_owned(),
                default,
            }),
        }
    }

    /// Removes a column. No-op on an absent column and on `_id`.
    /// Returns whether the schema changed.
    pub(crate) fn remove_column(&mut self, name: &str) -> bool {
        if name == ID_COLUMN {
            return false;
        }
        match self.index_of(name) {
            Some(idx) => {
                self.columns.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Renames a column in place, preserving its position.
    ///
    /// No-op when `old` is absent, `old == new`, `old` is `_id`, or the
    /// new name collides with an existing column. Returns whether the
    /// schema changed.
    pub(crate) fn rename_column(&mut self, old: &str, new: &str) -> bool {
        if old == new || old == ID_COLUMN || self.contains(new) {
            return false;
        }
        match self.index_of(old) {
            Some(idx) => {
                self.columns[idx].name = new.to_owned();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people_schema() -> Schema {
        Schema::new(vec![
            ColumnSpec::named("name"),
            ColumnSpec::new("tags", ColumnDefault::EmptyList),
            ColumnSpec::new("active", ColumnDefault::True),
        ])
    }

    #[test]
    fn id_column_is_prepended() {
        let schema = people_schema();
        let names: Vec<_> = schema.column_names().collect();
        assert_eq!(names, vec!["_id", "name", "tags", "active"]);
    }

    #[test]
    fn declared_id_column_is_not_duplicated() {
        let schema = Schema::new(vec![ColumnSpec::named("_id"), ColumnSpec::named("name")]);
        assert_eq!(schema.len(), 2);
        assert_eq!(schema.index_of("_id"), Some(0));
    }

    #[test]
    fn duplicate_declarations_keep_position_and_take_last_default() {
        let schema = Schema::new(vec![
            ColumnSpec::new("flag", ColumnDefault::True),
            ColumnSpec::named("name"),
            ColumnSpec::new("flag", ColumnDefault::False),
        ]);

        assert_eq!(schema.index_of("flag"), Some(1));
        assert_eq!(schema.default_of("flag"), Some(&Value::Bool(false)));
    }

    #[test]
    fn symbolic_defaults_resolve_once() {
        let schema = people_schema();
        assert_eq!(schema.default_of("tags"), Some(&Value::List(vec![])));
        assert_eq!(schema.default_of("active"), Some(&Value::Bool(true)));
        assert_eq!(schema.default_of("name"), Some(&Value::Null));
    }

    #[test]
    fn default_aliases_parse_case_insensitively() {
        assert_eq!("NULL".parse::<ColumnDefault>().unwrap(), ColumnDefault::None);
        assert_eq!("none".parse::<ColumnDefault>().unwrap(), ColumnDefault::None);
        assert_eq!("List".parse::<ColumnDefault>().unwrap(), ColumnDefault::EmptyList);
        assert_eq!("map".parse::<ColumnDefault>().unwrap(), ColumnDefault::EmptyMap);
        assert_eq!("true".parse::<ColumnDefault>().unwrap(), ColumnDefault::True);
        assert!("whatever".parse::<ColumnDefault>().is_err());
    }

    #[test]
    fn remove_column_is_a_noop_on_absent_and_id() {
        let mut schema = people_schema();
        assert!(!schema.remove_column("nope"));
        assert!(!schema.remove_column("_id"));
        assert!(schema.remove_column("tags"));
        assert!(!schema.contains("tags"));
    }

    #[test]
    fn rename_column_preserves_position() {
        let mut schema = people_schema();
        assert!(schema.rename_column("name", "full_name"));
        assert_eq!(schema.index_of("full_name"), Some(1));
        assert!(!schema.contains("name"));
    }

    #[test]
    fn rename_column_noops() {
        let mut schema = people_schema();
        assert!(!schema.rename_column("name", "name"));
        assert!(!schema.rename_column("missing", "other"));
        assert!(!schema.rename_column("_id", "id"));
        // Collision with an existing column would break name uniqueness.
        assert!(!schema.rename_column("name", "tags"));
    }
}
