use std::cmp::Ordering;

use strum::{Display, EnumString};

use crate::common::error::TableError;
use crate::db::row::Row;
use crate::db::schema::Schema;
use crate::db::value::Value;

/// Comparison/membership operators accepted inside a filter condition.
///
/// Parses from the lowercase operator keys used in wire-shape filters,
/// e.g. `{"age": {"gt": 21}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum FilterOp {
    /// Ordered comparison `cell > operand`.
    Gt,
    /// Ordered comparison `cell >= operand`.
    Gte,
    /// Ordered comparison `cell < operand`.
    Lt,
    /// Ordered comparison `cell <= operand`.
    Lte,
    /// Inequality.
    Not,
    /// Operand is an element of the cell (sequence element, string
    /// substring, or mapping key).
    Contains,
    /// String prefix test.
    StartsWith,
    /// String suffix test.
    EndsWith,
    /// The cell is an element of the operand sequence.
    In,
}

/// A per-column constraint: a bare value means equality, an operator
/// list applies each operator in turn (conjunctive).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Equals(Value),
    Ops(Vec<(FilterOp, Value)>),
}

/// Ordered conjunction of per-column conditions. Each clause narrows the
/// result of the previous one.
pub type Where = Vec<(String, Condition)>;

/// Sort direction for one key of a sort specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Ordered multi-key sort specification; the first key is primary.
pub type SortSpec = Vec<(String, SortOrder)>;

/// Parses the wire shape of a filter: an object mapping column names to
/// either a literal (equality) or an operator object.
///
/// # Example
///
/// ```
/// use rowbase::parse_where;
///
/// let clauses = parse_where(&serde_json::json!({
///     "name": "Alice",
///     "age": {"gte": 21, "lt": 65},
/// })).unwrap();
/// assert_eq!(clauses.len(), 2);
/// ```
pub fn parse_where(spec: &serde_json::Value) -> Result<Where, TableError> {
    let object = spec
        .as_object()
        .ok_or_else(|| TableError::InvalidQuery("filter must be an object".to_string()))?;

    let mut clauses = Where::with_capacity(object.len());
    for (column, condition) in object {
        let condition = match condition {
            serde_json::Value::Object(ops) => {
                let mut parsed = Vec::with_capacity(ops.len());
                for (key, operand) in ops {
                    let op = key.parse::<FilterOp>().map_err(|_| {
                        TableError::InvalidQuery(format!("unknown filter operator `{key}`"))
                    })?;
                    parsed.push((op, Value::from(operand.clone())));
                }
                Condition::Ops(parsed)
            }
            literal => Condition::Equals(Value::from(literal.clone())),
        };
        clauses.push((column.clone(), condition));
    }
    Ok(clauses)
}

/// Parses the wire shape of a sort specification: an object mapping
/// column names to `"asc"` or `"desc"` (case-insensitive), in priority
/// order.
pub fn parse_sort(spec: &serde_json::Value) -> Result<SortSpec, TableError> {
    let object = spec
        .as_object()
        .ok_or_else(|| TableError::InvalidQuery("sort must be an object".to_string()))?;

    let mut keys = SortSpec::with_capacity(object.len());
    for (column, order) in object {
        let order = order
            .as_str()
            .and_then(|raw| raw.parse::<SortOrder>().ok())
            .ok_or_else(|| {
                TableError::InvalidQuery(format!("sort direction for `{column}` must be asc or desc"))
            })?;
        keys.push((column.clone(), order));
    }
    Ok(keys)
}

static NULL: Value = Value::Null;

fn cell<'r>(row: &'r Row, column: &str) -> &'r Value {
    row.get(column).unwrap_or(&NULL)
}

/// Applies a conjunctive filter specification, narrowing `rows` one
/// clause at a time in declared order.
///
/// Comparison errors from operators applied to incomparable kinds
/// propagate to the caller; they are never swallowed.
pub(crate) fn apply_where(
    schema: &Schema,
    mut rows: Vec<Row>,
    clauses: &[(String, Condition)],
) -> Result<Vec<Row>, TableError> {
    for (column, condition) in clauses {
        if !schema.contains(column) {
            return Err(TableError::ColumnNotFound(column.clone()));
        }

        match condition {
            Condition::Equals(operand) => {
                rows.retain(|row| cell(row, column).loosely_equals(operand));
            }
            Condition::Ops(ops) => {
                for (op, operand) in ops {
                    let mut kept = Vec::with_capacity(rows.len());
                    for row in rows {
                        if matches(*op, cell(&row, column), operand)? {
                            kept.push(row);
                        }
                    }
                    rows = kept;
                }
            }
        }
    }
    Ok(rows)
}

/// Stable multi-key sort. One stable sort per key, applied in reverse
/// declared order, so the first-declared key ends up most significant.
pub(crate) fn apply_sort(
    schema: &Schema,
    rows: &mut [Row],
    sort: &[(String, SortOrder)],
) -> Result<(), TableError> {
    for (column, order) in sort.iter().rev() {
        if !schema.contains(column) {
            return Err(TableError::ColumnNotFound(column.clone()));
        }

        let mut failure = None;
        rows.sort_by(|a, b| match cell(a, column).compare(cell(b, column)) {
            Ok(ordering) => match order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            },
            Err(error) => {
                failure.get_or_insert(error);
                Ordering::Equal
            }
        });

        if let Some(error) = failure {
            return Err(error);
        }
    }
    Ok(())
}

/// Evaluates one operator against one cell.
fn matches(op: FilterOp, value: &Value, operand: &Value) -> Result<bool, TableError> {
    match op {
        FilterOp::Gt => Ok(value.compare(operand)? == Ordering::Greater),
        FilterOp::Gte => Ok(value.compare(operand)? != Ordering::Less),
        FilterOp::Lt => Ok(value.compare(operand)? == Ordering::Less),
        FilterOp::Lte => Ok(value.compare(operand)? != Ordering::Greater),
        FilterOp::Not => Ok(!value.loosely_equals(operand)),
        FilterOp::Contains => match (value, operand) {
            (Value::List(items), needle) => {
                Ok(items.iter().any(|item| item.loosely_equals(needle)))
            }
            (Value::Str(s), Value::Str(needle)) => Ok(s.contains(needle.as_str())),
            (Value::Map(map), Value::Str(key)) => Ok(map.contains_key(key)),
            _ => Err(inapplicable(op, value, operand)),
        },
        FilterOp::StartsWith => match (value, operand) {
            (Value::Str(s), Value::Str(prefix)) => Ok(s.starts_with(prefix.as_str())),
            _ => Err(inapplicable(op, value, operand)),
        },
        FilterOp::EndsWith => match (value, operand) {
            (Value::Str(s), Value::Str(suffix)) => Ok(s.ends_with(suffix.as_str())),
            _ => Err(inapplicable(op, value, operand)),
        },
        FilterOp::In => match (value, operand) {
            (needle, Value::List(items)) => {
                Ok(items.iter().any(|item| item.loosely_equals(needle)))
            }
            (Value::Str(s), Value::Str(haystack)) => Ok(haystack.contains(s.as_str())),
            _ => Err(inapplicable(op, value, operand)),
        },
    }
}

fn inapplicable(op: FilterOp, value: &Value, operand: &Value) -> TableError {
    TableError::TypeMismatch(format!(
        "`{op}` cannot apply to {} and {}",
        value.kind(),
        operand.kind()
    ))
}
