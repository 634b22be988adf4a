use crate::db::row::Row;
use crate::db::schema::{ID_COLUMN, Schema};
use crate::db::value::Value;

/// Makes a raw client-supplied field mapping conform to the schema.
///
/// Keys outside the declared column set are silently dropped and every
/// surviving value goes through the [`Value`] coercion. With `new_id`
/// set (insert mode) the row additionally gets that id — overwriting any
/// client-supplied one, clients cannot pick their own — and every absent
/// column back-filled with its schema default. Without it (patch mode)
/// the result carries only the keys the client actually sent, which is
/// exactly what `update` merges over matched rows.
pub(crate) fn normalize(
    schema: &Schema,
    raw: serde_json::Map<String, serde_json::Value>,
    new_id: Option<String>,
) -> Row {
    let mut row: Row = raw
        .into_iter()
        .filter(|(key, _)| schema.contains(key))
        .map(|(key, value)| (key, Value::from(value)))
        .collect();

    if let Some(id) = new_id {
        row.insert(ID_COLUMN.to_owned(), Value::Str(id));
        for column in schema.columns() {
            if column.name != ID_COLUMN && !row.contains_key(&column.name) {
                row.insert(column.name.clone(), column.default.clone());
            }
        }
    }

    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{ColumnDefault, ColumnSpec};

    fn test_schema() -> Schema {
        Schema::new(vec![
            ColumnSpec::named("name"),
            ColumnSpec::named("email"),
            ColumnSpec::new("tags", ColumnDefault::EmptyList),
        ])
    }

    fn raw(json: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match json {
            serde_json::Value::Object(fields) => fields,
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let schema = test_schema();
        let row = normalize(
            &schema,
            raw(serde_json::json!({"name": "Alice", "hacker": true})),
            Some("row-1".to_string()),
        );

        assert!(!row.contains_key("hacker"));
        assert_eq!(row.get("name"), Some(&Value::Str("Alice".to_string())));
    }

    #[test]
    fn insert_mode_fills_id_and_defaults() {
        let schema = test_schema();
        let row = normalize(
            &schema,
            raw(serde_json::json!({"name": "Alice"})),
            Some("row-1".to_string()),
        );

        assert_eq!(row.get("_id"), Some(&Value::Str("row-1".to_string())));
        assert_eq!(row.get("email"), Some(&Value::Null));
        assert_eq!(row.get("tags"), Some(&Value::List(vec![])));
        assert_eq!(row.len(), schema.len());
    }

    #[test]
    fn insert_mode_overwrites_client_supplied_id() {
        let schema = test_schema();
        let row = normalize(
            &schema,
            raw(serde_json::json!({"_id": "mine", "name": "Alice"})),
            Some("row-1".to_string()),
        );

        assert_eq!(row.get("_id"), Some(&Value::Str("row-1".to_string())));
    }

    #[test]
    fn patch_mode_keeps_only_sent_keys() {
        let schema = test_schema();
        let row = normalize(
            &schema,
            raw(serde_json::json!({"email": "a@x", "hacker": true})),
            None,
        );

        assert_eq!(row.len(), 1);
        assert_eq!(row.get("email"), Some(&Value::Str("a@x".to_string())));
    }

    #[test]
    fn values_are_coerced_through_the_model() {
        let schema = test_schema();
        let row = normalize(
            &schema,
            raw(serde_json::json!({"name": u64::MAX, "tags": [1, 2]})),
            Some("row-1".to_string()),
        );

        assert_eq!(row.get("name"), Some(&Value::Str(u64::MAX.to_string())));
        assert_eq!(
            row.get("tags"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
    }
}
