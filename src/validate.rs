//! Structural validation of schema documents.
//!
//! Every document is checked before it is stored, whichever path produced
//! it. Checks run in a fixed order and the first violation is returned.

use crate::schema::{
    COLUMN_PROPERTIES, ColumnId, RELATIONSHIP_FIELDS, RelationshipId, RelationshipType,
    SchemaDocument, TableId,
};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Schema must contain a tables array")]
    MissingTables,
    #[error("Schema {0} must be a mapping")]
    InvalidSection(&'static str),
    #[error("Table {0} must have a name")]
    TableMissingName(TableId),
    #[error("Table {0} must have a columns array")]
    TableMissingColumns(TableId),
    #[error("Column {column} in table {table} must have a name")]
    ColumnMissingName { table: TableId, column: ColumnId },
    #[error("Column {column} in table {table} must have a type")]
    ColumnMissingType { table: TableId, column: ColumnId },
    #[error("Invalid column property '{property}' in column {column} of table {table}")]
    InvalidColumnProperty {
        table: TableId,
        column: ColumnId,
        property: String,
    },
    #[error("Relationship {relationship} is missing required field: {field}")]
    RelationshipMissingField {
        relationship: RelationshipId,
        field: &'static str,
    },
    #[error("Invalid relationship type '{typ}' in relationship {relationship}")]
    InvalidRelationshipType {
        relationship: RelationshipId,
        typ: String,
    },
    #[error("Relationship {relationship} references non-existent table: {table}")]
    DanglingTableReference {
        relationship: RelationshipId,
        table: String,
    },
    #[error(
        "Relationship {relationship} references non-existent column: {column} in table {table}"
    )]
    DanglingColumnReference {
        relationship: RelationshipId,
        table: TableId,
        column: String,
    },
    #[error("Layout references non-existent table: {0}")]
    DanglingLayoutReference(TableId),
    #[error("Layout for table {table} must have a numeric {axis} position")]
    InvalidPosition { table: TableId, axis: &'static str },
}

impl ValidationError {
    /// Stable machine-readable code for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MissingTables => "missing_tables",
            ValidationError::InvalidSection(_) => "invalid_section",
            ValidationError::TableMissingName(_) => "table_missing_name",
            ValidationError::TableMissingColumns(_) => "table_missing_columns",
            ValidationError::ColumnMissingName { .. } => "column_missing_name",
            ValidationError::ColumnMissingType { .. } => "column_missing_type",
            ValidationError::InvalidColumnProperty { .. } => "invalid_column_property",
            ValidationError::RelationshipMissingField { .. } => "relationship_missing_field",
            ValidationError::InvalidRelationshipType { .. } => "invalid_relationship_type",
            ValidationError::DanglingTableReference { .. } => "dangling_table_reference",
            ValidationError::DanglingColumnReference { .. } => "dangling_column_reference",
            ValidationError::DanglingLayoutReference(_) => "dangling_layout_reference",
            ValidationError::InvalidPosition { .. } => "invalid_position",
        }
    }
}

/// Validate a typed document.
///
/// Attribute allow-list, relationship type set and numeric positions are
/// already guaranteed by deserialization; this checks the rest.
pub fn validate(doc: &SchemaDocument) -> Result<(), ValidationError> {
    let result = check_document(doc);
    if let Err(e) = &result {
        tracing::debug!(error = %e, kind = e.kind(), "schema rejected");
    }
    result
}

fn check_document(doc: &SchemaDocument) -> Result<(), ValidationError> {
    for (table_id, table) in &doc.tables {
        if table.name.is_empty() {
            return Err(ValidationError::TableMissingName(table_id.clone()));
        }
        for (column_id, column) in &table.columns {
            if column.name.is_empty() {
                return Err(ValidationError::ColumnMissingName {
                    table: table_id.clone(),
                    column: column_id.clone(),
                });
            }
            if column.typ.is_empty() {
                return Err(ValidationError::ColumnMissingType {
                    table: table_id.clone(),
                    column: column_id.clone(),
                });
            }
        }
    }

    for (rel_id, rel) in &doc.relationships {
        let from = doc.tables.get(&rel.from_table).ok_or_else(|| {
            ValidationError::DanglingTableReference {
                relationship: rel_id.clone(),
                table: rel.from_table.clone(),
            }
        })?;
        let to = doc.tables.get(&rel.to_table).ok_or_else(|| {
            ValidationError::DanglingTableReference {
                relationship: rel_id.clone(),
                table: rel.to_table.clone(),
            }
        })?;

        if from.resolve_column(&rel.from_column).is_none() {
            return Err(ValidationError::DanglingColumnReference {
                relationship: rel_id.clone(),
                table: rel.from_table.clone(),
                column: rel.from_column.clone(),
            });
        }
        if to.resolve_column(&rel.to_column).is_none() {
            return Err(ValidationError::DanglingColumnReference {
                relationship: rel_id.clone(),
                table: rel.to_table.clone(),
                column: rel.to_column.clone(),
            });
        }
    }

    for table_id in doc.layout.keys() {
        if !doc.tables.contains_key(table_id) {
            return Err(ValidationError::DanglingLayoutReference(table_id.clone()));
        }
    }

    Ok(())
}

/// Validate an untyped JSON document, in the order the rules are defined:
/// tables, columns, relationships, layout.
pub fn validate_value(doc: &Value) -> Result<(), ValidationError> {
    let result = check_value(doc);
    if let Err(e) = &result {
        tracing::debug!(error = %e, kind = e.kind(), "schema rejected");
    }
    result
}

/// An object, or an empty list standing in for an empty object.
fn mapping(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::Array(items) if items.is_empty() => Some(Map::new()),
        _ => None,
    }
}

/// `None` when the key is absent or null.
fn present<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn non_empty_str<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Render a JSON value for an error message: strings bare, anything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn column_exists(columns: &Map<String, Value>, reference: &str) -> bool {
    columns.contains_key(reference)
        || columns
            .values()
            .any(|c| c.get("name").and_then(Value::as_str) == Some(reference))
}

fn check_value(doc: &Value) -> Result<(), ValidationError> {
    let tables = present(doc, "tables")
        .and_then(mapping)
        .ok_or(ValidationError::MissingTables)?;

    let mut table_columns: Map<String, Value> = Map::new();

    for (table_id, table) in &tables {
        if non_empty_str(table, "name").is_none() {
            return Err(ValidationError::TableMissingName(table_id.clone()));
        }
        let columns = present(table, "columns")
            .and_then(mapping)
            .ok_or_else(|| ValidationError::TableMissingColumns(table_id.clone()))?;

        for (column_id, column) in &columns {
            if non_empty_str(column, "name").is_none() {
                return Err(ValidationError::ColumnMissingName {
                    table: table_id.clone(),
                    column: column_id.clone(),
                });
            }
            if non_empty_str(column, "type").is_none() {
                return Err(ValidationError::ColumnMissingType {
                    table: table_id.clone(),
                    column: column_id.clone(),
                });
            }
            if let Some(attrs) = column.as_object() {
                if let Some(property) = attrs
                    .keys()
                    .find(|k| !COLUMN_PROPERTIES.contains(&k.as_str()))
                {
                    return Err(ValidationError::InvalidColumnProperty {
                        table: table_id.clone(),
                        column: column_id.clone(),
                        property: property.clone(),
                    });
                }
            }
        }

        table_columns.insert(table_id.clone(), Value::Object(columns));
    }

    if let Some(relationships) = present(doc, "relationships") {
        let relationships =
            mapping(relationships).ok_or(ValidationError::InvalidSection("relationships"))?;
        for (rel_id, rel) in &relationships {
            check_relationship_value(rel_id, rel, &table_columns)?;
        }
    }

    if let Some(layout) = present(doc, "layout") {
        let layout = mapping(layout).ok_or(ValidationError::InvalidSection("layout"))?;
        for (table_id, position) in &layout {
            if !tables.contains_key(table_id) {
                return Err(ValidationError::DanglingLayoutReference(table_id.clone()));
            }
            for axis in ["x", "y"] {
                if !position.get(axis).is_some_and(Value::is_number) {
                    return Err(ValidationError::InvalidPosition {
                        table: table_id.clone(),
                        axis,
                    });
                }
            }
        }
    }

    Ok(())
}

fn check_relationship_value(
    rel_id: &str,
    rel: &Value,
    table_columns: &Map<String, Value>,
) -> Result<(), ValidationError> {
    for field in RELATIONSHIP_FIELDS {
        if present(rel, field).is_none() {
            return Err(ValidationError::RelationshipMissingField {
                relationship: rel_id.to_string(),
                field,
            });
        }
    }

    // Fields are known to be present from here on
    let field = |name: &str| rel.get(name).map(display_value).unwrap_or_default();

    let typ = rel.get("type").and_then(Value::as_str);
    if !typ.is_some_and(|t| t.parse::<RelationshipType>().is_ok()) {
        return Err(ValidationError::InvalidRelationshipType {
            relationship: rel_id.to_string(),
            typ: field("type"),
        });
    }

    let lookup = |table_key: &str| {
        let table = field(table_key);
        let columns = rel
            .get(table_key)
            .and_then(Value::as_str)
            .and_then(|t| table_columns.get(t))
            .and_then(Value::as_object);
        match columns {
            Some(columns) => Ok((table, columns)),
            None => Err(ValidationError::DanglingTableReference {
                relationship: rel_id.to_string(),
                table,
            }),
        }
    };
    let (from_table, from_columns) = lookup("from_table")?;
    let (to_table, to_columns) = lookup("to_table")?;

    for (table, columns, column_key) in [
        (from_table, from_columns, "from_column"),
        (to_table, to_columns, "to_column"),
    ] {
        let found = rel
            .get(column_key)
            .and_then(Value::as_str)
            .is_some_and(|c| column_exists(columns, c));
        if !found {
            return Err(ValidationError::DanglingColumnReference {
                relationship: rel_id.to_string(),
                table,
                column: field(column_key),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users_posts() -> Value {
        json!({
            "tables": {
                "users": {
                    "name": "users",
                    "columns": {
                        "id": {"name": "id", "type": "bigint", "primary": true, "nullable": false},
                        "name": {"name": "name", "type": "varchar", "nullable": false}
                    }
                },
                "posts": {
                    "name": "posts",
                    "columns": {
                        "user_id": {"name": "user_id", "type": "bigint"}
                    }
                }
            },
            "relationships": {
                "user_posts": {
                    "type": "one-to-many",
                    "from_table": "users",
                    "from_column": "id",
                    "to_table": "posts",
                    "to_column": "user_id"
                }
            },
            "layout": {
                "users": {"x": 100, "y": 100}
            }
        })
    }

    #[test]
    fn test_validates_basic_schema() {
        assert_eq!(validate_value(&users_posts()), Ok(()));
    }

    #[test]
    fn test_rejects_schema_without_tables() {
        let doc = json!({"relationships": [], "layout": []});
        let err = validate_value(&doc).unwrap_err();
        assert_eq!(err, ValidationError::MissingTables);
        assert_eq!(err.to_string(), "Schema must contain a tables array");
    }

    #[test]
    fn test_rejects_table_without_name() {
        let doc = json!({"tables": {"invalid_table": {"columns": []}}});
        let err = validate_value(&doc).unwrap_err();
        assert_eq!(err.to_string(), "Table invalid_table must have a name");
    }

    #[test]
    fn test_rejects_table_without_columns() {
        let doc = json!({"tables": {"invalid_table": {"name": "invalid_table"}}});
        let err = validate_value(&doc).unwrap_err();
        assert_eq!(err.to_string(), "Table invalid_table must have a columns array");
    }

    #[test]
    fn test_rejects_column_without_type() {
        let doc = json!({"tables": {"t": {"name": "t", "columns": {"c": {"name": "c"}}}}});
        assert_eq!(
            validate_value(&doc),
            Err(ValidationError::ColumnMissingType {
                table: "t".into(),
                column: "c".into()
            })
        );
    }

    #[test]
    fn test_rejects_column_without_name() {
        let doc = json!({"tables": {"t": {"name": "t", "columns": {"c": {"type": "int"}}}}});
        let err = validate_value(&doc).unwrap_err();
        assert_eq!(
            err,
            ValidationError::ColumnMissingName {
                table: "t".into(),
                column: "c".into()
            }
        );
        assert_eq!(err.to_string(), "Column c in table t must have a name");

        let doc = json!({"tables": {"t": {"name": "t", "columns": {
            "c": {"name": "", "type": "int"}
        }}}});
        assert_eq!(validate_value(&doc).unwrap_err().kind(), "column_missing_name");
    }

    #[test]
    fn test_rejects_non_mapping_sections() {
        let mut doc = users_posts();
        doc["relationships"] = json!("user_posts");
        let err = validate_value(&doc).unwrap_err();
        assert_eq!(err, ValidationError::InvalidSection("relationships"));
        assert_eq!(err.to_string(), "Schema relationships must be a mapping");

        let mut doc = users_posts();
        doc["layout"] = json!([{"x": 1, "y": 2}]);
        assert_eq!(
            validate_value(&doc),
            Err(ValidationError::InvalidSection("layout"))
        );

        let mut doc = users_posts();
        doc["layout"] = json!(null);
        assert_eq!(validate_value(&doc), Ok(()));
    }

    #[test]
    fn test_rejects_unknown_column_property() {
        let doc = json!({"tables": {"t": {"name": "t", "columns": {
            "c": {"name": "x", "type": "int", "foo": "bar"}
        }}}});
        let err = validate_value(&doc).unwrap_err();
        assert_eq!(err.kind(), "invalid_column_property");
        assert_eq!(
            err.to_string(),
            "Invalid column property 'foo' in column c of table t"
        );
    }

    #[test]
    fn test_rejects_invalid_relationship_type() {
        let mut doc = users_posts();
        doc["relationships"]["user_posts"]["type"] = json!("invalid-type");
        let err = validate_value(&doc).unwrap_err();
        assert!(err.to_string().starts_with("Invalid relationship type"));

        doc["relationships"]["user_posts"]["type"] = json!("many-to-one");
        assert_eq!(validate_value(&doc).unwrap_err().kind(), "invalid_relationship_type");
    }

    #[test]
    fn test_rejects_missing_relationship_field() {
        let mut doc = users_posts();
        doc["relationships"]["user_posts"]
            .as_object_mut()
            .unwrap()
            .remove("to_column");
        assert_eq!(
            validate_value(&doc),
            Err(ValidationError::RelationshipMissingField {
                relationship: "user_posts".into(),
                field: "to_column"
            })
        );
    }

    #[test]
    fn test_rejects_dangling_references() {
        let mut doc = users_posts();
        doc["relationships"]["user_posts"]["from_table"] = json!("accounts");
        assert_eq!(
            validate_value(&doc),
            Err(ValidationError::DanglingTableReference {
                relationship: "user_posts".into(),
                table: "accounts".into()
            })
        );

        let mut doc = users_posts();
        doc["relationships"]["user_posts"]["to_column"] = json!("author_id");
        assert_eq!(validate_value(&doc).unwrap_err().kind(), "dangling_column_reference");
    }

    #[test]
    fn test_column_reference_by_name() {
        let doc = json!({
            "tables": {
                "users": {"name": "users", "columns": {
                    "col_id": {"name": "id", "type": "bigint"}
                }},
                "posts": {"name": "posts", "columns": {
                    "col_user_id": {"name": "user_id", "type": "bigint"}
                }}
            },
            "relationships": {"rel_1": {
                "type": "one-to-many",
                "from_table": "users", "from_column": "id",
                "to_table": "posts", "to_column": "col_user_id"
            }}
        });
        assert_eq!(validate_value(&doc), Ok(()));
    }

    #[test]
    fn test_rejects_bad_layout() {
        let mut doc = users_posts();
        doc["layout"]["ghost"] = json!({"x": 1, "y": 2});
        assert_eq!(
            validate_value(&doc),
            Err(ValidationError::DanglingLayoutReference("ghost".into()))
        );

        let mut doc = users_posts();
        doc["layout"]["users"] = json!({"x": "left", "y": 2});
        assert_eq!(
            validate_value(&doc),
            Err(ValidationError::InvalidPosition {
                table: "users".into(),
                axis: "x"
            })
        );
    }

    #[test]
    fn test_typed_validation_matches_value_validation() {
        let value = users_posts();
        let doc: SchemaDocument = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(validate(&doc), Ok(()));

        let mut broken = doc.clone();
        broken.relationships["user_posts"].to_table = "comments".into();
        assert_eq!(
            validate(&broken),
            Err(ValidationError::DanglingTableReference {
                relationship: "user_posts".into(),
                table: "comments".into()
            })
        );

        let mut untyped = doc.clone();
        untyped.tables["users"].columns["name"].typ.clear();
        assert_eq!(validate(&untyped).unwrap_err().kind(), "column_missing_type");

        let mut unnamed = doc.clone();
        unnamed.tables["posts"].columns["user_id"].name.clear();
        assert_eq!(
            validate(&unnamed),
            Err(ValidationError::ColumnMissingName {
                table: "posts".into(),
                column: "user_id".into()
            })
        );

        let mut nameless_table = doc;
        nameless_table.tables["posts"].name.clear();
        assert_eq!(
            validate(&nameless_table),
            Err(ValidationError::TableMissingName("posts".into()))
        );
    }
}
