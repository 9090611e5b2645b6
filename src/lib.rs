pub mod config;
pub mod import;
pub mod logging;
pub mod schema;
pub mod sql;
pub mod suggest;
pub mod validate;

use wasm_bindgen::prelude::*;

pub use config::{ImportOptions, LayoutGrid};
pub use import::{
    ImportError, ImportOutcome, InputFormat, import_file, import_path, parse_document,
};
pub use schema::{Column, Position, Relationship, RelationshipType, SchemaDocument, Table};
pub use sql::{ImportReport, ImportWarning, import_ddl};
pub use suggest::{RelationshipSuggestion, detect_foreign_keys};
pub use validate::{ValidationError, validate, validate_value};

/// Initialize panic hook for better error messages in WASM
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

/// Import a `CREATE TABLE` script into a schema document (JSON).
#[wasm_bindgen(js_name = "importFromDdl")]
pub fn import_from_ddl(sql: &str) -> Result<String, String> {
    let report = import_ddl(sql, &ImportOptions::default());
    report.document.to_json(false).map_err(|e| e.to_string())
}

/// Validate a schema document (JSON). The error is the message to show.
#[wasm_bindgen(js_name = "validateSchema")]
pub fn validate_schema(json: &str) -> Result<(), String> {
    parse_document(json).map(|_| ()).map_err(|e| e.to_string())
}

/// Foreign-key suggestions for a schema document, as a JSON array.
#[wasm_bindgen(js_name = "detectForeignKeys")]
pub fn detect_foreign_keys_json(json: &str) -> Result<String, String> {
    let doc = SchemaDocument::from_json(json).map_err(|e| e.to_string())?;
    serde_json::to_string(&detect_foreign_keys(&doc)).map_err(|e| e.to_string())
}

/// Relationship types a document may store, for UI dropdowns.
#[wasm_bindgen(js_name = "relationshipTypes")]
pub fn relationship_types() -> js_sys::Array {
    RelationshipType::ALL
        .iter()
        .map(|t| JsValue::from_str(t.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_from_ddl_json() {
        let json = import_from_ddl("CREATE TABLE users (id INT PRIMARY KEY);").unwrap();
        assert!(validate_schema(&json).is_ok());
        assert!(json.starts_with(r#"{"tables":{"users":{"name":"users","columns":{"col_id":"#));
    }

    #[test]
    fn test_validate_schema_message() {
        let err = validate_schema(r#"{"relationships": {}}"#).unwrap_err();
        assert_eq!(err, "Schema must contain a tables array");
    }

    #[test]
    fn test_detect_foreign_keys_json() {
        let json = import_from_ddl(
            "CREATE TABLE users (id INT); CREATE TABLE posts (id INT, user_id INT);",
        )
        .unwrap();
        let out = detect_foreign_keys_json(&json).unwrap();
        let suggestions: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(suggestions[0]["id"], "fk_posts_user_id");
        assert_eq!(suggestions[0]["relationship"]["type"], "one-to-many");
    }
}
