use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use vischema::{
    ImportError, ImportOptions, InputFormat, Position, RelationshipType, SchemaDocument,
    ValidationError, import_ddl, import_path, parse_document, validate, validate_value,
};

const USERS_POSTS: &str = r#"
CREATE TABLE users (id BIGINT PRIMARY KEY, name VARCHAR(255) NOT NULL);
CREATE TABLE posts (
    id BIGINT PRIMARY KEY,
    user_id BIGINT,
    FOREIGN KEY (user_id) REFERENCES users(id)
);
"#;

fn import(sql: &str) -> SchemaDocument {
    import_ddl(sql, &ImportOptions::default()).document
}

#[test]
fn users_posts_scenario() {
    let doc = import(USERS_POSTS);

    assert_eq!(doc.tables.keys().collect::<Vec<_>>(), vec!["users", "posts"]);

    let name = &doc.tables["users"].columns["col_name"];
    assert_eq!(name.length, Some(255));
    assert_eq!(name.nullable, Some(false));

    let user_id = &doc.tables["posts"].columns["col_user_id"];
    assert_eq!(user_id.name, "user_id");
    assert_eq!(user_id.typ, "bigint");
    assert_eq!(user_id.nullable, Some(true));
    assert_eq!(user_id.primary, Some(false));

    assert_eq!(doc.relationships.len(), 1);
    let rel = doc.relationships.values().next().unwrap();
    assert_eq!(rel.typ, RelationshipType::OneToMany);
    assert_eq!(rel.from_table, "users");
    assert_eq!(rel.from_column, "id");
    assert_eq!(rel.to_table, "posts");
    assert_eq!(rel.to_column, "user_id");

    assert_eq!(doc.layout["users"], Position::new(100, 100));
    assert_eq!(doc.layout["posts"], Position::new(350, 100));

    assert_eq!(validate(&doc), Ok(()));
}

#[test]
fn imported_document_survives_json_round_trip() {
    let doc = import(USERS_POSTS);
    let json = doc.to_json(true).unwrap();

    let reparsed = parse_document(&json).unwrap();
    assert_eq!(reparsed, doc);
    assert_eq!(reparsed.to_json(true).unwrap(), json);
}

#[test]
fn empty_input_is_an_empty_valid_document() {
    let report = import_ddl("", &ImportOptions::default());
    assert!(report.warnings.is_empty());

    let doc = report.document;
    assert!(doc.tables.is_empty());
    assert!(doc.relationships.is_empty());
    assert!(doc.layout.is_empty());
    assert_eq!(validate(&doc), Ok(()));
    assert_eq!(doc.to_json(false).unwrap(), r#"{"tables":{},"relationships":{},"layout":{}}"#);
}

#[test]
fn garbage_input_never_fails_import() {
    for sql in ["SELECT 1;", "CREATE TABLE", "CREATE TABLE t (", ");;((", "/* unterminated"] {
        let doc = import(sql);
        assert!(doc.tables.is_empty(), "{sql}");
        assert_eq!(validate(&doc), Ok(()));
    }
}

#[test]
fn validation_is_idempotent() {
    let doc = json!({
        "tables": {"t": {"name": "t", "columns": {"c": {"name": "c", "type": "int"}}}},
        "layout": {"missing": {"x": 0, "y": 0}}
    });

    let first = validate_value(&doc).unwrap_err();
    let second = validate_value(&doc).unwrap_err();
    assert_eq!(first, second);
    assert_eq!(first.kind(), second.kind());
}

#[test]
fn extra_column_property_is_always_rejected() {
    for extra in [json!("bar"), json!(null), json!(true), json!({"nested": 1})] {
        let doc = json!({
            "tables": {"t": {"name": "t", "columns": {
                "c": {"name": "x", "type": "int", "nullable": false, "foo": extra}
            }}}
        });
        assert_eq!(
            validate_value(&doc),
            Err(ValidationError::InvalidColumnProperty {
                table: "t".into(),
                column: "c".into(),
                property: "foo".into(),
            })
        );
    }
}

#[test]
fn many_to_one_is_not_a_stored_relationship_type() {
    let doc = json!({
        "tables": {
            "a": {"name": "a", "columns": {"id": {"name": "id", "type": "int"}}},
            "b": {"name": "b", "columns": {"a_id": {"name": "a_id", "type": "int"}}}
        },
        "relationships": {"r": {
            "type": "many-to-one",
            "from_table": "b", "from_column": "a_id",
            "to_table": "a", "to_column": "id"
        }}
    });

    let err = parse_document(&doc.to_string()).unwrap_err();
    let ImportError::Validation(ValidationError::InvalidRelationshipType { typ, .. }) = err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(typ, "many-to-one");
}

#[test]
fn dangling_layout_entry_rejected_among_valid_ones() {
    let mut doc = import(USERS_POSTS);
    assert_eq!(validate(&doc), Ok(()));

    doc.layout.insert("comments".into(), Position::new(600, 100));
    assert_eq!(
        validate(&doc),
        Err(ValidationError::DanglingLayoutReference("comments".into()))
    );
}

#[test]
fn dangling_column_reference_rejected() {
    let mut doc = import(USERS_POSTS);
    doc.relationships[0].to_column = "author_id".into();

    assert_eq!(
        validate(&doc),
        Err(ValidationError::DanglingColumnReference {
            relationship: "rel_1".into(),
            table: "posts".into(),
            column: "author_id".into(),
        })
    );
}

#[test]
fn php_style_empty_arrays_are_accepted() {
    let json = json!({
        "tables": {"users": {"name": "users", "columns": []}},
        "relationships": [],
        "layout": []
    });
    let doc = parse_document(&json.to_string()).unwrap();
    assert_eq!(doc.tables["users"].columns.len(), 0);
}

#[test]
fn import_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".sql").tempfile().unwrap();
    file.write_all(USERS_POSTS.as_bytes()).unwrap();

    let outcome = import_path(file.path(), Some("blog"), &ImportOptions::default()).unwrap();
    assert_eq!(outcome.name, "blog");
    assert_eq!(outcome.format, InputFormat::Sql);
    assert_eq!(outcome.document, import(USERS_POSTS));

    let missing = file.path().with_extension("nope");
    assert!(matches!(
        import_path(&missing, None, &ImportOptions::default()),
        Err(ImportError::Io { .. })
    ));
}

#[test]
fn designer_documents_round_trip_byte_for_byte() {
    let json = concat!(
        r#"{"tables":{"users":{"name":"users","columns":{"#,
        r#""id":{"name":"id","type":"bigint","primary":true,"nullable":false},"#,
        r#""email":{"name":"email","type":"varchar","nullable":true,"length":255,"#,
        r#""primary":false,"unique":true,"default":null}}}},"#,
        r#""relationships":{},"layout":{"users":{"x":100,"y":100}}}"#,
    );

    let doc = parse_document(json).unwrap();
    assert_eq!(doc.tables["users"].columns["email"].default, None);
    assert_eq!(doc.to_json(false).unwrap(), json);
}
