//! Foreign-key suggestions from column naming (`<word>_id` → `<word>(s).id`).

use crate::schema::{ColumnId, Relationship, RelationshipId, SchemaDocument, TableId};
use serde::Serialize;
use std::collections::HashSet;

/// A relationship the designer may offer to add. Not validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipSuggestion {
    /// Proposed identifier, `fk_<table>_<column>`.
    pub id: RelationshipId,
    pub relationship: Relationship,
}

/// Endpoints normalized to (table id, column id) pairs.
type Link = ((TableId, String), (TableId, String));

pub fn detect_foreign_keys(doc: &SchemaDocument) -> Vec<RelationshipSuggestion> {
    let mut known: HashSet<Link> = doc
        .relationships
        .values()
        .filter_map(|rel| resolve_link(doc, rel))
        .collect();

    let mut suggestions = Vec::new();

    for (table_id, table) in &doc.tables {
        for (column_id, column) in &table.columns {
            let Some(word) = column.name.strip_suffix("_id") else {
                continue;
            };
            if word.is_empty() {
                continue;
            }

            let Some((target_id, id_column)) = referenced_id(doc, word) else {
                continue;
            };

            let from = (target_id.clone(), id_column.clone());
            let to = (table_id.clone(), column_id.clone());
            let reversed = (to.clone(), from.clone());
            if known.contains(&(from.clone(), to.clone())) || known.contains(&reversed) {
                continue;
            }

            tracing::debug!(
                from = %format!("{}.{}", target_id, id_column),
                to = %format!("{}.{}", table_id, column_id),
                "foreign key suggestion"
            );

            suggestions.push(RelationshipSuggestion {
                id: format!("fk_{}_{}", table_id, column.name),
                relationship: Relationship::one_to_many(
                    target_id.clone(),
                    id_column.clone(),
                    table_id.clone(),
                    column_id.clone(),
                ),
            });
            known.insert((from, to));
        }
    }

    suggestions
}

/// The `id` column of the table named `word`, else of `<word>s`.
fn referenced_id<'a>(doc: &'a SchemaDocument, word: &str) -> Option<(&'a TableId, &'a ColumnId)> {
    let plural = format!("{}s", word);
    [word, plural.as_str()].into_iter().find_map(|candidate| {
        let target_id = doc.table_id_by_name(candidate)?;
        let (id_column, _) = doc.tables[target_id]
            .columns
            .iter()
            .find(|(_, c)| c.name == "id")?;
        Some((target_id, id_column))
    })
}

/// Resolve a relationship's endpoints to identifiers, if they exist.
fn resolve_link(doc: &SchemaDocument, rel: &Relationship) -> Option<Link> {
    let (from_column, _) = doc.tables.get(&rel.from_table)?.resolve_column(&rel.from_column)?;
    let (to_column, _) = doc.tables.get(&rel.to_table)?.resolve_column(&rel.to_column)?;
    Some((
        (rel.from_table.clone(), from_column.clone()),
        (rel.to_table.clone(), to_column.clone()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, RelationshipType, Table};
    use crate::validate::validate;

    fn table(name: &str, columns: &[&str]) -> Table {
        let mut t = Table::new(name);
        for c in columns {
            t.columns.insert(format!("col_{}", c), Column::new(*c, "bigint"));
        }
        t
    }

    fn doc(tables: Vec<Table>) -> SchemaDocument {
        let mut doc = SchemaDocument::default();
        for t in tables {
            doc.tables.insert(t.name.clone(), t);
        }
        doc
    }

    #[test]
    fn test_plural_table_match() {
        let doc = doc(vec![
            table("users", &["id", "email"]),
            table("posts", &["id", "user_id"]),
        ]);

        let suggestions = detect_foreign_keys(&doc);
        assert_eq!(suggestions.len(), 1);

        let s = &suggestions[0];
        assert_eq!(s.id, "fk_posts_user_id");
        assert_eq!(s.relationship.typ, RelationshipType::OneToMany);
        assert_eq!(s.relationship.from_table, "users");
        assert_eq!(s.relationship.from_column, "col_id");
        assert_eq!(s.relationship.to_table, "posts");
        assert_eq!(s.relationship.to_column, "col_user_id");
    }

    #[test]
    fn test_singular_table_preferred() {
        let doc = doc(vec![
            table("person", &["id"]),
            table("persons", &["id"]),
            table("pets", &["id", "person_id"]),
        ]);

        let suggestions = detect_foreign_keys(&doc);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].relationship.from_table, "person");
    }

    #[test]
    fn test_skips_plain_id_and_tables_without_id() {
        let doc = doc(vec![
            table("users", &["uuid"]),
            table("posts", &["id", "user_id", "_id"]),
        ]);
        assert!(detect_foreign_keys(&doc).is_empty());
    }

    #[test]
    fn test_existing_relationship_in_either_direction() {
        let mut d = doc(vec![
            table("users", &["id"]),
            table("posts", &["id", "user_id"]),
        ]);
        // Reversed and referenced by column name
        d.relationships.insert(
            "rel_1".into(),
            Relationship::one_to_many("posts", "user_id", "users", "id"),
        );
        assert!(detect_foreign_keys(&d).is_empty());
    }

    #[test]
    fn test_suggestions_validate_once_applied() {
        let mut d = doc(vec![
            table("teams", &["id"]),
            table("users", &["id", "team_id"]),
            table("posts", &["id", "user_id", "team_id"]),
        ]);

        let suggestions = detect_foreign_keys(&d);
        assert_eq!(suggestions.len(), 3);
        for s in suggestions {
            d.relationships.insert(s.id, s.relationship);
        }
        assert_eq!(validate(&d), Ok(()));
        assert!(detect_foreign_keys(&d).is_empty());
    }
}
