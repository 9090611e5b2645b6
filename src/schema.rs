//! Schema document model.
//!
//! This is the JSON shape the designer stores and exchanges. Maps keep their
//! insertion order so a document serializes back the way it was read.

use indexmap::IndexMap;
use serde::de;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub type TableId = String;
pub type ColumnId = String;
pub type RelationshipId = String;

/// Column attributes a document may carry, in the order a new column
/// writes them. Anything else is rejected.
pub const COLUMN_PROPERTIES: [&str; 11] = [
    "name",
    "type",
    "nullable",
    "primary",
    "unique",
    "index",
    "length",
    "default",
    "precision",
    "scale",
    "unsigned",
];

/// Fields every relationship must define.
pub const RELATIONSHIP_FIELDS: [&str; 5] =
    ["type", "from_table", "from_column", "to_table", "to_column"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(deserialize_with = "map_or_empty_list")]
    pub tables: IndexMap<TableId, Table>,
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub relationships: IndexMap<RelationshipId, Relationship>,
    #[serde(default, deserialize_with = "map_or_empty_list")]
    pub layout: IndexMap<TableId, Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(deserialize_with = "map_or_empty_list")]
    pub columns: IndexMap<ColumnId, Column>,
}

/// A table column.
///
/// Attributes are written back in the order the document listed them, and a
/// listed attribute without a value is written as `null`. Attributes set
/// later go after the listed ones.
#[derive(Debug, Clone, Default)]
pub struct Column {
    pub name: String,
    pub typ: String,
    pub nullable: Option<bool>,
    pub primary: Option<bool>,
    pub unique: Option<bool>,
    pub index: Option<bool>,
    pub length: Option<u32>,
    pub default: Option<DefaultValue>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unsigned: Option<bool>,
    attribute_order: Vec<&'static str>,
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.typ == other.typ
            && self.nullable == other.nullable
            && self.primary == other.primary
            && self.unique == other.unique
            && self.index == other.index
            && self.length == other.length
            && self.default == other.default
            && self.precision == other.precision
            && self.scale == other.scale
            && self.unsigned == other.unsigned
    }
}

impl Column {
    pub fn new(name: impl Into<String>, typ: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            typ: typ.into(),
            ..Self::default()
        }
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(true)
    }

    pub fn is_primary(&self) -> bool {
        self.primary.unwrap_or(false)
    }

    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    /// Attribute names in the order they are serialized.
    pub fn attribute_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        let listed = self.attribute_order.iter().copied();
        let added = COLUMN_PROPERTIES
            .into_iter()
            .filter(|key| !self.attribute_order.contains(key) && !self.attribute(key).is_null());
        listed.chain(added)
    }

    fn read_attribute(&mut self, key: &'static str, value: Value) -> serde_json::Result<()> {
        match key {
            "name" => self.name = String::deserialize(value)?,
            "type" => self.typ = String::deserialize(value)?,
            "nullable" => self.nullable = Option::deserialize(value)?,
            "primary" => self.primary = Option::deserialize(value)?,
            "unique" => self.unique = Option::deserialize(value)?,
            "index" => self.index = Option::deserialize(value)?,
            "length" => self.length = Option::deserialize(value)?,
            "default" => self.default = Option::deserialize(value)?,
            "precision" => self.precision = Option::deserialize(value)?,
            "scale" => self.scale = Option::deserialize(value)?,
            _ => self.unsigned = Option::deserialize(value)?,
        }
        self.attribute_order.push(key);
        Ok(())
    }

    /// JSON value of one attribute; `null` when unset or unknown.
    pub fn attribute(&self, key: &str) -> Value {
        match key {
            "name" => Value::from(self.name.as_str()),
            "type" => Value::from(self.typ.as_str()),
            "nullable" => Value::from(self.nullable),
            "primary" => Value::from(self.primary),
            "unique" => Value::from(self.unique),
            "index" => Value::from(self.index),
            "length" => Value::from(self.length),
            "default" => Value::from(self.default.clone()),
            "precision" => Value::from(self.precision),
            "scale" => Value::from(self.scale),
            "unsigned" => Value::from(self.unsigned),
            _ => Value::Null,
        }
    }
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for key in self.attribute_names() {
            map.serialize_entry(key, &self.attribute(key))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Column {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let attrs = Map::<String, Value>::deserialize(deserializer)?;
        let mut column = Column::default();

        for (key, value) in attrs {
            let Some(known) = COLUMN_PROPERTIES.into_iter().find(|p| *p == key) else {
                return Err(de::Error::unknown_field(&key, &COLUMN_PROPERTIES));
            };
            column
                .read_attribute(known, value)
                .map_err(<D::Error as de::Error>::custom)?;
        }

        for required in ["name", "type"] {
            if !column.attribute_order.contains(&required) {
                return Err(de::Error::missing_field(required));
            }
        }
        Ok(column)
    }
}

/// A column default as it appears in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Text(String),
    Number(serde_json::Number),
    Bool(bool),
}

impl From<DefaultValue> for Value {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::Text(s) => Value::String(s),
            DefaultValue::Number(n) => Value::Number(n),
            DefaultValue::Bool(b) => Value::Bool(b),
        }
    }
}

impl fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Text(s) => f.write_str(s),
            DefaultValue::Number(n) => write!(f, "{}", n),
            DefaultValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub typ: RelationshipType,
    pub from_table: TableId,
    pub from_column: ColumnId,
    pub to_table: TableId,
    pub to_column: ColumnId,
}

impl Relationship {
    pub fn one_to_many(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            typ: RelationshipType::OneToMany,
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }
}

/// Relationship cardinality. `many-to-one` is deliberately not a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipType {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl RelationshipType {
    pub const ALL: [RelationshipType; 3] = [
        RelationshipType::OneToOne,
        RelationshipType::OneToMany,
        RelationshipType::ManyToMany,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RelationshipType::OneToOne => "one-to-one",
            RelationshipType::OneToMany => "one-to-many",
            RelationshipType::ManyToMany => "many-to-many",
        }
    }

}

impl FromStr for RelationshipType {
    type Err = UnknownRelationshipType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownRelationshipType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown relationship type '{0}'")]
pub struct UnknownRelationshipType(pub String);

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas position of a table. Numbers keep their JSON representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: serde_json::Number,
    pub y: serde_json::Number,
}

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
        }
    }

    /// Resolve a relationship column reference. The column identifier wins;
    /// otherwise the first column whose `name` matches.
    pub fn resolve_column(&self, reference: &str) -> Option<(&ColumnId, &Column)> {
        self.columns
            .get_key_value(reference)
            .or_else(|| self.columns.iter().find(|(_, c)| c.name == reference))
    }
}

impl SchemaDocument {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }

    /// Identifier of the first table with the given display name.
    pub fn table_id_by_name(&self, name: &str) -> Option<&TableId> {
        self.tables
            .iter()
            .find(|(_, t)| t.name == name)
            .map(|(id, _)| id)
    }
}

/// Accept either a JSON object or an empty JSON array as an empty map.
/// PHP-era documents encode empty maps as `[]`.
fn map_or_empty_list<'de, D, V>(deserializer: D) -> Result<IndexMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList<V> {
        Map(IndexMap<String, V>),
        List(Vec<serde::de::IgnoredAny>),
    }

    match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(map) => Ok(map),
        MapOrList::List(items) if items.is_empty() => Ok(IndexMap::new()),
        MapOrList::List(_) => Err(serde::de::Error::custom(
            "expected a mapping, found a non-empty list",
        )),
    }
}
