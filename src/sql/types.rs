//! Column type vocabulary understood by the designer.

/// Broad grouping of a column type, used for display and import warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Text,
    Numeric,
    Temporal,
    Boolean,
    /// Known to the designer but without a dedicated family (json, enum, ...)
    Other,
}

impl TypeFamily {
    /// Classify a lowercase type token. `None` means the designer does not
    /// know the type; it is still stored as-is.
    pub fn of(typ: &str) -> Option<Self> {
        let family = match typ {
            // Text
            "varchar" | "char" | "text" | "mediumtext" | "longtext" | "tinytext"
            | "character" | "nvarchar" | "nchar" | "string" => Self::Text,

            // Numeric
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "serial"
            | "bigserial" | "smallserial" | "decimal" | "numeric" | "float" | "double"
            | "real" => Self::Numeric,

            // Date/time
            "date" | "datetime" | "timestamp" | "timestamptz" | "time" | "year" => {
                Self::Temporal
            }

            // Boolean
            "boolean" | "bool" | "bit" => Self::Boolean,

            // Everything else the designer offers
            "json" | "jsonb" | "binary" | "varbinary" | "blob" | "uuid" | "enum" | "set" => {
                Self::Other
            }

            _ => return None,
        };
        Some(family)
    }
}

pub fn is_known_type(typ: &str) -> bool {
    TypeFamily::of(typ).is_some()
}
