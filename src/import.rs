//! Uploaded file import: format detection, parsing and the validation gate.

use crate::config::ImportOptions;
use crate::schema::SchemaDocument;
use crate::sql::{ImportWarning, import_ddl};
use crate::validate::{ValidationError, validate, validate_value};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid JSON file: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("Malformed schema document: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("Cannot detect file format")]
    UnknownFormat,
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Sql,
}

impl InputFormat {
    /// Pick the format from the file extension, falling back to the content.
    pub fn detect(file_name: Option<&str>, content: &str) -> Result<Self, ImportError> {
        let extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("json") => return Ok(Self::Json),
            Some("sql") => return Ok(Self::Sql),
            Some("xml") => return Err(ImportError::UnsupportedFormat("xml".to_string())),
            _ => {}
        }

        if serde_json::from_str::<serde_json::Value>(content).is_ok() {
            Ok(Self::Json)
        } else if content.to_uppercase().contains("CREATE TABLE") {
            Ok(Self::Sql)
        } else {
            Err(ImportError::UnknownFormat)
        }
    }
}

/// A validated document ready for storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    /// Display name: the caller's choice, else the file stem.
    pub name: String,
    pub format: InputFormat,
    pub document: SchemaDocument,
    pub warnings: Vec<ImportWarning>,
}

/// Parse and validate a JSON schema document.
pub fn parse_document(input: &str) -> Result<SchemaDocument, ImportError> {
    let value: serde_json::Value =
        serde_json::from_str(input).map_err(ImportError::InvalidJson)?;
    validate_value(&value)?;
    let document = serde_json::from_value(value).map_err(ImportError::Malformed)?;
    Ok(document)
}

/// Import an uploaded file. The document is rejected as a whole when it
/// fails validation.
pub fn import_file(
    file_name: Option<&str>,
    name: Option<&str>,
    content: &str,
    options: &ImportOptions,
) -> Result<ImportOutcome, ImportError> {
    let format = InputFormat::detect(file_name, content)?;
    tracing::debug!(?format, file = file_name.unwrap_or("-"), "importing schema");

    let (document, warnings) = match format {
        InputFormat::Json => (parse_document(content)?, Vec::new()),
        InputFormat::Sql => {
            let report = import_ddl(content, options);
            validate(&report.document)?;
            (report.document, report.warnings)
        }
    };

    let name = name
        .map(str::to_string)
        .or_else(|| {
            file_name
                .and_then(|f| Path::new(f).file_stem())
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "Untitled".to_string());

    tracing::info!(
        %name,
        tables = document.tables.len(),
        relationships = document.relationships.len(),
        warnings = warnings.len(),
        "schema imported"
    );

    Ok(ImportOutcome {
        name,
        format,
        document,
        warnings,
    })
}

/// Read a file from disk and import it, using its file name for format
/// detection and the default schema name.
pub fn import_path(
    path: &Path,
    name: Option<&str>,
    options: &ImportOptions,
) -> Result<ImportOutcome, ImportError> {
    let content = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file_name = path.file_name().and_then(|f| f.to_str());
    import_file(file_name, name, &content, options)
}
