//! SQL DDL to schema document conversion.

mod lexer;
mod parser;
mod types;

pub use parser::{ImportReport, ImportWarning, import_ddl};
pub use types::{TypeFamily, is_known_type};
