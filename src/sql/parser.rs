//! `CREATE TABLE` importer.
//!
//! Lenient by construction: anything that does not look like a table
//! definition is skipped and reported as an [`ImportWarning`], never as an
//! error.

use super::lexer::{Lexer, Token};
use super::types::is_known_type;
use crate::config::ImportOptions;
use crate::schema::{Column, DefaultValue, Position, Relationship, SchemaDocument, Table};
use std::fmt;

/// Result of a DDL import: the best-effort document plus what was skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub document: SchemaDocument,
    pub warnings: Vec<ImportWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportWarning {
    /// `CREATE TABLE` without a usable name or column list.
    MalformedStatement { near: String },
    /// A body line that is neither a column nor a constraint.
    SkippedLine { table: String, line: String },
    CompositeForeignKey { table: String, columns: Vec<String> },
    /// `FOREIGN KEY` without a full column list or referenced table.
    IncompleteForeignKey { table: String, constraint: String },
    UnknownType { table: String, column: String, typ: String },
    DuplicateTable { table: String },
    UnknownReferencedTable { table: String, referenced: String },
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::MalformedStatement { near } => {
                write!(f, "skipped malformed CREATE TABLE statement near '{}'", near)
            }
            ImportWarning::SkippedLine { table, line } => {
                write!(f, "skipped unrecognized line in table {}: {}", table, line)
            }
            ImportWarning::CompositeForeignKey { table, columns } => write!(
                f,
                "composite foreign key ({}) in table {} was not imported",
                columns.join(", "),
                table
            ),
            ImportWarning::IncompleteForeignKey { table, constraint } => write!(
                f,
                "incomplete foreign key in table {} was not imported: {}",
                table, constraint
            ),
            ImportWarning::UnknownType { table, column, typ } => {
                write!(f, "column {}.{} has unknown type '{}'", table, column, typ)
            }
            ImportWarning::DuplicateTable { table } => {
                write!(f, "table {} is defined more than once; the last definition wins", table)
            }
            ImportWarning::UnknownReferencedTable { table, referenced } => write!(
                f,
                "table {} references {}, which is not defined in the script",
                table, referenced
            ),
        }
    }
}

/// Import a SQL script of `CREATE TABLE` statements. Never fails.
pub fn import_ddl(input: &str, options: &ImportOptions) -> ImportReport {
    let tokens = Lexer::new(input).tokenize();
    let mut parser = Parser::new(tokens);
    let defs = parser.parse();
    assemble(defs, parser.warnings, options)
}

/// A parsed `CREATE TABLE` before it is placed into a document.
struct TableDef {
    name: String,
    columns: Vec<Column>,
    foreign_keys: Vec<FkInfo>,
}

struct FkInfo {
    column: String,
    target: String,
    target_column: String,
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    warnings: Vec<ImportWarning>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            warnings: Vec::new(),
        }
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn parse(&mut self) -> Vec<TableDef> {
        let mut tables = Vec::new();

        while self.current() != &Token::Eof {
            if self.current() != &Token::Create {
                self.advance();
                continue;
            }
            self.advance();

            if self.current() != &Token::Table {
                // CREATE INDEX, CREATE VIEW, ...
                self.skip_statement();
                continue;
            }
            self.advance();

            if self.current() == &Token::If {
                self.advance(); // IF
                if self.current() == &Token::Not {
                    self.advance();
                }
                if self.current() == &Token::Exists {
                    self.advance();
                }
            }

            if let Some(table) = self.parse_create_table() {
                tables.push(table);
            }
        }

        tables
    }

    fn parse_create_table(&mut self) -> Option<TableDef> {
        let Some(mut name) = self.take_ident() else {
            self.malformed();
            return None;
        };

        // schema.table keeps the table part
        while self.current() == &Token::Dot {
            self.advance();
            match self.take_ident() {
                Some(part) => name = part,
                None => {
                    self.malformed();
                    return None;
                }
            }
        }

        if self.current() != &Token::LParen {
            self.malformed();
            return None;
        }
        self.advance();

        let Some(lines) = self.split_body() else {
            self.warnings.push(ImportWarning::MalformedStatement { near: name });
            return None;
        };

        self.skip_table_options();

        let mut columns = Vec::new();
        let mut foreign_keys = Vec::new();

        for line in lines {
            let Some(first) = line.first() else {
                continue;
            };

            if first.starts_constraint() {
                if let Some(fk) = self.parse_foreign_key(&name, &line) {
                    foreign_keys.push(fk);
                }
            } else if let Some(column) = parse_column(&line) {
                if !is_known_type(&column.typ) {
                    self.warnings.push(ImportWarning::UnknownType {
                        table: name.clone(),
                        column: column.name.clone(),
                        typ: column.typ.clone(),
                    });
                }
                columns.push(column);
            } else {
                self.warnings.push(ImportWarning::SkippedLine {
                    table: name.clone(),
                    line: join_tokens(&line),
                });
            }
        }

        Some(TableDef {
            name,
            columns,
            foreign_keys,
        })
    }

    /// Split the table body on top-level commas, consuming the closing
    /// parenthesis. Commas inside `decimal(10,2)` or `enum('a','b')` stay
    /// within their line. Returns `None` when the input ends first.
    fn split_body(&mut self) -> Option<Vec<Vec<Token>>> {
        let mut lines = Vec::new();
        let mut line = Vec::new();
        let mut depth = 0usize;

        loop {
            let tok = self.current().clone();
            match tok {
                Token::Eof => return None,
                Token::RParen if depth == 0 => {
                    self.advance();
                    break;
                }
                Token::Comma if depth == 0 => {
                    lines.push(std::mem::take(&mut line));
                }
                Token::LParen => {
                    depth += 1;
                    line.push(tok);
                }
                Token::RParen => {
                    depth -= 1;
                    line.push(tok);
                }
                _ => line.push(tok),
            }
            self.advance();
        }

        lines.push(line);
        Some(lines)
    }

    /// `[CONSTRAINT name] FOREIGN KEY (col) REFERENCES table (col)`; other
    /// constraint lines yield nothing.
    fn parse_foreign_key(&mut self, table: &str, line: &[Token]) -> Option<FkInfo> {
        let start = line
            .windows(2)
            .position(|w| w[0] == Token::Foreign && w[1] == Token::Key)?;

        let Some((columns, target, target_columns)) = foreign_key_parts(&line[start + 2..]) else {
            self.warnings.push(ImportWarning::IncompleteForeignKey {
                table: table.to_string(),
                constraint: join_tokens(line),
            });
            return None;
        };

        if columns.len() != 1 || target_columns.len() != 1 {
            self.warnings.push(ImportWarning::CompositeForeignKey {
                table: table.to_string(),
                columns,
            });
            return None;
        }

        Some(FkInfo {
            column: columns[0].clone(),
            target,
            target_column: target_columns[0].clone(),
        })
    }

    fn take_ident(&mut self) -> Option<String> {
        match self.current() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    fn malformed(&mut self) {
        let near = self.current().to_string();
        self.warnings.push(ImportWarning::MalformedStatement { near });
        self.skip_statement();
    }

    /// Skip `ENGINE=...` and friends up to `;`. Stops short of a following
    /// `CREATE` so a missing semicolon costs nothing.
    fn skip_table_options(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Create | Token::Eof) {
            self.advance();
        }
        if self.current() == &Token::Semicolon {
            self.advance();
        }
    }

    fn skip_statement(&mut self) {
        while !matches!(self.current(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
        if self.current() == &Token::Semicolon {
            self.advance();
        }
    }
}

/// `(cols) REFERENCES [schema.]table (cols)`
fn foreign_key_parts(mut rest: &[Token]) -> Option<(Vec<String>, String, Vec<String>)> {
    let columns = take_name_list(&mut rest)?;
    let [Token::References, Token::Ident(target), tail @ ..] = rest else {
        return None;
    };
    let mut target = target.clone();
    rest = tail;
    while let [Token::Dot, Token::Ident(part), tail @ ..] = rest {
        target = part.clone();
        rest = tail;
    }

    let target_columns = take_name_list(&mut rest)?;
    Some((columns, target, target_columns))
}

/// `<name> <type>[(<params>)] [modifiers...]`
fn parse_column(line: &[Token]) -> Option<Column> {
    let (name, typ, mut rest) = match line {
        [Token::Ident(name), Token::Ident(typ), rest @ ..] => (name, typ, rest),
        _ => return None,
    };

    let mut column = Column::new(name.clone(), typ.to_lowercase());

    if rest.first() == Some(&Token::LParen) {
        let (params, tail) = split_parenthesized(rest);
        rest = tail;
        let numbers: Vec<u32> = params
            .iter()
            .filter(|t| **t != Token::Comma)
            .map(|t| match t {
                Token::Num(n) => n.parse().ok(),
                _ => None,
            })
            .collect::<Option<_>>()
            .unwrap_or_default();
        match numbers.as_slice() {
            [length] => column.length = Some(*length),
            [precision, scale] => {
                column.precision = Some(*precision);
                column.scale = Some(*scale);
            }
            _ => {}
        }
    }

    let mut nullable = true;
    let mut primary = false;
    let mut unique = false;

    let mut i = 0;
    while i < rest.len() {
        match &rest[i] {
            Token::Not if rest.get(i + 1) == Some(&Token::Null) => {
                nullable = false;
                i += 1;
            }
            Token::Primary if rest.get(i + 1) == Some(&Token::Key) => {
                primary = true;
                i += 1;
            }
            Token::AutoIncrement => primary = true,
            Token::Unique => unique = true,
            Token::Unsigned => column.unsigned = Some(true),
            Token::Default => {
                let (value, consumed) = default_value(&rest[i + 1..]);
                if let Some(value) = value {
                    column.default = Some(DefaultValue::Text(value));
                }
                i += consumed;
            }
            _ => {}
        }
        i += 1;
    }

    column.nullable = Some(nullable);
    column.primary = Some(primary);
    column.unique = Some(unique);
    Some(column)
}

/// Read a `DEFAULT` value; returns the text and how many tokens it used.
fn default_value(tokens: &[Token]) -> (Option<String>, usize) {
    match tokens {
        [Token::Str(s), ..] => (Some(s.clone()), 1),
        [Token::Num(n), ..] => (Some(n.clone()), 1),
        [Token::Null, ..] => (Some("NULL".to_string()), 1),
        [Token::Ident(f), Token::LParen, ..] => {
            let (args, tail) = split_parenthesized(&tokens[1..]);
            let used = tokens.len() - tail.len();
            (Some(format!("{}({})", f, join_tokens(args))), used)
        }
        [Token::Ident(s), ..] => (Some(s.clone()), 1),
        [Token::LParen, ..] => {
            let (inner, tail) = split_parenthesized(tokens);
            let used = tokens.len() - tail.len();
            (Some(format!("({})", join_tokens(inner))), used)
        }
        _ => (None, 0),
    }
}

/// Given tokens starting at `(`, return the contents up to the matching `)`
/// and the tokens after it.
fn split_parenthesized(tokens: &[Token]) -> (&[Token], &[Token]) {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth -= 1;
                if depth == 0 {
                    return (&tokens[1..i], &tokens[i + 1..]);
                }
            }
            _ => {}
        }
    }
    (tokens.get(1..).unwrap_or_default(), &[])
}

/// `(a, b, ...)` at the front of `rest`; advances past it.
fn take_name_list<'a>(rest: &mut &'a [Token]) -> Option<Vec<String>> {
    if rest.first() != Some(&Token::LParen) {
        return None;
    }
    let (inner, tail) = split_parenthesized(*rest);
    *rest = tail;
    let names: Vec<String> = inner
        .iter()
        .filter_map(|t| match t {
            Token::Ident(n) => Some(n.clone()),
            _ => None,
        })
        .collect();
    (!names.is_empty()).then_some(names)
}

fn join_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (i, tok) in tokens.iter().enumerate() {
        let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
        let glue = matches!(tok, Token::Comma | Token::RParen | Token::Dot)
            || matches!(prev, Some(Token::LParen | Token::Dot))
            || (*tok == Token::LParen && matches!(prev, Some(Token::Ident(_))));
        if i > 0 && !glue {
            out.push(' ');
        }
        out.push_str(&tok.to_string());
    }
    out
}

fn assemble(
    defs: Vec<TableDef>,
    mut warnings: Vec<ImportWarning>,
    options: &ImportOptions,
) -> ImportReport {
    let mut document = SchemaDocument::default();
    let positions = options.grid.positions(defs.len());
    let mut foreign_keys = Vec::new();

    for (def, (x, y)) in defs.into_iter().zip(positions) {
        tracing::debug!(
            table = %def.name,
            columns = def.columns.len(),
            foreign_keys = def.foreign_keys.len(),
            "imported table"
        );

        let mut table = Table::new(def.name.clone());
        for column in def.columns {
            table.columns.insert(options.column_id(&column.name), column);
        }

        if document.tables.insert(def.name.clone(), table).is_some() {
            warnings.push(ImportWarning::DuplicateTable {
                table: def.name.clone(),
            });
        }
        document.layout.insert(def.name.clone(), Position::new(x, y));

        foreign_keys.extend(def.foreign_keys.into_iter().map(|fk| (def.name.clone(), fk)));
    }

    for (i, (table, fk)) in foreign_keys.into_iter().enumerate() {
        if !document.tables.contains_key(&fk.target) {
            warnings.push(ImportWarning::UnknownReferencedTable {
                table: table.clone(),
                referenced: fk.target.clone(),
            });
        }
        document.relationships.insert(
            format!("rel_{}", i + 1),
            Relationship::one_to_many(fk.target, fk.target_column, table, fk.column),
        );
    }

    for warning in &warnings {
        tracing::warn!(%warning, "ddl import");
    }

    ImportReport { document, warnings }
}
