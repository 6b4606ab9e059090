//! DDL parsing for schema loading.
//!
//! Parses CREATE TABLE, ALTER TABLE and CREATE INDEX statements to extract:
//! - Column definitions with types and nullability
//! - Primary key and unique constraints
//! - Foreign key constraints, resolved into relationship edges at build time
//!
//! References that cannot be resolved against the loaded tables surface as
//! [`LoadWarning`]s; they are never turned into edges.

use super::{
    Column, ColumnId, ColumnRef, ColumnType, Relationship, RelationshipKind, Schema, Table,
    TableId,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Regex to extract table name from CREATE TABLE
/// Supports: `table` (MySQL), "table" (PostgreSQL), [table] (MSSQL), table (unquoted), schema.table
static CREATE_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(?:[\[`"]?(\w+)[\]`"]?\s*\.\s*)?[\[`"]?([^\[\]`"\s(]+)[\]`"]?"#,
    )
    .unwrap()
});

/// Regex to extract table name from ALTER TABLE
static ALTER_TABLE_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)ALTER\s+TABLE\s+(?:ONLY\s+)?(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s]+)[\]`"]?"#)
        .unwrap()
});

/// Regex for column definition
static COLUMN_DEF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^\s*[\[`"]?([^\[\]`"\s,]+)[\]`"]?\s+(\w+(?:\([^)]+\))?(?:\s+unsigned)?)"#).unwrap()
});

/// Regex for PRIMARY KEY table constraint
static PRIMARY_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)PRIMARY\s+KEY\s*(?:CLUSTERED\s+|NONCLUSTERED\s+)?\(([^)]+)\)").unwrap()
});

/// Regex for inline PRIMARY KEY on a column
static INLINE_PRIMARY_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bPRIMARY\s+KEY\b").unwrap());

/// Regex for FOREIGN KEY constraint with optional constraint name
static FOREIGN_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:CONSTRAINT\s+[\[`"]?([^\[\]`"\s]+)[\]`"]?\s+)?FOREIGN\s+KEY\s*\(([^)]+)\)\s*REFERENCES\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?\s*\(([^)]+)\)"#,
    )
    .unwrap()
});

/// Regex for a column-level REFERENCES clause (`user_id INT REFERENCES users(id)`)
static INLINE_REFERENCES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\bREFERENCES\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?([^\[\]`"\s(]+)[\]`"]?\s*(?:\(([^)]+)\))?"#,
    )
    .unwrap()
});

/// Regex to detect NOT NULL constraint
static NOT_NULL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bNOT\s+NULL\b").unwrap());

/// Regex for a UNIQUE table constraint or unique inline index:
/// UNIQUE (col), UNIQUE KEY name (col), UNIQUE INDEX name (col)
static UNIQUE_CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\bUNIQUE\s*(?:(?:KEY|INDEX)\s+[\[`"]?\w+[\]`"]?\s*)?\(([^)]+)\)"#).unwrap()
});

/// Regex for CREATE UNIQUE INDEX statements
static CREATE_INDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)CREATE\s+(UNIQUE\s+)?(?:CLUSTERED\s+|NONCLUSTERED\s+)?INDEX\s+(?:IF\s+NOT\s+EXISTS\s+)?[\[`"]?(\w+)[\]`"]?\s+ON\s+(?:[\[\]`"\w]+\s*\.\s*)*[\[`"]?(\w+)[\]`"]?\s*(?:USING\s+(\w+)\s*)?\(([^)]+)\)"#,
    )
    .unwrap()
});

/// A foreign key reference that could not be resolved while loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// FK references a table the dump never defines
    UnknownReferencedTable { table: String, referenced: String },
    /// FK names a column its table does not have
    UnknownReferencedColumn { table: String, column: String },
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::UnknownReferencedTable { table, referenced } => {
                write!(
                    f,
                    "foreign key on '{}' references undefined table '{}'",
                    table, referenced
                )
            }
            LoadWarning::UnknownReferencedColumn { table, column } => {
                write!(
                    f,
                    "foreign key references unknown column '{}.{}'",
                    table, column
                )
            }
        }
    }
}

/// Foreign key declaration held until all tables are loaded
#[derive(Debug, Clone)]
struct PendingForeignKey {
    name: Option<String>,
    table: TableId,
    column_names: Vec<String>,
    referenced_table: String,
    referenced_columns: Vec<String>,
}

/// Builder for constructing a schema from DDL statements
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
    pending_fks: Vec<PendingForeignKey>,
}

impl SchemaBuilder {
    /// Create a new schema builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an entire dump: splits statements and dispatches each by keyword
    pub fn parse_sql(&mut self, sql: &str) {
        for stmt in split_statements(sql) {
            let upper = stmt.trim_start().to_uppercase();
            if upper.starts_with("CREATE TABLE") {
                self.parse_create_table(&stmt);
            } else if upper.starts_with("ALTER TABLE") {
                self.parse_alter_table(&stmt);
            } else if upper.starts_with("CREATE UNIQUE INDEX") || upper.starts_with("CREATE INDEX")
            {
                self.parse_create_index(&stmt);
            }
        }
    }

    /// Parse a CREATE TABLE statement and add to schema
    pub fn parse_create_table(&mut self, stmt: &str) -> Option<TableId> {
        let caps = CREATE_TABLE_NAME_RE.captures(stmt)?;
        let qualifier = caps.get(1).map(|m| m.as_str().to_string());
        let table_name = caps.get(2)?.as_str().to_string();

        if let Some(existing) = self.schema.get_table_id(&table_name) {
            return Some(existing);
        }

        let mut table = Table::new(table_name, TableId(0));
        table.qualifier = qualifier;

        let body = extract_table_body(stmt)?;
        let id = {
            let pending = parse_table_body(&body, &mut table);
            let id = self.schema.add_table(table);
            for (column_names, referenced_table, referenced_columns) in pending {
                self.pending_fks.push(PendingForeignKey {
                    name: None,
                    table: id,
                    column_names,
                    referenced_table,
                    referenced_columns,
                });
            }
            id
        };

        Some(id)
    }

    /// Parse an ALTER TABLE statement for added FK constraints
    pub fn parse_alter_table(&mut self, stmt: &str) -> Option<TableId> {
        let table_name = ALTER_TABLE_NAME_RE
            .captures(stmt)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())?;
        let table_id = self.schema.get_table_id(&table_name)?;

        for caps in FOREIGN_KEY_RE.captures_iter(stmt) {
            let name = caps.get(1).map(|m| m.as_str().to_string());
            let column_names = caps
                .get(2)
                .map(|m| parse_column_list(m.as_str()))
                .unwrap_or_default();
            let referenced_table = caps
                .get(3)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let referenced_columns = caps
                .get(4)
                .map(|m| parse_column_list(m.as_str()))
                .unwrap_or_default();

            if !column_names.is_empty() && !referenced_table.is_empty() {
                self.pending_fks.push(PendingForeignKey {
                    name,
                    table: table_id,
                    column_names,
                    referenced_table,
                    referenced_columns,
                });
            }
        }

        Some(table_id)
    }

    /// Parse a CREATE INDEX statement; only single-column unique indexes
    /// matter to the model (they drive cardinality derivation)
    pub fn parse_create_index(&mut self, stmt: &str) -> Option<TableId> {
        let caps = CREATE_INDEX_RE.captures(stmt)?;

        let is_unique = caps.get(1).is_some();
        let table_name = caps.get(3)?.as_str().to_string();
        let columns = parse_column_list(caps.get(5)?.as_str());

        let table_id = self.schema.get_table_id(&table_name)?;
        if is_unique && columns.len() == 1 {
            if let Some(table) = self.schema.table_mut(table_id) {
                if let Some(col_id) = table.get_column_id(&columns[0]) {
                    table.unique_columns.insert(col_id);
                }
            }
        }

        Some(table_id)
    }

    /// Finalize the schema, resolving pending FK declarations into edges.
    ///
    /// Resolution failures become warnings, not edges: the graph never
    /// contains an endpoint the arena does not know.
    pub fn build(mut self) -> (Schema, Vec<LoadWarning>) {
        let mut warnings = Vec::new();
        let pending = std::mem::take(&mut self.pending_fks);

        for fk in pending {
            let child_table_name = self.schema.table_name(fk.table);
            let Some(parent_id) = self.schema.get_table_id(&fk.referenced_table) else {
                warnings.push(LoadWarning::UnknownReferencedTable {
                    table: child_table_name,
                    referenced: fk.referenced_table,
                });
                continue;
            };

            for (i, col_name) in fk.column_names.iter().enumerate() {
                let child_col = match self
                    .schema
                    .table(fk.table)
                    .and_then(|t| t.get_column_id(col_name))
                {
                    Some(c) => c,
                    None => {
                        warnings.push(LoadWarning::UnknownReferencedColumn {
                            table: child_table_name.clone(),
                            column: col_name.clone(),
                        });
                        continue;
                    }
                };

                let parent_table = self.schema.table(parent_id).expect("id just resolved");
                let parent_col = match fk.referenced_columns.get(i) {
                    Some(name) => parent_table.get_column_id(name),
                    // REFERENCES t without a column list means t's primary key
                    None => parent_table.single_pk_column().map(|c| c.ordinal),
                };
                let Some(parent_col) = parent_col else {
                    warnings.push(LoadWarning::UnknownReferencedColumn {
                        table: fk.referenced_table.clone(),
                        column: fk
                            .referenced_columns
                            .get(i)
                            .cloned()
                            .unwrap_or_else(|| "<primary key>".to_string()),
                    });
                    continue;
                };

                let parent = ColumnRef {
                    table: parent_id,
                    column: parent_col,
                };
                let child = ColumnRef {
                    table: fk.table,
                    column: child_col,
                };
                if self.schema.has_relationship(parent, child) {
                    continue;
                }
                // Endpoints were resolved against the arena above
                let _ = self.schema.add_relationship(Relationship {
                    name: fk.name.clone(),
                    parent,
                    child,
                    kind: RelationshipKind::Explicit,
                });
            }
        }

        (self.schema, warnings)
    }

    /// Get current schema (for inspection during building)
    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// Parse a full DDL dump into a schema plus any resolution warnings
pub fn parse_schema(sql: &str) -> (Schema, Vec<LoadWarning>) {
    let mut builder = SchemaBuilder::new();
    builder.parse_sql(sql);
    builder.build()
}

/// Split a dump into statements at top-level semicolons, respecting
/// single-quoted strings and `--` line comments
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut in_line_comment = false;
    let mut escape_next = false;

    let mut chars = sql.chars().peekable();
    while let Some(ch) = chars.next() {
        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
                current.push(ch);
            }
            continue;
        }

        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            current.push(ch);
            escape_next = true;
            continue;
        }

        if ch == '\'' {
            in_string = !in_string;
            current.push(ch);
            continue;
        }

        if !in_string && ch == '-' && chars.peek() == Some(&'-') {
            chars.next();
            in_line_comment = true;
            continue;
        }

        if !in_string && ch == ';' {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                statements.push(trimmed.to_string());
            }
            current.clear();
            continue;
        }

        current.push(ch);
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }

    statements
}

/// Extract the body of a CREATE TABLE statement (between first ( and matching ))
fn extract_table_body(stmt: &str) -> Option<String> {
    let bytes = stmt.as_bytes();
    let mut depth = 0;
    let mut start = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, &b) in bytes.iter().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }

        if b == b'\\' && in_string {
            escape_next = true;
            continue;
        }

        if b == b'\'' {
            in_string = !in_string;
            continue;
        }

        if in_string {
            continue;
        }

        if b == b'(' {
            if depth == 0 {
                start = Some(i + 1);
            }
            depth += 1;
        } else if b == b')' {
            depth -= 1;
            if depth == 0 {
                if let Some(s) = start {
                    return Some(stmt[s..i].to_string());
                }
            }
        }
    }

    None
}

/// Parse the body of a CREATE TABLE: fills columns/keys on `table`, returns
/// pending FK declarations as (columns, referenced table, referenced columns)
fn parse_table_body(
    body: &str,
    table: &mut Table,
) -> Vec<(Vec<String>, String, Vec<String>)> {
    let mut pending = Vec::new();

    for part in split_table_body(body) {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }

        let upper = trimmed.to_uppercase();
        let is_constraint = upper.starts_with("PRIMARY KEY")
            || upper.starts_with("CONSTRAINT")
            || upper.starts_with("FOREIGN KEY")
            || upper.starts_with("KEY ")
            || upper.starts_with("INDEX ")
            || upper.starts_with("UNIQUE")
            || upper.starts_with("FULLTEXT ")
            || upper.starts_with("SPATIAL ")
            || upper.starts_with("CHECK ");

        if is_constraint {
            if let Some(pk_cols) = parse_primary_key_constraint(trimmed) {
                for col_name in pk_cols {
                    if let Some(col) = table
                        .columns
                        .iter_mut()
                        .find(|c| c.name.eq_ignore_ascii_case(&col_name))
                    {
                        col.is_primary_key = true;
                        if !table.primary_key.contains(&col.ordinal) {
                            table.primary_key.push(col.ordinal);
                        }
                    }
                }
            }

            for caps in FOREIGN_KEY_RE.captures_iter(trimmed) {
                let columns = caps
                    .get(2)
                    .map(|m| parse_column_list(m.as_str()))
                    .unwrap_or_default();
                let referenced_table = caps
                    .get(3)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                let referenced_columns = caps
                    .get(4)
                    .map(|m| parse_column_list(m.as_str()))
                    .unwrap_or_default();
                if !columns.is_empty() && !referenced_table.is_empty() {
                    pending.push((columns, referenced_table, referenced_columns));
                }
            }

            if !upper.contains("FOREIGN KEY") {
                if let Some(caps) = UNIQUE_CONSTRAINT_RE.captures(trimmed) {
                    let cols = parse_column_list(caps.get(1).map(|m| m.as_str()).unwrap_or(""));
                    if cols.len() == 1 {
                        if let Some(col_id) = table.get_column_id(&cols[0]) {
                            table.unique_columns.insert(col_id);
                        }
                    }
                }
            }
        } else if let Some(mut col) = parse_column_def(trimmed, ColumnId(table.columns.len() as u16))
        {
            if INLINE_PRIMARY_KEY_RE.is_match(trimmed) {
                col.is_primary_key = true;
                col.is_nullable = false;
                table.primary_key.push(col.ordinal);
            }
            if upper.contains(" UNIQUE") {
                table.unique_columns.insert(col.ordinal);
            }
            // Column-level REFERENCES clause is shorthand for a one-column FK
            if let Some(caps) = INLINE_REFERENCES_RE.captures(trimmed) {
                let referenced_table = caps.get(1).map(|m| m.as_str().to_string());
                let referenced_columns = caps
                    .get(2)
                    .map(|m| parse_column_list(m.as_str()))
                    .unwrap_or_default();
                if let Some(referenced_table) = referenced_table {
                    pending.push((vec![col.name.clone()], referenced_table, referenced_columns));
                }
            }
            table.columns.push(col);
        }
    }

    pending
}

/// Split table body by commas, respecting nested parentheses
pub fn split_table_body(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in body.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        if ch == '\\' && in_string {
            current.push(ch);
            escape_next = true;
            continue;
        }

        if ch == '\'' {
            in_string = !in_string;
            current.push(ch);
            continue;
        }

        if in_string {
            current.push(ch);
            continue;
        }

        match ch {
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current = String::new();
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }

    parts
}

/// Parse a column definition
fn parse_column_def(def: &str, ordinal: ColumnId) -> Option<Column> {
    let caps = COLUMN_DEF_RE.captures(def)?;
    let name = caps.get(1)?.as_str().to_string();
    let type_str = caps.get(2)?.as_str();

    let col_type = ColumnType::from_sql_type(type_str);
    let is_nullable = !NOT_NULL_RE.is_match(def);

    Some(Column {
        name,
        col_type,
        ordinal,
        is_primary_key: false,
        is_nullable,
    })
}

/// Parse PRIMARY KEY constraint, returns column names
fn parse_primary_key_constraint(constraint: &str) -> Option<Vec<String>> {
    let caps = PRIMARY_KEY_RE.captures(constraint)?;
    let cols_str = caps.get(1)?.as_str();
    Some(parse_column_list(cols_str))
}

/// Parse a comma-separated column list, stripping quotes (backticks, double quotes, brackets)
pub fn parse_column_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|c| {
            c.trim()
                .trim_matches('`')
                .trim_matches('"')
                .trim_matches('[')
                .trim_matches(']')
                .to_string()
        })
        .filter(|c| !c.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RelationshipKind;

    const DUMP: &str = r#"
CREATE TABLE users (
  id INT PRIMARY KEY,
  email VARCHAR(255) NOT NULL UNIQUE
);

CREATE TABLE orders (
  id INT PRIMARY KEY,
  user_id INT NOT NULL,
  note VARCHAR(500),
  FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE TABLE audit_log (
  id INT PRIMARY KEY,
  actor_id INT REFERENCES users(id)
);

ALTER TABLE orders ADD CONSTRAINT fk_orders_audit FOREIGN KEY (id) REFERENCES audit_log(id);
"#;

    #[test]
    fn test_parse_schema_tables_and_columns() {
        let (schema, warnings) = parse_schema(DUMP);
        assert!(warnings.is_empty());
        assert_eq!(schema.len(), 3);

        let users = schema.get_table("users").unwrap();
        assert_eq!(users.columns.len(), 2);
        assert!(users.columns[0].is_primary_key);
        assert!(!users.columns[0].is_nullable);
        assert!(!users.columns[1].is_nullable);
        assert!(users.is_unique_column(ColumnId(1)));

        let orders = schema.get_table("orders").unwrap();
        assert!(orders.column(ColumnId(2)).unwrap().is_nullable);
    }

    #[test]
    fn test_parse_schema_resolves_fk_edges() {
        let (schema, _) = parse_schema(DUMP);
        assert_eq!(schema.relationships().len(), 3);
        assert!(schema
            .relationships()
            .iter()
            .all(|r| r.kind == RelationshipKind::Explicit));

        let users = schema.get_table_id("users").unwrap();
        let orders = schema.get_table_id("orders").unwrap();
        let edge = &schema.relationships()[0];
        assert_eq!(edge.parent.table, users);
        assert_eq!(edge.child.table, orders);
    }

    #[test]
    fn test_inline_references_default_to_primary_key() {
        let (schema, warnings) = parse_schema(
            "CREATE TABLE t (id INT PRIMARY KEY);\
             CREATE TABLE u (id INT PRIMARY KEY, t_ref INT REFERENCES t);",
        );
        assert!(warnings.is_empty());
        assert_eq!(schema.relationships().len(), 1);
        let t = schema.get_table("t").unwrap();
        assert_eq!(schema.relationships()[0].parent.column, t.primary_key[0]);
    }

    #[test]
    fn test_unresolved_reference_becomes_warning_not_edge() {
        let (schema, warnings) = parse_schema(
            "CREATE TABLE orders (id INT PRIMARY KEY, ghost_id INT,\
             FOREIGN KEY (ghost_id) REFERENCES ghosts(id));",
        );
        assert!(schema.relationships().is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains("ghosts"));
    }

    #[test]
    fn test_schema_qualifier_captured() {
        let (schema, _) = parse_schema("CREATE TABLE sales.orders (id INT PRIMARY KEY);");
        let orders = schema.get_table("orders").unwrap();
        assert_eq!(orders.qualified_name(), "sales.orders");
    }

    #[test]
    fn test_create_unique_index_marks_column() {
        let (schema, _) = parse_schema(
            "CREATE TABLE t (id INT PRIMARY KEY, code VARCHAR(10));\
             CREATE UNIQUE INDEX idx_code ON t (code);",
        );
        let t = schema.get_table("t").unwrap();
        assert!(t.is_unique_column(ColumnId(1)));
    }

    #[test]
    fn test_split_statements_respects_strings_and_comments() {
        let stmts = split_statements(
            "CREATE TABLE a (x VARCHAR(9)); -- trailing; comment\n\
             INSERT INTO a VALUES ('semi;colon');\n\
             CREATE TABLE b (y INT)",
        );
        assert_eq!(stmts.len(), 3);
        assert!(stmts[1].contains("semi;colon"));
        assert!(stmts[2].starts_with("CREATE TABLE b"));
    }

    #[test]
    fn test_duplicate_fk_declarations_collapse() {
        let (schema, _) = parse_schema(
            "CREATE TABLE p (id INT PRIMARY KEY);\
             CREATE TABLE c (id INT PRIMARY KEY, p_id INT,\
             FOREIGN KEY (p_id) REFERENCES p(id));\
             ALTER TABLE c ADD FOREIGN KEY (p_id) REFERENCES p(id);",
        );
        assert_eq!(schema.relationships().len(), 1);
    }
}
