//! Schema model for relationship-aware diagram generation.
//!
//! This module provides:
//! - Data models for tables, columns, and relationship edges
//! - MySQL/PostgreSQL DDL parsing for loading a schema from a dump file
//! - Implied relationship detection from naming/type conventions
//!
//! Tables live in an arena indexed by [`TableId`]; relationship edges are stored
//! centrally on the [`Schema`] as identifier pairs, so self-referencing and
//! mutually referencing tables need no cross-owned pointers.

mod ddl;
mod implied;

pub use ddl::*;
pub use implied::*;

use ahash::{AHashMap, AHashSet};
use std::fmt;

/// Unique identifier for a table within a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableId({})", self.0)
    }
}

/// Unique identifier for a column within a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnId(pub u16);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnId({})", self.0)
    }
}

/// Unique identifier for a relationship edge within a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelationshipId(pub u32);

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RelationshipId({})", self.0)
    }
}

/// SQL column type classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnType {
    /// Integer types: INT, INTEGER, TINYINT, SMALLINT, MEDIUMINT
    Int,
    /// Big integer types: BIGINT
    BigInt,
    /// Text types: CHAR, VARCHAR, TEXT, etc.
    Text,
    /// UUID types (detected by column name or type)
    Uuid,
    /// Decimal/numeric types
    Decimal,
    /// Date/time types
    DateTime,
    /// Boolean type
    Bool,
    /// Any other type
    Other(String),
}

impl ColumnType {
    /// Parse a SQL type string into a ColumnType
    /// Supports MySQL, PostgreSQL, and SQLite types
    pub fn from_sql_type(type_str: &str) -> Self {
        let type_lower = type_str.to_lowercase();
        let base_type = type_lower.split('(').next().unwrap_or(&type_lower).trim();

        match base_type {
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "int4" | "int2" => {
                ColumnType::Int
            }
            "serial" | "smallserial" => ColumnType::Int,
            "bigint" | "int8" | "bigserial" => ColumnType::BigInt,
            "char" | "varchar" | "text" | "tinytext" | "mediumtext" | "longtext" | "enum"
            | "set" | "character" => ColumnType::Text,
            "decimal" | "numeric" | "float" | "double" | "real" | "float4" | "float8" | "money" => {
                ColumnType::Decimal
            }
            "date" | "datetime" | "timestamp" | "time" | "year" | "timestamptz" | "timetz"
            | "interval" => ColumnType::DateTime,
            "bool" | "boolean" => ColumnType::Bool,
            "binary" | "varbinary" | "blob" | "bytea" => {
                // binary(16) is a common UUID storage convention
                if type_lower.contains("16") {
                    ColumnType::Uuid
                } else {
                    ColumnType::Other(type_str.to_string())
                }
            }
            "uuid" => ColumnType::Uuid,
            _ => ColumnType::Other(type_str.to_string()),
        }
    }

    /// Short display form used in diagram node labels
    pub fn display_name(&self) -> String {
        match self {
            ColumnType::Int => "INT".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Text => "VARCHAR".to_string(),
            ColumnType::Uuid => "UUID".to_string(),
            ColumnType::Decimal => "DECIMAL".to_string(),
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Bool => "BOOL".to_string(),
            ColumnType::Other(s) => s.to_uppercase(),
        }
    }
}

/// Column definition within a table
#[derive(Debug, Clone)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column type
    pub col_type: ColumnType,
    /// Position in table (0-indexed)
    pub ordinal: ColumnId,
    /// Whether this column is part of the primary key
    pub is_primary_key: bool,
    /// Whether this column allows NULL values
    pub is_nullable: bool,
}

/// Table definition: identity, ordered columns, key metadata
#[derive(Debug, Clone)]
pub struct Table {
    /// Table name (unqualified)
    pub name: String,
    /// Optional schema qualifier (e.g. `public` in `public.orders`)
    pub qualifier: Option<String>,
    /// Table ID within the schema
    pub id: TableId,
    /// Column definitions in order
    pub columns: Vec<Column>,
    /// Primary key column IDs (ordered for composite PKs)
    pub primary_key: Vec<ColumnId>,
    /// Columns covered by a single-column unique index
    pub unique_columns: AHashSet<ColumnId>,
}

impl Table {
    /// Create a new empty table
    pub fn new(name: String, id: TableId) -> Self {
        Self {
            name,
            qualifier: None,
            id,
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique_columns: AHashSet::new(),
        }
    }

    /// Schema-qualified display name
    pub fn qualified_name(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", q, self.name),
            None => self.name.clone(),
        }
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Get column ID by name
    pub fn get_column_id(&self, name: &str) -> Option<ColumnId> {
        self.get_column(name).map(|c| c.ordinal)
    }

    /// Get column by ID
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.get(id.0 as usize)
    }

    /// Check if column is part of the primary key
    pub fn is_pk_column(&self, col_id: ColumnId) -> bool {
        self.primary_key.contains(&col_id)
    }

    /// Check if a column is unique on its own (sole PK column or unique index)
    pub fn is_unique_column(&self, col_id: ColumnId) -> bool {
        (self.primary_key.len() == 1 && self.primary_key[0] == col_id)
            || self.unique_columns.contains(&col_id)
    }

    /// The single primary-key column, if the PK is not composite
    pub fn single_pk_column(&self) -> Option<&Column> {
        match self.primary_key.as_slice() {
            [only] => self.column(*only),
            _ => None,
        }
    }
}

/// How a relationship edge came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// Declared as a foreign key constraint in the schema
    Explicit,
    /// Inferred from naming/type conventions
    Implied,
}

impl RelationshipKind {
    pub fn label(self) -> &'static str {
        match self {
            RelationshipKind::Explicit => "explicit",
            RelationshipKind::Implied => "implied",
        }
    }
}

/// A (table, column) endpoint of a relationship edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: TableId,
    pub column: ColumnId,
}

/// A relationship edge: child column references parent column.
///
/// Edges are relations, not possessions: both endpoint tables see the same
/// edge through the relationship graph.
#[derive(Debug, Clone)]
pub struct Relationship {
    /// Constraint name, when one was declared
    pub name: Option<String>,
    /// Referenced side (usually a primary key)
    pub parent: ColumnRef,
    /// Referencing side (the FK column)
    pub child: ColumnRef,
    /// Explicit or implied
    pub kind: RelationshipKind,
}

impl Relationship {
    /// Whether both endpoints are on the same table
    pub fn is_self_reference(&self) -> bool {
        self.parent.table == self.child.table
    }

    /// The table on the far side of `from`, for adjacency walks
    pub fn other_end(&self, from: TableId) -> TableId {
        if self.child.table == from {
            self.parent.table
        } else {
            self.child.table
        }
    }
}

/// Relationship cardinality, derived from key metadata of the child column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    #[default]
    OneToMany,
    OneToOne,
}

impl Cardinality {
    pub fn label(self) -> &'static str {
        match self {
            Cardinality::OneToMany => "one-to-many",
            Cardinality::OneToOne => "one-to-one",
        }
    }
}

/// Rejected edge: an endpoint referenced a table or column the schema does
/// not contain. Treated as a defect in whatever populated the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    UnknownTable { table: TableId },
    UnknownColumn { table: String, column: ColumnId },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::UnknownTable { table } => {
                write!(f, "relationship references unknown table {}", table)
            }
            SchemaError::UnknownColumn { table, column } => {
                write!(
                    f,
                    "relationship references unknown column {} of table '{}'",
                    column, table
                )
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Complete database schema: table arena plus central relationship edge list
#[derive(Debug, Default)]
pub struct Schema {
    /// Map from table name to table ID
    tables_by_name: AHashMap<String, TableId>,
    /// Tables indexed by TableId
    tables: Vec<Table>,
    /// All relationship edges, explicit and implied
    relationships: Vec<Relationship>,
    /// Endpoint pairs already present, for duplicate suppression
    edge_index: AHashSet<(ColumnRef, ColumnRef)>,
}

impl Schema {
    /// Create a new empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Get table ID by name (case-insensitive fallback)
    pub fn get_table_id(&self, name: &str) -> Option<TableId> {
        if let Some(&id) = self.tables_by_name.get(name) {
            return Some(id);
        }
        let name_lower = name.to_lowercase();
        self.tables_by_name
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, &id)| id)
    }

    /// Get table by ID
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.0 as usize)
    }

    /// Get mutable table by ID
    pub fn table_mut(&mut self, id: TableId) -> Option<&mut Table> {
        self.tables.get_mut(id.0 as usize)
    }

    /// Get table by name
    pub fn get_table(&self, name: &str) -> Option<&Table> {
        self.get_table_id(name).and_then(|id| self.table(id))
    }

    /// Display name for a table ID, falling back to the raw ID
    pub fn table_name(&self, id: TableId) -> String {
        self.table(id)
            .map(|t| t.qualified_name())
            .unwrap_or_else(|| id.to_string())
    }

    /// Add a new table, returning its ID
    pub fn add_table(&mut self, mut table: Table) -> TableId {
        let id = TableId(self.tables.len() as u32);
        table.id = id;
        self.tables_by_name.insert(table.name.clone(), id);
        self.tables.push(table);
        id
    }

    /// Add a relationship edge after validating both endpoints.
    ///
    /// An edge naming a table or column absent from this schema is rejected
    /// rather than traversed into an undefined node.
    pub fn add_relationship(
        &mut self,
        rel: Relationship,
    ) -> Result<RelationshipId, SchemaError> {
        for end in [rel.parent, rel.child] {
            let table = self
                .table(end.table)
                .ok_or(SchemaError::UnknownTable { table: end.table })?;
            if table.column(end.column).is_none() {
                return Err(SchemaError::UnknownColumn {
                    table: table.qualified_name(),
                    column: end.column,
                });
            }
        }

        let id = RelationshipId(self.relationships.len() as u32);
        self.edge_index.insert((rel.parent, rel.child));
        self.relationships.push(rel);
        Ok(id)
    }

    /// Whether an edge with these endpoints already exists, of either kind
    pub fn has_relationship(&self, parent: ColumnRef, child: ColumnRef) -> bool {
        self.edge_index.contains(&(parent, child))
    }

    /// Get a relationship by ID
    pub fn relationship(&self, id: RelationshipId) -> Option<&Relationship> {
        self.relationships.get(id.0 as usize)
    }

    /// All relationship edges in insertion order
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Columns participating in any explicit edge, on either side
    pub fn explicit_edge_columns(&self) -> AHashSet<ColumnRef> {
        self.relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Explicit)
            .flat_map(|r| [r.parent, r.child])
            .collect()
    }

    /// Cardinality of an edge, derived from uniqueness of the child column
    pub fn cardinality(&self, rel: &Relationship) -> Cardinality {
        let unique = self
            .table(rel.child.table)
            .map(|t| t.is_unique_column(rel.child.column))
            .unwrap_or(false);
        if unique {
            Cardinality::OneToOne
        } else {
            Cardinality::OneToMany
        }
    }

    /// Get the number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if schema is empty
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Iterate over all tables
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_columns(name: &str, cols: &[(&str, ColumnType, bool)]) -> Table {
        let mut table = Table::new(name.to_string(), TableId(0));
        for (i, (col_name, col_type, is_pk)) in cols.iter().enumerate() {
            let ordinal = ColumnId(i as u16);
            table.columns.push(Column {
                name: col_name.to_string(),
                col_type: col_type.clone(),
                ordinal,
                is_primary_key: *is_pk,
                is_nullable: !*is_pk,
            });
            if *is_pk {
                table.primary_key.push(ordinal);
            }
        }
        table
    }

    #[test]
    fn test_add_relationship_validates_endpoints() {
        let mut schema = Schema::new();
        let users = schema.add_table(table_with_columns(
            "users",
            &[("id", ColumnType::Int, true)],
        ));
        let orders = schema.add_table(table_with_columns(
            "orders",
            &[
                ("id", ColumnType::Int, true),
                ("user_id", ColumnType::Int, false),
            ],
        ));

        let ok = schema.add_relationship(Relationship {
            name: None,
            parent: ColumnRef {
                table: users,
                column: ColumnId(0),
            },
            child: ColumnRef {
                table: orders,
                column: ColumnId(1),
            },
            kind: RelationshipKind::Explicit,
        });
        assert!(ok.is_ok());

        let bad_table = schema.add_relationship(Relationship {
            name: None,
            parent: ColumnRef {
                table: TableId(99),
                column: ColumnId(0),
            },
            child: ColumnRef {
                table: orders,
                column: ColumnId(1),
            },
            kind: RelationshipKind::Explicit,
        });
        assert_eq!(
            bad_table,
            Err(SchemaError::UnknownTable { table: TableId(99) })
        );

        let bad_column = schema.add_relationship(Relationship {
            name: None,
            parent: ColumnRef {
                table: users,
                column: ColumnId(7),
            },
            child: ColumnRef {
                table: orders,
                column: ColumnId(1),
            },
            kind: RelationshipKind::Explicit,
        });
        assert_eq!(
            bad_column,
            Err(SchemaError::UnknownColumn {
                table: "users".to_string(),
                column: ColumnId(7),
            })
        );
    }

    #[test]
    fn test_has_relationship_tracks_endpoint_pairs() {
        let mut schema = Schema::new();
        let users = schema.add_table(table_with_columns(
            "users",
            &[("id", ColumnType::Int, true)],
        ));
        let orders = schema.add_table(table_with_columns(
            "orders",
            &[
                ("id", ColumnType::Int, true),
                ("user_id", ColumnType::Int, false),
            ],
        ));

        let parent = ColumnRef {
            table: users,
            column: ColumnId(0),
        };
        let child = ColumnRef {
            table: orders,
            column: ColumnId(1),
        };
        assert!(!schema.has_relationship(parent, child));

        schema
            .add_relationship(Relationship {
                name: None,
                parent,
                child,
                kind: RelationshipKind::Explicit,
            })
            .unwrap();
        assert!(schema.has_relationship(parent, child));
    }

    #[test]
    fn test_cardinality_from_child_uniqueness() {
        let mut schema = Schema::new();
        let users = schema.add_table(table_with_columns(
            "users",
            &[("id", ColumnType::Int, true)],
        ));
        let profiles = schema.add_table(table_with_columns(
            "profiles",
            &[("user_id", ColumnType::Int, true)],
        ));
        let orders = schema.add_table(table_with_columns(
            "orders",
            &[
                ("id", ColumnType::Int, true),
                ("user_id", ColumnType::Int, false),
            ],
        ));

        let one_to_one = Relationship {
            name: None,
            parent: ColumnRef {
                table: users,
                column: ColumnId(0),
            },
            child: ColumnRef {
                table: profiles,
                column: ColumnId(0),
            },
            kind: RelationshipKind::Explicit,
        };
        assert_eq!(schema.cardinality(&one_to_one), Cardinality::OneToOne);

        let one_to_many = Relationship {
            name: None,
            parent: ColumnRef {
                table: users,
                column: ColumnId(0),
            },
            child: ColumnRef {
                table: orders,
                column: ColumnId(1),
            },
            kind: RelationshipKind::Explicit,
        };
        assert_eq!(schema.cardinality(&one_to_many), Cardinality::OneToMany);
    }

    #[test]
    fn test_qualified_name() {
        let mut table = Table::new("orders".to_string(), TableId(0));
        assert_eq!(table.qualified_name(), "orders");
        table.qualifier = Some("sales".to_string());
        assert_eq!(table.qualified_name(), "sales.orders");
    }

    #[test]
    fn test_column_type_classification() {
        assert_eq!(ColumnType::from_sql_type("INT"), ColumnType::Int);
        assert_eq!(ColumnType::from_sql_type("bigint"), ColumnType::BigInt);
        assert_eq!(ColumnType::from_sql_type("VARCHAR(255)"), ColumnType::Text);
        assert_eq!(ColumnType::from_sql_type("binary(16)"), ColumnType::Uuid);
        assert_eq!(
            ColumnType::from_sql_type("GEOMETRY"),
            ColumnType::Other("GEOMETRY".to_string())
        );
    }
}
