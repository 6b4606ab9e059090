//! Implied relationship detection.
//!
//! Scans columns that participate in no explicit foreign key and matches them
//! against single-column primary keys of other tables. Accepted matches become
//! [`RelationshipKind::Implied`] edges. The matching rule itself is a
//! pluggable [`MatchPolicy`]; the shipped [`ConventionPolicy`] encodes the
//! common `<table>_<pk>` / bare-pk-name naming conventions.

use super::{Column, ColumnRef, ColumnType, Relationship, RelationshipKind, Schema, Table};

/// Decides whether a column plausibly references another table's primary key.
///
/// Implementations see the candidate child column together with the parent
/// table and its primary-key column, and must be pure: detection runs the
/// policy over every (column, primary key) pair and relies on stable answers.
pub trait MatchPolicy {
    fn matches(&self, child_table: &Table, column: &Column, parent: &Table, pk: &Column) -> bool;
}

/// Default naming/type convention policy.
///
/// A column matches a parent primary key when the column types are compatible
/// and the column name (case- and underscore-insensitive) equals either
/// `<parent stem><pk name>` or the bare pk name. Parent stems cover plural
/// table names, so `category_id` matches `CATEGORIES(id)`. Bare pk names of
/// three characters or fewer never match on their own: a schema full of `id`
/// primary keys would otherwise connect everything to everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConventionPolicy;

impl MatchPolicy for ConventionPolicy {
    fn matches(&self, _child_table: &Table, column: &Column, parent: &Table, pk: &Column) -> bool {
        if !types_compatible(&column.col_type, &pk.col_type) {
            return false;
        }

        let col = normalize(&column.name);
        let pk_name = normalize(&pk.name);

        for stem in table_stems(&parent.name) {
            if col == format!("{}{}", stem, pk_name) {
                return true;
            }
        }

        pk_name.len() > 3 && col == pk_name
    }
}

/// Compatible column types for FK inference. Integer widths are
/// interchangeable; everything else requires the same classification.
fn types_compatible(a: &ColumnType, b: &ColumnType) -> bool {
    let ints = |t: &ColumnType| matches!(t, ColumnType::Int | ColumnType::BigInt);
    a == b || (ints(a) && ints(b))
}

/// Lowercase and strip underscores so `Category_ID` and `categoryid` compare equal
fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Candidate stems for a parent table name: the name itself plus singular forms
fn table_stems(name: &str) -> Vec<String> {
    let base = normalize(name);
    let mut stems = vec![base.clone()];
    if let Some(stripped) = base.strip_suffix("ies") {
        stems.push(format!("{}y", stripped));
    }
    if let Some(stripped) = base.strip_suffix('s') {
        stems.push(stripped.to_string());
    }
    stems
}

/// Run implied relationship detection over a fully loaded schema.
///
/// Only columns outside every explicit edge are considered; a column may
/// match several primary keys (fan-out is allowed) but never its own table's.
/// Detection is idempotent: edges that already exist, of either kind, are not
/// added again. Returns the number of edges added.
pub fn detect_implied(schema: &mut Schema, policy: &dyn MatchPolicy) -> usize {
    let explicit_columns = schema.explicit_edge_columns();

    // Candidate parents: tables with a single-column primary key
    let parents: Vec<(ColumnRef, Table)> = schema
        .iter()
        .filter_map(|t| {
            t.single_pk_column().map(|pk| {
                (
                    ColumnRef {
                        table: t.id,
                        column: pk.ordinal,
                    },
                    t.clone(),
                )
            })
        })
        .collect();

    let mut found: Vec<(ColumnRef, ColumnRef)> = Vec::new();

    for child_table in schema.iter() {
        for column in &child_table.columns {
            let child_ref = ColumnRef {
                table: child_table.id,
                column: column.ordinal,
            };
            if explicit_columns.contains(&child_ref) {
                continue;
            }

            for (parent_ref, parent_table) in &parents {
                if parent_table.id == child_table.id {
                    continue;
                }
                let pk = parent_table
                    .column(parent_ref.column)
                    .expect("pk column of candidate parent");
                if policy.matches(child_table, column, parent_table, pk) {
                    found.push((*parent_ref, child_ref));
                }
            }
        }
    }

    let mut added = 0;
    for (parent, child) in found {
        if schema.has_relationship(parent, child) {
            continue;
        }
        // Both endpoints come straight from the arena scan above
        let _ = schema.add_relationship(Relationship {
            name: None,
            parent,
            child,
            kind: RelationshipKind::Implied,
        });
        added += 1;
    }

    added
}
