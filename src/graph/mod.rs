//! Relationship graph over a loaded schema.
//!
//! Provides:
//! - Symmetric adjacency from the schema's relationship edge list
//! - Per-kind edge filtering (all edges vs implied-only)
//! - Bounded-hop neighborhood extraction for diagram generation
//! - DOT serialization of extracted neighborhoods

mod dot;
mod neighborhood;

pub use dot::*;
pub use neighborhood::*;

use crate::schema::{RelationshipId, RelationshipKind, Schema, TableId};

/// Which relationship kinds an adjacency query sees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFilter {
    /// Explicit and implied edges
    All,
    /// Explicit edges only
    ExplicitOnly,
    /// Implied edges only
    ImpliedOnly,
}

impl EdgeFilter {
    pub fn accepts(self, kind: RelationshipKind) -> bool {
        match self {
            EdgeFilter::All => true,
            EdgeFilter::ExplicitOnly => kind == RelationshipKind::Explicit,
            EdgeFilter::ImpliedOnly => kind == RelationshipKind::Implied,
        }
    }
}

/// Relationship graph built from a schema's edge list.
///
/// Adjacency is symmetric: an edge connecting A and B appears in both tables'
/// incident lists (once, for a self-reference). The graph owns the schema and
/// is immutable after construction, so it can be shared across worker threads
/// without synchronization.
#[derive(Debug)]
pub struct RelationshipGraph {
    schema: Schema,
    /// For each table, IDs of edges touching it in either direction
    incident: Vec<Vec<RelationshipId>>,
}

impl RelationshipGraph {
    /// Build the graph in a single pass over the schema's edges
    pub fn from_schema(schema: Schema) -> Self {
        let n = schema.len();
        let mut incident: Vec<Vec<RelationshipId>> = vec![Vec::new(); n];

        for (i, rel) in schema.relationships().iter().enumerate() {
            let id = RelationshipId(i as u32);
            incident[rel.child.table.0 as usize].push(id);
            if !rel.is_self_reference() {
                incident[rel.parent.table.0 as usize].push(id);
            }
        }

        Self { schema, incident }
    }

    /// The underlying schema
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// IDs of all edges touching a table, both directions
    pub fn incident_edges(&self, table: TableId) -> &[RelationshipId] {
        self.incident
            .get(table.0 as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Tables directly connected to `table` through edges the filter accepts,
    /// paired with the connecting edge
    pub fn neighbors(
        &self,
        table: TableId,
        filter: EdgeFilter,
    ) -> impl Iterator<Item = (RelationshipId, TableId)> + '_ {
        self.incident_edges(table).iter().filter_map(move |&id| {
            let rel = self.schema.relationship(id)?;
            if filter.accepts(rel.kind) {
                Some((id, rel.other_end(table)))
            } else {
                None
            }
        })
    }

    /// Get the number of tables in the graph
    pub fn len(&self) -> usize {
        self.schema.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.schema.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parse_schema;

    fn build_graph(sql: &str) -> RelationshipGraph {
        let (schema, warnings) = parse_schema(sql);
        assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
        RelationshipGraph::from_schema(schema)
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let graph = build_graph(
            "CREATE TABLE users (id INT PRIMARY KEY);\
             CREATE TABLE orders (id INT PRIMARY KEY, user_id INT,\
             FOREIGN KEY (user_id) REFERENCES users(id));",
        );
        let users = graph.schema().get_table_id("users").unwrap();
        let orders = graph.schema().get_table_id("orders").unwrap();

        assert_eq!(graph.incident_edges(users), graph.incident_edges(orders));
        let from_users: Vec<_> = graph.neighbors(users, EdgeFilter::All).collect();
        let from_orders: Vec<_> = graph.neighbors(orders, EdgeFilter::All).collect();
        assert_eq!(from_users, vec![(from_users[0].0, orders)]);
        assert_eq!(from_orders, vec![(from_users[0].0, users)]);
    }

    #[test]
    fn test_adjacency_independent_of_declaration_order() {
        // Same schema declared in two orders; each table must see the same
        // neighbor set either way
        let a = build_graph(
            "CREATE TABLE users (id INT PRIMARY KEY);\
             CREATE TABLE orders (id INT PRIMARY KEY, user_id INT,\
             FOREIGN KEY (user_id) REFERENCES users(id));\
             CREATE TABLE items (id INT PRIMARY KEY, order_id INT,\
             FOREIGN KEY (order_id) REFERENCES orders(id));",
        );
        let b = build_graph(
            "CREATE TABLE items (id INT PRIMARY KEY, order_id INT);\
             CREATE TABLE orders (id INT PRIMARY KEY, user_id INT);\
             CREATE TABLE users (id INT PRIMARY KEY);\
             ALTER TABLE orders ADD FOREIGN KEY (user_id) REFERENCES users(id);\
             ALTER TABLE items ADD FOREIGN KEY (order_id) REFERENCES orders(id);",
        );

        for graph in [&a, &b] {
            let orders = graph.schema().get_table_id("orders").unwrap();
            let mut names: Vec<String> = graph
                .neighbors(orders, EdgeFilter::All)
                .map(|(_, t)| graph.schema().table_name(t))
                .collect();
            names.sort();
            assert_eq!(names, vec!["items", "users"]);
        }
    }

    #[test]
    fn test_self_reference_listed_once() {
        let graph = build_graph(
            "CREATE TABLE employees (id INT PRIMARY KEY, manager_id INT,\
             FOREIGN KEY (manager_id) REFERENCES employees(id));",
        );
        let employees = graph.schema().get_table_id("employees").unwrap();
        assert_eq!(graph.incident_edges(employees).len(), 1);
    }

    #[test]
    fn test_edge_filter_by_kind() {
        let (mut schema, _) = parse_schema(
            "CREATE TABLE categories (id INT PRIMARY KEY);\
             CREATE TABLE suppliers (id INT PRIMARY KEY);\
             CREATE TABLE products (id INT PRIMARY KEY, category_id INT, supplier_id INT,\
             FOREIGN KEY (supplier_id) REFERENCES suppliers(id));",
        );
        crate::schema::detect_implied(&mut schema, &crate::schema::ConventionPolicy);
        let graph = RelationshipGraph::from_schema(schema);
        let products = graph.schema().get_table_id("products").unwrap();

        assert_eq!(graph.neighbors(products, EdgeFilter::All).count(), 2);
        assert_eq!(
            graph.neighbors(products, EdgeFilter::ExplicitOnly).count(),
            1
        );
        let implied: Vec<_> = graph
            .neighbors(products, EdgeFilter::ImpliedOnly)
            .map(|(_, t)| graph.schema().table_name(t))
            .collect();
        assert_eq!(implied, vec!["categories"]);
    }
}
