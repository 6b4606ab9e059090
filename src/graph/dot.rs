//! Graphviz DOT output for neighborhood diagrams.
//!
//! The digraph is named after the variant's image-map id: Graphviz copies the
//! graph name into its cmapx output, which is how the rendered map ends up
//! addressable from the composed HTML fragment.

use crate::graph::{Neighborhood, RelationshipGraph};
use crate::schema::{Relationship, RelationshipKind, Table};

/// Serialization options threaded in from the composer
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Relative URL prefix for table page links emitted on nodes
    pub table_url_prefix: String,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            table_url_prefix: "../tables".to_string(),
        }
    }
}

/// Serialize a neighborhood as a DOT graph description.
///
/// Output is deterministic for a given neighborhood content: tables are
/// ordered by name and edges by their endpoint names, independent of
/// insertion order.
pub fn to_dot(graph: &RelationshipGraph, nb: &Neighborhood, config: &DotConfig) -> String {
    let schema = graph.schema();
    let mut output = String::new();

    output.push_str(&format!("digraph {} {{\n", nb.variant.map_id()));
    output.push_str("  graph [pad=\"0.5\", nodesep=\"1\", ranksep=\"1.5\"];\n");
    output.push_str("  node [shape=none, margin=0];\n");
    output.push_str("  edge [arrowhead=crow, arrowtail=none, dir=both];\n\n");

    let mut tables: Vec<&Table> = nb
        .tables
        .iter()
        .filter_map(|&id| schema.table(id))
        .collect();
    tables.sort_by(|a, b| a.qualified_name().cmp(&b.qualified_name()));

    for table in &tables {
        let label = generate_table_label(table, table.id == nb.focus);
        output.push_str(&format!(
            "  {} [label=<{}>, URL=\"{}/{}.html\", tooltip=\"{}\"];\n",
            escape_dot_id(&table.name),
            label,
            config.table_url_prefix,
            table.name,
            escape_html(&table.qualified_name()),
        ));
    }

    if !nb.edges.is_empty() {
        output.push('\n');
    }

    let mut edges: Vec<&Relationship> = nb
        .edges
        .iter()
        .filter_map(|&id| schema.relationship(id))
        .collect();
    edges.sort_by_key(|rel| edge_sort_key(graph, rel));

    for rel in edges {
        let child_table = schema.table(rel.child.table);
        let parent_table = schema.table(rel.parent.table);
        let (Some(child_table), Some(parent_table)) = (child_table, parent_table) else {
            continue;
        };
        let child_col = child_table.column(rel.child.column).map(|c| c.name.as_str());
        let parent_col = parent_table
            .column(rel.parent.column)
            .map(|c| c.name.as_str());
        let (Some(child_col), Some(parent_col)) = (child_col, parent_col) else {
            continue;
        };

        let mut attrs = vec![format!("label=\"{}\"", schema.cardinality(rel).label())];
        if rel.kind == RelationshipKind::Implied {
            attrs.push("style=dashed".to_string());
            attrs.push("color=\"#718096\"".to_string());
        }

        output.push_str(&format!(
            "  {}:{} -> {}:{} [{}];\n",
            escape_dot_id(&child_table.name),
            escape_dot_id(child_col),
            escape_dot_id(&parent_table.name),
            escape_dot_id(parent_col),
            attrs.join(", ")
        ));
    }

    output.push_str("}\n");
    output
}

fn edge_sort_key(graph: &RelationshipGraph, rel: &Relationship) -> (String, String, String, String, u8) {
    let schema = graph.schema();
    let col_name = |end: &crate::schema::ColumnRef| {
        schema
            .table(end.table)
            .and_then(|t| t.column(end.column))
            .map(|c| c.name.clone())
            .unwrap_or_default()
    };
    (
        schema.table_name(rel.child.table),
        col_name(&rel.child),
        schema.table_name(rel.parent.table),
        col_name(&rel.parent),
        (rel.kind == RelationshipKind::Implied) as u8,
    )
}

/// Generate HTML-like table label for DOT
fn generate_table_label(table: &Table, is_focus: bool) -> String {
    let mut html = String::new();

    // The focal table gets a distinct header fill so the diagram reads
    // without relying on layout position
    let header_color = if is_focus { "#2b6cb0" } else { "#4a5568" };

    html.push_str("<TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\" CELLPADDING=\"4\">");
    html.push_str(&format!(
        "<TR><TD BGCOLOR=\"{}\" COLSPAN=\"2\"><FONT COLOR=\"white\"><B>{}</B></FONT></TD></TR>",
        header_color,
        escape_html(&table.qualified_name())
    ));

    for col in &table.columns {
        let name_cell = if col.is_primary_key {
            format!("<B><U>{}</U></B>", escape_html(&col.name))
        } else {
            escape_html(&col.name)
        };
        let null_marker = if col.is_nullable && !col.is_primary_key {
            " <FONT COLOR=\"#888888\">NULL</FONT>"
        } else {
            ""
        };

        html.push_str("<TR>");
        html.push_str(&format!(
            "<TD ALIGN=\"LEFT\" PORT=\"{}\">{}{}</TD>",
            escape_html(&col.name),
            name_cell,
            null_marker
        ));
        html.push_str(&format!(
            "<TD ALIGN=\"LEFT\"><FONT COLOR=\"#666666\">{}</FONT></TD>",
            escape_html(&col.col_type.display_name())
        ));
        html.push_str("</TR>");
    }

    html.push_str("</TABLE>");
    html
}

/// Escape a string for use in DOT HTML labels
fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Escape a string for use as a DOT node ID
fn escape_dot_id(s: &str) -> String {
    if s.chars().all(|c| c.is_alphanumeric() || c == '_') && !s.is_empty() {
        s.to_string()
    } else {
        format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
    }
}
