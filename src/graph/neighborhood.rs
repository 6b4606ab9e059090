//! Bounded-hop neighborhood extraction.
//!
//! A neighborhood is the induced subgraph reachable from a focal table within
//! one or two relationship hops, under one of three variants. Neighborhoods
//! are ephemeral views: recomputed per diagram request, never stored.

use super::{EdgeFilter, RelationshipGraph};
use crate::schema::{RelationshipId, TableId};
use ahash::AHashSet;
use std::collections::VecDeque;
use std::fmt;

/// The three diagram variants generated per table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DegreeVariant {
    /// Direct relationships only
    OneDegree,
    /// All relationships within two hops
    TwoDegrees,
    /// Implied relationships within two hops
    ImpliedTwoDegrees,
}

impl DegreeVariant {
    pub const ALL: [DegreeVariant; 3] = [
        DegreeVariant::OneDegree,
        DegreeVariant::TwoDegrees,
        DegreeVariant::ImpliedTwoDegrees,
    ];

    /// Hop budget for the breadth-first expansion
    pub fn max_hops(self) -> usize {
        match self {
            DegreeVariant::OneDegree => 1,
            DegreeVariant::TwoDegrees | DegreeVariant::ImpliedTwoDegrees => 2,
        }
    }

    /// Which edges the expansion follows
    pub fn edge_filter(self) -> EdgeFilter {
        match self {
            DegreeVariant::OneDegree | DegreeVariant::TwoDegrees => EdgeFilter::All,
            DegreeVariant::ImpliedTwoDegrees => EdgeFilter::ImpliedOnly,
        }
    }

    /// Artifact file suffix, between the table name and the format extension
    pub fn file_suffix(self) -> &'static str {
        match self {
            DegreeVariant::OneDegree => "1degree",
            DegreeVariant::TwoDegrees => "2degrees",
            DegreeVariant::ImpliedTwoDegrees => "implied2degrees",
        }
    }

    /// Image-map element id; also the digraph name, which Graphviz copies
    /// into the cmapx output as the map's name
    pub fn map_id(self) -> &'static str {
        match self {
            DegreeVariant::OneDegree => "oneDegreeRelationshipsDiagram",
            DegreeVariant::TwoDegrees => "twoDegreesRelationshipsDiagram",
            DegreeVariant::ImpliedTwoDegrees => "impliedTwoDegreesRelationshipsDiagram",
        }
    }

    /// Id of the `<object>` element embedding this variant's image
    pub fn img_id(self) -> &'static str {
        match self {
            DegreeVariant::OneDegree => "oneDegreeImg",
            DegreeVariant::TwoDegrees => "twoDegreesImg",
            DegreeVariant::ImpliedTwoDegrees => "impliedTwoDegreesImg",
        }
    }
}

impl fmt::Display for DegreeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DegreeVariant::OneDegree => "one degree",
            DegreeVariant::TwoDegrees => "two degrees",
            DegreeVariant::ImpliedTwoDegrees => "implied two degrees",
        };
        write!(f, "{}", label)
    }
}

/// Inclusion and size policy applied during extraction
#[derive(Debug, Default, Clone)]
pub struct NeighborhoodOptions {
    /// Tables never pulled into a neighborhood (exclusion patterns, resolved upstream)
    pub excluded: AHashSet<TableId>,
    /// Stop adding tables beyond this count; the neighborhood is flagged truncated
    pub max_tables: Option<usize>,
}

/// An extracted neighborhood: focal table, reachable tables, induced edges
#[derive(Debug, Clone)]
pub struct Neighborhood {
    pub focus: TableId,
    pub variant: DegreeVariant,
    /// Tables in breadth-first discovery order, focus first
    pub tables: Vec<TableId>,
    /// Filter-accepted edges with both endpoints included, ascending by id
    pub edges: Vec<RelationshipId>,
    /// True when the size cap cut the expansion short
    pub truncated: bool,
}

impl Neighborhood {
    /// Number of tables, focal table included
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// True when nothing but the focal table was reached
    pub fn only_focus(&self) -> bool {
        self.tables.len() == 1
    }

    /// Whether two neighborhoods cover the same table set
    pub fn same_tables(&self, other: &Neighborhood) -> bool {
        if self.tables.len() != other.tables.len() {
            return false;
        }
        let mine: AHashSet<TableId> = self.tables.iter().copied().collect();
        other.tables.iter().all(|t| mine.contains(t))
    }
}

/// Breadth-first expansion from `focus` up to the variant's hop budget.
///
/// Tables already included at a shallower hop are never re-added or
/// re-traversed, so cycles and self-references terminate. The focal table is
/// always included, even when it has no accepted edges.
pub fn extract(
    graph: &RelationshipGraph,
    focus: TableId,
    variant: DegreeVariant,
    options: &NeighborhoodOptions,
) -> Neighborhood {
    let filter = variant.edge_filter();
    let max_hops = variant.max_hops();

    let mut included: AHashSet<TableId> = AHashSet::new();
    let mut tables = Vec::new();
    let mut truncated = false;

    included.insert(focus);
    tables.push(focus);

    let mut frontier: VecDeque<(TableId, usize)> = VecDeque::new();
    frontier.push_back((focus, 0));

    'expansion: while let Some((current, hops)) = frontier.pop_front() {
        if hops >= max_hops {
            continue;
        }
        for (_, neighbor) in graph.neighbors(current, filter) {
            if included.contains(&neighbor) || options.excluded.contains(&neighbor) {
                continue;
            }
            if let Some(cap) = options.max_tables {
                if tables.len() >= cap {
                    truncated = true;
                    break 'expansion;
                }
            }
            included.insert(neighbor);
            tables.push(neighbor);
            frontier.push_back((neighbor, hops + 1));
        }
    }

    // Induced edges: every accepted edge whose endpoints both made it in
    let mut edges = Vec::new();
    for (i, rel) in graph.schema().relationships().iter().enumerate() {
        if filter.accepts(rel.kind)
            && included.contains(&rel.parent.table)
            && included.contains(&rel.child.table)
        {
            edges.push(RelationshipId(i as u32));
        }
    }

    Neighborhood {
        focus,
        variant,
        tables,
        edges,
        truncated,
    }
}
