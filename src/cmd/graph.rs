//! Graph command: print one table's neighborhood description.
//!
//! Useful for inspecting what the report would render, or for piping a
//! description straight into Graphviz by hand.

use crate::graph::{extract, to_dot, DegreeVariant, DotConfig, NeighborhoodOptions, RelationshipGraph};
use crate::schema::{detect_implied, parse_schema, ConventionPolicy};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::PathBuf;

/// Run the graph command
pub fn run(
    file: PathBuf,
    table: String,
    degrees: String,
    output: Option<PathBuf>,
    no_implied: bool,
) -> Result<()> {
    if !file.exists() {
        bail!("input file does not exist: {}", file.display());
    }

    let variant = match degrees.to_lowercase().as_str() {
        "one" | "1" => DegreeVariant::OneDegree,
        "two" | "2" => DegreeVariant::TwoDegrees,
        "implied" => DegreeVariant::ImpliedTwoDegrees,
        other => bail!("unknown degrees: {}. Valid options: one, two, implied", other),
    };

    let sql = fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    let (mut schema, load_warnings) = parse_schema(&sql);
    for warning in &load_warnings {
        eprintln!("  ⚠ {}", warning);
    }

    if !no_implied {
        detect_implied(&mut schema, &ConventionPolicy);
    }

    let Some(focus) = schema.get_table_id(&table) else {
        bail!("table not found: {}", table);
    };

    let graph = RelationshipGraph::from_schema(schema);
    let nb = extract(&graph, focus, variant, &NeighborhoodOptions::default());
    let dot = to_dot(&graph, &nb, &DotConfig::default());

    if let Some(out_path) = output {
        fs::write(&out_path, &dot)
            .with_context(|| format!("writing {}", out_path.display()))?;
        eprintln!("Description written to: {}", out_path.display());
    } else {
        print!("{}", dot);
    }

    eprintln!(
        "Neighborhood of {} ({}): {} tables, {} relationships",
        table,
        variant,
        nb.table_count(),
        nb.edges.len()
    );

    Ok(())
}
