//! Report command: diagrams plus embeddable fragments for a whole schema.

use crate::compose::{ComposeOptions, DiagramComposer, DiagramWarning, WarningCollector};
use crate::graph::{DegreeVariant, DotConfig, NeighborhoodOptions, RelationshipGraph};
use crate::render::{CancelFlag, DiagramRenderer, GraphvizRenderer, RendererConfig};
use crate::schema::{detect_implied, parse_schema, ConventionPolicy, TableId};
use ahash::AHashSet;
use anyhow::{bail, Context, Result};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

/// End-of-run statistics, printed and optionally emitted as JSON
#[derive(Debug, Default, Serialize)]
struct ReportSummary {
    tables: usize,
    renderer_available: bool,
    implied_relationships: usize,
    one_degree_diagrams: usize,
    two_degree_diagrams: usize,
    implied_diagrams: usize,
    warnings: usize,
}

/// Run the report command
#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    output: PathBuf,
    tables: Option<String>,
    exclude: Option<String>,
    no_implied: bool,
    jobs: usize,
    renderer: String,
    bitmap_format: String,
    vector_format: String,
    max_diagram_tables: Option<usize>,
    progress: bool,
    json: bool,
) -> Result<()> {
    if !file.exists() {
        bail!("input file does not exist: {}", file.display());
    }

    let sql = fs::read_to_string(&file)
        .with_context(|| format!("reading {}", file.display()))?;
    let (mut schema, load_warnings) = parse_schema(&sql);

    for warning in &load_warnings {
        eprintln!("  ⚠ {}", warning);
    }

    if schema.is_empty() {
        if !json {
            eprintln!("No tables found in the file.");
        }
        return Ok(());
    }

    let implied_count = if no_implied {
        0
    } else {
        detect_implied(&mut schema, &ConventionPolicy)
    };
    let graph = RelationshipGraph::from_schema(schema);

    let include_patterns = parse_patterns(tables.as_deref());
    let exclude_patterns = parse_patterns(exclude.as_deref());

    // Excluded tables get no diagrams and never appear inside anyone else's
    let excluded: AHashSet<TableId> = graph
        .schema()
        .iter()
        .filter(|t| exclude_patterns.iter().any(|p| p.matches(&t.name)))
        .map(|t| t.id)
        .collect();

    let mut targets: Vec<TableId> = graph
        .schema()
        .iter()
        .filter(|t| !excluded.contains(&t.id))
        .filter(|t| {
            include_patterns.is_empty() || include_patterns.iter().any(|p| p.matches(&t.name))
        })
        .map(|t| t.id)
        .collect();
    targets.sort_by_key(|&id| graph.schema().table_name(id));

    // Destination problems are fatal for the whole run; detect them before
    // composing anything
    let diagram_dir = output.join("diagrams");
    let fragment_dir = output.join("tables");
    fs::create_dir_all(&diagram_dir)
        .with_context(|| format!("creating output directory {}", diagram_dir.display()))?;
    fs::create_dir_all(&fragment_dir)
        .with_context(|| format!("creating output directory {}", fragment_dir.display()))?;

    let cancel = CancelFlag::new();
    let renderer = GraphvizRenderer::new(
        RendererConfig {
            command: renderer,
            bitmap_format,
            vector_format,
        },
        cancel.clone(),
    );

    let mut collector = WarningCollector::new();
    let mut summary = ReportSummary {
        tables: targets.len(),
        renderer_available: renderer.is_available(),
        implied_relationships: implied_count,
        ..ReportSummary::default()
    };

    if renderer.is_available() {
        if !json {
            if let Some(version) = renderer.version() {
                eprintln!("Using layout tool: {}", version);
            }
        }

        let options = ComposeOptions {
            diagram_dir: diagram_dir.clone(),
            diagram_url_prefix: "../diagrams".to_string(),
            dot: DotConfig::default(),
            neighborhood: NeighborhoodOptions {
                excluded,
                max_tables: max_diagram_tables,
            },
            include_implied: !no_implied,
        };
        let composer = DiagramComposer::new(&graph, &renderer, cancel.clone(), options);

        let bar = if progress && !json {
            let bar = ProgressBar::new(targets.len() as u64);
            bar.set_style(
                ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
                    .expect("static progress template"),
            );
            Some(bar)
        } else {
            None
        };

        let results = composer.compose_all(&targets, jobs.max(1), bar.as_ref());
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }

        for result in results {
            collector.extend(result.warnings);
            for variant in &result.rendered {
                match variant {
                    DegreeVariant::OneDegree => summary.one_degree_diagrams += 1,
                    DegreeVariant::TwoDegrees => summary.two_degree_diagrams += 1,
                    DegreeVariant::ImpliedTwoDegrees => summary.implied_diagrams += 1,
                }
            }
            if let Some(fragment) = result.fragment {
                let Some(name) = graph.schema().table(result.table).map(|t| t.name.clone()) else {
                    continue;
                };
                let path = fragment_dir.join(format!("{}.html", name));
                fs::write(&path, fragment)
                    .with_context(|| format!("writing fragment {}", path.display()))?;
            }
        }
    } else {
        // One run-level warning, not one per table
        collector.add(DiagramWarning::RendererUnavailable);
    }

    summary.warnings = collector.count();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        eprintln!(
            "\nDiagrams: {} tables, {} one-degree, {} two-degree, {} implied ({} implied relationships detected)",
            summary.tables,
            summary.one_degree_diagrams,
            summary.two_degree_diagrams,
            summary.implied_diagrams,
            summary.implied_relationships,
        );
        collector.print_summary();
    }

    Ok(())
}

fn parse_patterns(list: Option<&str>) -> Vec<Pattern> {
    list.map(|s| {
        s.split(',')
            .filter_map(|p| Pattern::new(p.trim()).ok())
            .collect()
    })
    .unwrap_or_default()
}
