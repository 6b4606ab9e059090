//! Per-table diagram composition.
//!
//! Drives neighborhood extraction, serialization, and rendering for each
//! table, decides which of the up-to-three diagrams are worth emitting, and
//! assembles the embeddable HTML fragment that toggles between the one- and
//! two-degree views. Tables compose independently and in parallel; the only
//! shared state is the read-only relationship graph and the renderer.

mod warnings;

pub use warnings::*;

use crate::graph::{extract, to_dot, DegreeVariant, DotConfig, NeighborhoodOptions, Neighborhood, RelationshipGraph};
use crate::render::{CancelFlag, DiagramPaths, DiagramRenderer, RenderError, RenderedDiagram};
use crate::schema::TableId;
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::PathBuf;

/// Composition options, threaded in from the CLI
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Directory artifacts are written into
    pub diagram_dir: PathBuf,
    /// Relative prefix under which the fragment references images
    pub diagram_url_prefix: String,
    /// Serializer options
    pub dot: DotConfig,
    /// Neighborhood inclusion/size policy
    pub neighborhood: NeighborhoodOptions,
    /// Whether implied-relationship diagrams are generated at all
    pub include_implied: bool,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            diagram_dir: PathBuf::from("diagrams"),
            diagram_url_prefix: "../diagrams".to_string(),
            dot: DotConfig::default(),
            neighborhood: NeighborhoodOptions::default(),
            include_implied: true,
        }
    }
}

/// Result of composing one table's diagrams
#[derive(Debug)]
pub struct TableDiagram {
    pub table: TableId,
    /// Embeddable HTML fragment; `None` when the renderer is unavailable or
    /// the base one-degree diagram could not be produced
    pub fragment: Option<String>,
    /// Variants whose artifacts exist on disk
    pub rendered: Vec<DegreeVariant>,
    /// Per-variant failures, for the run-level collector
    pub warnings: Vec<DiagramWarning>,
}

impl TableDiagram {
    fn empty(table: TableId) -> Self {
        Self {
            table,
            fragment: None,
            rendered: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Composes relationship diagrams for the tables of one schema.
///
/// Holds only shared read-only state; `compose` may be called concurrently
/// from a worker pool.
pub struct DiagramComposer<'a> {
    graph: &'a RelationshipGraph,
    renderer: &'a dyn DiagramRenderer,
    cancel: CancelFlag,
    options: ComposeOptions,
}

impl<'a> DiagramComposer<'a> {
    pub fn new(
        graph: &'a RelationshipGraph,
        renderer: &'a dyn DiagramRenderer,
        cancel: CancelFlag,
        options: ComposeOptions,
    ) -> Self {
        Self {
            graph,
            renderer,
            cancel,
            options,
        }
    }

    /// Compose the diagrams and HTML fragment for one table.
    ///
    /// Sequencing: the one-degree diagram first (its failure omits the
    /// table's diagrams entirely), then the implied and two-degree variants,
    /// each subject to the emptiness/redundancy policy. Per-variant failures
    /// are recorded and the remaining variants still run.
    pub fn compose(&self, table: TableId) -> TableDiagram {
        if self.cancel.is_cancelled() || !self.renderer.is_available() {
            return TableDiagram::empty(table);
        }
        let Some(table_name) = self.graph.schema().table(table).map(|t| t.name.clone()) else {
            return TableDiagram::empty(table);
        };

        let mut warnings = Vec::new();
        let mut rendered = Vec::new();

        let one_nb = self.extract(table, DegreeVariant::OneDegree);
        let Some(one) = self.render_variant(&one_nb, &table_name, &mut warnings) else {
            return TableDiagram {
                table,
                fragment: None,
                rendered,
                warnings,
            };
        };
        rendered.push(DegreeVariant::OneDegree);

        let implied = if self.options.include_implied {
            let nb = self.extract(table, DegreeVariant::ImpliedTwoDegrees);
            // No implied edge reaches this table within two hops: the
            // variant is empty and gets no artifacts at all
            if nb.only_focus() {
                self.discard_variant(&table_name, DegreeVariant::ImpliedTwoDegrees);
                None
            } else {
                let result = self.render_variant(&nb, &table_name, &mut warnings);
                if result.is_some() {
                    rendered.push(DegreeVariant::ImpliedTwoDegrees);
                }
                result
            }
        } else {
            self.discard_variant(&table_name, DegreeVariant::ImpliedTwoDegrees);
            None
        };

        let two = {
            let nb = self.extract(table, DegreeVariant::TwoDegrees);
            // Nothing new at hop two: the toggle would show the same picture
            if nb.same_tables(&one_nb) {
                self.discard_variant(&table_name, DegreeVariant::TwoDegrees);
                None
            } else {
                let result = self.render_variant(&nb, &table_name, &mut warnings);
                if result.is_some() {
                    rendered.push(DegreeVariant::TwoDegrees);
                }
                result
            }
        };

        let fragment =
            self.assemble_fragment(&table_name, &one, implied.as_ref(), two.as_ref());

        TableDiagram {
            table,
            fragment: Some(fragment),
            rendered,
            warnings,
        }
    }

    /// Compose all given tables on a bounded worker pool.
    ///
    /// Each table writes only its own distinctly-named files, so the pool
    /// runs them without synchronization beyond the shared graph/renderer.
    pub fn compose_all(
        &self,
        tables: &[TableId],
        jobs: usize,
        progress: Option<&ProgressBar>,
    ) -> Vec<TableDiagram> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .expect("building worker pool");

        pool.install(|| {
            tables
                .par_iter()
                .map(|&table| {
                    let result = self.compose(table);
                    if let Some(bar) = progress {
                        bar.inc(1);
                    }
                    result
                })
                .collect()
        })
    }

    fn extract(&self, table: TableId, variant: DegreeVariant) -> Neighborhood {
        extract(self.graph, table, variant, &self.options.neighborhood)
    }

    fn paths_for(&self, table_name: &str, variant: DegreeVariant) -> DiagramPaths {
        DiagramPaths::new(
            &self.options.diagram_dir,
            table_name,
            variant,
            self.renderer.bitmap_format(),
            self.renderer.vector_format(),
        )
    }

    /// A skipped variant leaves no files behind, including stale ones from
    /// an earlier run into the same directory
    fn discard_variant(&self, table_name: &str, variant: DegreeVariant) {
        self.paths_for(table_name, variant).discard();
    }

    /// Serialize and render one variant. Failures discard the variant's
    /// artifacts and surface a warning; cancellation stays silent.
    fn render_variant(
        &self,
        nb: &Neighborhood,
        table_name: &str,
        warnings: &mut Vec<DiagramWarning>,
    ) -> Option<RenderedDiagram> {
        let description = to_dot(self.graph, nb, &self.options.dot);
        let paths = self.paths_for(table_name, nb.variant);

        match self.renderer.render(&description, &paths) {
            Ok(diagram) => Some(diagram),
            Err(RenderError::Cancelled) => {
                paths.discard();
                None
            }
            Err(err) => {
                paths.discard();
                warnings.push(DiagramWarning::RenderFailed {
                    table: table_name.to_string(),
                    variant: nb.variant,
                    reason: err.to_string(),
                });
                None
            }
        }
    }

    /// Assemble the embeddable fragment: toggle form (only when the
    /// two-degree diagram exists), image maps, and one `<object>` per
    /// rendered variant with the raster image as fallback content.
    fn assemble_fragment(
        &self,
        table_name: &str,
        one: &RenderedDiagram,
        implied: Option<&RenderedDiagram>,
        two: Option<&RenderedDiagram>,
    ) -> String {
        let mut html = String::new();

        html.push_str("<br><form action='get'><b>Close relationships");
        if two.is_some() {
            html.push_str(&format!(
                "</b><span class='degrees' id='degrees' title='Detail diminishes with increased separation from {}'>\n",
                table_name
            ));
            html.push_str(
                "&nbsp;within <label for='oneDegree'><input type='radio' name='degrees' id='oneDegree' checked>one</label>",
            );
            html.push_str(
                "  <label for='twoDegrees'><input type='radio' name='degrees' id='twoDegrees'>two degrees</label> of separation",
            );
            html.push_str("</span><b>:</b>\n</form>\n");
        } else {
            html.push_str(":</b></form>\n");
        }

        self.push_diagram(&mut html, one, DegreeVariant::OneDegree);
        if let Some(diagram) = implied {
            self.push_diagram(&mut html, diagram, DegreeVariant::ImpliedTwoDegrees);
        }
        if let Some(diagram) = two {
            self.push_diagram(&mut html, diagram, DegreeVariant::TwoDegrees);
        }

        html
    }

    fn push_diagram(&self, html: &mut String, diagram: &RenderedDiagram, variant: DegreeVariant) {
        let prefix = &self.options.diagram_url_prefix;
        let vector_name = file_name(&diagram.vector);
        let raster_name = file_name(&diagram.raster);

        html.push_str(&diagram.map);
        if !diagram.map.ends_with('\n') {
            html.push('\n');
        }
        html.push_str("  <div class='diagram'>\n");
        html.push_str(&format!(
            "    <object id='{}' data='{}/{}' type='{}'>\n",
            variant.img_id(),
            prefix,
            vector_name,
            vector_mime_type(self.renderer.vector_format()),
        ));
        html.push_str(&format!(
            "      <img src='{}/{}' usemap='#{}'>\n",
            prefix,
            raster_name,
            variant.map_id(),
        ));
        html.push_str("    </object>\n");
        html.push_str("  </div>\n");
    }
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn vector_mime_type(format: &str) -> String {
    match format {
        "svg" => "image/svg+xml".to_string(),
        other => format!("image/{}", other),
    }
}
