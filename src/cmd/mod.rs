mod graph;
mod report;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "schema-atlas")]
#[command(version)]
#[command(
    about = "Document relational database schemas as linked entity-relationship diagrams",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate relationship diagrams and HTML fragments for every table
    Report {
        /// Input SQL DDL file (CREATE TABLE / ALTER TABLE statements)
        file: PathBuf,

        /// Output directory for diagrams and fragments
        #[arg(short, long, default_value = "atlas")]
        output: PathBuf,

        /// Only include tables matching these glob patterns (comma-separated)
        #[arg(short, long)]
        tables: Option<String>,

        /// Exclude tables matching these glob patterns (comma-separated)
        #[arg(short = 'x', long)]
        exclude: Option<String>,

        /// Skip implied relationship detection and diagrams
        #[arg(long)]
        no_implied: bool,

        /// Worker threads for per-table diagram generation
        #[arg(short, long, default_value_t = 4)]
        jobs: usize,

        /// Layout tool command (Graphviz dot or compatible)
        #[arg(long, default_value = "dot")]
        renderer: String,

        /// Raster image format produced by the layout tool
        #[arg(long, default_value = "png")]
        bitmap_format: String,

        /// Vector image format produced by the layout tool
        #[arg(long, default_value = "svg")]
        vector_format: String,

        /// Cap the number of tables per diagram (unlimited if omitted)
        #[arg(long)]
        max_diagram_tables: Option<usize>,

        /// Show progress during generation
        #[arg(short, long)]
        progress: bool,

        /// Emit a JSON run summary to stdout
        #[arg(long)]
        json: bool,
    },

    /// Print one table's neighborhood as a Graphviz description
    Graph {
        /// Input SQL DDL file
        file: PathBuf,

        /// Focal table name
        #[arg(short, long)]
        table: String,

        /// Degrees of separation: one, two, or implied
        #[arg(short, long, default_value = "one")]
        degrees: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip implied relationship detection
        #[arg(long)]
        no_implied: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Report {
            file,
            output,
            tables,
            exclude,
            no_implied,
            jobs,
            renderer,
            bitmap_format,
            vector_format,
            max_diagram_tables,
            progress,
            json,
        } => report::run(
            file,
            output,
            tables,
            exclude,
            no_implied,
            jobs,
            renderer,
            bitmap_format,
            vector_format,
            max_diagram_tables,
            progress,
            json,
        ),
        Commands::Graph {
            file,
            table,
            degrees,
            output,
            no_implied,
        } => graph::run(file, table, degrees, output, no_implied),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
