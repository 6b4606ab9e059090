//! External renderer adapter for Graphviz.
//!
//! Turns a serialized graph description into a raster image, a vector image,
//! and an HTML image-map fragment, via one `dot` invocation per variant.
//! Availability of the external tool is probed once per run and cached on the
//! renderer instance; every render after a failed probe short-circuits to
//! [`RenderError::Unavailable`] without spawning anything.

use crate::graph::DegreeVariant;
use once_cell::sync::OnceCell;
use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Cooperative cancellation flag, shared across worker threads
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Renderer configuration, threaded in at construction time
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Layout tool command name or path
    pub command: String,
    /// Raster output format (`png`, `gif`, ...)
    pub bitmap_format: String,
    /// Vector output format (`svg`, ...)
    pub vector_format: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            command: "dot".to_string(),
            bitmap_format: "png".to_string(),
            vector_format: "svg".to_string(),
        }
    }
}

/// Deterministic artifact paths for one (table, variant) pair.
///
/// All three files share the table name as prefix and the variant suffix, so
/// other report components can locate them without extra state.
#[derive(Debug, Clone)]
pub struct DiagramPaths {
    /// Graph description file (`<table>.<variant>.dot`)
    pub description: PathBuf,
    /// Raster image (`<table>.<variant>.<bitmap format>`)
    pub raster: PathBuf,
    /// Vector image (`<table>.<variant>.<vector format>`)
    pub vector: PathBuf,
}

impl DiagramPaths {
    pub fn new(
        dir: &Path,
        table_name: &str,
        variant: DegreeVariant,
        bitmap_format: &str,
        vector_format: &str,
    ) -> Self {
        let base = format!("{}.{}", table_name, variant.file_suffix());
        Self {
            description: dir.join(format!("{}.dot", base)),
            raster: dir.join(format!("{}.{}", base, bitmap_format)),
            vector: dir.join(format!("{}.{}", base, vector_format)),
        }
    }

    /// Remove whatever artifacts exist; missing files are fine
    pub fn discard(&self) {
        for path in [&self.description, &self.raster, &self.vector] {
            let _ = fs::remove_file(path);
        }
    }

    /// True if any of the three files is on disk
    pub fn any_exists(&self) -> bool {
        [&self.description, &self.raster, &self.vector]
            .iter()
            .any(|p| p.exists())
    }
}

/// A successfully rendered diagram
#[derive(Debug, Clone)]
pub struct RenderedDiagram {
    pub raster: PathBuf,
    pub vector: PathBuf,
    /// cmapx image-map fragment emitted by the layout tool
    pub map: String,
}

/// Named render outcomes, so callers and test doubles can branch without
/// string matching
#[derive(Debug)]
pub enum RenderError {
    /// The layout tool is not installed or not resolvable
    Unavailable,
    /// The tool ran and failed
    ExecutionFailed {
        status: Option<i32>,
        stderr: String,
    },
    /// Reading or writing an artifact failed
    Io(std::io::Error),
    /// The run was aborted while this variant was in flight
    Cancelled,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::Unavailable => {
                write!(f, "layout tool not found; install Graphviz or pass --renderer")
            }
            RenderError::ExecutionFailed { status, stderr } => {
                write!(f, "layout tool failed")?;
                if let Some(code) = status {
                    write!(f, " with status {}", code)?;
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {}", stderr)?;
                }
                Ok(())
            }
            RenderError::Io(e) => write!(f, "diagram I/O error: {}", e),
            RenderError::Cancelled => write!(f, "render cancelled"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e)
    }
}

/// Capability interface over the external layout tool.
///
/// Production code uses [`GraphvizRenderer`]; tests substitute doubles that
/// simulate each outcome without spawning a process.
pub trait DiagramRenderer: Sync {
    /// Whether the tool can be invoked at all. Checked once per run by
    /// callers; an unavailable renderer skips all diagram work.
    fn is_available(&self) -> bool;

    /// Configured raster format, used in artifact names and fragment markup
    fn bitmap_format(&self) -> &str;

    /// Configured vector format
    fn vector_format(&self) -> &str;

    /// Write the description file and produce raster, vector, and image map.
    /// On any failure the variant's partial artifacts are removed.
    fn render(&self, description: &str, paths: &DiagramPaths)
        -> Result<RenderedDiagram, RenderError>;
}

/// Graphviz-backed renderer
pub struct GraphvizRenderer {
    config: RendererConfig,
    cancel: CancelFlag,
    version: OnceCell<Option<String>>,
}

impl GraphvizRenderer {
    pub fn new(config: RendererConfig, cancel: CancelFlag) -> Self {
        Self {
            config,
            cancel,
            version: OnceCell::new(),
        }
    }

    /// Tool version string, probed once via `dot -V`
    pub fn version(&self) -> Option<&str> {
        self.version
            .get_or_init(|| probe_version(&self.config.command))
            .as_deref()
    }
}

/// `dot -V` prints its version banner on stderr
fn probe_version(command: &str) -> Option<String> {
    let output = Command::new(command).arg("-V").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let banner = String::from_utf8_lossy(&output.stderr);
    Some(banner.lines().next().unwrap_or("").trim().to_string())
}

impl DiagramRenderer for GraphvizRenderer {
    fn is_available(&self) -> bool {
        self.version().is_some()
    }

    fn bitmap_format(&self) -> &str {
        &self.config.bitmap_format
    }

    fn vector_format(&self) -> &str {
        &self.config.vector_format
    }

    fn render(
        &self,
        description: &str,
        paths: &DiagramPaths,
    ) -> Result<RenderedDiagram, RenderError> {
        if self.cancel.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        if !self.is_available() {
            return Err(RenderError::Unavailable);
        }

        if let Err(e) = fs::write(&paths.description, description) {
            paths.discard();
            return Err(RenderError::Io(e));
        }

        // One invocation per variant: raster and vector via -T/-o pairs, the
        // trailing -Tcmapx lands on stdout as the image map
        let spawned = Command::new(&self.config.command)
            .arg(format!("-T{}", self.config.bitmap_format))
            .arg("-o")
            .arg(&paths.raster)
            .arg(format!("-T{}", self.config.vector_format))
            .arg("-o")
            .arg(&paths.vector)
            .arg("-Tcmapx")
            .arg(&paths.description)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                paths.discard();
                if e.kind() == std::io::ErrorKind::NotFound {
                    return Err(RenderError::Unavailable);
                }
                return Err(RenderError::Io(e));
            }
        };

        // Drain pipes off-thread so a large map cannot deadlock the child
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_reader = thread::spawn(move || read_to_string_lossy(stdout));
        let stderr_reader = thread::spawn(move || read_to_string_lossy(stderr));

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if self.cancel.is_cancelled() {
                        let _ = child.kill();
                        let _ = child.wait();
                        drop(stdout_reader);
                        drop(stderr_reader);
                        paths.discard();
                        return Err(RenderError::Cancelled);
                    }
                    thread::sleep(Duration::from_millis(25));
                }
                Err(e) => {
                    paths.discard();
                    return Err(RenderError::Io(e));
                }
            }
        };

        let map = stdout_reader.join().unwrap_or_default();
        let stderr_text = stderr_reader.join().unwrap_or_default();

        if !status.success() {
            paths.discard();
            return Err(RenderError::ExecutionFailed {
                status: status.code(),
                stderr: stderr_text,
            });
        }

        Ok(RenderedDiagram {
            raster: paths.raster.clone(),
            vector: paths.vector.clone(),
            map,
        })
    }
}

fn read_to_string_lossy(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}
