//! Warning system for diagram composition.
//!
//! Tracks per-(table, variant) render failures and run-level conditions so
//! the report can finish with fewer diagrams instead of aborting, and the
//! user sees one consolidated summary at the end.

use crate::graph::DegreeVariant;
use std::fmt;

/// Warning types that can occur while composing diagrams
#[derive(Debug, Clone, PartialEq)]
pub enum DiagramWarning {
    /// The layout tool could not be found; reported once per run
    RendererUnavailable,
    /// A single variant failed to render and was omitted
    RenderFailed {
        table: String,
        variant: DegreeVariant,
        reason: String,
    },
}

impl fmt::Display for DiagramWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagramWarning::RendererUnavailable => {
                write!(
                    f,
                    "layout tool not found; relationship diagrams will be omitted"
                )
            }
            DiagramWarning::RenderFailed {
                table,
                variant,
                reason,
            } => {
                write!(f, "diagram for {} ({}) omitted: {}", table, variant, reason)
            }
        }
    }
}

/// Collects warnings during composition
#[derive(Debug, Default)]
pub struct WarningCollector {
    warnings: Vec<DiagramWarning>,
    max_warnings: usize,
}

impl WarningCollector {
    pub fn new() -> Self {
        Self {
            warnings: Vec::new(),
            max_warnings: 100,
        }
    }

    /// Add a warning, deduplicating repeats of the same condition
    pub fn add(&mut self, warning: DiagramWarning) {
        if self.warnings.len() < self.max_warnings {
            if !self.warnings.iter().any(|w| Self::is_similar(w, &warning)) {
                self.warnings.push(warning);
            }
        }
    }

    /// Merge warnings collected by a per-table composition
    pub fn extend(&mut self, warnings: impl IntoIterator<Item = DiagramWarning>) {
        for w in warnings {
            self.add(w);
        }
    }

    fn is_similar(a: &DiagramWarning, b: &DiagramWarning) -> bool {
        match (a, b) {
            (DiagramWarning::RendererUnavailable, DiagramWarning::RendererUnavailable) => true,
            (
                DiagramWarning::RenderFailed {
                    table: t1,
                    variant: v1,
                    ..
                },
                DiagramWarning::RenderFailed {
                    table: t2,
                    variant: v2,
                    ..
                },
            ) => t1 == t2 && v1 == v2,
            _ => false,
        }
    }

    /// Get all collected warnings
    pub fn warnings(&self) -> &[DiagramWarning] {
        &self.warnings
    }

    /// Check if any warnings were collected
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Get warning count
    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    /// Print summary of warnings
    pub fn print_summary(&self) {
        if self.warnings.is_empty() {
            return;
        }

        eprintln!("\nDiagram warnings ({}):", self.warnings.len());
        for warning in &self.warnings {
            eprintln!("  ⚠ {}", warning);
        }

        if self.warnings.len() >= self.max_warnings {
            eprintln!("  ... (additional warnings truncated)");
        }
    }
}
