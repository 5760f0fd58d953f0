//! Budget export documents.
//!
//! The ledger builds a [`BudgetSnapshot`]; a [`DocumentRenderer`] turns it
//! into bytes. JSON and CSV renderers ship in-tree. PDF and spreadsheet
//! output is produced by an external rendering service that registers its
//! own renderer.

pub mod csv;
pub mod json;
pub mod snapshot;

pub use self::csv::CsvRenderer;
pub use self::json::JsonRenderer;
pub use self::snapshot::{BudgetSnapshot, SnapshotExpense};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Export document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// JSON document.
    Json,
    /// Comma-separated values.
    Csv,
    /// PDF report.
    Pdf,
    /// Excel workbook.
    Xlsx,
}

impl ExportFormat {
    /// Parses a format from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "csv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            "xlsx" | "excel" => Some(Self::Xlsx),
            _ => None,
        }
    }

    /// Returns the string representation of the format.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
        }
    }

    /// MIME type of the rendered document.
    #[must_use]
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Csv => "text/csv; charset=utf-8",
            Self::Pdf => "application/pdf",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// File extension.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Export errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No renderer is registered for the format.
    #[error("Export format '{0}' is not available")]
    Unsupported(ExportFormat),

    /// The renderer failed to encode the document.
    #[error("Failed to encode document: {0}")]
    Encoding(String),
}

/// Turns a budget snapshot into a document.
pub trait DocumentRenderer: Send + Sync {
    /// The format this renderer produces.
    fn format(&self) -> ExportFormat;

    /// Renders the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Encoding` if the document cannot be produced.
    fn render(&self, snapshot: &BudgetSnapshot) -> Result<Bytes, RenderError>;
}

/// Renderers by format.
#[derive(Clone)]
pub struct RendererRegistry {
    renderers: HashMap<ExportFormat, Arc<dyn DocumentRenderer>>,
}

impl RendererRegistry {
    /// Registry with no renderers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Registers (or replaces) the renderer for its format.
    #[must_use]
    pub fn with(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderers.insert(renderer.format(), renderer);
        self
    }

    /// Returns true if `format` can be rendered.
    #[must_use]
    pub fn supports(&self, format: ExportFormat) -> bool {
        self.renderers.contains_key(&format)
    }

    /// Looks up the renderer for `format`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Unsupported` if none is registered.
    pub fn get(&self, format: ExportFormat) -> Result<&Arc<dyn DocumentRenderer>, RenderError> {
        self.renderers
            .get(&format)
            .ok_or(RenderError::Unsupported(format))
    }
}

impl Default for RendererRegistry {
    /// The in-tree JSON and CSV renderers.
    fn default() -> Self {
        Self::empty()
            .with(Arc::new(JsonRenderer))
            .with(Arc::new(CsvRenderer))
    }
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut formats: Vec<&str> = self.renderers.keys().map(ExportFormat::as_str).collect();
        formats.sort_unstable();
        f.debug_struct("RendererRegistry")
            .field("formats", &formats)
            .finish()
    }
}
