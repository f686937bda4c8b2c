use thiserror::Error;

/// Convenience result type for combine operations.
pub type CombineResult<T> = Result<T, CombineError>;

/// Error type returned across locating, extracting and writing.
///
/// Per-file failures are caught by the pipeline and turned into log entries; only
/// configuration errors, a second `start`, and write-phase failures reach callers.
#[derive(Debug, Error)]
pub enum CombineError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Workbook could not be opened or a sheet could not be read.
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Output workbook could not be built or saved.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Directory walk failed.
    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// A configuration file could not be parsed.
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The run configuration was rejected before any work started.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// `start` was called while a run was still active.
    #[error("a combine run is already in progress")]
    RunInProgress,

    /// The combined table does not fit in one worksheet.
    #[error("combined table too large for one worksheet: {rows} rows x {columns} columns")]
    OutputTooLarge { rows: usize, columns: usize },
}

impl CombineError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
