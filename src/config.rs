//! Run configuration.
//!
//! A [`RunConfig`] is built once per run (directly, via the `with_*` helpers, or from a
//! JSON file) and moved into the worker. Nothing mutates it while a run is active.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CombineError, CombineResult};

/// Sheet read from each workbook when none is configured.
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";
/// Header of the column holding each row's source file name.
pub const DEFAULT_SOURCE_COLUMN: &str = "source_file";
/// File name used by [`RunConfig::default_output_path`].
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "combined.xlsx";

const MAX_SHEET_NAME_LEN: usize = 31;

/// Immutable settings for one combine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory scanned for workbooks.
    pub directory: PathBuf,
    /// Exact (case-sensitive) name of the sheet to read from every workbook.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// Walk subdirectories too.
    #[serde(default)]
    pub recursive: bool,
    /// Prepend a column holding each row's source file name.
    #[serde(default = "default_true")]
    pub add_source_column: bool,
    /// Where the combined workbook is written.
    pub output_path: PathBuf,
    /// Header of the source column.
    #[serde(default = "default_source_column")]
    pub source_column_name: String,
    /// Name of the single sheet in the output workbook.
    #[serde(default = "default_sheet_name")]
    pub output_sheet_name: String,
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

fn default_source_column() -> String {
    DEFAULT_SOURCE_COLUMN.to_string()
}

fn default_true() -> bool {
    true
}

impl RunConfig {
    /// Create a config with default sheet name, non-recursive scan and source column on.
    pub fn new(directory: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            sheet_name: default_sheet_name(),
            recursive: false,
            add_source_column: true,
            output_path: output_path.into(),
            source_column_name: default_source_column(),
            output_sheet_name: default_sheet_name(),
        }
    }

    /// `<directory>/combined.xlsx`, next to the inputs.
    pub fn default_output_path(directory: impl AsRef<Path>) -> PathBuf {
        directory.as_ref().join(DEFAULT_OUTPUT_FILE_NAME)
    }

    pub fn with_sheet_name(mut self, sheet_name: impl Into<String>) -> Self {
        self.sheet_name = sheet_name.into();
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_source_column(mut self, enabled: bool) -> Self {
        self.add_source_column = enabled;
        self
    }

    pub fn with_source_column_name(mut self, name: impl Into<String>) -> Self {
        self.source_column_name = name.into();
        self
    }

    pub fn with_output_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.output_sheet_name = name.into();
        self
    }

    /// Parse a config from JSON. Optional fields take their defaults.
    pub fn from_json_str(json: &str) -> CombineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> CombineResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Reject configurations that cannot start a run.
    pub fn validate(&self) -> CombineResult<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(CombineError::invalid_config("no input directory given"));
        }
        if !self.directory.is_dir() {
            return Err(CombineError::invalid_config(format!(
                "input directory does not exist or is not a directory: {}",
                self.directory.display()
            )));
        }
        if self.sheet_name.trim().is_empty() {
            return Err(CombineError::invalid_config("sheet name must not be empty"));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(CombineError::invalid_config("no output path given"));
        }
        if self.output_path.file_name().is_none() {
            return Err(CombineError::invalid_config(format!(
                "output path has no file name: {}",
                self.output_path.display()
            )));
        }
        if self.output_path.is_dir() {
            return Err(CombineError::invalid_config(format!(
                "output path is a directory: {}",
                self.output_path.display()
            )));
        }
        if self.add_source_column && self.source_column_name.trim().is_empty() {
            return Err(CombineError::invalid_config(
                "source column name must not be empty when the source column is enabled",
            ));
        }
        let out_sheet = self.output_sheet_name.trim();
        if out_sheet.is_empty() || self.output_sheet_name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(CombineError::invalid_config(format!(
                "output sheet name must be 1-{MAX_SHEET_NAME_LEN} characters (got '{}')",
                self.output_sheet_name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RunConfig::new("/tmp", "/tmp/out.xlsx");
        assert_eq!(cfg.sheet_name, "Sheet1");
        assert!(!cfg.recursive);
        assert!(cfg.add_source_column);
        assert_eq!(cfg.source_column_name, "source_file");
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let cfg = RunConfig::from_json_str(
            r#"{"directory": ".", "output_path": "out.xlsx", "sheet_name": "Plan1"}"#,
        )
        .unwrap();
        assert_eq!(cfg.sheet_name, "Plan1");
        assert!(cfg.add_source_column);
        assert_eq!(cfg.output_sheet_name, "Sheet1");
    }

    #[test]
    fn json_without_directory_is_rejected() {
        let err = RunConfig::from_json_str(r#"{"output_path": "out.xlsx"}"#).unwrap_err();
        assert!(matches!(err, CombineError::Json(_)));
    }

    #[test]
    fn validate_accepts_existing_directory() {
        let dir = std::env::temp_dir();
        let cfg = RunConfig::new(&dir, dir.join("out.xlsx"));
        cfg.validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_directory() {
        let cfg = RunConfig::new("/definitely/not/here/sheet-stacker", "/tmp/out.xlsx");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn validate_rejects_blank_sheet_name() {
        let dir = std::env::temp_dir();
        let cfg = RunConfig::new(&dir, dir.join("out.xlsx")).with_sheet_name("  ");
        assert!(matches!(cfg.validate(), Err(CombineError::InvalidConfig { .. })));
    }

    #[test]
    fn validate_rejects_empty_output_path() {
        let dir = std::env::temp_dir();
        let cfg = RunConfig::new(&dir, "");
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("no output path"));
    }

    #[test]
    fn validate_rejects_blank_source_column_only_when_enabled() {
        let dir = std::env::temp_dir();
        let cfg = RunConfig::new(&dir, dir.join("out.xlsx")).with_source_column_name("");
        assert!(cfg.validate().is_err());
        cfg.with_source_column(false).validate().unwrap();
    }

    #[test]
    fn validate_rejects_long_output_sheet_name() {
        let dir = std::env::temp_dir();
        let cfg = RunConfig::new(&dir, dir.join("out.xlsx"))
            .with_output_sheet_name("x".repeat(32));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_output_path_sits_in_directory() {
        assert_eq!(
            RunConfig::default_output_path("/data"),
            Path::new("/data").join("combined.xlsx")
        );
    }
}
