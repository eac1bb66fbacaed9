use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing a workbook.
#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Read(#[from] calamine::Error),
    #[error("{0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
    #[error("malformed workbook: {0}")]
    Malformed(String),
}

/// Stage-fatal errors. Configuration and I/O problems abort the stage that
/// raised them; per-request generation failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("required column `{column}` not found in {origin}")]
    MissingColumn { column: String, origin: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("settings: {0}")]
    Settings(#[from] config::ConfigError),
    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("cannot write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
}

impl PipelineError {
    pub fn missing_column(column: &str, origin: &str) -> Self {
        PipelineError::MissingColumn {
            column: column.to_string(),
            origin: origin.to_string(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingColumn { .. }
                | PipelineError::InvalidConfig(_)
                | PipelineError::Settings(_)
        )
    }

    pub fn is_io(&self) -> bool {
        matches!(self, PipelineError::Read { .. } | PipelineError::Write { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
