use thiserror::Error;

use dockline_layout::SaverError;

pub type Result<T> = std::result::Result<T, LintError>;

/// Failures of a lint run, mapped onto process exit codes: 1 for usage
/// errors, 2 for layout files that fail validation.
#[derive(Debug, Error)]
pub enum LintError {
    #[error("{0}")]
    Usage(#[from] clap::Error),

    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Invalid { path: String, source: SaverError },

    #[error("{path}: {count} sanity issue(s); run with --verbose for details")]
    Unsound { path: String, count: usize },
}

impl LintError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 1,
            Self::Read { .. } | Self::Invalid { .. } | Self::Unsound { .. } => 2,
        }
    }
}
