#![forbid(unsafe_code)]

pub mod cli;
pub mod error;
pub mod lint;

pub use cli::run_from_env;
pub use error::{LintError, Result};
