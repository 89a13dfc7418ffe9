use std::path::PathBuf;

use clap::Parser;

use crate::error::Result;
use crate::lint::{run_lint, LintArgs};

#[derive(Debug, Parser)]
#[command(
    name = "dockline-lint",
    about = "Validate saved dockline layout files: schema, structure, and sanity",
    version
)]
pub struct Cli {
    /// Layout JSON file to validate.
    pub path: PathBuf,

    /// A dock widget name the host registers; may be repeated. Defaults to
    /// every name found in the file.
    #[arg(long = "dock", value_name = "NAME")]
    pub docks: Vec<String>,

    /// Drop absent docks instead of keeping placeholders.
    #[arg(long)]
    pub skip_absent: bool,

    /// Print per-window findings and state hashes.
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn run_from_env() -> Result<()> {
    // Usage errors map to exit 1; help and version print and exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) if error.use_stderr() => return Err(error.into()),
        Err(error) => error.exit(),
    };
    run(&cli)
}

pub fn run(cli: &Cli) -> Result<()> {
    run_lint(&LintArgs {
        path: &cli.path,
        docks: &cli.docks,
        skip_absent: cli.skip_absent,
        verbose: cli.verbose,
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Cli;

    #[test]
    fn parses_repeated_dock_flags() {
        let cli = Cli::parse_from([
            "dockline-lint",
            "layout.json",
            "--dock",
            "editor",
            "--dock",
            "console",
            "--verbose",
        ]);
        assert_eq!(cli.docks, ["editor", "console"]);
        assert!(cli.verbose);
        assert!(!cli.skip_absent);
    }

    #[test]
    fn rejects_missing_path() {
        assert!(Cli::try_parse_from(["dockline-lint"]).is_err());
    }
}
