use std::path::Path;

use dockline_layout::{
    ItemKind, LayoutDocument, LayoutSaver, RestoreOptions, SanitySeverity, WindowRegistry,
};

use crate::error::{LintError, Result};

pub struct LintArgs<'a> {
    pub path: &'a Path,
    /// Dock widgets the host registers. Empty means every name in the file,
    /// so a self-contained file lints without placeholder noise.
    pub docks: &'a [String],
    pub skip_absent: bool,
    pub verbose: bool,
}

pub fn run_lint(args: &LintArgs<'_>) -> Result<()> {
    let path = args.path.display().to_string();
    let bytes = std::fs::read(args.path).map_err(|source| LintError::Read {
        path: path.clone(),
        source,
    })?;
    let document: LayoutDocument =
        serde_json::from_slice(&bytes).map_err(|source| LintError::Invalid {
            path: path.clone(),
            source: source.into(),
        })?;

    let known = if args.docks.is_empty() {
        saved_dock_names(&document)
    } else {
        args.docks.to_vec()
    };

    let registry = LayoutSaver::restore(
        &document,
        &known,
        RestoreOptions {
            skip_absent: args.skip_absent,
            ..RestoreOptions::none()
        },
    )
    .map_err(|source| LintError::Invalid {
        path: path.clone(),
        source,
    })?;

    let findings = inspect(&registry, args.verbose);
    if args.verbose {
        println!("document state hash: {:016x}", document.state_hash());
    }
    if findings.errors > 0 {
        return Err(LintError::Unsound {
            path,
            count: findings.errors,
        });
    }

    println!(
        "{path}: OK ({} window(s), {} dock(s), {} warning(s))",
        registry.window_count(),
        findings.docks,
        findings.warnings,
    );
    Ok(())
}

struct Findings {
    docks: usize,
    warnings: usize,
    errors: usize,
}

fn inspect(registry: &WindowRegistry, verbose: bool) -> Findings {
    let mut findings = Findings {
        docks: 0,
        warnings: 0,
        errors: 0,
    };
    for record in registry.windows() {
        let names = record.area.dock_names();
        findings.docks += names.len();
        let report = record.area.check_sanity();
        for issue in &report.issues {
            match issue.severity {
                SanitySeverity::Warning => findings.warnings += 1,
                SanitySeverity::Error => findings.errors += 1,
            }
        }
        if verbose {
            println!(
                "window {} ({:?}): {} dock(s) {:?}, tree hash {:016x}",
                record.id.get(),
                record.kind,
                names.len(),
                names,
                record.area.tree().state_hash(),
            );
            for issue in &report.issues {
                println!("  [{:?}] {:?}: {}", issue.severity, issue.code, issue.message);
            }
        }
    }
    findings
}

/// Every dock name saved in the document, across all windows.
fn saved_dock_names(document: &LayoutDocument) -> Vec<String> {
    let mut names = Vec::new();
    for window in &document.windows {
        for node in &window.tree.nodes {
            match &node.kind {
                ItemKind::Leaf(group) => names.extend(group.tabs().iter().cloned()),
                ItemKind::Placeholder { dock_name } => names.push(dock_name.clone()),
                ItemKind::Container { .. } => {}
            }
        }
    }
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockline_layout::{AddOptions, DockLocation, Rect};

    fn write_sample_layout(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let mut registry = WindowRegistry::new();
        let main = registry
            .open_main_window(Rect::new(0, 0, 805, 600), Vec::new())
            .expect("main");
        let area = registry.area_mut(main).expect("area");
        area.add_dock_widget("a", DockLocation::OnLeft, None, AddOptions::default())
            .expect("a");
        area.add_dock_widget("b", DockLocation::OnRight, None, AddOptions::default())
            .expect("b");
        let path = dir.path().join("layout.json");
        LayoutSaver::save_to_file(&registry, &path).expect("save");
        path
    }

    #[test]
    fn valid_layout_lints_clean() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_sample_layout(&dir);
        let result = run_lint(&LintArgs {
            path: &path,
            docks: &[],
            skip_absent: false,
            verbose: false,
        });
        assert!(result.is_ok());
    }

    #[test]
    fn missing_file_exits_two() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = run_lint(&LintArgs {
            path: &dir.path().join("missing.json"),
            docks: &[],
            skip_absent: false,
            verbose: false,
        })
        .expect_err("missing file");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn corrupt_json_exits_two() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        std::fs::write(&path, b"{ \"windows\": [ nonsense").expect("write");
        let error = run_lint(&LintArgs {
            path: &path,
            docks: &[],
            skip_absent: false,
            verbose: false,
        })
        .expect_err("corrupt json");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn future_version_exits_two() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_sample_layout(&dir);
        let mut value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        value["schema_version"] = serde_json::json!(999);
        std::fs::write(&path, serde_json::to_vec(&value).expect("bytes")).expect("write");

        let error = run_lint(&LintArgs {
            path: &path,
            docks: &[],
            skip_absent: false,
            verbose: false,
        })
        .expect_err("future version");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn explicit_dock_list_restricts_known_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_sample_layout(&dir);
        // Only "a" is registered; "b" becomes a placeholder, which is still
        // a valid layout.
        let result = run_lint(&LintArgs {
            path: &path,
            docks: &["a".to_string()],
            skip_absent: false,
            verbose: true,
        });
        assert!(result.is_ok());
    }
}
