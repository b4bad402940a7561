//! Deployable-unit discovery.
//!
//! A repository opts directories into deployment by placing them under
//! `actions/` at its root: one subdirectory per independently-deployable
//! unit. The directory name is the unit name and must be unique — it is the
//! addressing key for the deployment target.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Conventional subdirectory scanned for deployable units.
pub const ACTIONS_DIR: &str = "actions";

#[derive(Debug, Clone, Serialize)]
pub struct ActionSource {
    pub name: String,
    pub dir: PathBuf,
}

/// Scan `root/actions/` one level deep. A missing `actions/` directory is a
/// valid, empty result — repositories without deployable units are silently
/// skipped. Entries that are not directories are ignored.
pub fn discover_actions(root: &Path) -> Result<Vec<ActionSource>> {
    let actions_dir = root.join(ACTIONS_DIR);
    if !actions_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(&actions_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        sources.push(ActionSource {
            name: entry.file_name().to_string_lossy().into_owned(),
            dir: entry.path(),
        });
    }
    // read_dir order is platform-dependent; sort so discovery order is
    // stable across runs.
    sources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(sources)
}

/// The versioned deployment name: `{unit}-{version}`. Units with equal
/// names and different release versions are distinct targets, which is how
/// dev and stage deployments coexist without collision.
pub fn target_name(unit: &str, version: &str) -> String {
    format!("{unit}-{version}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_actions_dir_is_empty_not_an_error() {
        let root = TempDir::new().unwrap();
        let found = discover_actions(root.path()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn one_descriptor_per_subdirectory() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("actions/greeter")).unwrap();
        std::fs::create_dir_all(root.path().join("actions/mailer")).unwrap();

        let found = discover_actions(root.path()).unwrap();
        let names: Vec<_> = found.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["greeter", "mailer"]);
        assert_eq!(found[0].dir, root.path().join("actions/greeter"));
    }

    #[test]
    fn plain_files_are_skipped() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("actions/greeter")).unwrap();
        std::fs::write(root.path().join("actions/README.md"), "docs").unwrap();

        let found = discover_actions(root.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "greeter");
    }

    #[test]
    fn no_recursion_below_one_level() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("actions/greeter/nested")).unwrap();

        let found = discover_actions(root.path()).unwrap();
        let names: Vec<_> = found.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["greeter"]);
    }

    #[test]
    fn target_names_are_version_qualified() {
        assert_eq!(target_name("greeter", "dev"), "greeter-dev");
        assert_eq!(target_name("greeter", "1.2.3"), "greeter-1.2.3");
    }
}
