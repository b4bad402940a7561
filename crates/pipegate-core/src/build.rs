//! Builder and packager boundaries.
//!
//! The build toolchain is opaque to the gate: one configured shell command
//! per unit, run in the unit's directory. Packaging zips the directory as
//! the build left it — installed dependencies included, since the runtime
//! receives the archive as the complete executable.

use async_trait::async_trait;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{GateError, Result};

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Builder: Send + Sync {
    /// Run the unit's build in `dir`. `action` is carried for attribution.
    async fn build(&self, action: &str, dir: &Path) -> Result<()>;
}

/// Runs the configured shell command (`sh -c`) in the unit directory.
pub struct CommandBuilder {
    command: String,
}

impl CommandBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl Builder for CommandBuilder {
    async fn build(&self, action: &str, dir: &Path) -> Result<()> {
        info!(action, command = %self.command, "building");
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| GateError::Build {
                action: action.to_string(),
                detail: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(GateError::Build {
                action: action.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Packager
// ---------------------------------------------------------------------------

pub trait Packager: Send + Sync {
    /// Produce the deployable archive for the built unit at `dir`.
    fn package(&self, action: &str, dir: &Path) -> Result<Vec<u8>>;
}

/// Zips the unit directory in-memory, paths relative to the unit root.
pub struct ZipPackager;

impl Packager for ZipPackager {
    fn package(&self, action: &str, dir: &Path) -> Result<Vec<u8>> {
        zip_directory(dir).map_err(|e| GateError::Package {
            action: action.to_string(),
            detail: e.to_string(),
        })
    }
}

fn zip_directory(dir: &Path) -> std::result::Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(dir)?
            .to_string_lossy()
            .replace('\\', "/");
        if entry.file_type().is_dir() {
            writer.add_directory(format!("{relative}/"), options)?;
        } else if entry.file_type().is_file() {
            writer.start_file(relative, options)?;
            let mut file = std::fs::File::open(entry.path())?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;
            writer.write_all(&buf)?;
        }
    }

    let archive = writer.finish()?.into_inner();
    debug!(bytes = archive.len(), "archive written");
    Ok(archive)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn command_builder_runs_in_unit_dir() {
        let dir = TempDir::new().unwrap();
        let builder = CommandBuilder::new("echo built > marker.txt");
        builder.build("greeter", dir.path()).await.unwrap();
        assert!(dir.path().join("marker.txt").exists());
    }

    #[tokio::test]
    async fn command_builder_failure_names_the_action() {
        let dir = TempDir::new().unwrap();
        let builder = CommandBuilder::new("echo boom >&2; exit 3");
        let err = builder.build("greeter", dir.path()).await.unwrap_err();
        match err {
            GateError::Build { action, detail } => {
                assert_eq!(action, "greeter");
                assert!(detail.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zip_packager_produces_a_zip_with_relative_paths() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.js"), "module.exports = {}").unwrap();
        std::fs::create_dir_all(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/util.js"), "// util").unwrap();

        let archive = ZipPackager.package("greeter", dir.path()).unwrap();
        // Zip local-file-header magic.
        assert_eq!(&archive[..4], b"PK\x03\x04");

        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"index.js".to_string()));
        assert!(names.contains(&"lib/util.js".to_string()));
    }

    #[test]
    fn zip_packager_empty_dir_still_yields_archive() {
        let dir = TempDir::new().unwrap();
        let archive = ZipPackager.package("greeter", dir.path()).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 0);
    }
}
