//! Deploy/verify orchestration.
//!
//! One run materializes the source tree, snapshots the registry once, and
//! then either verifies target presence (approval gate) or builds, packages,
//! and create-or-updates every discovered unit against that snapshot.
//!
//! Create-vs-update is decided solely against the snapshot taken at the
//! start of the run: repeated runs with the same revision and version
//! converge on the same deployed artifacts. A target created mid-run is not
//! visible to later units of the same run — unit names are required unique,
//! so that collision would be a configuration error, not a handled case.
//!
//! Per-unit failures are best-effort: a failing unit's outcome records the
//! error under the unit's name and the remaining units proceed. The run as
//! a whole only fails on run-level errors (source materialization, registry
//! listing).

use futures::future::join_all;
use runtime_client::ActionSpec;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{info, warn};

use crate::build::{Builder, CommandBuilder, Packager, ZipPackager};
use crate::config::GateConfig;
use crate::discover::{discover_actions, target_name, ActionSource};
use crate::error::Result;
use crate::registry::ActionRegistry;
use crate::source::{GitSourceProvider, SourceProvider};

// ---------------------------------------------------------------------------
// Request / report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Branch, tag, or commit to materialize.
    pub revision: String,
    /// Release version qualifying every deployment-target name.
    pub version: String,
    /// Check target presence instead of deploying.
    pub verify_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Created,
    Updated,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    pub name: String,
    pub target: String,
    #[serde(flatten)]
    pub status: UnitStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DeployReport {
    /// Verify-only result: `result` is true iff every expected target was
    /// present in the snapshot.
    Verified { result: bool, missing: Vec<String> },
    /// Deploy result, one outcome per discovered unit.
    Deployed { outcomes: Vec<UnitOutcome> },
}

impl DeployReport {
    pub fn success(&self) -> bool {
        match self {
            DeployReport::Verified { result, .. } => *result,
            DeployReport::Deployed { outcomes } => outcomes
                .iter()
                .all(|o| !matches!(o.status, UnitStatus::Failed { .. })),
        }
    }
}

// ---------------------------------------------------------------------------
// DeployOrchestrator
// ---------------------------------------------------------------------------

pub struct DeployOrchestrator {
    source: Arc<dyn SourceProvider>,
    builder: Arc<dyn Builder>,
    packager: Arc<dyn Packager>,
    registry: Arc<dyn ActionRegistry>,
    kind: String,
}

impl DeployOrchestrator {
    pub fn new(
        source: Arc<dyn SourceProvider>,
        builder: Arc<dyn Builder>,
        packager: Arc<dyn Packager>,
        registry: Arc<dyn ActionRegistry>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            source,
            builder,
            packager,
            registry,
            kind: kind.into(),
        }
    }

    /// Production wiring: git source, configured build command, zip
    /// packager, runtime registry client.
    pub fn from_config(config: &GateConfig) -> Result<Self> {
        let registry = runtime_client::RuntimeClient::new(
            config.runtime.api_host.clone(),
            config.runtime.namespace.clone(),
            &config.runtime.auth,
        )?;
        Ok(Self::new(
            Arc::new(GitSourceProvider::new(config.source.clone())),
            Arc::new(CommandBuilder::new(config.build.command.clone())),
            Arc::new(ZipPackager),
            Arc::new(registry),
            config.runtime.kind.clone(),
        ))
    }

    /// Run one deploy or verify pass. The workspace is a fresh temp
    /// directory removed on drop, success or not.
    pub async fn run(&self, request: &DeployRequest) -> Result<DeployReport> {
        let workspace = TempDir::new()?;
        self.source
            .materialize(workspace.path(), &request.revision)
            .await?;

        // The one and only registry read of this run.
        let snapshot: HashSet<String> = self.registry.list_names().await?.into_iter().collect();

        let units = discover_actions(workspace.path())?;
        info!(
            revision = %request.revision,
            version = %request.version,
            units = units.len(),
            verify_only = request.verify_only,
            "orchestration run"
        );

        if request.verify_only {
            let missing: Vec<String> = units
                .iter()
                .map(|u| target_name(&u.name, &request.version))
                .filter(|t| !snapshot.contains(t))
                .collect();
            return Ok(DeployReport::Verified {
                result: missing.is_empty(),
                missing,
            });
        }

        let outcomes = join_all(
            units
                .iter()
                .map(|unit| self.deploy_unit(unit, &request.version, &snapshot)),
        )
        .await;
        Ok(DeployReport::Deployed { outcomes })
    }

    async fn deploy_unit(
        &self,
        unit: &ActionSource,
        version: &str,
        snapshot: &HashSet<String>,
    ) -> UnitOutcome {
        let target = target_name(&unit.name, version);
        let status = match self.try_deploy(unit, &target, snapshot).await {
            Ok(created) => {
                info!(target = %target, created, "deployed");
                if created {
                    UnitStatus::Created
                } else {
                    UnitStatus::Updated
                }
            }
            Err(e) => {
                warn!(unit = %unit.name, error = %e, "unit deployment failed");
                UnitStatus::Failed {
                    error: e.to_string(),
                }
            }
        };
        UnitOutcome {
            name: unit.name.clone(),
            target,
            status,
        }
    }

    /// Returns `true` when the target was created, `false` when updated.
    async fn try_deploy(
        &self,
        unit: &ActionSource,
        target: &str,
        snapshot: &HashSet<String>,
    ) -> Result<bool> {
        self.builder.build(&unit.name, &unit.dir).await?;
        let archive = self.packager.package(&unit.name, &unit.dir)?;
        let spec = ActionSpec {
            name: target.to_string(),
            kind: self.kind.clone(),
            archive,
            web_export: true,
        };
        if snapshot.contains(target) {
            self.registry.update(&spec).await?;
            Ok(false)
        } else {
            self.registry.create(&spec).await?;
            Ok(true)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
