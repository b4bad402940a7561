//! Pipeline event routing.
//!
//! Routing is split in two: [`decide`] is a pure function from the fetched
//! pipeline state to one of a small closed set of dispositions, and
//! [`EventRouter`] is the executor that fetches that state and carries the
//! disposition out. Events the gate does not recognize are dropped before
//! any credential is issued or any network call is made — the event source
//! evolves independently of this gate, and unknown event shapes must stay
//! harmless.

use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::GateConfig;
use crate::error::{GateError, Result};
use crate::event::{EventKind, PipelineEvent};
use crate::orchestrate::{DeployOrchestrator, DeployReport, DeployRequest};
use crate::pipeline::{PipelineClient, ResolvedStep};
use crate::token::{CredentialIssuer, JwtCredentialIssuer};

/// Release version tag for dev-environment deployments. Dev deploys track a
/// branch, not a build artifact, so the version is a fixed label.
pub const DEV_VERSION: &str = "dev";

const ACTION_DEPLOY: &str = "deploy";
const ACTION_BUILD: &str = "build";
const ACTION_APPROVAL: &str = "approval";
const ENV_DEV: &str = "dev";
const ENV_STAGE: &str = "stage";

// ---------------------------------------------------------------------------
// Decision layer
// ---------------------------------------------------------------------------

/// Which recognized event fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Started,
    Waiting,
}

/// The closed set of things an event can ask the gate to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    NoOp(&'static str),
    Deploy { revision: String, version: String },
    VerifyGate { revision: String, version: String },
}

/// Map `(trigger, fetched state)` to a disposition. Pure — callable from
/// tests without any network.
pub fn decide(trigger: Trigger, resolved: &ResolvedStep, program_id: &str) -> Result<Disposition> {
    if resolved.program.id != program_id {
        return Ok(Disposition::NoOp("event is for another program"));
    }

    match trigger {
        Trigger::Started => {
            if resolved.step.action != ACTION_DEPLOY {
                return Ok(Disposition::NoOp("started step is not a deploy"));
            }
            match resolved.step.environment_type.as_deref() {
                Some(ENV_DEV) => {
                    // The sibling build step knows which branch produced
                    // this execution.
                    let branch = resolved
                        .execution
                        .step_with_action(ACTION_BUILD)
                        .and_then(|s| s.branch.clone())
                        .ok_or_else(|| {
                            GateError::MissingBuildStep(resolved.step_url.to_string())
                        })?;
                    Ok(Disposition::Deploy {
                        revision: branch,
                        version: DEV_VERSION.to_string(),
                    })
                }
                Some(ENV_STAGE) => {
                    let version = artifacts_version(resolved)?;
                    Ok(Disposition::Deploy {
                        revision: version.clone(),
                        version,
                    })
                }
                _ => Ok(Disposition::NoOp("environment is not gated")),
            }
        }
        Trigger::Waiting => {
            if resolved.step.action != ACTION_APPROVAL {
                return Ok(Disposition::NoOp("waiting step is not an approval"));
            }
            let version = artifacts_version(resolved)?;
            Ok(Disposition::VerifyGate {
                revision: version.clone(),
                version,
            })
        }
    }
}

fn artifacts_version(resolved: &ResolvedStep) -> Result<String> {
    resolved
        .execution
        .artifacts_version
        .clone()
        .ok_or_else(|| GateError::MissingArtifactsVersion(resolved.step_url.to_string()))
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// What handling one event amounted to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum Outcome {
    Ignored { reason: String },
    DeployDispatched { revision: String, version: String },
    Advanced,
    Cancelled { missing: Vec<String> },
}

// ---------------------------------------------------------------------------
// EventRouter
// ---------------------------------------------------------------------------

pub struct EventRouter {
    config: Arc<GateConfig>,
    http: reqwest::Client,
    issuer: Arc<dyn CredentialIssuer>,
    orchestrator: Arc<DeployOrchestrator>,
    /// Join handles of dispatched deploys. Long-lived hosts never need
    /// these; one-shot hosts call [`EventRouter::drain`] before exiting so
    /// a dispatched deploy is not killed mid-flight.
    dispatched: tokio::sync::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl EventRouter {
    pub fn new(
        config: Arc<GateConfig>,
        issuer: Arc<dyn CredentialIssuer>,
        orchestrator: Arc<DeployOrchestrator>,
    ) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            issuer,
            orchestrator,
            dispatched: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Production wiring from configuration.
    pub fn from_config(config: Arc<GateConfig>) -> Result<Self> {
        let http = reqwest::Client::new();
        let issuer = Arc::new(JwtCredentialIssuer::new(
            config.credentials.clone(),
            http.clone(),
        ));
        let orchestrator = Arc::new(DeployOrchestrator::from_config(&config)?);
        Ok(Self {
            config,
            http,
            issuer,
            orchestrator,
            dispatched: tokio::sync::Mutex::new(Vec::new()),
        })
    }

    /// Wait for every deploy dispatched so far to finish.
    pub async fn drain(&self) {
        let handles: Vec<_> = self.dispatched.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Handle one inbound event to completion.
    ///
    /// Deploy dispositions are dispatched asynchronously — the router
    /// resolves without waiting for the deploy. The approval gate is the
    /// opposite: verification runs to completion before advance or cancel
    /// is issued, because approving a promotion before confirming the
    /// deployment would defeat the gate.
    pub async fn handle(&self, event: &PipelineEvent) -> Result<Outcome> {
        let (trigger, url) = match event.kind() {
            EventKind::Unrecognized => {
                return Ok(Outcome::Ignored {
                    reason: "unrecognized event or object type".into(),
                })
            }
            EventKind::Started(url) => (Trigger::Started, url),
            EventKind::Waiting(url) => (Trigger::Waiting, url),
        };

        let token = self.issuer.issue().await?;
        let client = PipelineClient::new(self.http.clone(), &self.config.pipeline, token);
        let resolved = client.fetch_step(url).await?;

        match decide(trigger, &resolved, &self.config.program_id)? {
            Disposition::NoOp(reason) => {
                info!(reason, "event resolved without action");
                Ok(Outcome::Ignored {
                    reason: reason.into(),
                })
            }
            Disposition::Deploy { revision, version } => {
                let orchestrator = self.orchestrator.clone();
                let request = DeployRequest {
                    revision: revision.clone(),
                    version: version.clone(),
                    verify_only: false,
                };
                let handle = tokio::spawn(async move {
                    match orchestrator.run(&request).await {
                        Ok(report) if report.success() => {
                            info!(revision = %request.revision, "deploy finished")
                        }
                        Ok(_) => warn!(revision = %request.revision, "deploy finished with failed units"),
                        Err(e) => error!(revision = %request.revision, error = %e, "deploy failed"),
                    }
                });
                self.dispatched.lock().await.push(handle);
                Ok(Outcome::DeployDispatched { revision, version })
            }
            Disposition::VerifyGate { revision, version } => {
                let report = self
                    .orchestrator
                    .run(&DeployRequest {
                        revision,
                        version,
                        verify_only: true,
                    })
                    .await?;
                if report.success() {
                    info!("all expected targets deployed; advancing");
                    client.advance(&resolved).await?;
                    Ok(Outcome::Advanced)
                } else {
                    let missing = match report {
                        DeployReport::Verified { missing, .. } => missing,
                        DeployReport::Deployed { .. } => Vec::new(),
                    };
                    warn!(?missing, "expected targets missing; cancelling");
                    client.cancel(&resolved).await?;
                    Ok(Outcome::Cancelled { missing })
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
