//! Pipeline API resources and client.
//!
//! The pipeline API is hypermedia-driven: the event carries the step-state
//! URL, and everything else (execution, program, advance, cancel) is reached
//! by following `_links` relations embedded in the fetched resource. Only
//! the entry-point URL is ever hardcoded by the caller; hrefs may be
//! relative and are resolved against the step-state URL.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::PipelineApiConfig;
use crate::error::{GateError, Result};

pub const REL_EXECUTION: &str = "https://ns.pipegate.io/rel/execution";
pub const REL_PROGRAM: &str = "https://ns.pipegate.io/rel/program";
pub const REL_ADVANCE: &str = "https://ns.pipegate.io/rel/pipeline/advance";
pub const REL_CANCEL: &str = "https://ns.pipegate.io/rel/pipeline/cancel";

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Links(pub HashMap<String, Link>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
}

impl Links {
    /// Follow a named relation. Missing relations are a structural error,
    /// never a panic.
    pub fn follow(&self, rel: &str) -> Result<&str> {
        self.0
            .get(rel)
            .map(|l| l.href.as_str())
            .ok_or_else(|| GateError::LinkNotFound(rel.to_string()))
    }
}

/// One pipeline step's current record. `branch` is only populated on build
/// steps; the gate reads it off the sibling build step when deploying dev.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepState {
    pub action: String,
    #[serde(rename = "environmentType", default)]
    pub environment_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(rename = "_links", default)]
    pub links: Links,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    #[serde(rename = "artifactsVersion", default)]
    pub artifacts_version: Option<String>,
    #[serde(rename = "_embedded", default)]
    pub embedded: EmbeddedSteps,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddedSteps {
    #[serde(rename = "stepStates", default)]
    pub step_states: Vec<StepState>,
}

impl Execution {
    /// The sibling step with the given action, if any.
    pub fn step_with_action(&self, action: &str) -> Option<&StepState> {
        self.embedded.step_states.iter().find(|s| s.action == action)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
}

/// A step state together with the resources its links point at, fetched
/// fresh for one event. `step_url` is kept for resolving further relations.
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub step: StepState,
    pub execution: Execution,
    pub program: Program,
    pub step_url: Url,
}

// ---------------------------------------------------------------------------
// PipelineClient
// ---------------------------------------------------------------------------

/// Authenticated client for the pipeline API. One instance per event —
/// the bearer token it carries is issued fresh for each invocation.
#[derive(Debug, Clone)]
pub struct PipelineClient {
    http: reqwest::Client,
    token: String,
    api_key: String,
    org_id: String,
}

impl PipelineClient {
    pub fn new(http: reqwest::Client, config: &PipelineApiConfig, token: String) -> Self {
        Self {
            http,
            token,
            api_key: config.api_key.clone(),
            org_id: config.org_id.clone(),
        }
    }

    /// Fetch the step state at `url`, then its execution and program via
    /// link relations.
    pub async fn fetch_step(&self, url: &str) -> Result<ResolvedStep> {
        let step_url = parse_url(url)?;
        let step: StepState = self.get_json(step_url.clone()).await?;

        let execution_url = resolve(&step_url, step.links.follow(REL_EXECUTION)?)?;
        let execution: Execution = self.get_json(execution_url).await?;

        let program_url = resolve(&step_url, step.links.follow(REL_PROGRAM)?)?;
        let program: Program = self.get_json(program_url).await?;

        debug!(program = %program.id, action = %step.action, "resolved step state");

        Ok(ResolvedStep {
            step,
            execution,
            program,
            step_url,
        })
    }

    /// Approve the waiting step: PUT `{"approved": true}` to its advance
    /// relation.
    pub async fn advance(&self, resolved: &ResolvedStep) -> Result<()> {
        let url = resolve(&resolved.step_url, resolved.step.links.follow(REL_ADVANCE)?)?;
        self.put_approval(url, true).await
    }

    /// Reject the waiting step: PUT `{"approved": false}` to its cancel
    /// relation.
    pub async fn cancel(&self, resolved: &ResolvedStep) -> Result<()> {
        let url = resolve(&resolved.step_url, resolved.step.links.follow(REL_CANCEL)?)?;
        self.put_approval(url, false).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.request(reqwest::Method::GET, url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(GateError::PipelineApi {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn put_approval(&self, url: Url, approved: bool) -> Result<()> {
        let response = self
            .request(reqwest::Method::PUT, url.clone())
            .json(&serde_json::json!({ "approved": approved }))
            .send()
            .await?;
        // The advance/cancel endpoints answer with an empty body; only the
        // status matters.
        if !response.status().is_success() {
            return Err(GateError::PipelineApi {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&self.token)
            .header("x-api-key", &self.api_key)
            .header("x-org-id", &self.org_id)
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| GateError::InvalidUrl {
        url: url.to_string(),
        detail: e.to_string(),
    })
}

/// Resolve an href against the step-state URL. Absolute hrefs pass through;
/// relative ones join.
fn resolve(base: &Url, href: &str) -> Result<Url> {
    base.join(href).map_err(|e| GateError::InvalidUrl {
        url: href.to_string(),
        detail: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineApiConfig;

    fn client() -> PipelineClient {
        PipelineClient::new(
            reqwest::Client::new(),
            &PipelineApiConfig {
                api_key: "key-123".into(),
                org_id: "org-123".into(),
            },
            "bearer-token".into(),
        )
    }

    fn step_state_body(server_url: &str) -> String {
        format!(
            r#"{{
              "action": "approval",
              "environmentType": "stage",
              "_links": {{
                "{REL_EXECUTION}": {{ "href": "/execution/11" }},
                "{REL_PROGRAM}": {{ "href": "{server_url}/program/4242" }},
                "{REL_ADVANCE}": {{ "href": "/step/7/advance" }},
                "{REL_CANCEL}": {{ "href": "/step/7/cancel" }}
              }}
            }}"#
        )
    }

    #[tokio::test]
    async fn fetch_step_follows_execution_and_program_links() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let step_mock = server
            .mock("GET", "/step/7")
            .match_header("authorization", "Bearer bearer-token")
            .match_header("x-api-key", "key-123")
            .match_header("x-org-id", "org-123")
            .with_body(step_state_body(&url))
            .create_async()
            .await;
        // Relative href resolved against the step URL.
        let execution_mock = server
            .mock("GET", "/execution/11")
            .with_body(r#"{"artifactsVersion":"1.2.3","_embedded":{"stepStates":[{"action":"build","branch":"main"}]}}"#)
            .create_async()
            .await;
        // Absolute href passes through unchanged.
        let program_mock = server
            .mock("GET", "/program/4242")
            .with_body(r#"{"id":"4242"}"#)
            .create_async()
            .await;

        let resolved = client().fetch_step(&format!("{url}/step/7")).await.unwrap();
        step_mock.assert_async().await;
        execution_mock.assert_async().await;
        program_mock.assert_async().await;

        assert_eq!(resolved.program.id, "4242");
        assert_eq!(resolved.execution.artifacts_version.as_deref(), Some("1.2.3"));
        assert_eq!(
            resolved
                .execution
                .step_with_action("build")
                .and_then(|s| s.branch.as_deref()),
            Some("main")
        );
    }

    #[tokio::test]
    async fn advance_puts_approved_true() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        server
            .mock("GET", "/step/7")
            .with_body(step_state_body(&url))
            .create_async()
            .await;
        server
            .mock("GET", "/execution/11")
            .with_body(r#"{"artifactsVersion":"1.2.3"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/program/4242")
            .with_body(r#"{"id":"4242"}"#)
            .create_async()
            .await;
        let advance_mock = server
            .mock("PUT", "/step/7/advance")
            .match_body(mockito::Matcher::Json(serde_json::json!({"approved": true})))
            .with_status(202)
            .create_async()
            .await;

        let c = client();
        let resolved = c.fetch_step(&format!("{url}/step/7")).await.unwrap();
        c.advance(&resolved).await.unwrap();
        advance_mock.assert_async().await;
    }

    #[tokio::test]
    async fn cancel_puts_approved_false() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();
        server
            .mock("GET", "/step/7")
            .with_body(step_state_body(&url))
            .create_async()
            .await;
        server
            .mock("GET", "/execution/11")
            .with_body(r#"{"artifactsVersion":"1.2.3"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/program/4242")
            .with_body(r#"{"id":"4242"}"#)
            .create_async()
            .await;
        let cancel_mock = server
            .mock("PUT", "/step/7/cancel")
            .match_body(mockito::Matcher::Json(serde_json::json!({"approved": false})))
            .with_status(202)
            .create_async()
            .await;

        let c = client();
        let resolved = c.fetch_step(&format!("{url}/step/7")).await.unwrap();
        c.cancel(&resolved).await.unwrap();
        cancel_mock.assert_async().await;
    }

    #[tokio::test]
    async fn missing_link_relation_is_a_structural_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/step/7")
            .with_body(r#"{"action":"deploy","_links":{}}"#)
            .create_async()
            .await;

        let err = client()
            .fetch_step(&format!("{}/step/7", server.url()))
            .await
            .unwrap_err();
        match err {
            GateError::LinkNotFound(rel) => assert_eq!(rel, REL_EXECUTION),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_success_status_carries_url_and_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/step/7")
            .with_status(503)
            .create_async()
            .await;

        let err = client()
            .fetch_step(&format!("{}/step/7", server.url()))
            .await
            .unwrap_err();
        match err {
            GateError::PipelineApi { url, status } => {
                assert!(url.ends_with("/step/7"));
                assert_eq!(status, 503);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn follow_reports_the_missing_relation() {
        let links = Links::default();
        match links.follow(REL_ADVANCE) {
            Err(GateError::LinkNotFound(rel)) => assert_eq!(rel, REL_ADVANCE),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
