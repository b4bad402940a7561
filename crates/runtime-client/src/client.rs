use base64::Engine as _;
use tracing::debug;

use crate::error::RuntimeError;
use crate::types::{ActionBody, ActionSpec, ActionSummary, Annotation, ExecBody};
use crate::Result;

/// How many actions one listing page may return. The gate deploys a handful
/// of actions per repository, so a single page is always enough.
const LIST_LIMIT: u32 = 200;

// ---------------------------------------------------------------------------
// RuntimeClient
// ---------------------------------------------------------------------------

/// REST client for one namespace of the serverless runtime.
///
/// Create and update map onto the registry's PUT endpoint; the only
/// difference is the `overwrite=true` query flag, which the registry
/// requires before it will replace an existing action.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    http: reqwest::Client,
    api_host: String,
    namespace: String,
    auth_user: String,
    auth_key: String,
}

impl RuntimeClient {
    /// `auth` is the platform's `user:key` credential pair.
    pub fn new(api_host: impl Into<String>, namespace: impl Into<String>, auth: &str) -> Result<Self> {
        let (user, key) = auth
            .split_once(':')
            .ok_or(RuntimeError::MalformedCredentials)?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_host: api_host.into().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            auth_user: user.to_string(),
            auth_key: key.to_string(),
        })
    }

    fn actions_url(&self) -> String {
        format!(
            "{}/api/v1/namespaces/{}/actions",
            self.api_host, self.namespace
        )
    }

    /// List the deployed actions in the namespace (names only matter to the
    /// gate; see [`ActionSummary`]).
    pub async fn list_actions(&self) -> Result<Vec<ActionSummary>> {
        let url = format!("{}?limit={LIST_LIMIT}&skip=0", self.actions_url());
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.auth_user, Some(&self.auth_key))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error("<list>", response).await);
        }
        Ok(response.json().await?)
    }

    /// Register a new action. Fails if the name already exists.
    pub async fn create_action(&self, spec: &ActionSpec) -> Result<()> {
        self.put_action(spec, false).await
    }

    /// Replace an existing action.
    pub async fn update_action(&self, spec: &ActionSpec) -> Result<()> {
        self.put_action(spec, true).await
    }

    async fn put_action(&self, spec: &ActionSpec, overwrite: bool) -> Result<()> {
        let mut url = format!("{}/{}", self.actions_url(), spec.name);
        if overwrite {
            url.push_str("?overwrite=true");
        }

        let body = ActionBody {
            exec: ExecBody {
                kind: spec.kind.clone(),
                code: base64::engine::general_purpose::STANDARD.encode(&spec.archive),
                binary: true,
            },
            annotations: vec![Annotation {
                key: "web-export".into(),
                value: serde_json::Value::Bool(spec.web_export),
            }],
        };

        debug!(action = %spec.name, overwrite, bytes = spec.archive.len(), "uploading action");

        let response = self
            .http
            .put(&url)
            .basic_auth(&self.auth_user, Some(&self.auth_key))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(&spec.name, response).await);
        }
        Ok(())
    }
}

/// Fold a non-2xx response into [`RuntimeError::Api`], keeping whatever body
/// the registry sent so failures stay attributable.
async fn api_error(action: &str, response: reqwest::Response) -> RuntimeError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    RuntimeError::Api {
        action: action.to_string(),
        status,
        body,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    fn spec(name: &str) -> ActionSpec {
        ActionSpec {
            name: name.to_string(),
            kind: "nodejs:20".to_string(),
            archive: b"PK\x03\x04fake-zip".to_vec(),
            web_export: true,
        }
    }

    #[tokio::test]
    async fn list_actions_returns_names() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/namespaces/acme/actions")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("limit".into(), "200".into()),
                mockito::Matcher::UrlEncoded("skip".into(), "0".into()),
            ]))
            .with_body(r#"[{"name":"greeter-dev"},{"name":"mailer-1.2.3","version":"0.0.2"}]"#)
            .create_async()
            .await;

        let client = RuntimeClient::new(server.url(), "acme", "user:key").unwrap();
        let actions = client.list_actions().await.unwrap();
        mock.assert_async().await;

        let names: Vec<_> = actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["greeter-dev", "mailer-1.2.3"]);
    }

    #[tokio::test]
    async fn create_does_not_send_overwrite() {
        let mut server = mockito::Server::new_async().await;
        // No query matcher: a request carrying `overwrite=true` would not
        // match this mock.
        let mock = server
            .mock("PUT", "/api/v1/namespaces/acme/actions/greeter-dev")
            .with_status(200)
            .create_async()
            .await;

        let client = RuntimeClient::new(server.url(), "acme", "user:key").unwrap();
        client.create_action(&spec("greeter-dev")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn update_sends_overwrite_flag() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/v1/namespaces/acme/actions/greeter-dev")
            .match_query(mockito::Matcher::UrlEncoded(
                "overwrite".into(),
                "true".into(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let client = RuntimeClient::new(server.url(), "acme", "user:key").unwrap();
        client.update_action(&spec("greeter-dev")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn put_body_carries_base64_archive_and_web_export() {
        let mut server = mockito::Server::new_async().await;
        let expected_code = base64::engine::general_purpose::STANDARD.encode(b"PK\x03\x04fake-zip");
        let mock = server
            .mock("PUT", "/api/v1/namespaces/acme/actions/greeter-dev")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "exec": { "kind": "nodejs:20", "code": expected_code, "binary": true },
                "annotations": [{ "key": "web-export", "value": true }],
            })))
            .with_status(200)
            .create_async()
            .await;

        let client = RuntimeClient::new(server.url(), "acme", "user:key").unwrap();
        client.create_action(&spec("greeter-dev")).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_failure_carries_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/api/v1/namespaces/acme/actions/greeter-dev")
            .with_status(409)
            .with_body("resource already exists")
            .create_async()
            .await;

        let client = RuntimeClient::new(server.url(), "acme", "user:key").unwrap();
        let err = client.create_action(&spec("greeter-dev")).await.unwrap_err();
        match err {
            RuntimeError::Api {
                action,
                status,
                body,
            } => {
                assert_eq!(action, "greeter-dev");
                assert_eq!(status, 409);
                assert!(body.contains("already exists"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn credentials_must_contain_separator() {
        let err = RuntimeClient::new("https://runtime.example.com", "acme", "no-separator");
        assert!(matches!(err, Err(RuntimeError::MalformedCredentials)));
    }
}
