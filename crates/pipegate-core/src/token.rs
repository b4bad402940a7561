//! Credential issuer: signed-assertion bearer token exchange.
//!
//! Each run signs a short-lived RS256 assertion with the configured private
//! key and trades it for a bearer token at the exchange endpoint. Tokens are
//! never cached — runs are short-lived and stateless, and one extra
//! round-trip per event is the accepted cost.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::CredentialConfig;
use crate::error::{GateError, Result};

/// Assertion lifetime. The exchange happens immediately after signing, so
/// one hour leaves ample clock-skew headroom.
const EXPIRATION_SECS: i64 = 60 * 60;

// ---------------------------------------------------------------------------
// CredentialIssuer
// ---------------------------------------------------------------------------

#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    /// Produce a bearer token valid against the pipeline API.
    async fn issue(&self) -> Result<String>;
}

// ---------------------------------------------------------------------------
// JwtCredentialIssuer
// ---------------------------------------------------------------------------

pub struct JwtCredentialIssuer {
    config: CredentialConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl JwtCredentialIssuer {
    pub fn new(config: CredentialConfig, http: reqwest::Client) -> Self {
        Self { config, http }
    }

    /// Build and sign the assertion payload. Claims beyond the registered
    /// ones are the configured metascopes, each asserted `true`.
    fn signed_assertion(&self) -> Result<String> {
        let mut claims = Map::new();
        claims.insert(
            "exp".into(),
            Value::from(Utc::now().timestamp() + EXPIRATION_SECS),
        );
        claims.insert("iss".into(), Value::from(self.config.issuer.clone()));
        claims.insert("sub".into(), Value::from(self.config.subject.clone()));
        claims.insert("aud".into(), Value::from(self.config.audience.clone()));
        for scope in &self.config.metascopes {
            claims.insert(scope.clone(), Value::Bool(true));
        }

        let pem = self.config.private_key_pem()?;
        let key = EncodingKey::from_rsa_pem(pem.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
    }
}

#[async_trait]
impl CredentialIssuer for JwtCredentialIssuer {
    async fn issue(&self) -> Result<String> {
        let assertion = self.signed_assertion()?;

        debug!(url = %self.config.token_url, "exchanging signed assertion");

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("jwt_token", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GateError::Token(format!(
                "exchange endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| GateError::Token(format!("malformed exchange response: {e}")))?;
        Ok(token.access_token)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
