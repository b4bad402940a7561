use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("link relation not found: {0}")]
    LinkNotFound(String),

    #[error("no build step in execution for step state at {0}")]
    MissingBuildStep(String),

    #[error("execution has no artifacts version for step state at {0}")]
    MissingArtifactsVersion(String),

    #[error("source checkout of '{revision}' failed: {detail}")]
    Source { revision: String, detail: String },

    #[error("build failed for action '{action}': {detail}")]
    Build { action: String, detail: String },

    #[error("packaging failed for action '{action}': {detail}")]
    Package { action: String, detail: String },

    #[error("pipeline API call to {url} returned {status}")]
    PipelineApi { url: String, status: u16 },

    #[error("token exchange failed: {0}")]
    Token(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid url '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    #[error(transparent)]
    Registry(#[from] runtime_client::RuntimeError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GateError>;
