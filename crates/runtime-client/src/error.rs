use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("registry returned {status} for {action}: {body}")]
    Api {
        action: String,
        status: u16,
        body: String,
    },

    #[error("malformed credential string: expected 'user:key'")]
    MalformedCredentials,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
