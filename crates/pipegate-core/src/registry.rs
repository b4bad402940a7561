//! Deployment-registry boundary.
//!
//! The orchestrator talks to the registry through this trait so the deploy
//! workflow can be exercised without a live platform. The production
//! implementation is [`runtime_client::RuntimeClient`].

use async_trait::async_trait;
use runtime_client::{ActionSpec, RuntimeClient};

use crate::error::Result;

#[async_trait]
pub trait ActionRegistry: Send + Sync {
    /// Names of every deployment target currently present.
    async fn list_names(&self) -> Result<Vec<String>>;
    async fn create(&self, spec: &ActionSpec) -> Result<()>;
    async fn update(&self, spec: &ActionSpec) -> Result<()>;
}

#[async_trait]
impl ActionRegistry for RuntimeClient {
    async fn list_names(&self) -> Result<Vec<String>> {
        let actions = self.list_actions().await?;
        Ok(actions.into_iter().map(|a| a.name).collect())
    }

    async fn create(&self, spec: &ActionSpec) -> Result<()> {
        Ok(self.create_action(spec).await?)
    }

    async fn update(&self, spec: &ActionSpec) -> Result<()> {
        Ok(self.update_action(spec).await?)
    }
}
