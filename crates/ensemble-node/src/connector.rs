//! Factories for connected node clients

use crate::client::{HttpNodeClient, NodeClient};
use crate::error::Result;
use async_trait::async_trait;
use ensemble_core::{RequestContext, Source};
use std::sync::Arc;
use std::time::Duration;

/// Produces a connected [`NodeClient`] for a data node described by a source
#[async_trait]
pub trait NodeConnector: Send + Sync {
    async fn connect(&self, ctx: &RequestContext, source: &Source) -> Result<Arc<dyn NodeClient>>;
}

/// Connects [`HttpNodeClient`]s
#[derive(Debug, Clone)]
pub struct HttpNodeConnector {
    timeout: Duration,
}

impl HttpNodeConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpNodeConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl NodeConnector for HttpNodeConnector {
    async fn connect(&self, ctx: &RequestContext, source: &Source) -> Result<Arc<dyn NodeClient>> {
        let client = HttpNodeClient::with_timeout(self.timeout);
        client.connect(ctx, source).await?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeError;

    #[tokio::test]
    async fn test_connect_failure_yields_no_client() {
        let connector = HttpNodeConnector::new(Duration::from_secs(2));
        let ctx = RequestContext::background();
        let src = Source {
            url: "127.0.0.1:1".to_string(),
            ..Default::default()
        };
        assert!(matches!(connector.connect(&ctx, &src).await, Err(NodeError::Http(_))));
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let connector = HttpNodeConnector::default();
        let ctx = RequestContext::background();
        let src = Source::default();
        assert!(matches!(connector.connect(&ctx, &src).await, Err(NodeError::InvalidUrl(_))));
    }
}
