//! Cluster client: discovery through the meta endpoint and round-robin
//! dispatch across the connected data nodes

use crate::config::ClientConfig;
use crate::error::{ClusterError, Result};
use crate::pool::NodePool;
use ensemble_core::permissions::catalog;
use ensemble_core::{authorizer_for, Authorizer, Permissions, Point, Query, QueryResponse, RequestContext, Source};
use ensemble_meta::{
    parse_meta_url, MetaClient, MetaClientOptions, MetaCtrl, MetaRolesStore, MetaUsersStore, RolesStore,
    UsersStore,
};
use ensemble_node::{HttpNodeConnector, NodeClient, NodeConnector, NodeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

type Node = Arc<dyn NodeClient>;

/// Client for a cluster of data nodes administered by a meta endpoint.
///
/// `connect` asks the meta endpoint for the current data nodes, connects to
/// each one and keeps those that answered. Queries and writes then go to one
/// node at a time in rotation. The node set is a snapshot taken at connect
/// time and is not refreshed afterwards.
pub struct ClusterClient {
    ctrl: Arc<dyn MetaCtrl>,
    connector: Arc<dyn NodeConnector>,
    pool: OnceCell<NodePool<Node>>,
    opened: AtomicBool,
}

impl ClusterClient {
    pub fn new(ctrl: Arc<dyn MetaCtrl>, connector: Arc<dyn NodeConnector>) -> Self {
        Self {
            ctrl,
            connector,
            pool: OnceCell::new(),
            opened: AtomicBool::new(false),
        }
    }

    /// Build a client from validated configuration
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let base = parse_meta_url(&config.meta_url, config.tls)?;
        let options = MetaClientOptions {
            insecure_skip_verify: config.insecure_skip_verify,
            timeout: config.request_timeout(),
            max_redirects: config.max_redirects,
        };
        let ctrl = MetaClient::with_options(base, authorizer_for(&config.source()), options)?;

        Ok(Self::new(
            Arc::new(ctrl),
            Arc::new(HttpNodeConnector::new(config.request_timeout())),
        ))
    }

    /// Build a client for the meta endpoint at `meta_url`.
    ///
    /// The URL is parsed here so a malformed address fails before any
    /// network I/O. `tls` forces HTTPS regardless of the scheme given.
    pub fn with_url(meta_url: &str, authorizer: Arc<dyn Authorizer>, tls: bool, insecure: bool) -> Result<Self> {
        let base = parse_meta_url(meta_url, tls)?;
        let ctrl = MetaClient::new(base, insecure, authorizer)?;
        Ok(Self::new(Arc::new(ctrl), Arc::new(HttpNodeConnector::default())))
    }

    /// Build a client over an already known set of data nodes.
    ///
    /// `connect` still has to be called before dispatching, but it will not
    /// run discovery while the set is non-empty.
    pub fn with_nodes(ctrl: Arc<dyn MetaCtrl>, nodes: Vec<Node>) -> Self {
        let pool = if nodes.is_empty() {
            OnceCell::new()
        } else {
            OnceCell::new_with(Some(NodePool::new(nodes)))
        };

        Self {
            ctrl,
            connector: Arc::new(HttpNodeConnector::default()),
            pool,
            opened: AtomicBool::new(false),
        }
    }

    /// Discover and connect the data nodes, once.
    ///
    /// The client counts as opened even when this fails. Concurrent callers
    /// wait for a single discovery; a failed discovery leaves the pool empty
    /// so the next call tries again.
    pub async fn connect(&self, ctx: &RequestContext, source: &Source) -> Result<()> {
        self.opened.store(true, Ordering::Release);

        let pool = self.pool.get_or_try_init(|| self.discover(ctx, source)).await?;
        debug!("Cluster client ready with {} data nodes", pool.len());
        Ok(())
    }

    async fn discover(&self, ctx: &RequestContext, source: &Source) -> Result<NodePool<Node>> {
        let cluster = self.ctrl.show_cluster(ctx).await?;
        let discovered = cluster.data.len();
        info!("Discovered {} data nodes", discovered);

        let mut nodes = Vec::with_capacity(discovered);
        for data_node in &cluster.data {
            let url = data_node.url();
            match self.connector.connect(ctx, &source.with_url(url.as_str())).await {
                Ok(node) => {
                    debug!("Connected data node {} at {}", data_node.id, url);
                    nodes.push(node);
                }
                Err(NodeError::Interrupted(e)) => return Err(e.into()),
                Err(e) => warn!("Skipping data node {} at {}: {}", data_node.id, url, e),
            }
        }

        if nodes.is_empty() {
            return Err(ClusterError::NoAvailableNodes { discovered });
        }

        info!("Connected {} of {} data nodes", nodes.len(), discovered);
        Ok(NodePool::new(nodes))
    }

    fn next_node(&self) -> Result<&Node> {
        if !self.opened.load(Ordering::Acquire) {
            return Err(ClusterError::Uninitialized);
        }
        self.pool.get().ok_or(ClusterError::EmptyPool)?.next()
    }

    /// Run a query on the next data node in rotation
    pub async fn query(&self, ctx: &RequestContext, query: &Query) -> Result<QueryResponse> {
        let node = self.next_node()?;
        debug!("Dispatching query: {}", query.command);
        Ok(node.query(ctx, query).await?)
    }

    /// Write points through the next data node in rotation
    pub async fn write(&self, ctx: &RequestContext, points: &[Point]) -> Result<()> {
        let node = self.next_node()?;
        debug!("Dispatching write of {} points", points.len());
        Ok(node.write(ctx, points).await?)
    }

    pub fn users(&self) -> Arc<dyn UsersStore> {
        Arc::new(MetaUsersStore::new(Arc::clone(&self.ctrl)))
    }

    pub fn roles(&self) -> Result<Arc<dyn RolesStore>> {
        Ok(Arc::new(MetaRolesStore::new(Arc::clone(&self.ctrl))))
    }

    /// Actions the cluster understands, for both scopes
    pub fn permissions(&self) -> Permissions {
        catalog()
    }

    /// Full administrative surface of the meta endpoint
    pub fn ctrl(&self) -> &Arc<dyn MetaCtrl> {
        &self.ctrl
    }

    pub fn is_opened(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    /// Number of connected data nodes
    pub fn pool_size(&self) -> usize {
        self.pool.get().map(NodePool::len).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_core::{BasicAuth, Scope};
    use ensemble_meta::InMemoryCtrl;

    fn idle() -> ClusterClient {
        ClusterClient::new(Arc::new(InMemoryCtrl::new()), Arc::new(HttpNodeConnector::default()))
    }

    #[tokio::test]
    async fn test_dispatch_before_connect() {
        let client = idle();
        let ctx = RequestContext::background();

        assert!(!client.is_opened());
        assert!(matches!(
            client.query(&ctx, &Query::new("SHOW DATABASES")).await,
            Err(ClusterError::Uninitialized)
        ));
        assert!(matches!(client.write(&ctx, &[]).await, Err(ClusterError::Uninitialized)));
    }

    #[tokio::test]
    async fn test_connect_with_no_data_nodes() {
        let client = idle();
        let ctx = RequestContext::background();

        let res = client.connect(&ctx, &Source::default()).await;
        assert!(matches!(res, Err(ClusterError::NoAvailableNodes { discovered: 0 })));
        assert!(client.is_opened());
        assert_eq!(client.pool_size(), 0);
        assert!(matches!(
            client.query(&ctx, &Query::new("SHOW DATABASES")).await,
            Err(ClusterError::EmptyPool)
        ));
    }

    #[test]
    fn test_with_url_rejects_bad_address() {
        let auth = Arc::new(BasicAuth {
            username: "admin".to_string(),
            password: "secret".to_string(),
        });
        assert!(ClusterClient::with_url("meta-1:8091", auth.clone(), true, false).is_ok());
        assert!(matches!(
            ClusterClient::with_url("", auth, false, false),
            Err(ClusterError::Meta(_))
        ));
    }

    #[test]
    fn test_from_config_validates() {
        let config = ClientConfig {
            meta_url: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            ClusterClient::from_config(&config),
            Err(ClusterError::Configuration(_))
        ));
        assert!(ClusterClient::from_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_permissions_catalog() {
        // Available without connecting
        let client = idle();
        let perms = client.permissions();
        assert_eq!(perms, client.permissions());
        assert_eq!(perms.len(), 2);
        assert_eq!(perms.0[0].scope, Scope::All);
        assert_eq!(perms.0[1].scope, Scope::Database);
        assert_eq!(perms.0[0].allowed.len(), 19);
    }
}
