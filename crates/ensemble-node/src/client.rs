//! HTTP client for a single data node

use crate::error::{NodeError, Result};
use crate::line_protocol;
use async_trait::async_trait;
use ensemble_core::{authorizer_for, Authorizer, Point, Query, QueryResponse, RequestContext, Source};
use parking_lot::RwLock;
use reqwest::{Response, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Operations available on one data node
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Bind the client to `source.url` and verify the node answers
    async fn connect(&self, ctx: &RequestContext, source: &Source) -> Result<()>;

    async fn query(&self, ctx: &RequestContext, query: &Query) -> Result<QueryResponse>;

    async fn write(&self, ctx: &RequestContext, points: &[Point]) -> Result<()>;
}

struct Connection {
    base: Url,
    client: reqwest::Client,
    authorizer: Arc<dyn Authorizer>,
    default_database: String,
}

/// Data node client speaking the `/ping`, `/query` and `/write` endpoints
pub struct HttpNodeClient {
    timeout: Duration,
    conn: RwLock<Option<Arc<Connection>>>,
}

impl HttpNodeClient {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            conn: RwLock::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.conn.read().is_some()
    }

    /// Address of the connected node
    pub fn url(&self) -> Option<Url> {
        self.conn.read().as_ref().map(|c| c.base.clone())
    }

    fn connection(&self) -> Result<Arc<Connection>> {
        self.conn.read().clone().ok_or(NodeError::NotConnected)
    }
}

impl Default for HttpNodeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    async fn ping(&self) -> Result<()> {
        let req = self.client.get(self.endpoint("/ping"));
        let resp = self.authorizer.authorize(req)?.send().await?;
        if !resp.status().is_success() {
            return Err(NodeError::Unhealthy {
                url: self.base.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<QueryResponse> {
        let mut params = vec![("q", query.command.as_str())];
        let db = if query.database.is_empty() {
            self.default_database.as_str()
        } else {
            query.database.as_str()
        };
        if !db.is_empty() {
            params.push(("db", db));
        }
        if !query.retention_policy.is_empty() {
            params.push(("rp", query.retention_policy.as_str()));
        }
        if !query.epoch.is_empty() {
            params.push(("epoch", query.epoch.as_str()));
        }

        let req = self.client.get(self.endpoint("/query")).query(&params);
        let resp = check(self.authorizer.authorize(req)?.send().await?).await?;
        Ok(QueryResponse::new(resp.json::<Value>().await?))
    }

    async fn write(&self, points: &[Point]) -> Result<()> {
        for ((db, rp), batch) in line_protocol::group_by_target(points) {
            let db = if db.is_empty() { self.default_database.as_str() } else { db };
            let mut params = vec![("precision", "ns")];
            if !db.is_empty() {
                params.push(("db", db));
            }
            if !rp.is_empty() {
                params.push(("rp", rp));
            }

            let body = line_protocol::encode(batch.iter().copied());
            debug!("Writing {} points ({} bytes) to {} db='{}'", batch.len(), body.len(), self.base, db);

            let req = self.client.post(self.endpoint("/write")).query(&params).body(body);
            check(self.authorizer.authorize(req)?.send().await?).await?;
        }
        Ok(())
    }
}

/// Parse a node address, accepting bare `host:port`
pub fn parse_node_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(NodeError::InvalidUrl("empty URL".to_string()));
    }
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{}", raw)
    };
    let url = Url::parse(&with_scheme).map_err(|e| NodeError::InvalidUrl(format!("'{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(NodeError::InvalidUrl(format!("unsupported scheme '{}'", other))),
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    Err(NodeError::Server {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn connect(&self, ctx: &RequestContext, source: &Source) -> Result<()> {
        let base = parse_node_url(&source.url)?;
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .danger_accept_invalid_certs(source.insecure_skip_verify)
            .build()?;

        let conn = Connection {
            base,
            client,
            authorizer: authorizer_for(source),
            default_database: source.default_database.clone(),
        };
        ctx.run(conn.ping()).await??;

        info!("Connected to data node {}", conn.base);
        *self.conn.write() = Some(Arc::new(conn));
        Ok(())
    }

    async fn query(&self, ctx: &RequestContext, query: &Query) -> Result<QueryResponse> {
        let conn = self.connection()?;
        debug!("Query on {}: {}", conn.base, query.command);
        ctx.run(conn.query(query)).await?
    }

    async fn write(&self, ctx: &RequestContext, points: &[Point]) -> Result<()> {
        let conn = self.connection()?;
        if points.is_empty() {
            return Ok(());
        }
        for point in points {
            point.validate()?;
        }
        ctx.run(conn.write(points)).await?
    }
}
