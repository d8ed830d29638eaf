//! HTTP/JSON client for cluster meta nodes

use crate::ctrl::MetaCtrl;
use crate::error::{MetaError, Result};
use crate::model::{
    names_missing, permissions_missing, Cluster, MetaPermissions, MetaRole, MetaUser, Roles, Users,
};
use async_trait::async_trait;
use ensemble_core::{Authorizer, RequestContext};
use reqwest::header::LOCATION;
use reqwest::{redirect, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Tuning for [`MetaClient`]
#[derive(Debug, Clone)]
pub struct MetaClientOptions {
    /// Accept any TLS certificate presented by the meta node
    pub insecure_skip_verify: bool,
    /// Per-request timeout applied by the HTTP client
    pub timeout: Duration,
    /// How many leader redirects to follow before giving up
    pub max_redirects: usize,
}

impl Default for MetaClientOptions {
    fn default() -> Self {
        Self {
            insecure_skip_verify: false,
            timeout: Duration::from_secs(30),
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Talks to the administrative API of a cluster.
///
/// Followers answer mutations with a redirect to the current leader. Those
/// are followed by hand so the authorizer decorates every hop; the HTTP
/// client's own redirect handling would drop credentials across hosts.
pub struct MetaClient {
    base: Url,
    client: reqwest::Client,
    authorizer: Arc<dyn Authorizer>,
    max_redirects: usize,
}

impl MetaClient {
    pub fn new(base: Url, insecure_skip_verify: bool, authorizer: Arc<dyn Authorizer>) -> Result<Self> {
        Self::with_options(
            base,
            authorizer,
            MetaClientOptions {
                insecure_skip_verify,
                ..Default::default()
            },
        )
    }

    pub fn with_options(base: Url, authorizer: Arc<dyn Authorizer>, options: MetaClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(options.insecure_skip_verify)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self {
            base,
            client,
            authorizer,
            max_redirects: options.max_redirects,
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(None);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// Send one request, following leader redirects
    async fn exchange(&self, method: Method, mut url: Url, body: Option<&Value>) -> Result<Response> {
        for _ in 0..=self.max_redirects {
            let mut req = self.client.request(method.clone(), url.clone());
            if let Some(body) = body {
                req = req.json(body);
            }
            let resp = self.authorizer.authorize(req)?.send().await?;

            match resp.status() {
                StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT => {
                    let location = resp
                        .headers()
                        .get(LOCATION)
                        .and_then(|v| v.to_str().ok())
                        .ok_or_else(|| MetaError::Redirect(format!("{} without Location header", resp.status())))?;
                    let next = url
                        .join(location)
                        .map_err(|e| MetaError::Redirect(format!("'{}': {}", location, e)))?;
                    debug!("Meta request {} {} redirected to {}", method, url, next);
                    url = next;
                }
                _ => return check(resp).await,
            }
        }

        Err(MetaError::TooManyRedirects(self.max_redirects))
    }

    async fn get<T: DeserializeOwned>(&self, ctx: &RequestContext, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(path, query);
        ctx.run(async {
            let resp = self.exchange(Method::GET, url, None).await?;
            Ok::<T, MetaError>(resp.json::<T>().await?)
        })
        .await?
    }

    async fn post(&self, ctx: &RequestContext, path: &str, body: Value) -> Result<()> {
        let url = self.endpoint(path, &[]);
        ctx.run(async {
            self.exchange(Method::POST, url, Some(&body)).await?;
            Ok::<(), MetaError>(())
        })
        .await?
    }

    async fn user_action(&self, ctx: &RequestContext, action: &str, user: MetaUser) -> Result<()> {
        debug!("Meta user action '{}' for {}", action, user.name);
        self.post(ctx, "/user", json!({ "action": action, "user": user })).await
    }

    async fn role_action(&self, ctx: &RequestContext, action: &str, role: MetaRole) -> Result<()> {
        debug!("Meta role action '{}' for {}", action, role.name);
        self.post(ctx, "/role", json!({ "action": action, "role": role })).await
    }
}

async fn check(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or(body);
    Err(MetaError::Server {
        status: status.as_u16(),
        message,
    })
}

fn is_not_found(err: &MetaError) -> bool {
    err.status() == Some(StatusCode::NOT_FOUND.as_u16())
}

#[async_trait]
impl MetaCtrl for MetaClient {
    async fn show_cluster(&self, ctx: &RequestContext) -> Result<Cluster> {
        self.get(ctx, "/show-cluster", &[]).await
    }

    async fn users(&self, ctx: &RequestContext, name: Option<&str>) -> Result<Users> {
        match name {
            Some(name) => self
                .get(ctx, "/user", &[("name", name)])
                .await
                .map_err(|e| if is_not_found(&e) { MetaError::UserNotFound(name.to_string()) } else { e }),
            None => self.get(ctx, "/user", &[]).await,
        }
    }

    async fn user(&self, ctx: &RequestContext, name: &str) -> Result<MetaUser> {
        self.users(ctx, Some(name))
            .await?
            .users
            .into_iter()
            .find(|u| u.name == name)
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))
    }

    async fn create_user(&self, ctx: &RequestContext, name: &str, password: &str) -> Result<()> {
        let user = MetaUser {
            name: name.to_string(),
            password: Some(password.to_string()),
            ..Default::default()
        };
        self.user_action(ctx, "create", user).await
    }

    async fn delete_user(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        self.user_action(ctx, "delete", MetaUser::named(name)).await
    }

    async fn change_password(&self, ctx: &RequestContext, name: &str, password: &str) -> Result<()> {
        let user = MetaUser {
            name: name.to_string(),
            password: Some(password.to_string()),
            ..Default::default()
        };
        self.user_action(ctx, "change-password", user).await
    }

    async fn set_user_perms(&self, ctx: &RequestContext, name: &str, perms: &MetaPermissions) -> Result<()> {
        let current = self.user(ctx, name).await?;

        let granted = permissions_missing(&current.permissions, perms);
        if !granted.is_empty() {
            let user = MetaUser {
                name: name.to_string(),
                password: None,
                permissions: granted,
            };
            self.user_action(ctx, "add-permissions", user).await?;
        }

        let revoked = permissions_missing(perms, &current.permissions);
        if !revoked.is_empty() {
            let user = MetaUser {
                name: name.to_string(),
                password: None,
                permissions: revoked,
            };
            self.user_action(ctx, "remove-permissions", user).await?;
        }

        Ok(())
    }

    async fn user_roles(&self, ctx: &RequestContext) -> Result<BTreeMap<String, Vec<MetaRole>>> {
        let roles = self.roles(ctx, None).await?;

        let mut by_user: BTreeMap<String, Vec<MetaRole>> = BTreeMap::new();
        for role in roles.roles {
            for user in &role.users {
                by_user.entry(user.clone()).or_default().push(role.clone());
            }
        }
        Ok(by_user)
    }

    async fn roles(&self, ctx: &RequestContext, name: Option<&str>) -> Result<Roles> {
        match name {
            Some(name) => self
                .get(ctx, "/role", &[("name", name)])
                .await
                .map_err(|e| if is_not_found(&e) { MetaError::RoleNotFound(name.to_string()) } else { e }),
            None => self.get(ctx, "/role", &[]).await,
        }
    }

    async fn role(&self, ctx: &RequestContext, name: &str) -> Result<MetaRole> {
        self.roles(ctx, Some(name))
            .await?
            .roles
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| MetaError::RoleNotFound(name.to_string()))
    }

    async fn create_role(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        self.role_action(ctx, "create", MetaRole::named(name)).await
    }

    async fn delete_role(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        self.role_action(ctx, "delete", MetaRole::named(name)).await
    }

    async fn set_role_perms(&self, ctx: &RequestContext, name: &str, perms: &MetaPermissions) -> Result<()> {
        let current = self.role(ctx, name).await?;

        let granted = permissions_missing(&current.permissions, perms);
        if !granted.is_empty() {
            let role = MetaRole {
                name: name.to_string(),
                permissions: granted,
                users: Vec::new(),
            };
            self.role_action(ctx, "add-permissions", role).await?;
        }

        let revoked = permissions_missing(perms, &current.permissions);
        if !revoked.is_empty() {
            let role = MetaRole {
                name: name.to_string(),
                permissions: revoked,
                users: Vec::new(),
            };
            self.role_action(ctx, "remove-permissions", role).await?;
        }

        Ok(())
    }

    async fn set_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()> {
        let current = self.role(ctx, name).await?;

        let added = names_missing(&current.users, users);
        if !added.is_empty() {
            self.add_role_users(ctx, name, &added).await?;
        }

        let revoked = names_missing(users, &current.users);
        if !revoked.is_empty() {
            self.remove_role_users(ctx, name, &revoked).await?;
        }

        Ok(())
    }

    async fn add_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()> {
        let role = MetaRole {
            name: name.to_string(),
            permissions: MetaPermissions::new(),
            users: users.to_vec(),
        };
        self.role_action(ctx, "add-users", role).await
    }

    async fn remove_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()> {
        let role = MetaRole {
            name: name.to_string(),
            permissions: MetaPermissions::new(),
            users: users.to_vec(),
        };
        self.role_action(ctx, "remove-users", role).await
    }
}
