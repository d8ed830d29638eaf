//! Process-local meta controller
//!
//! `InMemoryCtrl` keeps users, roles and a fixed topology in memory and
//! honours the same contract as [`MetaClient`](crate::MetaClient). It backs
//! the test suites and lets callers exercise a cluster client without a
//! running meta node.

use crate::ctrl::MetaCtrl;
use crate::error::{MetaError, Result};
use crate::model::{names_missing, Cluster, MetaPermissions, MetaRole, MetaUser, Roles, Users};
use async_trait::async_trait;
use ensemble_core::RequestContext;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
pub struct InMemoryCtrl {
    cluster: RwLock<Cluster>,
    users: RwLock<BTreeMap<String, MetaUser>>,
    roles: RwLock<BTreeMap<String, MetaRole>>,
    show_cluster_calls: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryCtrl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(cluster: Cluster) -> Self {
        let ctrl = Self::default();
        *ctrl.cluster.write() = cluster;
        ctrl
    }

    pub fn set_cluster(&self, cluster: Cluster) {
        *self.cluster.write() = cluster;
    }

    /// Make `show_cluster` fail as if the meta node were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of topology lookups served so far
    pub fn show_cluster_calls(&self) -> usize {
        self.show_cluster_calls.load(Ordering::SeqCst)
    }

    fn conflict(what: &str, name: &str) -> MetaError {
        MetaError::Server {
            status: 409,
            message: format!("{} already exists: {}", what, name),
        }
    }
}

fn public(user: &MetaUser) -> MetaUser {
    MetaUser {
        password: None,
        ..user.clone()
    }
}

#[async_trait]
impl MetaCtrl for InMemoryCtrl {
    async fn show_cluster(&self, ctx: &RequestContext) -> Result<Cluster> {
        ctx.check()?;
        self.show_cluster_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MetaError::Server {
                status: 503,
                message: "meta service unavailable".to_string(),
            });
        }
        Ok(self.cluster.read().clone())
    }

    async fn users(&self, ctx: &RequestContext, name: Option<&str>) -> Result<Users> {
        ctx.check()?;
        let users = self.users.read();
        match name {
            Some(name) => users
                .get(name)
                .map(|u| Users { users: vec![public(u)] })
                .ok_or_else(|| MetaError::UserNotFound(name.to_string())),
            None => Ok(Users {
                users: users.values().map(public).collect(),
            }),
        }
    }

    async fn user(&self, ctx: &RequestContext, name: &str) -> Result<MetaUser> {
        ctx.check()?;
        self.users
            .read()
            .get(name)
            .map(public)
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))
    }

    async fn create_user(&self, ctx: &RequestContext, name: &str, password: &str) -> Result<()> {
        ctx.check()?;
        let mut users = self.users.write();
        if users.contains_key(name) {
            return Err(Self::conflict("user", name));
        }
        users.insert(
            name.to_string(),
            MetaUser {
                name: name.to_string(),
                password: Some(password.to_string()),
                permissions: MetaPermissions::new(),
            },
        );
        Ok(())
    }

    async fn delete_user(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        ctx.check()?;
        if self.users.write().remove(name).is_none() {
            return Err(MetaError::UserNotFound(name.to_string()));
        }
        for role in self.roles.write().values_mut() {
            role.users.retain(|u| u != name);
        }
        Ok(())
    }

    async fn change_password(&self, ctx: &RequestContext, name: &str, password: &str) -> Result<()> {
        ctx.check()?;
        let mut users = self.users.write();
        let user = users
            .get_mut(name)
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))?;
        user.password = Some(password.to_string());
        Ok(())
    }

    async fn set_user_perms(&self, ctx: &RequestContext, name: &str, perms: &MetaPermissions) -> Result<()> {
        ctx.check()?;
        let mut users = self.users.write();
        let user = users
            .get_mut(name)
            .ok_or_else(|| MetaError::UserNotFound(name.to_string()))?;
        user.permissions = perms.clone();
        Ok(())
    }

    async fn user_roles(&self, ctx: &RequestContext) -> Result<BTreeMap<String, Vec<MetaRole>>> {
        ctx.check()?;
        let mut by_user: BTreeMap<String, Vec<MetaRole>> = BTreeMap::new();
        for role in self.roles.read().values() {
            for user in &role.users {
                by_user.entry(user.clone()).or_default().push(role.clone());
            }
        }
        Ok(by_user)
    }

    async fn roles(&self, ctx: &RequestContext, name: Option<&str>) -> Result<Roles> {
        ctx.check()?;
        let roles = self.roles.read();
        match name {
            Some(name) => roles
                .get(name)
                .map(|r| Roles { roles: vec![r.clone()] })
                .ok_or_else(|| MetaError::RoleNotFound(name.to_string())),
            None => Ok(Roles {
                roles: roles.values().cloned().collect(),
            }),
        }
    }

    async fn role(&self, ctx: &RequestContext, name: &str) -> Result<MetaRole> {
        ctx.check()?;
        self.roles
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MetaError::RoleNotFound(name.to_string()))
    }

    async fn create_role(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        ctx.check()?;
        let mut roles = self.roles.write();
        if roles.contains_key(name) {
            return Err(Self::conflict("role", name));
        }
        roles.insert(name.to_string(), MetaRole::named(name));
        Ok(())
    }

    async fn delete_role(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        ctx.check()?;
        self.roles
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| MetaError::RoleNotFound(name.to_string()))
    }

    async fn set_role_perms(&self, ctx: &RequestContext, name: &str, perms: &MetaPermissions) -> Result<()> {
        ctx.check()?;
        let mut roles = self.roles.write();
        let role = roles
            .get_mut(name)
            .ok_or_else(|| MetaError::RoleNotFound(name.to_string()))?;
        role.permissions = perms.clone();
        Ok(())
    }

    async fn set_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()> {
        ctx.check()?;
        let mut roles = self.roles.write();
        let role = roles
            .get_mut(name)
            .ok_or_else(|| MetaError::RoleNotFound(name.to_string()))?;
        role.users = names_missing(&[], users);
        Ok(())
    }

    async fn add_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()> {
        ctx.check()?;
        let mut roles = self.roles.write();
        let role = roles
            .get_mut(name)
            .ok_or_else(|| MetaError::RoleNotFound(name.to_string()))?;
        let added = names_missing(&role.users, users);
        role.users.extend(added);
        Ok(())
    }

    async fn remove_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()> {
        ctx.check()?;
        let mut roles = self.roles.write();
        let role = roles
            .get_mut(name)
            .ok_or_else(|| MetaError::RoleNotFound(name.to_string()))?;
        role.users.retain(|u| !users.contains(u));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_role_membership_operations() {
        let ctrl = InMemoryCtrl::new();
        let ctx = RequestContext::background();
        ctrl.create_role(&ctx, "ops").await.unwrap();

        ctrl.add_role_users(&ctx, "ops", &names(&["a", "b"])).await.unwrap();
        ctrl.add_role_users(&ctx, "ops", &names(&["b", "c"])).await.unwrap();
        assert_eq!(ctrl.role(&ctx, "ops").await.unwrap().users, names(&["a", "b", "c"]));

        ctrl.remove_role_users(&ctx, "ops", &names(&["a", "z"])).await.unwrap();
        assert_eq!(ctrl.role(&ctx, "ops").await.unwrap().users, names(&["b", "c"]));

        ctrl.set_role_users(&ctx, "ops", &names(&["d"])).await.unwrap();
        assert_eq!(ctrl.role(&ctx, "ops").await.unwrap().users, names(&["d"]));
    }

    #[tokio::test]
    async fn test_missing_records() {
        let ctrl = InMemoryCtrl::new();
        let ctx = RequestContext::background();

        assert!(matches!(ctrl.user(&ctx, "nobody").await, Err(MetaError::UserNotFound(_))));
        assert!(matches!(ctrl.role(&ctx, "nothing").await, Err(MetaError::RoleNotFound(_))));
        assert!(matches!(
            ctrl.add_role_users(&ctx, "nothing", &names(&["a"])).await,
            Err(MetaError::RoleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_passwords_are_not_returned() {
        let ctrl = InMemoryCtrl::new();
        let ctx = RequestContext::background();
        ctrl.create_user(&ctx, "bob", "secret").await.unwrap();

        assert_eq!(ctrl.user(&ctx, "bob").await.unwrap().password, None);
        assert!(matches!(
            ctrl.create_user(&ctx, "bob", "again").await,
            Err(MetaError::Server { status: 409, .. })
        ));
    }

    #[tokio::test]
    async fn test_unavailable_topology() {
        let ctrl = InMemoryCtrl::new();
        ctrl.set_unavailable(true);
        let res = ctrl.show_cluster(&RequestContext::background()).await;
        assert!(matches!(res, Err(MetaError::Server { status: 503, .. })));
        assert_eq!(ctrl.show_cluster_calls(), 1);
    }
}
