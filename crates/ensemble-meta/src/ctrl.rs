//! Administrative control surface of a cluster

use crate::error::Result;
use crate::model::{Cluster, MetaPermissions, MetaRole, MetaUser, Roles, Users};
use async_trait::async_trait;
use ensemble_core::RequestContext;
use std::collections::BTreeMap;

/// Administrative operations served by the meta endpoint.
///
/// Every mutation either lands on the remote record or returns an error;
/// implementations keep no local state that could need rolling back.
#[async_trait]
pub trait MetaCtrl: Send + Sync {
    /// Current data and meta node topology. Not retried internally.
    async fn show_cluster(&self, ctx: &RequestContext) -> Result<Cluster>;

    /// All users, or only `name` when given
    async fn users(&self, ctx: &RequestContext, name: Option<&str>) -> Result<Users>;
    /// A single user; `MetaError::UserNotFound` when absent
    async fn user(&self, ctx: &RequestContext, name: &str) -> Result<MetaUser>;
    async fn create_user(&self, ctx: &RequestContext, name: &str, password: &str) -> Result<()>;
    async fn delete_user(&self, ctx: &RequestContext, name: &str) -> Result<()>;
    async fn change_password(&self, ctx: &RequestContext, name: &str, password: &str) -> Result<()>;
    /// Replace the user's permissions with `perms`.
    ///
    /// The meta endpoint has no replace action, so this grants first and
    /// revokes second. A failure part way leaves a superset of the old and
    /// new permissions, never fewer than either.
    async fn set_user_perms(&self, ctx: &RequestContext, name: &str, perms: &MetaPermissions) -> Result<()>;

    /// Map of user name to the roles that user belongs to
    async fn user_roles(&self, ctx: &RequestContext) -> Result<BTreeMap<String, Vec<MetaRole>>>;

    /// All roles, or only `name` when given
    async fn roles(&self, ctx: &RequestContext, name: Option<&str>) -> Result<Roles>;
    /// A single role; `MetaError::RoleNotFound` when absent
    async fn role(&self, ctx: &RequestContext, name: &str) -> Result<MetaRole>;
    async fn create_role(&self, ctx: &RequestContext, name: &str) -> Result<()>;
    async fn delete_role(&self, ctx: &RequestContext, name: &str) -> Result<()>;
    /// Replace the role's permissions with `perms`, granting before
    /// revoking as `set_user_perms` does
    async fn set_role_perms(&self, ctx: &RequestContext, name: &str, perms: &MetaPermissions) -> Result<()>;
    /// Replace the role's membership with exactly `users`, adding members
    /// before removing any
    async fn set_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()>;
    /// Union `users` into the role's membership
    async fn add_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()>;
    /// Remove `users` from the role's membership
    async fn remove_role_users(&self, ctx: &RequestContext, name: &str, users: &[String]) -> Result<()>;
}
