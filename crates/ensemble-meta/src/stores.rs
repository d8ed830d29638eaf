//! Store-shaped views over a [`MetaCtrl`]
//!
//! Request handlers manage users and roles through [`UsersStore`] and
//! [`RolesStore`]. The meta-backed implementations hold a shared handle to
//! the controller and keep no state of their own.

use crate::ctrl::MetaCtrl;
use crate::error::Result;
use crate::model::{names_missing, MetaPermissions, MetaRole, MetaUser};
use async_trait::async_trait;
use ensemble_core::{Permission, Permissions, RequestContext, Role, Scope, User};
use std::collections::BTreeMap;
use std::sync::Arc;

#[async_trait]
pub trait UsersStore: Send + Sync {
    async fn all(&self, ctx: &RequestContext) -> Result<Vec<User>>;
    /// Create a user with its permissions and role memberships
    async fn add(&self, ctx: &RequestContext, user: &User) -> Result<User>;
    async fn delete(&self, ctx: &RequestContext, user: &User) -> Result<()>;
    async fn get(&self, ctx: &RequestContext, name: &str) -> Result<User>;
    /// Apply changes to an existing user. A password change is applied on
    /// its own; otherwise roles (when given) and permissions are replaced.
    async fn update(&self, ctx: &RequestContext, user: &User) -> Result<()>;
    async fn num(&self, ctx: &RequestContext) -> Result<usize>;
}

#[async_trait]
pub trait RolesStore: Send + Sync {
    async fn all(&self, ctx: &RequestContext) -> Result<Vec<Role>>;
    async fn add(&self, ctx: &RequestContext, role: &Role) -> Result<Role>;
    async fn delete(&self, ctx: &RequestContext, role: &Role) -> Result<()>;
    async fn get(&self, ctx: &RequestContext, name: &str) -> Result<Role>;
    /// Replace permissions, and membership when `users` is given
    async fn update(&self, ctx: &RequestContext, role: &Role) -> Result<()>;
}

/// Convert meta permissions into scoped permissions
pub fn to_permissions(perms: &MetaPermissions) -> Permissions {
    perms
        .iter()
        .map(|(db, actions)| {
            let allowed = actions.iter().cloned().collect();
            if db.is_empty() {
                Permission::all(allowed)
            } else {
                Permission::database(db.clone(), allowed)
            }
        })
        .collect()
}

/// Convert scoped permissions into the meta wire form
pub fn to_meta_permissions(perms: &Permissions) -> MetaPermissions {
    let mut out = MetaPermissions::new();
    for perm in perms.iter() {
        let key = match perm.scope {
            Scope::All => String::new(),
            Scope::Database => perm.name.clone(),
        };
        let actions = out.entry(key).or_default();
        for action in perm.allowed.iter() {
            if !actions.iter().any(|a| a == action) {
                actions.push(action.to_string());
            }
        }
    }
    out
}

fn to_role(role: &MetaRole) -> Role {
    Role {
        name: role.name.clone(),
        permissions: to_permissions(&role.permissions),
        users: Some(role.users.clone()),
    }
}

fn to_user(user: &MetaUser, roles: &[MetaRole]) -> User {
    User {
        name: user.name.clone(),
        password: None,
        permissions: to_permissions(&user.permissions),
        roles: Some(
            roles
                .iter()
                .map(|r| Role {
                    name: r.name.clone(),
                    permissions: to_permissions(&r.permissions),
                    users: None,
                })
                .collect(),
        ),
    }
}

/// Users backed by the meta endpoint
#[derive(Clone)]
pub struct MetaUsersStore {
    ctrl: Arc<dyn MetaCtrl>,
}

impl MetaUsersStore {
    pub fn new(ctrl: Arc<dyn MetaCtrl>) -> Self {
        Self { ctrl }
    }

    async fn roles_of(&self, ctx: &RequestContext, name: &str) -> Result<Vec<MetaRole>> {
        let mut by_user = self.ctrl.user_roles(ctx).await?;
        Ok(by_user.remove(name).unwrap_or_default())
    }
}

#[async_trait]
impl UsersStore for MetaUsersStore {
    async fn all(&self, ctx: &RequestContext) -> Result<Vec<User>> {
        let users = self.ctrl.users(ctx, None).await?;
        let by_user: BTreeMap<String, Vec<MetaRole>> = self.ctrl.user_roles(ctx).await?;

        Ok(users
            .users
            .iter()
            .map(|u| to_user(u, by_user.get(&u.name).map(Vec::as_slice).unwrap_or(&[])))
            .collect())
    }

    async fn add(&self, ctx: &RequestContext, user: &User) -> Result<User> {
        let password = user.password.as_deref().unwrap_or_default();
        self.ctrl.create_user(ctx, &user.name, password).await?;

        let perms = to_meta_permissions(&user.permissions);
        self.ctrl.set_user_perms(ctx, &user.name, &perms).await?;

        if let Some(roles) = &user.roles {
            let member = [user.name.clone()];
            for role in roles {
                self.ctrl.add_role_users(ctx, &role.name, &member).await?;
            }
        }

        self.get(ctx, &user.name).await
    }

    async fn delete(&self, ctx: &RequestContext, user: &User) -> Result<()> {
        self.ctrl.delete_user(ctx, &user.name).await
    }

    async fn get(&self, ctx: &RequestContext, name: &str) -> Result<User> {
        let user = self.ctrl.user(ctx, name).await?;
        let roles = self.roles_of(ctx, name).await?;
        Ok(to_user(&user, &roles))
    }

    async fn update(&self, ctx: &RequestContext, user: &User) -> Result<()> {
        if let Some(password) = user.password.as_deref().filter(|p| !p.is_empty()) {
            return self.ctrl.change_password(ctx, &user.name, password).await;
        }

        if let Some(roles) = &user.roles {
            let current: Vec<String> = self
                .roles_of(ctx, &user.name)
                .await?
                .into_iter()
                .map(|r| r.name)
                .collect();
            let wanted: Vec<String> = roles.iter().map(|r| r.name.clone()).collect();
            let member = [user.name.clone()];

            for role in names_missing(&wanted, &current) {
                self.ctrl.remove_role_users(ctx, &role, &member).await?;
            }
            for role in names_missing(&current, &wanted) {
                self.ctrl.add_role_users(ctx, &role, &member).await?;
            }
        }

        let perms = to_meta_permissions(&user.permissions);
        self.ctrl.set_user_perms(ctx, &user.name, &perms).await
    }

    async fn num(&self, ctx: &RequestContext) -> Result<usize> {
        Ok(self.ctrl.users(ctx, None).await?.users.len())
    }
}

/// Roles backed by the meta endpoint
#[derive(Clone)]
pub struct MetaRolesStore {
    ctrl: Arc<dyn MetaCtrl>,
}

impl MetaRolesStore {
    pub fn new(ctrl: Arc<dyn MetaCtrl>) -> Self {
        Self { ctrl }
    }
}

#[async_trait]
impl RolesStore for MetaRolesStore {
    async fn all(&self, ctx: &RequestContext) -> Result<Vec<Role>> {
        let roles = self.ctrl.roles(ctx, None).await?;
        Ok(roles.roles.iter().map(to_role).collect())
    }

    async fn add(&self, ctx: &RequestContext, role: &Role) -> Result<Role> {
        self.ctrl.create_role(ctx, &role.name).await?;

        let perms = to_meta_permissions(&role.permissions);
        self.ctrl.set_role_perms(ctx, &role.name, &perms).await?;

        if let Some(users) = &role.users {
            self.ctrl.set_role_users(ctx, &role.name, users).await?;
        }

        self.get(ctx, &role.name).await
    }

    async fn delete(&self, ctx: &RequestContext, role: &Role) -> Result<()> {
        self.ctrl.delete_role(ctx, &role.name).await
    }

    async fn get(&self, ctx: &RequestContext, name: &str) -> Result<Role> {
        let role = self.ctrl.role(ctx, name).await?;
        Ok(to_role(&role))
    }

    async fn update(&self, ctx: &RequestContext, role: &Role) -> Result<()> {
        let perms = to_meta_permissions(&role.permissions);
        self.ctrl.set_role_perms(ctx, &role.name, &perms).await?;

        if let Some(users) = &role.users {
            self.ctrl.set_role_users(ctx, &role.name, users).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryCtrl;
    use crate::MetaError;
    use ensemble_core::Allowances;

    fn allow(actions: &[&str]) -> Allowances {
        actions.iter().copied().collect()
    }

    async fn seeded() -> (Arc<InMemoryCtrl>, RequestContext) {
        let ctrl = Arc::new(InMemoryCtrl::new());
        let ctx = RequestContext::background();
        ctrl.create_role(&ctx, "ops").await.unwrap();
        ctrl.create_role(&ctx, "dev").await.unwrap();
        (ctrl, ctx)
    }

    #[test]
    fn test_permission_translation() {
        let perms = Permissions(vec![
            Permission::all(allow(&["ViewAdmin"])),
            Permission::database("telegraf", allow(&["ReadData", "WriteData"])),
        ]);

        let meta = to_meta_permissions(&perms);
        assert_eq!(meta.get(""), Some(&vec!["ViewAdmin".to_string()]));
        assert_eq!(
            meta.get("telegraf"),
            Some(&vec!["ReadData".to_string(), "WriteData".to_string()])
        );

        let back = to_permissions(&meta);
        assert_eq!(back, perms);
    }

    #[tokio::test]
    async fn test_add_user_with_roles() {
        let (ctrl, ctx) = seeded().await;
        let store = MetaUsersStore::new(ctrl.clone());

        let user = User {
            name: "bob".to_string(),
            password: Some("secret".to_string()),
            permissions: Permissions(vec![Permission::database("telegraf", allow(&["ReadData"]))]),
            roles: Some(vec![Role::new("ops")]),
        };
        let created = store.add(&ctx, &user).await.unwrap();

        assert_eq!(created.name, "bob");
        assert_eq!(created.password, None);
        assert_eq!(created.permissions, user.permissions);
        let roles: Vec<String> = created.roles.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(roles, vec!["ops".to_string()]);
        assert_eq!(store.num(&ctx).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_user_roles_and_permissions() {
        let (ctrl, ctx) = seeded().await;
        let store = MetaUsersStore::new(ctrl.clone());
        store
            .add(
                &ctx,
                &User {
                    roles: Some(vec![Role::new("ops")]),
                    ..User::new("bob")
                },
            )
            .await
            .unwrap();

        let update = User {
            permissions: Permissions(vec![Permission::all(allow(&["Monitor"]))]),
            roles: Some(vec![Role::new("dev")]),
            ..User::new("bob")
        };
        store.update(&ctx, &update).await.unwrap();

        let bob = store.get(&ctx, "bob").await.unwrap();
        let roles: Vec<String> = bob.roles.unwrap().into_iter().map(|r| r.name).collect();
        assert_eq!(roles, vec!["dev".to_string()]);
        assert_eq!(bob.permissions, update.permissions);
        assert!(ctrl.role(&ctx, "ops").await.unwrap().users.is_empty());
    }

    #[tokio::test]
    async fn test_password_update_leaves_permissions() {
        let (ctrl, ctx) = seeded().await;
        let store = MetaUsersStore::new(ctrl.clone());
        let perms = Permissions(vec![Permission::all(allow(&["ViewAdmin"]))]);
        store
            .add(
                &ctx,
                &User {
                    permissions: perms.clone(),
                    ..User::new("bob")
                },
            )
            .await
            .unwrap();

        let update = User {
            password: Some("n3w".to_string()),
            ..User::new("bob")
        };
        store.update(&ctx, &update).await.unwrap();

        assert_eq!(store.get(&ctx, "bob").await.unwrap().permissions, perms);
    }

    #[tokio::test]
    async fn test_roles_store_round_trip() {
        let (ctrl, ctx) = seeded().await;
        ctrl.create_user(&ctx, "alice", "x").await.unwrap();
        let store = MetaRolesStore::new(ctrl.clone());

        let role = Role {
            name: "readers".to_string(),
            permissions: Permissions(vec![Permission::database("telegraf", allow(&["ReadData"]))]),
            users: Some(vec!["alice".to_string()]),
        };
        let created = store.add(&ctx, &role).await.unwrap();
        assert_eq!(created, role);

        store
            .update(
                &ctx,
                &Role {
                    users: Some(Vec::new()),
                    ..role.clone()
                },
            )
            .await
            .unwrap();
        assert_eq!(store.get(&ctx, "readers").await.unwrap().users, Some(Vec::new()));

        assert_eq!(store.all(&ctx).await.unwrap().len(), 3);
        store.delete(&ctx, &role).await.unwrap();
        assert!(matches!(
            store.get(&ctx, "readers").await,
            Err(MetaError::RoleNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let (ctrl, ctx) = seeded().await;
        let store = MetaUsersStore::new(ctrl);
        assert!(matches!(
            store.get(&ctx, "ghost").await,
            Err(MetaError::UserNotFound(_))
        ));
    }
}
