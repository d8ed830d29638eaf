//! Permission model and the cluster's action catalog

use serde::{Deserialize, Serialize};

/// Every action name the cluster understands, in catalog order
pub const ACTIONS: &[&str] = &[
    "NoPermissions",
    "ViewAdmin",
    "ViewCloudHub",
    "CreateDatabase",
    "CreateUserAndRole",
    "AddRemoveNode",
    "DropDatabase",
    "DropData",
    "ReadData",
    "WriteData",
    "Rebalance",
    "ManageShard",
    "ManageContinuousQuery",
    "ManageQuery",
    "ManageSubscription",
    "Monitor",
    "CopyShard",
    "KapacitorAPI",
    "KapacitorConfigAPI",
];

/// Where a permission applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Cluster-wide
    All,
    /// A single database, named by [`Permission::name`]
    Database,
}

/// Set of allowed action names
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allowances(pub Vec<String>);

impl Allowances {
    pub fn contains(&self, action: &str) -> bool {
        self.0.iter().any(|a| a == action)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for Allowances {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Actions allowed within one scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub scope: Scope,
    /// Database name for `Scope::Database`; empty for `Scope::All`
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub allowed: Allowances,
}

impl Permission {
    pub fn all(allowed: Allowances) -> Self {
        Self {
            scope: Scope::All,
            name: String::new(),
            allowed,
        }
    }

    pub fn database(name: impl Into<String>, allowed: Allowances) -> Self {
        Self {
            scope: Scope::Database,
            name: name.into(),
            allowed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(pub Vec<Permission>);

impl Permissions {
    pub fn iter(&self) -> std::slice::Iter<'_, Permission> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<Permission> for Permissions {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The capability vocabulary advertised by the cluster.
///
/// This is not a grant: the same full action list is returned for both the
/// cluster-wide and the per-database scope.
pub fn catalog() -> Permissions {
    let all: Allowances = ACTIONS.iter().copied().collect();

    Permissions(vec![
        Permission {
            scope: Scope::All,
            name: String::new(),
            allowed: all.clone(),
        },
        Permission {
            scope: Scope::Database,
            name: String::new(),
            allowed: all,
        },
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_scopes_share_actions() {
        let perms = catalog();
        assert_eq!(perms.len(), 2);
        assert_eq!(perms.0[0].scope, Scope::All);
        assert_eq!(perms.0[1].scope, Scope::Database);
        assert_eq!(perms.0[0].allowed, perms.0[1].allowed);
        assert_eq!(perms.0[0].allowed.len(), ACTIONS.len());
        assert!(perms.0[0].allowed.contains("ManageShard"));
        assert!(perms.0[0].allowed.contains("WriteData"));
    }

    #[test]
    fn test_catalog_is_stable() {
        assert_eq!(catalog(), catalog());
    }

    #[test]
    fn test_permission_json_shape() {
        let perm = Permission::database("telegraf", ["ReadData", "WriteData"].into_iter().collect());
        let json = serde_json::to_value(&perm).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "scope": "database",
                "name": "telegraf",
                "allowed": ["ReadData", "WriteData"]
            })
        );
    }
}
