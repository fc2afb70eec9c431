//! Tenant snapshots used to resolve setting values
//!
//! The gateway pushes each tenant's channels and roles as `tenantUpdate`
//! events; the settings command reads one snapshot at a time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Channel type, as far as settings care
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Text,
    Category,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
}

impl ChannelInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }

    /// `<#id>`
    pub fn mention(&self) -> String {
        format!("<#{}>", self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleInfo {
    pub id: String,
    pub name: String,
}

impl RoleInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// `<@&id>`
    pub fn mention(&self) -> String {
        format!("<@&{}>", self.id)
    }
}

/// Snapshot of one tenant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ChannelInfo>,
    #[serde(default)]
    pub roles: Vec<RoleInfo>,
}

impl TenantInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            channels: Vec::new(),
            roles: Vec::new(),
        }
    }

    pub fn with_channel(mut self, id: &str, name: &str, kind: ChannelKind) -> Self {
        self.channels.push(ChannelInfo::new(id, name, kind));
        self
    }

    pub fn with_role(mut self, id: &str, name: &str) -> Self {
        self.roles.push(RoleInfo::new(id, name));
        self
    }

    /// Find a channel of `kind` by mention, then case-insensitive name, then id
    pub fn find_channel(&self, kind: ChannelKind, value: &str) -> Option<&ChannelInfo> {
        let candidates = || self.channels.iter().filter(move |c| c.kind == kind);
        candidates()
            .find(|c| c.mention() == value)
            .or_else(|| candidates().find(|c| c.name.to_lowercase() == value.to_lowercase()))
            .or_else(|| candidates().find(|c| c.id == value))
    }

    /// Find a role by mention, then case-insensitive name, then id
    pub fn find_role(&self, value: &str) -> Option<&RoleInfo> {
        self.roles
            .iter()
            .find(|r| r.mention() == value)
            .or_else(|| {
                self.roles
                    .iter()
                    .find(|r| r.name.to_lowercase() == value.to_lowercase())
            })
            .or_else(|| self.roles.iter().find(|r| r.id == value))
    }
}

/// Source of tenant snapshots
pub trait TenantDirectory: Send + Sync {
    fn tenant(&self, tenant_id: &str) -> Option<TenantInfo>;

    /// Replace the snapshot for `tenant.id`
    fn upsert(&self, tenant: TenantInfo);
}

/// Tenant snapshots held in memory, fed by gateway updates
#[derive(Debug, Default)]
pub struct MemoryTenantDirectory {
    tenants: RwLock<HashMap<String, TenantInfo>>,
}

impl MemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(self, tenant: TenantInfo) -> Self {
        self.upsert(tenant);
        self
    }

    pub fn len(&self) -> usize {
        self.tenants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TenantDirectory for MemoryTenantDirectory {
    fn tenant(&self, tenant_id: &str) -> Option<TenantInfo> {
        self.tenants
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(tenant_id)
            .cloned()
    }

    fn upsert(&self, tenant: TenantInfo) {
        self.tenants
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tenant.id.clone(), tenant);
    }
}
