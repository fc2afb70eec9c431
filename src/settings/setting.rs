//! Setting definitions
//!
//! Every setting pairs a key with a kind. The kind validates user input,
//! turns it into the stored form, and formats the stored form back for
//! display. All three work against a tenant snapshot.

use super::tenant::{ChannelKind, TenantInfo};

type Check = fn(&str, &TenantInfo) -> Option<String>;

/// Validate, transform and format functions for one kind of value
#[derive(Clone, Copy)]
pub struct SettingKind {
    /// Returns an error message for invalid input
    pub validator: Check,
    /// Input to stored value; `None` means invalid
    pub transform: Check,
    /// Stored value to display text; `None` means it no longer resolves
    pub formatter: Check,
}

impl std::fmt::Debug for SettingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SettingKind")
    }
}

/// A text channel, stored by id and shown as a mention
pub const CHANNEL: SettingKind = SettingKind {
    validator: |value, tenant| match tenant.find_channel(ChannelKind::Text, value) {
        Some(_) => None,
        None => Some("Please provide a valid channel.".to_string()),
    },
    transform: |value, tenant| {
        tenant
            .find_channel(ChannelKind::Text, value)
            .map(|c| c.id.clone())
    },
    formatter: |value, tenant| {
        tenant
            .find_channel(ChannelKind::Text, value)
            .map(|c| c.mention())
    },
};

/// A role, stored by id and shown as a mention
pub const ROLE: SettingKind = SettingKind {
    validator: |value, tenant| match tenant.find_role(value) {
        Some(_) => None,
        None => Some("Please provide a valid role.".to_string()),
    },
    transform: |value, tenant| tenant.find_role(value).map(|r| r.id.clone()),
    formatter: |value, tenant| tenant.find_role(value).map(|r| r.mention()),
};

/// A channel category, stored by id and shown by name
pub const CATEGORY: SettingKind = SettingKind {
    validator: |value, tenant| match tenant.find_channel(ChannelKind::Category, value) {
        Some(_) => None,
        None => Some("Please provide a valid category.".to_string()),
    },
    transform: |value, tenant| {
        tenant
            .find_channel(ChannelKind::Category, value)
            .map(|c| c.id.clone())
    },
    formatter: |value, tenant| {
        tenant
            .find_channel(ChannelKind::Category, value)
            .map(|c| c.name.clone())
    },
};

/// A setting the `/settings` command can view and change
#[derive(Debug, Clone)]
pub struct Setting {
    pub key: String,
    pub name: String,
    pub description: String,
    pub kind: SettingKind,
}

impl Setting {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        kind: SettingKind,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            kind,
        }
    }

    pub fn validate(&self, value: &str, tenant: &TenantInfo) -> Option<String> {
        (self.kind.validator)(value, tenant)
    }

    pub fn transform(&self, value: &str, tenant: &TenantInfo) -> Option<String> {
        (self.kind.transform)(value, tenant)
    }

    pub fn format(&self, stored: &str, tenant: &TenantInfo) -> Option<String> {
        (self.kind.formatter)(stored, tenant)
    }
}

/// Settings available out of the box
pub fn default_settings() -> Vec<Setting> {
    vec![Setting::new(
        "commissionLog",
        "Commission Log Channel",
        "The channel where commissions are sent and are available for claim and messaging.",
        CHANNEL,
    )]
}
