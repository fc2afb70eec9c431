//! `tenantUpdate` gateway event: refresh a tenant snapshot

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::tenant::{TenantDirectory, TenantInfo};
use crate::interaction::ExecutionError;
use crate::module::capability::Event;

pub const TENANT_UPDATE: &str = "tenantUpdate";

pub struct TenantUpdateEvent {
    directory: Arc<dyn TenantDirectory>,
}

impl TenantUpdateEvent {
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl Event for TenantUpdateEvent {
    fn name(&self) -> &str {
        TENANT_UPDATE
    }

    async fn run(&self, payload: &Value) -> Result<(), ExecutionError> {
        let tenant: TenantInfo = serde_json::from_value(payload.clone())
            .map_err(|e| ExecutionError::Internal(format!("Malformed tenant snapshot: {}", e)))?;
        debug!(
            "Tenant {} snapshot: {} channels, {} roles",
            tenant.id,
            tenant.channels.len(),
            tenant.roles.len()
        );
        self.directory.upsert(tenant);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::tenant::MemoryTenantDirectory;
    use serde_json::json;

    #[tokio::test]
    async fn updates_directory() {
        let directory = Arc::new(MemoryTenantDirectory::new());
        let event = TenantUpdateEvent::new(directory.clone());
        event
            .run(&json!({"id": "g1", "name": "Guild", "roles": [{"id": "5", "name": "Mods"}]}))
            .await
            .unwrap();
        assert_eq!(directory.tenant("g1").unwrap().roles.len(), 1);
    }

    #[tokio::test]
    async fn rejects_malformed_payload() {
        let event = TenantUpdateEvent::new(Arc::new(MemoryTenantDirectory::new()));
        let err = event.run(&json!({"name": 3})).await.unwrap_err();
        assert!(!err.is_user_facing());
    }
}
