use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{LicenseKeyRepository, TxContext};
use crate::domain::license::{LicenseKey, LicenseKeyStatus};
use crate::error::AppResult;
use crate::id::{LicenseKeyId, TenantId};

/// Keyed by `key_hash` as well as `id` since `FindByHashForUpdate` is the
/// hot path (spec §4.2); both maps are kept in sync on every write.
#[derive(Default)]
pub struct InMemoryLicenseKeyRepository {
    by_id: Mutex<HashMap<LicenseKeyId, LicenseKey>>,
}

impl InMemoryLicenseKeyRepository {
    pub fn new() -> Self {
        InMemoryLicenseKeyRepository::default()
    }
}

#[async_trait]
impl LicenseKeyRepository for InMemoryLicenseKeyRepository {
    async fn find_by_hash_for_update(
        &self,
        _ctx: &mut dyn TxContext,
        key_hash: &str,
    ) -> AppResult<Option<LicenseKey>> {
        // The in-memory double has no row-level lock to take; the outer
        // `with_tx` mutex-per-map already serializes writers.
        Ok(self
            .by_id
            .lock()
            .await
            .values()
            .find(|k| k.key_hash == key_hash)
            .cloned())
    }

    async fn save(&self, _ctx: &mut dyn TxContext, key: &LicenseKey) -> AppResult<()> {
        self.by_id.lock().await.insert(key.id.clone(), key.clone());
        Ok(())
    }

    async fn save_batch(&self, _ctx: &mut dyn TxContext, keys: &[LicenseKey]) -> AppResult<()> {
        let mut rows = self.by_id.lock().await;
        for key in keys {
            rows.insert(key.id.clone(), key.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &LicenseKeyId) -> AppResult<Option<LicenseKey>> {
        Ok(self.by_id.lock().await.get(id).cloned())
    }

    async fn list(&self, limit: u32, offset: u32) -> AppResult<(Vec<LicenseKey>, u64)> {
        let rows = self.by_id.lock().await;
        let mut all: Vec<LicenseKey> = rows.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let total = all.len() as u64;
        let page = all.into_iter().skip(offset as usize).take(limit as usize).collect();
        Ok((page, total))
    }

    async fn count_by_status(&self, status: LicenseKeyStatus) -> AppResult<u64> {
        Ok(self.by_id.lock().await.values().filter(|k| k.status == status).count() as u64)
    }

    async fn revoke_batch(&self, _ctx: &mut dyn TxContext, ids: &[LicenseKeyId]) -> AppResult<u64> {
        let mut rows = self.by_id.lock().await;
        let mut updated = 0;
        let now = chrono::Utc::now();
        for id in ids {
            if let Some(key) = rows.get_mut(id) {
                key.revoke(now);
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn find_by_hash_and_tenant(
        &self,
        key_hash: &str,
        tenant_id: &TenantId,
    ) -> AppResult<Option<LicenseKey>> {
        Ok(self
            .by_id
            .lock()
            .await
            .values()
            .find(|k| k.key_hash == key_hash && k.used_by_tenant_id.as_ref() == Some(tenant_id))
            .cloned())
    }
}
