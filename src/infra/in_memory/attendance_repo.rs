use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{AttendanceCollectionRepository, TxContext};
use crate::domain::attendance_collection::{
    AttendanceCollection, AttendanceResponse, CollectionGroupAssignment, CollectionRoleAssignment,
    TargetDate,
};
use crate::error::AppResult;
use crate::id::{AttendanceCollectionId, TenantId};

#[derive(Default)]
struct Store {
    collections: HashMap<AttendanceCollectionId, AttendanceCollection>,
    target_dates: HashMap<AttendanceCollectionId, Vec<TargetDate>>,
    responses: Vec<AttendanceResponse>,
    group_assignments: Vec<CollectionGroupAssignment>,
    role_assignments: Vec<CollectionRoleAssignment>,
}

#[derive(Default)]
pub struct InMemoryAttendanceCollectionRepository {
    store: Mutex<Store>,
}

impl InMemoryAttendanceCollectionRepository {
    pub fn new() -> Self {
        InMemoryAttendanceCollectionRepository::default()
    }
}

#[async_trait]
impl AttendanceCollectionRepository for InMemoryAttendanceCollectionRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, collection: &AttendanceCollection) -> AppResult<()> {
        self.store.lock().await.collections.insert(collection.id.clone(), collection.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &AttendanceCollectionId,
    ) -> AppResult<Option<AttendanceCollection>> {
        Ok(self
            .store
            .lock()
            .await
            .collections
            .get(id)
            .filter(|c| &c.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<AttendanceCollection>> {
        Ok(self
            .store
            .lock()
            .await
            .collections
            .values()
            .find(|c| c.public_token.as_str() == token)
            .cloned())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<AttendanceCollection>> {
        Ok(self
            .store
            .lock()
            .await
            .collections
            .values()
            .filter(|c| &c.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn upsert_response(&self, _ctx: &mut dyn TxContext, response: &AttendanceResponse) -> AppResult<()> {
        let mut store = self.store.lock().await;
        if let Some(existing) = store.responses.iter_mut().find(|r| {
            r.collection_id == response.collection_id
                && r.member_id == response.member_id
                && r.target_date_id == response.target_date_id
        }) {
            *existing = response.clone();
        } else {
            store.responses.push(response.clone());
        }
        Ok(())
    }

    async fn find_responses_by_collection_id(
        &self,
        collection_id: &AttendanceCollectionId,
    ) -> AppResult<Vec<AttendanceResponse>> {
        Ok(self
            .store
            .lock()
            .await
            .responses
            .iter()
            .filter(|r| &r.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn replace_target_dates(
        &self,
        _ctx: &mut dyn TxContext,
        collection_id: &AttendanceCollectionId,
        new_list: &[TargetDate],
    ) -> AppResult<()> {
        let mut store = self.store.lock().await;
        let keep_ids: std::collections::HashSet<_> = new_list.iter().map(|t| t.id.clone()).collect();
        store
            .responses
            .retain(|r| &r.collection_id != collection_id || keep_ids.contains(&r.target_date_id));
        store.target_dates.insert(collection_id.clone(), new_list.to_vec());
        Ok(())
    }

    async fn save_target_dates(
        &self,
        _ctx: &mut dyn TxContext,
        collection_id: &AttendanceCollectionId,
        dates: &[TargetDate],
    ) -> AppResult<()> {
        let mut store = self.store.lock().await;
        store.responses.retain(|r| &r.collection_id != collection_id);
        store.target_dates.insert(collection_id.clone(), dates.to_vec());
        Ok(())
    }

    async fn find_target_dates_by_collection_id(
        &self,
        collection_id: &AttendanceCollectionId,
    ) -> AppResult<Vec<TargetDate>> {
        Ok(self
            .store
            .lock()
            .await
            .target_dates
            .get(collection_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_group_assignments(
        &self,
        _ctx: &mut dyn TxContext,
        assignments: &[CollectionGroupAssignment],
    ) -> AppResult<()> {
        self.store.lock().await.group_assignments.extend_from_slice(assignments);
        Ok(())
    }

    async fn save_role_assignments(
        &self,
        _ctx: &mut dyn TxContext,
        assignments: &[CollectionRoleAssignment],
    ) -> AppResult<()> {
        self.store.lock().await.role_assignments.extend_from_slice(assignments);
        Ok(())
    }

    async fn find_group_assignments_by_collection_id(
        &self,
        collection_id: &AttendanceCollectionId,
    ) -> AppResult<Vec<CollectionGroupAssignment>> {
        Ok(self
            .store
            .lock()
            .await
            .group_assignments
            .iter()
            .filter(|a| &a.collection_id == collection_id)
            .cloned()
            .collect())
    }

    async fn find_role_assignments_by_collection_id(
        &self,
        collection_id: &AttendanceCollectionId,
    ) -> AppResult<Vec<CollectionRoleAssignment>> {
        Ok(self
            .store
            .lock()
            .await
            .role_assignments
            .iter()
            .filter(|a| &a.collection_id == collection_id)
            .cloned()
            .collect())
    }
}
