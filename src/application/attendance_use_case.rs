//! Attendance-collection use case (spec §4.5, C5): create, close, and
//! respond to a public-token addressed attendance poll.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::application::ports::{with_tx, AttendanceCollectionRepository, TxManager};
use crate::clock::Clock;
use crate::domain::attendance_collection::{
    diff_target_dates, is_visible_to, AttendanceCollection, AttendanceResponse, AttendanceStatus,
    CollectionGroupAssignment, CollectionRoleAssignment, TargetDate, TargetType,
};
use crate::error::{AppError, AppResult};
use crate::id::{AttendanceCollectionId, AttendanceResponseId, MemberId, TargetDateId, TenantId};

pub struct CreateCollectionInput {
    pub tenant_id: TenantId,
    pub title: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub deadline: Option<DateTime<Utc>>,
    pub dates: Vec<NaiveDate>,
    pub group_ids: Vec<String>,
    pub role_ids: Vec<String>,
}

/// Snapshot returned to a public-token caller: the collection plus its
/// ordered target dates, gated by `is_visible_to` before it ever reaches
/// here (spec §4.5 "visibility is checked at the query boundary").
pub struct CollectionView {
    pub collection: AttendanceCollection,
    pub target_dates: Vec<TargetDate>,
}

pub struct AttendanceUseCase {
    collections: Arc<dyn AttendanceCollectionRepository>,
    tx_manager: Arc<dyn TxManager>,
    clock: Arc<dyn Clock>,
}

impl AttendanceUseCase {
    pub fn new(
        collections: Arc<dyn AttendanceCollectionRepository>,
        tx_manager: Arc<dyn TxManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        AttendanceUseCase {
            collections,
            tx_manager,
            clock,
        }
    }

    pub async fn create(&self, input: CreateCollectionInput) -> AppResult<AttendanceCollection> {
        let now = self.clock.now();
        let collection = AttendanceCollection::new(
            input.tenant_id,
            input.title,
            input.target_type,
            input.target_id,
            input.deadline,
            now,
        )?;
        let target_dates: Vec<TargetDate> = input
            .dates
            .iter()
            .enumerate()
            .map(|(i, date)| TargetDate::new(collection.id.clone(), *date, i as u32))
            .collect();
        let group_assignments: Vec<CollectionGroupAssignment> = input
            .group_ids
            .into_iter()
            .map(|group_id| CollectionGroupAssignment {
                collection_id: collection.id.clone(),
                group_id,
            })
            .collect();
        let role_assignments: Vec<CollectionRoleAssignment> = input
            .role_ids
            .into_iter()
            .map(|role_id| CollectionRoleAssignment {
                collection_id: collection.id.clone(),
                role_id,
            })
            .collect();

        let collection_for_tx = collection.clone();
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let collection = collection_for_tx.clone();
            let target_dates = target_dates.clone();
            let group_assignments = group_assignments.clone();
            let role_assignments = role_assignments.clone();
            Box::pin(async move {
                self.collections.save(ctx, &collection).await?;
                // New aggregate: no existing rows to preserve, so a plain
                // insert via `replace_target_dates` with an empty baseline
                // is equivalent to `save_target_dates` here.
                self.collections
                    .replace_target_dates(ctx, &collection.id, &target_dates)
                    .await?;
                if !group_assignments.is_empty() {
                    self.collections.save_group_assignments(ctx, &group_assignments).await?;
                }
                if !role_assignments.is_empty() {
                    self.collections.save_role_assignments(ctx, &role_assignments).await?;
                }
                Ok(())
            })
        })
        .await?;

        Ok(collection)
    }

    pub async fn close(&self, tenant_id: &TenantId, collection_id: &AttendanceCollectionId) -> AppResult<AttendanceCollection> {
        let now = self.clock.now();
        let tenant_id = tenant_id.clone();
        let collection_id = collection_id.clone();
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let tenant_id = tenant_id.clone();
            let collection_id = collection_id.clone();
            Box::pin(async move {
                let mut collection = self
                    .collections
                    .find_by_id(&tenant_id, &collection_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("attendance collection"))?;
                collection.close(now)?;
                self.collections.save(ctx, &collection).await?;
                Ok(collection)
            })
        })
        .await
    }

    /// Replaces the target-date list, preserving responses on unchanged
    /// dates via `diff_target_dates` (spec §4.5, §8 invariant 9).
    pub async fn replace_target_dates(
        &self,
        tenant_id: &TenantId,
        collection_id: &AttendanceCollectionId,
        new_dates: Vec<TargetDate>,
    ) -> AppResult<()> {
        let tenant_id = tenant_id.clone();
        let collection_id = collection_id.clone();
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let tenant_id = tenant_id.clone();
            let collection_id = collection_id.clone();
            let new_dates = new_dates.clone();
            Box::pin(async move {
                self.collections
                    .find_by_id(&tenant_id, &collection_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("attendance collection"))?;
                let existing = self
                    .collections
                    .find_target_dates_by_collection_id(&collection_id)
                    .await?;
                let diff = diff_target_dates(&existing, &new_dates);
                let mut merged = diff.to_update;
                merged.extend(diff.to_insert);
                self.collections.replace_target_dates(ctx, &collection_id, &merged).await?;
                Ok(())
            })
        })
        .await
    }

    /// Upserts a member's response to one target date, gated by
    /// `AttendanceCollection::can_respond` (spec §4.5).
    pub async fn respond(
        &self,
        collection_token: &str,
        member_id: MemberId,
        target_date_id: TargetDateId,
        status: AttendanceStatus,
    ) -> AppResult<()> {
        let now = self.clock.now();
        let collection = self
            .collections
            .find_by_token(collection_token)
            .await?
            .ok_or_else(|| AppError::not_found("attendance collection"))?;
        collection.can_respond(now)?;

        let response = AttendanceResponse {
            id: AttendanceResponseId::generate(),
            collection_id: collection.id.clone(),
            member_id,
            target_date_id,
            status,
            updated_at: now,
        };
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let response = response.clone();
            Box::pin(async move { self.collections.upsert_response(ctx, &response).await })
        })
        .await
    }

    /// Public-token read path: returns `None` when the token doesn't
    /// resolve, or when the subject is gated out (spec §4.5).
    pub async fn view_by_token(
        &self,
        token: &str,
        subject_group_ids: &[String],
        subject_role_ids: &[String],
    ) -> AppResult<Option<CollectionView>> {
        let Some(collection) = self.collections.find_by_token(token).await? else {
            return Ok(None);
        };
        let group_assignments = self
            .collections
            .find_group_assignments_by_collection_id(&collection.id)
            .await?;
        let role_assignments = self
            .collections
            .find_role_assignments_by_collection_id(&collection.id)
            .await?;
        if !is_visible_to(&group_assignments, &role_assignments, subject_group_ids, subject_role_ids) {
            return Ok(None);
        }
        let target_dates = self
            .collections
            .find_target_dates_by_collection_id(&collection.id)
            .await?;
        Ok(Some(CollectionView { collection, target_dates }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::infra::in_memory::{InMemoryAttendanceCollectionRepository, InMemoryTxManager};

    fn build_use_case(clock: Arc<FixedClock>) -> AttendanceUseCase {
        AttendanceUseCase::new(
            Arc::new(InMemoryAttendanceCollectionRepository::new()),
            Arc::new(InMemoryTxManager::new()),
            clock,
        )
    }

    // S7: create with a deadline, respond before and after it, close, then
    // close again.
    #[tokio::test]
    async fn lifecycle_respects_deadline_and_close_is_single_shot() {
        let start: DateTime<Utc> = "2025-01-10T00:00:00Z".parse().unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let use_case = build_use_case(clock.clone());
        let tenant_id = TenantId::generate();

        let deadline: DateTime<Utc> = "2025-01-10T01:00:00Z".parse().unwrap();
        let collection = use_case
            .create(CreateCollectionInput {
                tenant_id: tenant_id.clone(),
                title: "忘年会の出欠確認".to_string(),
                target_type: TargetType::Event,
                target_id: "event-1".to_string(),
                deadline: Some(deadline),
                dates: vec![NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()],
                group_ids: vec![],
                role_ids: vec![],
            })
            .await
            .unwrap();

        // Before the deadline: respondable.
        assert!(collection.can_respond(clock.now()).is_ok());

        // After the deadline: rejected.
        clock.set(deadline + chrono::Duration::hours(2));
        assert!(collection.can_respond(clock.now()).is_err());

        // Close succeeds once.
        let closed = use_case.close(&tenant_id, &collection.id).await.unwrap();
        assert_eq!(closed.status, crate::domain::attendance_collection::CollectionStatus::Closed);

        // A second close is rejected.
        let second_close = use_case.close(&tenant_id, &collection.id).await;
        assert!(second_close.is_err());
    }
}
