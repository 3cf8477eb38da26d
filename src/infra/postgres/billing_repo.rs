use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use super::{map_sqlx_err, tx::PgTxContext};
use crate::application::ports::{
    BillingAuditLogRepository, EntitlementRepository, SubscriptionRepository, TxContext,
};
use crate::domain::license::{ActorType, BillingAuditLog, Entitlement, EntitlementSource, Subscription};
use crate::error::AppResult;
use crate::id::{BillingAuditLogId, EntitlementId, SubscriptionId, TenantId};

// ---------------------------------------------------------------- Entitlement

pub struct PostgresEntitlementRepository {
    pool: PgPool,
}

impl PostgresEntitlementRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresEntitlementRepository { pool }
    }
}

fn entitlement_source_label(source: EntitlementSource) -> &'static str {
    match source {
        EntitlementSource::Booth => "booth",
        EntitlementSource::Stripe => "stripe",
    }
}

/// Unrecognized values fold to `Booth` rather than panicking.
fn parse_entitlement_source(label: &str) -> EntitlementSource {
    match label {
        "booth" => EntitlementSource::Booth,
        "stripe" => EntitlementSource::Stripe,
        _ => EntitlementSource::Booth,
    }
}

fn row_to_entitlement(row: &sqlx::postgres::PgRow) -> Entitlement {
    Entitlement {
        id: EntitlementId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        plan_code: row.get("plan_code"),
        source: parse_entitlement_source(row.get::<String, _>("source").as_str()),
        starts_at: row.get("starts_at"),
        revoked_at: row.get("revoked_at"),
    }
}

#[async_trait]
impl EntitlementRepository for PostgresEntitlementRepository {
    async fn save(&self, ctx: &mut dyn TxContext, entitlement: &Entitlement) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO entitlements (id, tenant_id, plan_code, source, starts_at, revoked_at) \
             VALUES ($1,$2,$3,$4,$5,$6) \
             ON CONFLICT (id) DO UPDATE SET revoked_at = EXCLUDED.revoked_at",
        )
        .bind(entitlement.id.as_str())
        .bind(entitlement.tenant_id.as_str())
        .bind(&entitlement.plan_code)
        .bind(entitlement_source_label(entitlement.source))
        .bind(entitlement.starts_at)
        .bind(entitlement.revoked_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save entitlement", e))?;
        Ok(())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Entitlement>> {
        sqlx::query("SELECT * FROM entitlements WHERE tenant_id = $1 ORDER BY starts_at ASC")
            .bind(tenant_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_entitlement).collect())
            .map_err(|e| map_sqlx_err("find entitlements by tenant", e))
    }

    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Entitlement>> {
        sqlx::query("SELECT * FROM entitlements WHERE tenant_id = $1 AND revoked_at IS NULL ORDER BY starts_at ASC")
            .bind(tenant_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_entitlement).collect())
            .map_err(|e| map_sqlx_err("find active entitlements by tenant", e))
    }
}

// --------------------------------------------------------------- Subscription

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresSubscriptionRepository { pool }
    }
}

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: SubscriptionId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        stripe_customer_id: row.get("stripe_customer_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        status: row.get("status"),
        current_period_end: row.get("current_period_end"),
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, ctx: &mut dyn TxContext, subscription: &Subscription) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO subscriptions (id, tenant_id, stripe_customer_id, stripe_subscription_id, status, current_period_end) \
             VALUES ($1,$2,$3,$4,$5,$6) \
             ON CONFLICT (id) DO UPDATE SET \
             status = EXCLUDED.status, current_period_end = EXCLUDED.current_period_end",
        )
        .bind(subscription.id.as_str())
        .bind(subscription.tenant_id.as_str())
        .bind(&subscription.stripe_customer_id)
        .bind(&subscription.stripe_subscription_id)
        .bind(&subscription.status)
        .bind(subscription.current_period_end)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save subscription", e))?;
        Ok(())
    }

    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Option<Subscription>> {
        sqlx::query("SELECT * FROM subscriptions WHERE tenant_id = $1 ORDER BY current_period_end DESC LIMIT 1")
            .bind(tenant_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_subscription))
            .map_err(|e| map_sqlx_err("find active subscription by tenant", e))
    }
}

// ------------------------------------------------------------ BillingAuditLog

pub struct PostgresBillingAuditLogRepository {
    pool: PgPool,
}

impl PostgresBillingAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresBillingAuditLogRepository { pool }
    }
}

fn actor_type_label(actor_type: ActorType) -> &'static str {
    match actor_type {
        ActorType::User => "user",
        ActorType::Admin => "admin",
        ActorType::System => "system",
    }
}

/// Unrecognized values fold to `System` rather than panicking — a
/// corrupted actor type should never be silently attributed to a real
/// user or admin.
fn parse_actor_type(label: &str) -> ActorType {
    match label {
        "user" => ActorType::User,
        "admin" => ActorType::Admin,
        "system" => ActorType::System,
        _ => ActorType::System,
    }
}

fn row_to_log(row: &sqlx::postgres::PgRow) -> BillingAuditLog {
    BillingAuditLog {
        id: BillingAuditLogId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: row
            .get::<Option<String>, _>("tenant_id")
            .map(|s| TenantId::parse(s).expect("stored id is a valid SID")),
        when: row.get("when_at"),
        actor_type: parse_actor_type(row.get::<String, _>("actor_type").as_str()),
        actor_id: row.get("actor_id"),
        action: row.get("action"),
        subject_type: row.get("subject_type"),
        subject_id: row.get("subject_id"),
        before_json: row.get("before_json"),
        after_json: row.get("after_json"),
        ip: row.get("ip"),
        user_agent: row.get("user_agent"),
    }
}

impl PostgresBillingAuditLogRepository {
    async fn insert<'c, E>(executor: E, entry: &BillingAuditLog) -> AppResult<()>
    where
        E: sqlx::Executor<'c, Database = sqlx::Postgres>,
    {
        sqlx::query(
            "INSERT INTO billing_audit_log \
             (id, tenant_id, when_at, actor_type, actor_id, action, subject_type, subject_id, \
              before_json, after_json, ip, user_agent) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
        )
        .bind(entry.id.as_str())
        .bind(entry.tenant_id.as_ref().map(|t| t.as_str().to_string()))
        .bind(entry.when)
        .bind(actor_type_label(entry.actor_type))
        .bind(&entry.actor_id)
        .bind(&entry.action)
        .bind(&entry.subject_type)
        .bind(&entry.subject_id)
        .bind(&entry.before_json)
        .bind(&entry.after_json)
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .execute(executor)
        .await
        .map_err(|e| map_sqlx_err("append billing audit log", e))?;
        Ok(())
    }
}

#[async_trait]
impl BillingAuditLogRepository for PostgresBillingAuditLogRepository {
    async fn append(&self, ctx: &mut dyn TxContext, entry: &BillingAuditLog) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        Self::insert(&mut **tx, entry).await
    }

    // Out-of-band entries intentionally bypass the caller's transaction:
    // they record that something failed even when the enclosing tx rolls
    // back, so they need their own connection, not `&mut **tx`.
    async fn append_out_of_band(&self, entry: &BillingAuditLog) -> AppResult<()> {
        Self::insert(&self.pool, entry).await
    }

    async fn find_by_tenant_id(
        &self,
        tenant_id: &TenantId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<BillingAuditLog>> {
        sqlx::query(
            "SELECT * FROM billing_audit_log WHERE tenant_id = $1 \
             AND ($2::timestamptz IS NULL OR when_at >= $2) \
             AND ($3::timestamptz IS NULL OR when_at <= $3) \
             ORDER BY when_at ASC",
        )
        .bind(tenant_id.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.iter().map(row_to_log).collect())
        .map_err(|e| map_sqlx_err("find billing audit log by tenant", e))
    }
}
