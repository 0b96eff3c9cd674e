//! PostgreSQL implementation of BillingStore.
//!
//! Row locks use `SELECT ... FOR UPDATE`. The per-user subscription lock is a
//! transaction-scoped advisory lock keyed on the user id, so it also covers
//! users that have no subscription row yet. Every transaction starts with
//! `SET LOCAL lock_timeout`; a lock wait past that limit surfaces as
//! `ErrorCode::LockTimeout`.
//!
//! Orders store the amount twice: `amount_minor` and the decimal mirror
//! `amount_decimal`. Both are written from the same `Money`, and reads
//! refuse rows where they disagree.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::{PgPool, Postgres, Transaction};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::billing::{
    decimal_to_minor, BillingPeriod, Money, Order, OrderNumber, OrderStatus, PeriodUnit, Plan,
    Subscription, SubscriptionStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, OrderId, PlanId, SubscriptionId, Timestamp, UserId,
};
use crate::ports::{BillingStore, BillingUnitOfWork};

/// SQLSTATE for `lock_not_available`.
const LOCK_NOT_AVAILABLE: &str = "55P03";
const ORDER_NUMBER_CONSTRAINT: &str = "orders_order_number_key";

const PLAN_COLUMNS: &str =
    "id, code, name, description, price_minor, period_unit, period_count, active, sort_order";

const ORDER_COLUMNS: &str = "id, user_id, plan_id, order_number, trade_number, subject, \
     amount_minor, amount_decimal, status, submitted_at, paid_at, refunded_at, notify_payload, \
     created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str = "id, user_id, plan_id, last_order_id, started_at, expires_at, \
     status, created_at, updated_at";

pub struct PostgresBillingStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresBillingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Row mapping
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    code: String,
    name: String,
    description: Option<String>,
    price_minor: i64,
    period_unit: String,
    period_count: i32,
    active: bool,
    sort_order: i32,
}

impl From<PlanRow> for Plan {
    fn from(row: PlanRow) -> Self {
        Plan {
            id: PlanId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            description: row.description,
            price: Money::from_minor(row.price_minor),
            period: BillingPeriod::new(
                PeriodUnit::parse_lenient(&row.period_unit),
                u32::try_from(row.period_count).unwrap_or(1),
            ),
            active: row.active,
            sort_order: row.sort_order,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    plan_id: Uuid,
    order_number: String,
    trade_number: Option<String>,
    subject: String,
    amount_minor: i64,
    amount_decimal: String,
    status: String,
    submitted_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    refunded_at: Option<DateTime<Utc>>,
    notify_payload: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let mirrored = decimal_to_minor(&row.amount_decimal).ok();
        if mirrored != Some(row.amount_minor) {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!(
                    "order {} amount {} disagrees with decimal mirror '{}'",
                    row.order_number, row.amount_minor, row.amount_decimal
                ),
            ));
        }

        Ok(Order {
            id: OrderId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(corrupt_row)?,
            plan_id: PlanId::from_uuid(row.plan_id),
            order_number: OrderNumber::parse(&row.order_number).map_err(corrupt_row)?,
            trade_number: row.trade_number,
            subject: row.subject,
            amount: Money::from_minor(row.amount_minor),
            status: OrderStatus::parse(&row.status).map_err(corrupt_row)?,
            submitted_at: row.submitted_at.map(Timestamp::from_datetime),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            refunded_at: row.refunded_at.map(Timestamp::from_datetime),
            notify_payload: row.notify_payload,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    plan_id: Uuid,
    last_order_id: Option<Uuid>,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(corrupt_row)?,
            plan_id: PlanId::from_uuid(row.plan_id),
            last_order_id: row.last_order_id.map(OrderId::from_uuid),
            started_at: Timestamp::from_datetime(row.started_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            status: SubscriptionStatus::parse(&row.status).map_err(corrupt_row)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn corrupt_row(err: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored value: {}", err))
}

/// Maps driver errors, singling out lock timeouts and order-number clashes.
fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) {
            return DomainError::new(ErrorCode::LockTimeout, format!("{}: lock wait timed out", context));
        }
        if db_err.constraint() == Some(ORDER_NUMBER_CONSTRAINT) {
            return DomainError::new(ErrorCode::DuplicateOrderNumber, "Order number already exists");
        }
    }
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, err))
}

// ════════════════════════════════════════════════════════════════════════════════
// Queries shared by the pool and open transactions
// ════════════════════════════════════════════════════════════════════════════════

async fn fetch_plan<'e>(executor: impl PgExecutor<'e>, id: &PlanId) -> Result<Option<Plan>, DomainError> {
    let row: Option<PlanRow> = sqlx::query_as(&format!(
        "SELECT {} FROM subscription_plans WHERE id = $1",
        PLAN_COLUMNS
    ))
    .bind(id.as_uuid())
    .fetch_optional(executor)
    .await
    .map_err(|e| db_error("Failed to find plan", e))?;

    Ok(row.map(Plan::from))
}

async fn fetch_order<'e>(
    executor: impl PgExecutor<'e>,
    filter: &str,
    key: OrderKey<'_>,
    for_update: bool,
) -> Result<Option<Order>, DomainError> {
    let sql = format!(
        "SELECT {} FROM orders WHERE {} = $1{}",
        ORDER_COLUMNS,
        filter,
        if for_update { " FOR UPDATE" } else { "" }
    );
    let query = sqlx::query_as::<_, OrderRow>(&sql);
    let query = match key {
        OrderKey::Id(id) => query.bind(*id.as_uuid()),
        OrderKey::Number(number) => query.bind(number.as_str().to_string()),
    };

    let row = query
        .fetch_optional(executor)
        .await
        .map_err(|e| db_error("Failed to find order", e))?;

    row.map(Order::try_from).transpose()
}

#[derive(Clone, Copy)]
enum OrderKey<'a> {
    Id(&'a OrderId),
    Number(&'a OrderNumber),
}

async fn insert_order_row<'e>(executor: impl PgExecutor<'e>, order: &Order) -> Result<(), DomainError> {
    sqlx::query(&format!(
        "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        ORDER_COLUMNS
    ))
    .bind(order.id.as_uuid())
    .bind(order.user_id.as_str())
    .bind(order.plan_id.as_uuid())
    .bind(order.order_number.as_str())
    .bind(&order.trade_number)
    .bind(&order.subject)
    .bind(order.amount.minor())
    .bind(order.amount_decimal())
    .bind(order.status.as_str())
    .bind(order.submitted_at.map(Timestamp::into_datetime))
    .bind(order.paid_at.map(Timestamp::into_datetime))
    .bind(order.refunded_at.map(Timestamp::into_datetime))
    .bind(&order.notify_payload)
    .bind(order.created_at.as_datetime())
    .bind(order.updated_at.as_datetime())
    .execute(executor)
    .await
    .map_err(|e| db_error("Failed to insert order", e))?;

    Ok(())
}

#[async_trait]
impl BillingStore for PostgresBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingUnitOfWork>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        // SET does not take bind parameters; the value is an integer we own.
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to set lock timeout", e))?;

        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        fetch_plan(&self.pool, id).await
    }

    async fn list_active_plans(&self) -> Result<Vec<Plan>, DomainError> {
        let rows: Vec<PlanRow> = sqlx::query_as(&format!(
            "SELECT {} FROM subscription_plans WHERE active ORDER BY sort_order ASC, code ASC",
            PLAN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list plans", e))?;

        Ok(rows.into_iter().map(Plan::from).collect())
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        fetch_order(&self.pool, "id", OrderKey::Id(id), false).await
    }

    async fn find_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, DomainError> {
        fetch_order(&self.pool, "order_number", OrderKey::Number(number), false).await
    }

    async fn find_latest_pending_order(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
    ) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM orders
            WHERE user_id = $1 AND plan_id = $2 AND status = $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id.as_str())
        .bind(plan_id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find pending order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn insert_order(&self, order: &Order) -> Result<(), DomainError> {
        insert_order_row(&self.pool, order).await
    }

    async fn find_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_subscriptions WHERE user_id = $1",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }
}

struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl BillingUnitOfWork for PostgresUnitOfWork {
    async fn find_plan(&mut self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        fetch_plan(&mut *self.tx, id).await
    }

    async fn lock_order(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        fetch_order(&mut *self.tx, "id", OrderKey::Id(id), true).await
    }

    async fn lock_order_by_number(&mut self, number: &OrderNumber) -> Result<Option<Order>, DomainError> {
        fetch_order(&mut *self.tx, "order_number", OrderKey::Number(number), true).await
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        insert_order_row(&mut *self.tx, order).await
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                trade_number = $2,
                status = $3,
                submitted_at = $4,
                paid_at = $5,
                refunded_at = $6,
                notify_payload = $7,
                updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(&order.trade_number)
        .bind(order.status.as_str())
        .bind(order.submitted_at.map(Timestamp::into_datetime))
        .bind(order.paid_at.map(Timestamp::into_datetime))
        .bind(order.refunded_at.map(Timestamp::into_datetime))
        .bind(&order.notify_payload)
        .bind(order.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to update order", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::OrderNotFound,
                format!("Order {} not found", order.order_number),
            ));
        }

        Ok(())
    }

    async fn close_pending_orders(
        &mut self,
        user_id: &UserId,
        plan_id: &PlanId,
        now: Timestamp,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET status = $4, updated_at = $5
            WHERE user_id = $1 AND plan_id = $2 AND status = $3
            "#,
        )
        .bind(user_id.as_str())
        .bind(plan_id.as_uuid())
        .bind(OrderStatus::Pending.as_str())
        .bind(OrderStatus::Closed.as_str())
        .bind(now.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to close pending orders", e))?;

        Ok(result.rows_affected())
    }

    async fn lock_subscription(&mut self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("user_subscription:{}", user_id))
            .execute(&mut *self.tx)
            .await
            .map_err(|e| db_error("Failed to lock subscription", e))?;

        let row: Option<SubscriptionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM user_subscriptions WHERE user_id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to load subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn save_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(&format!(
            r#"
            INSERT INTO user_subscriptions ({})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id) DO UPDATE SET
                plan_id = EXCLUDED.plan_id,
                last_order_id = EXCLUDED.last_order_id,
                started_at = EXCLUDED.started_at,
                expires_at = EXCLUDED.expires_at,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.plan_id.as_uuid())
        .bind(subscription.last_order_id.map(|id| *id.as_uuid()))
        .bind(subscription.started_at.as_datetime())
        .bind(subscription.expires_at.as_datetime())
        .bind(subscription.status.as_str())
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| db_error("Failed to save subscription", e))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .commit()
            .await
            .map_err(|e| db_error("Failed to commit transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| db_error("Failed to roll back transaction", e))
    }
}
