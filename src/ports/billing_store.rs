//! Billing persistence port.
//!
//! Plain reads go through `BillingStore`. Every mutation runs inside a
//! `BillingUnitOfWork`: begin, lock the rows involved, read, conditionally
//! write, commit. Dropping a unit of work without committing rolls it back.
//!
//! # Locking
//!
//! - `lock_order*` takes an exclusive lock on the order row
//! - `lock_subscription` takes an exclusive per-user lock that also covers the
//!   case where the user has no subscription row yet, so two first-time
//!   activations for one user serialize
//!
//! A lock wait that exceeds the store's timeout fails with
//! `ErrorCode::LockTimeout`; callers may retry the whole operation.

use async_trait::async_trait;

use crate::domain::billing::{Order, OrderNumber, Plan, Subscription};
use crate::domain::foundation::{DomainError, OrderId, PlanId, Timestamp, UserId};

/// Read access plus the entry point for transactional writes.
#[async_trait]
pub trait BillingStore: Send + Sync {
    /// Starts a transaction.
    async fn begin(&self) -> Result<Box<dyn BillingUnitOfWork>, DomainError>;

    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError>;

    /// Active plans ordered by sort order.
    async fn list_active_plans(&self) -> Result<Vec<Plan>, DomainError>;

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    async fn find_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, DomainError>;

    /// Most recently created pending order for the (user, plan) pair.
    async fn find_latest_pending_order(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
    ) -> Result<Option<Order>, DomainError>;

    /// Inserts outside a transaction.
    ///
    /// # Errors
    ///
    /// - `DuplicateOrderNumber` if the number already exists
    async fn insert_order(&self, order: &Order) -> Result<(), DomainError>;

    async fn find_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError>;
}

/// One open transaction against the billing tables.
#[async_trait]
pub trait BillingUnitOfWork: Send {
    async fn find_plan(&mut self, id: &PlanId) -> Result<Option<Plan>, DomainError>;

    async fn lock_order(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    async fn lock_order_by_number(&mut self, number: &OrderNumber) -> Result<Option<Order>, DomainError>;

    async fn insert_order(&mut self, order: &Order) -> Result<(), DomainError>;

    async fn update_order(&mut self, order: &Order) -> Result<(), DomainError>;

    /// Closes every pending order for the pair; returns how many changed.
    async fn close_pending_orders(
        &mut self,
        user_id: &UserId,
        plan_id: &PlanId,
        now: Timestamp,
    ) -> Result<u64, DomainError>;

    /// Locks the user's subscription slot and returns the row if present.
    async fn lock_subscription(&mut self, user_id: &UserId) -> Result<Option<Subscription>, DomainError>;

    /// Inserts or replaces the user's single subscription row.
    async fn save_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError>;

    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
