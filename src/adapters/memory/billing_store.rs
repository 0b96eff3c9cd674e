//! In-memory billing store for tests and local development.
//!
//! A unit of work holds the store mutex for its whole lifetime and edits a
//! staged copy of the tables; `commit` swaps the copy in, anything else
//! discards it. This serializes all transactions, which is a stronger
//! guarantee than the row locks the Postgres adapter takes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::billing::{Order, OrderNumber, OrderStatus, Plan, Subscription};
use crate::domain::foundation::{DomainError, ErrorCode, OrderId, PlanId, Timestamp, UserId};
use crate::ports::{BillingStore, BillingUnitOfWork};

#[derive(Debug, Clone, Default)]
struct BillingTables {
    plans: HashMap<PlanId, Plan>,
    orders: HashMap<OrderId, Order>,
    subscriptions: HashMap<UserId, Subscription>,
}

impl BillingTables {
    fn order_by_number(&self, number: &OrderNumber) -> Option<&Order> {
        self.orders.values().find(|o| &o.order_number == number)
    }

    fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        if self.order_by_number(&order.order_number).is_some() {
            return Err(DomainError::new(
                ErrorCode::DuplicateOrderNumber,
                format!("order number {} already exists", order.order_number),
            ));
        }
        self.orders.insert(order.id, order.clone());
        Ok(())
    }

    fn latest_pending(&self, user_id: &UserId, plan_id: &PlanId) -> Option<&Order> {
        self.orders
            .values()
            .filter(|o| {
                &o.user_id == user_id && &o.plan_id == plan_id && o.status == OrderStatus::Pending
            })
            .max_by_key(|o| o.created_at)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryBillingStore {
    tables: Arc<Mutex<BillingTables>>,
}

impl InMemoryBillingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given plans.
    pub async fn with_plans(plans: impl IntoIterator<Item = Plan>) -> Self {
        let store = Self::new();
        for plan in plans {
            store.save_plan(plan).await;
        }
        store
    }

    pub async fn save_plan(&self, plan: Plan) {
        self.tables.lock().await.plans.insert(plan.id, plan);
    }

    /// Writes a subscription row directly, bypassing the lifecycle.
    pub async fn put_subscription(&self, subscription: Subscription) {
        self.tables
            .lock()
            .await
            .subscriptions
            .insert(subscription.user_id.clone(), subscription);
    }

    /// Replaces an order row directly, bypassing the lifecycle.
    pub async fn put_order(&self, order: Order) {
        self.tables.lock().await.orders.insert(order.id, order);
    }

    pub async fn orders_for(&self, user_id: &UserId) -> Vec<Order> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .values()
            .filter(|o| &o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }
}

#[async_trait]
impl BillingStore for InMemoryBillingStore {
    async fn begin(&self) -> Result<Box<dyn BillingUnitOfWork>, DomainError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, staged }))
    }

    async fn find_plan(&self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self.tables.lock().await.plans.get(id).cloned())
    }

    async fn list_active_plans(&self) -> Result<Vec<Plan>, DomainError> {
        let tables = self.tables.lock().await;
        let mut plans: Vec<Plan> = tables.plans.values().filter(|p| p.active).cloned().collect();
        plans.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.code.cmp(&b.code)));
        Ok(plans)
    }

    async fn find_order(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.tables.lock().await.orders.get(id).cloned())
    }

    async fn find_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, DomainError> {
        Ok(self.tables.lock().await.order_by_number(number).cloned())
    }

    async fn find_latest_pending_order(
        &self,
        user_id: &UserId,
        plan_id: &PlanId,
    ) -> Result<Option<Order>, DomainError> {
        Ok(self.tables.lock().await.latest_pending(user_id, plan_id).cloned())
    }

    async fn insert_order(&self, order: &Order) -> Result<(), DomainError> {
        self.tables.lock().await.insert_order(order)
    }

    async fn find_subscription(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.tables.lock().await.subscriptions.get(user_id).cloned())
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<BillingTables>,
    staged: BillingTables,
}

#[async_trait]
impl BillingUnitOfWork for InMemoryUnitOfWork {
    async fn find_plan(&mut self, id: &PlanId) -> Result<Option<Plan>, DomainError> {
        Ok(self.staged.plans.get(id).cloned())
    }

    async fn lock_order(&mut self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.staged.orders.get(id).cloned())
    }

    async fn lock_order_by_number(&mut self, number: &OrderNumber) -> Result<Option<Order>, DomainError> {
        Ok(self.staged.order_by_number(number).cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), DomainError> {
        self.staged.insert_order(order)
    }

    async fn update_order(&mut self, order: &Order) -> Result<(), DomainError> {
        match self.staged.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::OrderNotFound,
                format!("order {} not found", order.order_number),
            )),
        }
    }

    async fn close_pending_orders(
        &mut self,
        user_id: &UserId,
        plan_id: &PlanId,
        now: Timestamp,
    ) -> Result<u64, DomainError> {
        let mut closed = 0;
        for order in self.staged.orders.values_mut() {
            if &order.user_id == user_id
                && &order.plan_id == plan_id
                && order.status == OrderStatus::Pending
            {
                order.close(now)?;
                closed += 1;
            }
        }
        Ok(closed)
    }

    async fn lock_subscription(&mut self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.staged.subscriptions.get(user_id).cloned())
    }

    async fn save_subscription(&mut self, subscription: &Subscription) -> Result<(), DomainError> {
        self.staged
            .subscriptions
            .insert(subscription.user_id.clone(), subscription.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DomainError> {
        let InMemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DomainError> {
        Ok(())
    }
}
