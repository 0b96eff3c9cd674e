//! Mock payment gateway for testing.
//!
//! Supports:
//! - Pre-configured refund and query results
//! - Error injection
//! - Call tracking
//!
//! ```ignore
//! let gateway = MockPaymentGateway::new();
//! gateway.fail_refunds(GatewayError::Timeout(Duration::from_secs(15))).await;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::billing::OrderNumber;
use crate::ports::{
    GatewayError, GatewayOrderState, PaymentGateway, PaymentSettings, RefundReceipt, RefundRequest,
};

#[derive(Debug, Default)]
struct MockState {
    refund_error: Option<GatewayError>,
    refunds: Vec<RefundRequest>,
    orders: HashMap<String, GatewayOrderState>,
    queries: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every following refund fails with `error`.
    pub async fn fail_refunds(&self, error: GatewayError) {
        self.inner.lock().await.refund_error = Some(error);
    }

    /// What the query endpoint reports for `state.order_number`.
    pub async fn set_order(&self, state: GatewayOrderState) {
        self.inner
            .lock()
            .await
            .orders
            .insert(state.order_number.clone(), state);
    }

    pub async fn refunds(&self) -> Vec<RefundRequest> {
        self.inner.lock().await.refunds.clone()
    }

    pub async fn query_count(&self) -> usize {
        self.inner.lock().await.queries.len()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn refund(
        &self,
        _settings: &PaymentSettings,
        request: &RefundRequest,
    ) -> Result<RefundReceipt, GatewayError> {
        let mut state = self.inner.lock().await;
        if let Some(error) = state.refund_error.clone() {
            return Err(error);
        }
        state.refunds.push(request.clone());
        Ok(RefundReceipt {
            message: "refund accepted".to_string(),
        })
    }

    async fn query_order(
        &self,
        _settings: &PaymentSettings,
        order_number: &OrderNumber,
    ) -> Result<GatewayOrderState, GatewayError> {
        let mut state = self.inner.lock().await;
        state.queries.push(order_number.to_string());
        state
            .orders
            .get(order_number.as_str())
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                code: -1,
                message: "order not found".to_string(),
            })
    }
}
