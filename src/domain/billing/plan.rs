//! Billing plan template.

use serde::{Deserialize, Serialize};

use super::money::Money;
use super::renewal::BillingPeriod;
use crate::domain::foundation::{PlanId, ValidationError};

/// What a subscription costs and how long one purchase lasts.
///
/// A price of zero marks a free plan, which activates without the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub period: BillingPeriod,
    pub active: bool,
    pub sort_order: i32,
}

impl Plan {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        period: BillingPeriod,
    ) -> Result<Self, ValidationError> {
        let code = code.into();
        let name = name.into();
        if code.trim().is_empty() {
            return Err(ValidationError::empty_field("code"));
        }
        if name.trim().is_empty() {
            return Err(ValidationError::empty_field("name"));
        }
        if price.minor() < 0 {
            return Err(ValidationError::out_of_range("price", 0, i64::MAX, price.minor()));
        }

        Ok(Self {
            id: PlanId::new(),
            code,
            name,
            description: None,
            price,
            period,
            active: true,
            sort_order: 0,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn is_free(&self) -> bool {
        self.price.is_zero()
    }
}
