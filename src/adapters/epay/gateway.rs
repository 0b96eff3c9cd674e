//! EasyPay-compatible gateway client.
//!
//! Both calls go to `<gateway>/api.php` and authenticate with the merchant id
//! and key in the request itself. Responses are JSON with `code == 1` meaning
//! success. Every request carries the per-operation deadline from
//! `PaymentSettings::timeout`.
//!
//! # Configuration
//!
//! ```ignore
//! let gateway = EpayGateway::new();
//! let receipt = gateway.refund(&settings, &request).await?;
//! ```

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::domain::billing::{fields, OrderNumber};
use crate::ports::{
    GatewayError, GatewayOrderState, PaymentGateway, PaymentSettings, RefundReceipt, RefundRequest,
};

const CODE_OK: i64 = 1;
const STATUS_PAID: i64 = 1;

#[derive(Debug, Deserialize)]
struct RefundResponse {
    code: i64,
    #[serde(default)]
    msg: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    trade_no: String,
    #[serde(default)]
    out_trade_no: String,
    #[serde(default, rename = "type")]
    payment_type: String,
    #[serde(default)]
    money: String,
    #[serde(default)]
    status: i64,
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EpayGateway {
    http_client: reqwest::Client,
}

impl EpayGateway {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    fn map_send_error(settings: &PaymentSettings, err: reqwest::Error) -> GatewayError {
        if err.is_timeout() {
            GatewayError::Timeout(settings.timeout)
        } else {
            GatewayError::Transport(err.to_string())
        }
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        settings: &PaymentSettings,
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Self::map_send_error(settings, e))?;

        if !status.is_success() {
            return Err(GatewayError::Transport(format!("HTTP {}", status)));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body_len = body.len(), "unreadable gateway response");
            GatewayError::MalformedResponse(e.to_string())
        })
    }
}

#[async_trait]
impl PaymentGateway for EpayGateway {
    async fn refund(
        &self,
        settings: &PaymentSettings,
        request: &RefundRequest,
    ) -> Result<RefundReceipt, GatewayError> {
        let money = request.amount.to_decimal();
        let form = [
            (fields::MERCHANT_ID, settings.merchant_id.as_str()),
            ("key", settings.merchant_key.expose_secret().as_str()),
            (fields::TRADE_NUMBER, request.trade_number.as_str()),
            (fields::MONEY, money.as_str()),
        ];

        let response = self
            .http_client
            .post(settings.api_url())
            .timeout(settings.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| Self::map_send_error(settings, e))?;

        let body: RefundResponse = Self::read_json(settings, response).await?;
        if body.code != CODE_OK {
            tracing::warn!(
                trade_no = %request.trade_number,
                code = body.code,
                message = %body.msg,
                "gateway refused refund"
            );
            return Err(GatewayError::Rejected {
                code: body.code,
                message: body.msg,
            });
        }

        Ok(RefundReceipt { message: body.msg })
    }

    async fn query_order(
        &self,
        settings: &PaymentSettings,
        order_number: &OrderNumber,
    ) -> Result<GatewayOrderState, GatewayError> {
        let query = [
            ("act", "order"),
            (fields::MERCHANT_ID, settings.merchant_id.as_str()),
            ("key", settings.merchant_key.expose_secret().as_str()),
            (fields::ORDER_NUMBER, order_number.as_str()),
        ];

        let response = self
            .http_client
            .get(settings.api_url())
            .timeout(settings.timeout)
            .query(&query)
            .send()
            .await
            .map_err(|e| Self::map_send_error(settings, e))?;

        let body: QueryResponse = Self::read_json(settings, response).await?;
        if body.code != CODE_OK {
            return Err(GatewayError::Rejected {
                code: body.code,
                message: body.msg,
            });
        }

        Ok(GatewayOrderState {
            order_number: body.out_trade_no,
            trade_number: non_empty(body.trade_no),
            money: body.money,
            paid: body.status == STATUS_PAID,
            payment_type: non_empty(body.payment_type),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_response_tolerates_missing_fields() {
        let body: QueryResponse = serde_json::from_str(r#"{"code":-1,"msg":"no such order"}"#).unwrap();
        assert_eq!(body.code, -1);
        assert_eq!(body.status, 0);
        assert!(body.trade_no.is_empty());
    }

    #[test]
    fn query_response_reads_paid_order() {
        let body: QueryResponse = serde_json::from_str(
            r#"{"code":1,"msg":"ok","trade_no":"T1","out_trade_no":"RD1","type":"alipay","money":"9.99","status":1}"#,
        )
        .unwrap();
        assert_eq!(body.status, STATUS_PAID);
        assert_eq!(body.payment_type, "alipay");
        assert_eq!(body.money, "9.99");
    }

    #[test]
    fn empty_strings_become_none() {
        assert_eq!(non_empty(String::new()), None);
        assert_eq!(non_empty("x".to_string()), Some("x".to_string()));
    }

    #[test]
    fn refund_response_parses_failure() {
        let body: RefundResponse = serde_json::from_str(r#"{"code":0,"msg":"insufficient"}"#).unwrap();
        assert_ne!(body.code, CODE_OK);
        assert_eq!(body.msg, "insufficient");
    }
}
