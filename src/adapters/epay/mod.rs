//! EasyPay-compatible payment gateway adapters.
//!
//! - `gateway` - reqwest client for refund and order query
//! - `mock_gateway` - in-process double for tests
//! - `submit_form` - browser auto-submit page

mod gateway;
mod mock_gateway;
mod submit_form;

pub use gateway::EpayGateway;
pub use mock_gateway::MockPaymentGateway;
pub use submit_form::{escape_html, render_auto_submit};
