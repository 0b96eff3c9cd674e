//! Auto-submitting payment form.
//!
//! The gateway expects a browser POST. The submit page renders the signed
//! parameters as hidden inputs and posts them on load, with a button for
//! browsers without JavaScript.

use std::fmt::Write;

use crate::domain::billing::GatewayParams;

/// Minimal HTML escaping for text and double-quoted attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Renders the page that posts `params` to `action`.
///
/// Inputs appear in key order, which `GatewayParams` already guarantees.
pub fn render_auto_submit(action: &str, params: &GatewayParams) -> String {
    let mut page = String::from(
        "<!doctype html><html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
         <title>Redirecting to payment...</title></head><body>",
    );

    // Writing into a String cannot fail.
    let _ = write!(
        page,
        "<form id=\"pay-form\" method=\"post\" action=\"{}\">",
        escape_html(action)
    );
    for (name, value) in params {
        let _ = write!(
            page,
            "<input type=\"hidden\" name=\"{}\" value=\"{}\">",
            escape_html(name),
            escape_html(value)
        );
    }
    page.push_str("</form>");
    page.push_str(
        "<noscript>Enable JavaScript or press continue. \
         <button type=\"submit\" form=\"pay-form\">Continue</button></noscript>",
    );
    page.push_str("<script>document.getElementById('pay-form').submit();</script>");
    page.push_str("</body></html>");
    page
}
