//! Backoffice navigation URL construction.
//!
//! Built URLs are stripped of session-identifier fragments (`SID=...` query
//! parts and `/key/...` path segments) before they are exposed - export
//! consumers must never receive a link carrying someone's session.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use ordergate_core::{CustomerId, OrderId};

static KEY_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/key/[^/]*").expect("valid regex"));
static SID_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"SID=[a-z0-9]*").expect("valid regex"));

/// Builds order and customer detail URLs from the configured backoffice
/// base URL.
#[derive(Debug, Clone)]
pub struct AdminUrlBuilder {
    base: Url,
}

impl AdminUrlBuilder {
    /// Create a builder for the given backoffice base URL.
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// URL of the order detail view.
    #[must_use]
    pub fn order_url(&self, order_id: OrderId) -> String {
        self.build(&format!("sales_order/view/order_id/{order_id}"))
    }

    /// URL of the customer detail view. Guest orders carry no customer id
    /// and link to the customer overview instead.
    #[must_use]
    pub fn customer_url(&self, customer_id: Option<CustomerId>) -> String {
        match customer_id {
            Some(id) => self.build(&format!("customer/edit/id/{id}")),
            None => self.build("customer"),
        }
    }

    fn build(&self, route: &str) -> String {
        let url = format!("{}/{route}", self.base.as_str().trim_end_matches('/'));
        strip_session_fragments(&url)
    }
}

/// Remove `/key/...` path fragments and `SID=...` query fragments.
fn strip_session_fragments(url: &str) -> String {
    let url = KEY_FRAGMENT.replace_all(url, "");
    SID_FRAGMENT.replace_all(&url, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> AdminUrlBuilder {
        AdminUrlBuilder::new(Url::parse("https://shop.example/admin").unwrap())
    }

    #[test]
    fn builds_order_url() {
        assert_eq!(
            builder().order_url(OrderId::new(42)),
            "https://shop.example/admin/sales_order/view/order_id/42"
        );
    }

    #[test]
    fn builds_customer_url() {
        assert_eq!(
            builder().customer_url(Some(CustomerId::new(7))),
            "https://shop.example/admin/customer/edit/id/7"
        );
        assert_eq!(
            builder().customer_url(None),
            "https://shop.example/admin/customer"
        );
    }

    #[test]
    fn strips_secret_key_path_fragment() {
        assert_eq!(
            strip_session_fragments("https://shop.example/admin/sales_order/view/order_id/42/key/a1b2c3/"),
            "https://shop.example/admin/sales_order/view/order_id/42/"
        );
    }

    #[test]
    fn strips_session_id_query_fragment() {
        assert_eq!(
            strip_session_fragments("https://shop.example/admin/sales_order/view?SID=abc123"),
            "https://shop.example/admin/sales_order/view?"
        );
    }

    #[test]
    fn base_url_session_fragments_never_leak() {
        let builder = AdminUrlBuilder::new(
            Url::parse("https://shop.example/admin/key/s3cret/").unwrap(),
        );
        let url = builder.order_url(OrderId::new(1));
        assert!(!url.contains("s3cret"));
    }
}
