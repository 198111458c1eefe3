//! Database operations against the commerce `PostgreSQL` schema.
//!
//! All access is read-only. Queries are runtime-built (`sqlx::query_as` /
//! `QueryBuilder`) because the filter surface is dynamic.
//!
//! ## Tables
//!
//! - `sales_orders` - Order headers
//! - `sales_order_addresses` - Billing/shipping addresses (one row each)
//! - `sales_order_status_history` - Order comments
//! - `sales_order_payments` - Payment rows (method code per row)
//! - `sales_invoices` / `sales_invoice_comments` / `sales_invoice_items`
//! - `sales_creditmemos` / `sales_creditmemo_comments` / `sales_creditmemo_items`
//! - `sales_shipments` / `sales_shipment_comments` / `sales_shipment_items`
//!   / `sales_shipment_tracks`
//! - `sales_order_items` - Order line items (tree via `parent_item_id`)
//! - `stores` - Storefront scopes with their configured timezone
//! - `payment_methods` - Payment method code to display title

pub mod comments;
pub mod creditmemos;
pub mod documents;
pub mod filter_plan;
pub mod invoices;
pub mod order_items;
pub mod orders;
pub mod payments;
pub mod shipments;

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use filter_plan::{FilterPlan, plan_filters};
pub use orders::{OrderBatch, fetch_orders};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Group values by a key, preserving input order within each group.
///
/// Every child fetcher ends with this shape: a flat list of converted rows
/// keyed back to their owning parent id.
pub fn group_by<K, V, I>(values: I, key: impl Fn(&V) -> K) -> HashMap<K, Vec<V>>
where
    K: Eq + Hash,
    I: IntoIterator<Item = V>,
{
    let mut groups: HashMap<K, Vec<V>> = HashMap::new();
    for value in values {
        groups.entry(key(&value)).or_default().push(value);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_by_preserves_input_order_within_groups() {
        let groups = group_by(vec![(1, "a"), (2, "b"), (1, "c")], |(k, _)| *k);

        assert_eq!(groups[&1], vec![(1, "a"), (1, "c")]);
        assert_eq!(groups[&2], vec![(2, "b")]);
    }

    #[test]
    fn group_by_empty_input() {
        let groups: HashMap<i64, Vec<i64>> = group_by(vec![], |v| *v);
        assert!(groups.is_empty());
    }
}
