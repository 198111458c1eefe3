//! The order export pipeline.
//!
//! One request runs plan, base fetch, six child fetches, merge, and
//! serialization in sequence. The resolvers are constructed here and live
//! for exactly this batch; the wire result is one JSON string per order.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;

use ordergate_core::{FilterMap, OrderExport, OrderId};

use crate::config::ServerConfig;
use crate::db::{self, OrderBatch, plan_filters};
use crate::error::ApiError;
use crate::services::{AdminUrlBuilder, PaymentTitleResolver, TimezoneResolver};

/// One exported order on the wire: its fully aggregated document as a JSON
/// string.
#[derive(Debug, Serialize)]
pub struct ExportedOrder {
    pub json: String,
}

/// Run the full export for a set of filter criteria.
///
/// Returns the matching orders, newest first, each fully aggregated and
/// serialized to its own JSON string. No matching orders is an empty list,
/// not an error.
///
/// # Errors
///
/// Returns [`ApiError::InvalidFilterField`] for unroutable filter fields
/// and a database error if any query fails.
pub async fn list_orders(
    pool: &PgPool,
    config: &ServerConfig,
    filters: &FilterMap,
    limit: i64,
) -> Result<Vec<ExportedOrder>, ApiError> {
    let plan = plan_filters(filters)?;

    let mut timezones = TimezoneResolver::new(config.default_timezone);
    let mut titles = PaymentTitleResolver::new();
    let urls = AdminUrlBuilder::new(config.backoffice_url.clone());

    let mut batch =
        db::orders::fetch_order_batch(pool, &plan, limit, &mut timezones, &urls).await?;
    if batch.is_empty() {
        return Ok(vec![]);
    }

    let comments = db::comments::fetch_order_comments(pool, &batch, &mut timezones).await?;
    let payments = db::payments::fetch_payments(pool, &batch, &mut titles).await?;
    let invoices = db::invoices::fetch_invoices(pool, &batch, &mut timezones).await?;
    let creditmemos = db::creditmemos::fetch_creditmemos(pool, &batch, &mut timezones).await?;
    let shipments = db::shipments::fetch_shipments(pool, &batch, &mut timezones).await?;
    let items = db::order_items::fetch_order_items(pool, &batch, &mut timezones).await?;

    attach(&mut batch, comments, |order| &mut order.comments);
    attach(&mut batch, payments, |order| &mut order.payments);
    attach(&mut batch, invoices, |order| &mut order.invoices);
    attach(&mut batch, creditmemos, |order| &mut order.creditmemos);
    attach(&mut batch, shipments, |order| &mut order.shipments);
    attach(&mut batch, items, |order| &mut order.items);

    serialize_orders(batch.into_orders())
}

/// Move fetched child records into their orders' collection slot. Groups
/// keyed by an order outside the batch are discarded.
fn attach<T>(
    batch: &mut OrderBatch,
    groups: HashMap<OrderId, Vec<T>>,
    slot: impl Fn(&mut OrderExport) -> &mut Vec<T>,
) {
    for (order_id, records) in groups {
        if let Some(order) = batch.get_mut(order_id) {
            *slot(order) = records;
        }
    }
}

/// Serialize each order to its own JSON string, preserving order.
fn serialize_orders(orders: Vec<OrderExport>) -> Result<Vec<ExportedOrder>, ApiError> {
    orders
        .into_iter()
        .map(|order| {
            serde_json::to_string(&order)
                .map(|json| ExportedOrder { json })
                .map_err(|e| ApiError::Internal(format!("order serialization failed: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordergate_core::{AddressExport, CommentExport, StoreId};

    fn order(id: i64) -> OrderExport {
        OrderExport {
            entity_id: OrderId::new(id),
            increment_id: format!("10000{id}"),
            ext_order_id: None,
            state: None,
            status: None,
            created_at: "2020-06-01 08:00:00".into(),
            updated_at: "2020-06-01 08:00:00".into(),
            store_id: StoreId::new(1),
            store_name: None,
            customer_id: None,
            ext_customer_id: None,
            order_currency_code: None,
            grand_total: None,
            total_paid: None,
            discount_amount: None,
            discount_description: None,
            shipping_incl_tax: None,
            customer_dob: None,
            shipping_method: None,
            shipping_description: None,
            billing_address: AddressExport::default(),
            shipping_address: AddressExport::default(),
            payments: vec![],
            invoices: vec![],
            creditmemos: vec![],
            shipments: vec![],
            comments: vec![],
            items: vec![],
            url: "https://backoffice.example/sales_order/view/order_id/1".into(),
            customer_url: "https://backoffice.example/customer".into(),
        }
    }

    fn comment(text: &str) -> CommentExport {
        CommentExport {
            created_at: "2020-06-01 08:00:00".into(),
            comment: text.into(),
        }
    }

    #[test]
    fn attach_fills_the_matching_order() {
        let mut batch = OrderBatch::default();
        batch.push(order(1));
        batch.push(order(2));

        let groups = HashMap::from([(OrderId::new(2), vec![comment("shipped")])]);
        attach(&mut batch, groups, |order| &mut order.comments);

        let orders = batch.into_orders();
        assert!(orders[0].comments.is_empty());
        assert_eq!(orders[1].comments, vec![comment("shipped")]);
    }

    #[test]
    fn attach_ignores_orders_outside_the_batch() {
        let mut batch = OrderBatch::default();
        batch.push(order(1));

        let groups = HashMap::from([(OrderId::new(99), vec![comment("lost")])]);
        attach(&mut batch, groups, |order| &mut order.comments);

        assert!(batch.into_orders()[0].comments.is_empty());
    }

    #[test]
    fn each_order_serializes_to_its_own_json_string() {
        let exported = serialize_orders(vec![order(1), order(2)]).unwrap();

        assert_eq!(exported.len(), 2);
        for entry in &exported {
            let parsed: serde_json::Value = serde_json::from_str(&entry.json).unwrap();
            assert!(parsed.is_object());
            assert!(parsed["billing_address"].is_object());
        }
    }

    #[test]
    fn wire_shape_wraps_the_document_string() {
        let exported = serialize_orders(vec![order(1)]).unwrap();

        let wire = serde_json::to_value(&exported[0]).unwrap();
        assert!(wire["json"].is_string());
    }

    #[test]
    fn serialization_preserves_recency_order() {
        let exported = serialize_orders(vec![order(2), order(1)]).unwrap();

        let first: serde_json::Value = serde_json::from_str(&exported[0].json).unwrap();
        let second: serde_json::Value = serde_json::from_str(&exported[1].json).unwrap();
        assert_eq!(first["entity_id"], 2);
        assert_eq!(second["entity_id"], 1);
    }
}
