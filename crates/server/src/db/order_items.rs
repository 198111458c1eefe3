//! Order line item fetch and tree assembly.
//!
//! Items of composite products reference their parent through
//! `parent_item_id`. The export nests children under the parent's `items`
//! list and attaches only root items to the order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use ordergate_core::{OrderId, OrderItemExport, OrderItemId, StoreId};

use super::orders::OrderBatch;
use super::{RepositoryError, group_by};
use crate::services::TimezoneResolver;

/// Internal row type for order line items.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    item_id: OrderItemId,
    order_id: OrderId,
    parent_item_id: Option<OrderItemId>,
    store_id: StoreId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    product_type: Option<String>,
    product_options: Option<String>,
    sku: Option<String>,
    name: Option<String>,
    description: Option<String>,
    qty_ordered: Option<Decimal>,
    qty_canceled: Option<Decimal>,
    qty_refunded: Option<Decimal>,
    qty_invoiced: Option<Decimal>,
    qty_shipped: Option<Decimal>,
    price_incl_tax: Option<Decimal>,
    row_total_incl_tax: Option<Decimal>,
}

impl OrderItemRow {
    fn into_export(self, tz: chrono_tz::Tz) -> OrderItemExport {
        OrderItemExport {
            item_id: self.item_id,
            parent_item_id: self.parent_item_id,
            created_at: TimezoneResolver::convert(tz, self.created_at),
            updated_at: TimezoneResolver::convert(tz, self.updated_at),
            product_type: self.product_type,
            product_options: self.product_options,
            sku: self.sku,
            name: self.name,
            description: self.description,
            qty_ordered: self.qty_ordered,
            qty_canceled: self.qty_canceled,
            qty_refunded: self.qty_refunded,
            qty_invoiced: self.qty_invoiced,
            qty_shipped: self.qty_shipped,
            price_incl_tax: self.price_incl_tax,
            row_total_incl_tax: self.row_total_incl_tax,
            items: vec![],
        }
    }
}

/// Fetch the line items of all orders in the batch, assembled into trees
/// and grouped by order id. Timestamps use the timezone of the item's own
/// store, which can differ from the order's store.
///
/// # Errors
///
/// Returns an error if a query or store lookup fails.
pub async fn fetch_order_items(
    pool: &PgPool,
    batch: &OrderBatch,
    timezones: &mut TimezoneResolver,
) -> Result<HashMap<OrderId, Vec<OrderItemExport>>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderItemRow>(
        "SELECT item_id, order_id, parent_item_id, store_id, created_at, updated_at, \
                product_type, product_options, sku, name, description, \
                qty_ordered, qty_canceled, qty_refunded, qty_invoiced, qty_shipped, \
                price_incl_tax, row_total_incl_tax \
         FROM sales_order_items WHERE order_id = ANY($1)",
    )
    .bind(batch.order_ids())
    .fetch_all(pool)
    .await?;

    let mut items = Vec::with_capacity(rows.len());

    for row in rows {
        if batch.store_id(row.order_id).is_none() {
            continue;
        }
        let tz = timezones.resolve(pool, row.store_id).await?;
        items.push((row.order_id, row.into_export(tz)));
    }

    Ok(group_by(items, |(order_id, _)| *order_id)
        .into_iter()
        .map(|(order_id, group)| {
            let flat = group.into_iter().map(|(_, item)| item).collect();
            (order_id, build_item_tree(flat))
        })
        .collect())
}

/// Nest child items under their parents, preserving database return order
/// among siblings and roots. Items whose parent reference points outside
/// the given set are dropped.
fn build_item_tree(flat: Vec<OrderItemExport>) -> Vec<OrderItemExport> {
    let ids: Vec<OrderItemId> = flat.iter().map(|item| item.item_id).collect();
    let mut by_id: HashMap<OrderItemId, OrderItemExport> =
        flat.into_iter().map(|item| (item.item_id, item)).collect();

    let mut children: HashMap<OrderItemId, Vec<OrderItemId>> = HashMap::new();
    let mut roots = Vec::new();

    for id in ids {
        match by_id[&id].parent_item_id {
            None => roots.push(id),
            Some(parent) if by_id.contains_key(&parent) => {
                children.entry(parent).or_default().push(id);
            }
            Some(_) => {}
        }
    }

    roots
        .into_iter()
        .filter_map(|id| materialize(id, &mut by_id, &children))
        .collect()
}

fn materialize(
    id: OrderItemId,
    by_id: &mut HashMap<OrderItemId, OrderItemExport>,
    children: &HashMap<OrderItemId, Vec<OrderItemId>>,
) -> Option<OrderItemExport> {
    let mut item = by_id.remove(&id)?;
    if let Some(child_ids) = children.get(&id) {
        for child_id in child_ids {
            if let Some(child) = materialize(*child_id, by_id, children) {
                item.items.push(child);
            }
        }
    }
    Some(item)
}
