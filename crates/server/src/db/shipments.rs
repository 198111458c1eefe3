//! Shipment fetch: parent rows, then comments, line items, and tracking.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use ordergate_core::{
    DocumentItemExport, OrderId, OrderItemId, ShipmentExport, ShipmentId, TrackingExport,
};

use super::documents::{ParentSet, fetch_document_comments};
use super::orders::OrderBatch;
use super::RepositoryError;
use crate::services::TimezoneResolver;

/// Internal row type for shipment headers.
#[derive(Debug, sqlx::FromRow)]
struct ShipmentRow {
    entity_id: ShipmentId,
    order_id: OrderId,
    increment_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Internal row type for shipment line items.
#[derive(Debug, sqlx::FromRow)]
struct ShipmentItemRow {
    parent_id: ShipmentId,
    product_id: Option<i64>,
    order_item_id: Option<OrderItemId>,
    sku: Option<String>,
    name: Option<String>,
    qty: Option<Decimal>,
    price: Option<Decimal>,
    row_total: Option<Decimal>,
}

/// Internal row type for shipment tracking entries.
#[derive(Debug, sqlx::FromRow)]
struct TrackRow {
    parent_id: ShipmentId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    track_number: Option<String>,
    carrier_code: Option<String>,
    title: Option<String>,
}

/// Fetch the shipments of all orders in the batch, each with its comments,
/// line items, and tracking entries, grouped by order id.
///
/// # Errors
///
/// Returns an error if a query or store lookup fails.
pub async fn fetch_shipments(
    pool: &PgPool,
    batch: &OrderBatch,
    timezones: &mut TimezoneResolver,
) -> Result<HashMap<OrderId, Vec<ShipmentExport>>, RepositoryError> {
    let rows = sqlx::query_as::<_, ShipmentRow>(
        "SELECT entity_id, order_id, increment_id, created_at, updated_at \
         FROM sales_shipments WHERE order_id = ANY($1)",
    )
    .bind(batch.order_ids())
    .fetch_all(pool)
    .await?;

    let mut parents: ParentSet<ShipmentId, ShipmentExport> = ParentSet::new();

    for row in rows {
        let Some(store_id) = batch.store_id(row.order_id) else {
            continue;
        };
        let tz = timezones.resolve(pool, store_id).await?;

        parents.insert(
            row.entity_id,
            row.order_id,
            tz,
            ShipmentExport {
                entity_id: row.entity_id,
                increment_id: row.increment_id,
                created_at: TimezoneResolver::convert(tz, row.created_at),
                updated_at: TimezoneResolver::convert(tz, row.updated_at),
                comments: vec![],
                items: vec![],
                tracking: vec![],
            },
        );
    }

    if parents.is_empty() {
        return Ok(HashMap::new());
    }

    let parent_ids: Vec<i64> = parents.ids().iter().map(|id| id.as_i64()).collect();

    for row in fetch_document_comments(pool, "sales_shipment_comments", &parent_ids).await? {
        let id = ShipmentId::new(row.parent_id);
        if let Some(tz) = parents.tz(id) {
            let comment = row.into_export(tz);
            if let Some(shipment) = parents.get_mut(id) {
                shipment.comments.push(comment);
            }
        }
    }

    let track_rows = sqlx::query_as::<_, TrackRow>(
        "SELECT parent_id, created_at, updated_at, track_number, carrier_code, title \
         FROM sales_shipment_tracks WHERE parent_id = ANY($1)",
    )
    .bind(&parent_ids)
    .fetch_all(pool)
    .await?;

    for row in track_rows {
        if let Some(tz) = parents.tz(row.parent_id) {
            let tracking = TrackingExport {
                created_at: TimezoneResolver::convert(tz, row.created_at),
                updated_at: TimezoneResolver::convert(tz, row.updated_at),
                track_number: row.track_number,
                carrier_code: row.carrier_code,
                title: row.title,
            };
            if let Some(shipment) = parents.get_mut(row.parent_id) {
                shipment.tracking.push(tracking);
            }
        }
    }

    let item_rows = sqlx::query_as::<_, ShipmentItemRow>(
        "SELECT parent_id, product_id, order_item_id, sku, name, qty, price, row_total \
         FROM sales_shipment_items WHERE parent_id = ANY($1)",
    )
    .bind(&parent_ids)
    .fetch_all(pool)
    .await?;

    for row in item_rows {
        if let Some(shipment) = parents.get_mut(row.parent_id) {
            shipment.items.push(DocumentItemExport {
                product_id: row.product_id,
                order_item_id: row.order_item_id,
                sku: row.sku,
                name: row.name,
                qty: row.qty,
                price_incl_tax: None,
                row_total_incl_tax: None,
                discount_amount: None,
                price: row.price,
                row_total: row.row_total,
            });
        }
    }

    Ok(parents.group_by_order())
}
