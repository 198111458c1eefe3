//! Credit memo fetch: parent rows, then comments and line items.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use ordergate_core::{CreditMemoExport, CreditMemoId, DocumentItemExport, OrderId, OrderItemId};

use super::documents::{ParentSet, fetch_document_comments};
use super::orders::OrderBatch;
use super::RepositoryError;
use crate::services::TimezoneResolver;

/// Internal row type for credit memo headers.
#[derive(Debug, sqlx::FromRow)]
struct CreditMemoRow {
    entity_id: CreditMemoId,
    order_id: OrderId,
    increment_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    grand_total: Option<Decimal>,
    adjustment_positive: Option<Decimal>,
    adjustment_negative: Option<Decimal>,
    subtotal_incl_tax: Option<Decimal>,
    shipping_incl_tax: Option<Decimal>,
    creditmemo_status: Option<i16>,
    state: Option<i16>,
}

/// Internal row type for credit memo line items (same projection as invoice
/// items).
#[derive(Debug, sqlx::FromRow)]
struct CreditMemoItemRow {
    parent_id: CreditMemoId,
    product_id: Option<i64>,
    order_item_id: Option<OrderItemId>,
    sku: Option<String>,
    name: Option<String>,
    qty: Option<Decimal>,
    price_incl_tax: Option<Decimal>,
    row_total_incl_tax: Option<Decimal>,
    discount_amount: Option<Decimal>,
}

/// Fetch the credit memos of all orders in the batch, each with its
/// comments and line items, grouped by order id.
///
/// # Errors
///
/// Returns an error if a query or store lookup fails.
pub async fn fetch_creditmemos(
    pool: &PgPool,
    batch: &OrderBatch,
    timezones: &mut TimezoneResolver,
) -> Result<HashMap<OrderId, Vec<CreditMemoExport>>, RepositoryError> {
    let rows = sqlx::query_as::<_, CreditMemoRow>(
        "SELECT entity_id, order_id, increment_id, created_at, updated_at, \
                grand_total, adjustment_positive, adjustment_negative, \
                subtotal_incl_tax, shipping_incl_tax, creditmemo_status, state \
         FROM sales_creditmemos WHERE order_id = ANY($1)",
    )
    .bind(batch.order_ids())
    .fetch_all(pool)
    .await?;

    let mut parents: ParentSet<CreditMemoId, CreditMemoExport> = ParentSet::new();

    for row in rows {
        let Some(store_id) = batch.store_id(row.order_id) else {
            continue;
        };
        let tz = timezones.resolve(pool, store_id).await?;

        parents.insert(
            row.entity_id,
            row.order_id,
            tz,
            CreditMemoExport {
                entity_id: row.entity_id,
                increment_id: row.increment_id,
                created_at: TimezoneResolver::convert(tz, row.created_at),
                updated_at: TimezoneResolver::convert(tz, row.updated_at),
                grand_total: row.grand_total,
                adjustment_positive: row.adjustment_positive,
                adjustment_negative: row.adjustment_negative,
                subtotal_incl_tax: row.subtotal_incl_tax,
                shipping_incl_tax: row.shipping_incl_tax,
                creditmemo_status: row.creditmemo_status,
                state: row.state,
                comments: vec![],
                items: vec![],
            },
        );
    }

    if parents.is_empty() {
        return Ok(HashMap::new());
    }

    let parent_ids: Vec<i64> = parents.ids().iter().map(|id| id.as_i64()).collect();

    for row in fetch_document_comments(pool, "sales_creditmemo_comments", &parent_ids).await? {
        let id = CreditMemoId::new(row.parent_id);
        if let Some(tz) = parents.tz(id) {
            let comment = row.into_export(tz);
            if let Some(memo) = parents.get_mut(id) {
                memo.comments.push(comment);
            }
        }
    }

    let item_rows = sqlx::query_as::<_, CreditMemoItemRow>(
        "SELECT parent_id, product_id, order_item_id, sku, name, qty, \
                price_incl_tax, row_total_incl_tax, discount_amount \
         FROM sales_creditmemo_items WHERE parent_id = ANY($1)",
    )
    .bind(&parent_ids)
    .fetch_all(pool)
    .await?;

    for row in item_rows {
        if let Some(memo) = parents.get_mut(row.parent_id) {
            memo.items.push(DocumentItemExport {
                product_id: row.product_id,
                order_item_id: row.order_item_id,
                sku: row.sku,
                name: row.name,
                qty: row.qty,
                price_incl_tax: row.price_incl_tax,
                row_total_incl_tax: row.row_total_incl_tax,
                discount_amount: row.discount_amount,
                price: None,
                row_total: None,
            });
        }
    }

    Ok(parents.group_by_order())
}
