//! Payment row fetch with method title resolution.

use std::collections::HashMap;

use sqlx::PgPool;

use ordergate_core::{OrderId, PaymentExport};

use super::orders::OrderBatch;
use super::{RepositoryError, group_by};
use crate::services::PaymentTitleResolver;

/// Internal row type for order payments.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    parent_id: OrderId,
    method: Option<String>,
}

/// Fetch the payments of all orders in the batch, grouped by order id.
/// Multiple payments per order are possible; titles come from the memoizing
/// resolver (empty for unknown method codes).
///
/// # Errors
///
/// Returns an error if a query fails.
pub async fn fetch_payments(
    pool: &PgPool,
    batch: &OrderBatch,
    titles: &mut PaymentTitleResolver,
) -> Result<HashMap<OrderId, Vec<PaymentExport>>, RepositoryError> {
    let rows = sqlx::query_as::<_, PaymentRow>(
        "SELECT parent_id, method FROM sales_order_payments WHERE parent_id = ANY($1)",
    )
    .bind(batch.order_ids())
    .fetch_all(pool)
    .await?;

    let mut payments = Vec::with_capacity(rows.len());

    for row in rows {
        if batch.store_id(row.parent_id).is_none() {
            continue;
        }

        let method = row.method.unwrap_or_default();
        let title = titles.resolve(pool, &method).await?;
        payments.push((row.parent_id, PaymentExport { method, title }));
    }

    Ok(group_by(payments, |(order_id, _)| *order_id)
        .into_iter()
        .map(|(order_id, group)| (order_id, group.into_iter().map(|(_, p)| p).collect()))
        .collect())
}
