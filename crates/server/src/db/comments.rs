//! Order comment fetch (status history rows).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use ordergate_core::{CommentExport, OrderId};

use super::orders::OrderBatch;
use super::{RepositoryError, group_by};
use crate::services::TimezoneResolver;

/// Internal row type for order status history.
#[derive(Debug, sqlx::FromRow)]
struct OrderCommentRow {
    parent_id: OrderId,
    created_at: DateTime<Utc>,
    comment: Option<String>,
}

/// Fetch the comments of all orders in the batch, grouped by order id in
/// database return order. Rows with empty comment text are skipped, as are
/// rows whose order is not in the batch.
///
/// # Errors
///
/// Returns an error if a query or store lookup fails.
pub async fn fetch_order_comments(
    pool: &PgPool,
    batch: &OrderBatch,
    timezones: &mut TimezoneResolver,
) -> Result<HashMap<OrderId, Vec<CommentExport>>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderCommentRow>(
        "SELECT parent_id, created_at, comment \
         FROM sales_order_status_history WHERE parent_id = ANY($1)",
    )
    .bind(batch.order_ids())
    .fetch_all(pool)
    .await?;

    let mut comments = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(text) = row.comment.filter(|c| !c.is_empty()) else {
            continue;
        };
        let Some(store_id) = batch.store_id(row.parent_id) else {
            continue;
        };

        let tz = timezones.resolve(pool, store_id).await?;
        comments.push((
            row.parent_id,
            CommentExport {
                created_at: TimezoneResolver::convert(tz, row.created_at),
                comment: text,
            },
        ));
    }

    Ok(group_by(comments, |(order_id, _)| *order_id)
        .into_iter()
        .map(|(order_id, group)| (order_id, group.into_iter().map(|(_, c)| c).collect()))
        .collect())
}
