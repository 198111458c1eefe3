//! Shared machinery for the two-phase document fetchers.
//!
//! Invoices, credit memos, and shipments follow one shape: fetch the parent
//! rows for the order batch, then fetch their dependents (comments, line
//! items, tracking) keyed by parent id, and finally regroup the parents by
//! owning order. [`ParentSet`] carries the parents through both phases,
//! keeping the owning order id and store timezone as bookkeeping on the
//! side - they never enter the outward document.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::PgPool;

use ordergate_core::{CommentExport, OrderId};

use super::RepositoryError;
use crate::services::TimezoneResolver;

/// Parent documents of one fetch pass, keyed by their own entity id while
/// retaining database return order.
#[derive(Debug)]
pub struct ParentSet<I, T> {
    entries: Vec<(I, T)>,
    index: HashMap<I, usize>,
    /// Owning order and store timezone per parent (bookkeeping only).
    meta: HashMap<I, (OrderId, Tz)>,
}

impl<I: Copy + Eq + Hash, T> Default for ParentSet<I, T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            meta: HashMap::new(),
        }
    }
}

impl<I: Copy + Eq + Hash, T> ParentSet<I, T> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether phase one matched no parents (phase two can be skipped).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entity ids of all parents, in database return order.
    #[must_use]
    pub fn ids(&self) -> Vec<I> {
        self.entries.iter().map(|(id, _)| *id).collect()
    }

    /// Add a parent with its bookkeeping data.
    pub fn insert(&mut self, id: I, order_id: OrderId, tz: Tz, value: T) {
        self.index.insert(id, self.entries.len());
        self.meta.insert(id, (order_id, tz));
        self.entries.push((id, value));
    }

    /// Store timezone of a parent, if it is in the set.
    #[must_use]
    pub fn tz(&self, id: I) -> Option<Tz> {
        self.meta.get(&id).map(|(_, tz)| *tz)
    }

    /// Mutable access to one parent for dependent merging.
    pub fn get_mut(&mut self, id: I) -> Option<&mut T> {
        let idx = *self.index.get(&id)?;
        self.entries.get_mut(idx).map(|(_, value)| value)
    }

    /// Consume the set, regrouping the parents by their owning order while
    /// preserving the per-order document order.
    #[must_use]
    pub fn group_by_order(self) -> HashMap<OrderId, Vec<T>> {
        let meta = self.meta;
        let mut groups: HashMap<OrderId, Vec<T>> = HashMap::new();
        for (id, value) in self.entries {
            if let Some((order_id, _)) = meta.get(&id) {
                groups.entry(*order_id).or_default().push(value);
            }
        }
        groups
    }
}

/// Internal row type for document comment tables (invoice, credit memo, and
/// shipment comments share one shape).
#[derive(Debug, sqlx::FromRow)]
pub struct DocumentCommentRow {
    pub parent_id: i64,
    pub created_at: DateTime<Utc>,
    pub comment: Option<String>,
}

impl DocumentCommentRow {
    /// Build the outward comment, timestamp converted to the parent's store
    /// timezone.
    #[must_use]
    pub fn into_export(self, tz: Tz) -> CommentExport {
        CommentExport {
            created_at: TimezoneResolver::convert(tz, self.created_at),
            comment: self.comment.unwrap_or_default(),
        }
    }
}

/// Fetch the comment rows of a document comment table for a set of parent
/// ids. The table name is a compile-time constant supplied by the caller,
/// never caller input.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn fetch_document_comments(
    pool: &PgPool,
    table: &'static str,
    parent_ids: &[i64],
) -> Result<Vec<DocumentCommentRow>, RepositoryError> {
    let rows = sqlx::query_as::<_, DocumentCommentRow>(&format!(
        "SELECT parent_id, created_at, comment FROM {table} WHERE parent_id = ANY($1)"
    ))
    .bind(parent_ids)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parent_set_groups_by_order_preserving_document_order() {
        let mut parents: ParentSet<i64, &str> = ParentSet::new();
        parents.insert(10, OrderId::new(1), chrono_tz::UTC, "first");
        parents.insert(11, OrderId::new(2), chrono_tz::UTC, "other");
        parents.insert(12, OrderId::new(1), chrono_tz::UTC, "second");

        let groups = parents.group_by_order();

        assert_eq!(groups[&OrderId::new(1)], vec!["first", "second"]);
        assert_eq!(groups[&OrderId::new(2)], vec!["other"]);
    }

    #[test]
    fn parent_set_lookups() {
        let mut parents: ParentSet<i64, String> = ParentSet::new();
        assert!(parents.is_empty());

        parents.insert(5, OrderId::new(1), chrono_tz::Europe::Berlin, "doc".to_string());

        assert_eq!(parents.ids(), vec![5]);
        assert_eq!(parents.tz(5), Some(chrono_tz::Europe::Berlin));
        assert_eq!(parents.tz(6), None);
        parents.get_mut(5).unwrap().push_str("ument");
        assert_eq!(parents.group_by_order()[&OrderId::new(1)], vec!["document".to_string()]);
    }

    #[test]
    fn comment_row_converts_timestamp_and_defaults_text() {
        let row = DocumentCommentRow {
            parent_id: 1,
            created_at: Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap(),
            comment: None,
        };

        let export = row.into_export(chrono_tz::America::New_York);
        assert_eq!(export.created_at, "2020-06-01 08:00:00");
        assert_eq!(export.comment, "");
    }
}
