//! Base order fetch: renders the filter plan into SQL and assembles the
//! order batch.
//!
//! The query always carries both address joins (the projection needs them),
//! groups by the order's entity id to collapse join fan-out, and returns
//! newest-created orders first.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use ordergate_core::{AddressExport, CustomerId, OrderExport, OrderId, StoreId};

use super::RepositoryError;
use super::filter_plan::{BILLING_ALIAS, FilterOp, FilterPlan, ORDERS_ALIAS, SHIPPING_ALIAS};
use crate::services::{AdminUrlBuilder, TimezoneResolver};

/// Projected order header columns.
const ORDER_FIELDS: [&str; 20] = [
    "entity_id",
    "increment_id",
    "ext_order_id",
    "state",
    "status",
    "created_at",
    "updated_at",
    "store_id",
    "store_name",
    "customer_id",
    "ext_customer_id",
    "order_currency_code",
    "grand_total",
    "total_paid",
    "discount_amount",
    "discount_description",
    "shipping_incl_tax",
    "customer_dob",
    "shipping_method",
    "shipping_description",
];

/// Projected address columns, selected once per address alias.
const ADDRESS_FIELDS: [&str; 11] = [
    "company",
    "firstname",
    "lastname",
    "street",
    "postcode",
    "city",
    "region",
    "country_id",
    "telephone",
    "fax",
    "email",
];

/// Internal row type for the base order query.
#[derive(Debug, sqlx::FromRow)]
pub struct OrderRow {
    pub entity_id: OrderId,
    pub increment_id: String,
    pub ext_order_id: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub store_id: StoreId,
    pub store_name: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub ext_customer_id: Option<String>,
    pub order_currency_code: Option<String>,
    pub grand_total: Option<Decimal>,
    pub total_paid: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub discount_description: Option<String>,
    pub shipping_incl_tax: Option<Decimal>,
    pub customer_dob: Option<NaiveDateTime>,
    pub shipping_method: Option<String>,
    pub shipping_description: Option<String>,
    pub billaddr_company: Option<String>,
    pub billaddr_firstname: Option<String>,
    pub billaddr_lastname: Option<String>,
    pub billaddr_street: Option<String>,
    pub billaddr_postcode: Option<String>,
    pub billaddr_city: Option<String>,
    pub billaddr_region: Option<String>,
    pub billaddr_country_id: Option<String>,
    pub billaddr_telephone: Option<String>,
    pub billaddr_fax: Option<String>,
    pub billaddr_email: Option<String>,
    pub shipaddr_company: Option<String>,
    pub shipaddr_firstname: Option<String>,
    pub shipaddr_lastname: Option<String>,
    pub shipaddr_street: Option<String>,
    pub shipaddr_postcode: Option<String>,
    pub shipaddr_city: Option<String>,
    pub shipaddr_region: Option<String>,
    pub shipaddr_country_id: Option<String>,
    pub shipaddr_telephone: Option<String>,
    pub shipaddr_fax: Option<String>,
    pub shipaddr_email: Option<String>,
}

impl OrderRow {
    /// Build the outward order document from this row, with both timestamps
    /// converted to the store timezone and all child collections empty.
    #[must_use]
    pub fn into_export(self, tz: chrono_tz::Tz, urls: &AdminUrlBuilder) -> OrderExport {
        let billing_address = AddressExport {
            company: self.billaddr_company,
            firstname: self.billaddr_firstname,
            lastname: self.billaddr_lastname,
            street: self.billaddr_street,
            postcode: self.billaddr_postcode,
            city: self.billaddr_city,
            region: self.billaddr_region,
            country_id: self.billaddr_country_id,
            telephone: self.billaddr_telephone,
            fax: self.billaddr_fax,
            email: self.billaddr_email,
        };
        let shipping_address = AddressExport {
            company: self.shipaddr_company,
            firstname: self.shipaddr_firstname,
            lastname: self.shipaddr_lastname,
            street: self.shipaddr_street,
            postcode: self.shipaddr_postcode,
            city: self.shipaddr_city,
            region: self.shipaddr_region,
            country_id: self.shipaddr_country_id,
            telephone: self.shipaddr_telephone,
            fax: self.shipaddr_fax,
            email: self.shipaddr_email,
        };

        OrderExport {
            entity_id: self.entity_id,
            increment_id: self.increment_id,
            ext_order_id: self.ext_order_id,
            state: self.state,
            status: self.status,
            created_at: TimezoneResolver::convert(tz, self.created_at),
            updated_at: TimezoneResolver::convert(tz, self.updated_at),
            store_id: self.store_id,
            store_name: self.store_name,
            customer_id: self.customer_id,
            ext_customer_id: self.ext_customer_id,
            order_currency_code: self.order_currency_code,
            grand_total: self.grand_total,
            total_paid: self.total_paid,
            discount_amount: self.discount_amount,
            discount_description: self.discount_description,
            shipping_incl_tax: self.shipping_incl_tax,
            customer_dob: self
                .customer_dob
                .map(|dob| dob.format("%Y-%m-%d %H:%M:%S").to_string()),
            shipping_method: self.shipping_method,
            shipping_description: self.shipping_description,
            billing_address,
            shipping_address,
            payments: vec![],
            invoices: vec![],
            creditmemos: vec![],
            shipments: vec![],
            comments: vec![],
            items: vec![],
            url: urls.order_url(self.entity_id),
            customer_url: urls.customer_url(self.customer_id),
        }
    }
}

/// The batch of orders one request operates on: the export documents in
/// recency order plus the bookkeeping side table mapping each order to its
/// store (kept out of the outward documents).
#[derive(Debug, Default)]
pub struct OrderBatch {
    orders: Vec<OrderExport>,
    index: HashMap<OrderId, usize>,
    store_ids: HashMap<OrderId, StoreId>,
}

impl OrderBatch {
    /// Add an order to the batch, keeping insertion (recency) order.
    pub fn push(&mut self, order: OrderExport) {
        self.index.insert(order.entity_id, self.orders.len());
        self.store_ids.insert(order.entity_id, order.store_id);
        self.orders.push(order);
    }

    /// Whether the batch holds no orders.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Internal ids of all orders in the batch, in recency order.
    #[must_use]
    pub fn order_ids(&self) -> Vec<OrderId> {
        self.orders.iter().map(|o| o.entity_id).collect()
    }

    /// Store owning the given order, if the order is in the batch.
    #[must_use]
    pub fn store_id(&self, order_id: OrderId) -> Option<StoreId> {
        self.store_ids.get(&order_id).copied()
    }

    /// Mutable access to one order for child-record merging.
    pub fn get_mut(&mut self, order_id: OrderId) -> Option<&mut OrderExport> {
        let idx = *self.index.get(&order_id)?;
        self.orders.get_mut(idx)
    }

    /// Consume the batch, yielding the orders in recency order.
    #[must_use]
    pub fn into_orders(self) -> Vec<OrderExport> {
        self.orders
    }
}

/// Render the filter plan into the base order query.
fn render_query(plan: &FilterPlan, limit: i64) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT ");

    let mut select = qb.separated(", ");
    for field in ORDER_FIELDS {
        select.push(format!("{ORDERS_ALIAS}.{field}"));
    }
    for field in ADDRESS_FIELDS {
        select.push(format!("{BILLING_ALIAS}.{field} AS billaddr_{field}"));
    }
    for field in ADDRESS_FIELDS {
        select.push(format!("{SHIPPING_ALIAS}.{field} AS shipaddr_{field}"));
    }

    qb.push(format!(" FROM sales_orders {ORDERS_ALIAS}"));
    qb.push(format!(
        " LEFT JOIN sales_order_addresses {BILLING_ALIAS} ON {ORDERS_ALIAS}.billing_address_id = {BILLING_ALIAS}.entity_id"
    ));
    qb.push(format!(
        " LEFT JOIN sales_order_addresses {SHIPPING_ALIAS} ON {ORDERS_ALIAS}.shipping_address_id = {SHIPPING_ALIAS}.entity_id"
    ));

    for join in &plan.joins {
        qb.push(format!(
            " LEFT JOIN {table} {alias} ON {ORDERS_ALIAS}.entity_id = {alias}.order_id",
            table = join.table(),
            alias = join.alias(),
        ));
    }

    for (i, cond) in plan.conditions.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        // Text-cast comparison: filter values arrive untyped, the columns
        // they route to do not share one type.
        qb.push(format!("CAST({} AS TEXT) ", cond.column));
        match cond.op {
            FilterOp::Eq => {
                qb.push("= ");
                qb.push_bind(cond.values.first().cloned().unwrap_or_default());
            }
            FilterOp::Prefix => {
                qb.push("LIKE ");
                qb.push_bind(cond.values.first().cloned().unwrap_or_default());
            }
            FilterOp::In => {
                qb.push("= ANY(");
                qb.push_bind(cond.values.clone());
                qb.push(")");
            }
        }
    }

    // Address joins can fan out rows; grouping by the entity ids keeps one
    // row per order.
    qb.push(format!(
        " GROUP BY {ORDERS_ALIAS}.entity_id, {BILLING_ALIAS}.entity_id, {SHIPPING_ALIAS}.entity_id"
    ));
    qb.push(format!(" ORDER BY {ORDERS_ALIAS}.created_at DESC"));

    if limit > 0 {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
    }

    qb
}

/// Execute the base order query for a plan.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn fetch_orders(
    pool: &PgPool,
    plan: &FilterPlan,
    limit: i64,
) -> Result<Vec<OrderRow>, RepositoryError> {
    let mut query = render_query(plan, limit);
    let rows = query.build_query_as::<OrderRow>().fetch_all(pool).await?;
    Ok(rows)
}

/// Fetch the base orders and assemble the batch: timestamps converted to
/// each order's store timezone, navigation URLs built, child collections
/// initialized empty.
///
/// # Errors
///
/// Returns an error if the order query or a store lookup fails.
pub async fn fetch_order_batch(
    pool: &PgPool,
    plan: &FilterPlan,
    limit: i64,
    timezones: &mut TimezoneResolver,
    urls: &AdminUrlBuilder,
) -> Result<OrderBatch, RepositoryError> {
    let rows = fetch_orders(pool, plan, limit).await?;

    let mut batch = OrderBatch::default();
    for row in rows {
        let tz = timezones.resolve(pool, row.store_id).await?;
        batch.push(row.into_export(tz, urls));
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::filter_plan::plan_filters;
    use chrono::TimeZone;
    use ordergate_core::{FilterMap, FilterValue};
    use url::Url;

    fn plan_for(entries: &[(&str, FilterValue)]) -> FilterPlan {
        let mut map = FilterMap::new();
        for (field, value) in entries {
            map.insert(*field, value.clone());
        }
        plan_filters(&map).unwrap()
    }

    fn urls() -> AdminUrlBuilder {
        AdminUrlBuilder::new(Url::parse("https://shop.example/admin").unwrap())
    }

    fn sample_row() -> OrderRow {
        OrderRow {
            entity_id: OrderId::new(11),
            increment_id: "100000123".into(),
            ext_order_id: None,
            state: Some("processing".into()),
            status: Some("processing".into()),
            created_at: Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2020, 6, 2, 12, 0, 0).unwrap(),
            store_id: StoreId::new(1),
            store_name: Some("Default".into()),
            customer_id: Some(CustomerId::new(5)),
            ext_customer_id: None,
            order_currency_code: Some("USD".into()),
            grand_total: None,
            total_paid: None,
            discount_amount: None,
            discount_description: None,
            shipping_incl_tax: None,
            customer_dob: None,
            shipping_method: None,
            shipping_description: None,
            billaddr_company: Some("ACME".into()),
            billaddr_firstname: None,
            billaddr_lastname: None,
            billaddr_street: None,
            billaddr_postcode: None,
            billaddr_city: None,
            billaddr_region: None,
            billaddr_country_id: None,
            billaddr_telephone: None,
            billaddr_fax: None,
            billaddr_email: None,
            shipaddr_company: None,
            shipaddr_firstname: None,
            shipaddr_lastname: None,
            shipaddr_street: None,
            shipaddr_postcode: None,
            shipaddr_city: None,
            shipaddr_region: None,
            shipaddr_country_id: None,
            shipaddr_telephone: None,
            shipaddr_fax: None,
            shipaddr_email: None,
        }
    }

    #[test]
    fn query_projects_both_address_aliases() {
        let query = render_query(&FilterPlan::default(), 0);
        let sql = query.sql();

        assert!(sql.contains("billing_o_a.company AS billaddr_company"));
        assert!(sql.contains("shipping_o_a.email AS shipaddr_email"));
        assert!(sql.contains("LEFT JOIN sales_order_addresses billing_o_a"));
        assert!(sql.contains("LEFT JOIN sales_order_addresses shipping_o_a"));
    }

    #[test]
    fn query_groups_and_orders_by_recency() {
        let query = render_query(&FilterPlan::default(), 0);
        let sql = query.sql();

        assert!(sql.contains("GROUP BY o.entity_id, billing_o_a.entity_id, shipping_o_a.entity_id"));
        assert!(sql.contains("ORDER BY o.created_at DESC"));
        assert!(!sql.contains("LIMIT"));
    }

    #[test]
    fn limit_is_bound_only_when_positive() {
        let query = render_query(&FilterPlan::default(), 25);
        assert!(query.sql().contains("LIMIT"));
    }

    #[test]
    fn conditions_render_as_anded_text_comparisons() {
        let plan = plan_for(&[
            ("status", FilterValue::One("processing".into())),
            ("store_id", FilterValue::Many(vec!["1".into(), "2".into()])),
        ]);
        let query = render_query(&plan, 0);
        let sql = query.sql();

        assert!(sql.contains("WHERE CAST(o.status AS TEXT) = $1"));
        assert!(sql.contains("AND CAST(o.store_id AS TEXT) = ANY($2)"));
    }

    #[test]
    fn document_join_is_rendered_once() {
        let plan = plan_for(&[("invoice_id", FilterValue::One("200000001".into()))]);
        let query = render_query(&plan, 0);
        let sql = query.sql();

        assert_eq!(sql.matches("LEFT JOIN sales_invoices invtbl").count(), 1);
        assert!(sql.contains("CAST(invtbl.increment_id AS TEXT)"));
    }

    #[test]
    fn export_converts_timestamps_to_store_zone() {
        let export = sample_row().into_export(chrono_tz::America::New_York, &urls());

        assert_eq!(export.created_at, "2020-06-01 08:00:00");
        assert_eq!(export.updated_at, "2020-06-02 08:00:00");
    }

    #[test]
    fn export_initializes_children_empty_and_builds_urls() {
        let export = sample_row().into_export(chrono_tz::UTC, &urls());

        assert!(export.payments.is_empty());
        assert!(export.invoices.is_empty());
        assert!(export.items.is_empty());
        assert_eq!(
            export.url,
            "https://shop.example/admin/sales_order/view/order_id/11"
        );
        assert_eq!(
            export.customer_url,
            "https://shop.example/admin/customer/edit/id/5"
        );
        assert_eq!(export.billing_address.company.as_deref(), Some("ACME"));
    }

    #[test]
    fn batch_tracks_store_ids_and_recency_order() {
        let mut batch = OrderBatch::default();
        batch.push(sample_row().into_export(chrono_tz::UTC, &urls()));

        assert_eq!(batch.order_ids(), vec![OrderId::new(11)]);
        assert_eq!(batch.store_id(OrderId::new(11)), Some(StoreId::new(1)));
        assert_eq!(batch.store_id(OrderId::new(99)), None);
        assert!(batch.get_mut(OrderId::new(11)).is_some());
    }
}
