//! Translation of filter criteria into a query plan.
//!
//! Routing is a static lookup, not string-keyed control flow: each filter
//! field maps to a [`FilterRoute`] which determines the target column(s),
//! the join it needs, and how the operator is selected. The resulting
//! [`FilterPlan`] is pure data; rendering it into SQL happens in
//! [`super::orders`].

use std::collections::BTreeSet;

use ordergate_core::{FilterMap, FilterValue};

use crate::error::ApiError;

/// Alias of the orders table in the rendered query.
pub const ORDERS_ALIAS: &str = "o";
/// Alias of the billing address join.
pub const BILLING_ALIAS: &str = "billing_o_a";
/// Alias of the shipping address join.
pub const SHIPPING_ALIAS: &str = "shipping_o_a";

/// Address fields that are matched against both the billing and the
/// shipping address, with prefix semantics for scalar values.
const ADDRESS_FIELDS: [&str; 6] = ["company", "firstname", "lastname", "street", "postcode", "city"];

/// An optional join required by a filter condition.
///
/// Each join is added to the plan at most once no matter how many
/// conditions require it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JoinTable {
    /// `sales_invoices`, for `invoice_id` filters.
    Invoices,
    /// `sales_creditmemos`, for `creditmemo_id` filters.
    CreditMemos,
}

impl JoinTable {
    /// Table name in the schema.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Invoices => "sales_invoices",
            Self::CreditMemos => "sales_creditmemos",
        }
    }

    /// Alias used in the rendered query.
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Self::Invoices => "invtbl",
            Self::CreditMemos => "crmemtbl",
        }
    }
}

/// How a filter field routes onto the query.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterRoute {
    /// Condition on an orders-table column of the same name.
    Direct(String),
    /// Condition applied to both address aliases, prefix-matched when scalar.
    Address(String),
    /// Condition on a joined document table's increment id.
    IncrementIdJoin(JoinTable),
}

/// Comparison operator of one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Exact match.
    Eq,
    /// Prefix match; the bind value already carries the `%` suffix.
    Prefix,
    /// Set membership.
    In,
}

/// One rendered-to-be predicate: a qualified column, an operator, and the
/// bind-ready values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub column: String,
    pub op: FilterOp,
    pub values: Vec<String>,
}

/// The composed query plan for a filter map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPlan {
    /// Predicates, all ANDed by the query.
    pub conditions: Vec<Condition>,
    /// Extra joins required by the predicates, deduplicated.
    pub joins: BTreeSet<JoinTable>,
}

/// Look up the routing rule for a filter field.
fn route_for(field: &str) -> Result<FilterRoute, ApiError> {
    if ADDRESS_FIELDS.contains(&field) {
        return Ok(FilterRoute::Address(field.to_string()));
    }

    match field {
        // The caller-facing order number is the increment id, not the
        // internal entity id.
        "order_id" => Ok(FilterRoute::Direct("increment_id".to_string())),
        "invoice_id" => Ok(FilterRoute::IncrementIdJoin(JoinTable::Invoices)),
        "creditmemo_id" => Ok(FilterRoute::IncrementIdJoin(JoinTable::CreditMemos)),
        other if is_safe_identifier(other) => Ok(FilterRoute::Direct(other.to_string())),
        other => Err(ApiError::InvalidFilterField(other.to_string())),
    }
}

/// Column names are spliced into SQL (bind parameters cannot stand in for
/// identifiers), so anything that is not a plain lowercase identifier is
/// rejected up front.
fn is_safe_identifier(field: &str) -> bool {
    let mut chars = field.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Translate a filter map into a query plan.
///
/// Operator selection: list values use membership; scalar values use exact
/// match, except on address fields where scalars prefix-match. Address
/// fields produce one condition per address alias (billing AND shipping -
/// the per-alias semantics are intentional, see the field routing rules).
///
/// # Errors
///
/// Returns [`ApiError::InvalidFilterField`] for field names that cannot be
/// routed onto a column.
pub fn plan_filters(filters: &FilterMap) -> Result<FilterPlan, ApiError> {
    let mut plan = FilterPlan::default();

    for (field, value) in filters.iter() {
        match route_for(field)? {
            FilterRoute::Direct(column) => {
                plan.conditions
                    .push(condition(format!("{ORDERS_ALIAS}.{column}"), value, false));
            }
            FilterRoute::Address(column) => {
                plan.conditions
                    .push(condition(format!("{BILLING_ALIAS}.{column}"), value, true));
                plan.conditions
                    .push(condition(format!("{SHIPPING_ALIAS}.{column}"), value, true));
            }
            FilterRoute::IncrementIdJoin(join) => {
                plan.joins.insert(join);
                plan.conditions.push(condition(
                    format!("{}.increment_id", join.alias()),
                    value,
                    false,
                ));
            }
        }
    }

    Ok(plan)
}

/// Build one condition, selecting the operator from the value shape.
fn condition(column: String, value: &FilterValue, prefix_scalar: bool) -> Condition {
    match value {
        FilterValue::Many(values) => Condition {
            column,
            op: FilterOp::In,
            values: values.clone(),
        },
        FilterValue::One(value) if prefix_scalar => Condition {
            column,
            op: FilterOp::Prefix,
            values: vec![format!("{value}%")],
        },
        FilterValue::One(value) => Condition {
            column,
            op: FilterOp::Eq,
            values: vec![value.clone()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(entries: &[(&str, FilterValue)]) -> FilterMap {
        let mut map = FilterMap::new();
        for (field, value) in entries {
            map.insert(*field, value.clone());
        }
        map
    }

    #[test]
    fn scalar_field_yields_one_eq_condition() {
        let plan = plan_filters(&filters(&[("status", FilterValue::One("processing".into()))]))
            .unwrap();

        assert_eq!(plan.conditions.len(), 1);
        assert_eq!(plan.conditions[0].column, "o.status");
        assert_eq!(plan.conditions[0].op, FilterOp::Eq);
        assert_eq!(plan.conditions[0].values, vec!["processing".to_string()]);
        assert!(plan.joins.is_empty());
    }

    #[test]
    fn list_values_always_use_membership() {
        let plan = plan_filters(&filters(&[
            ("status", FilterValue::Many(vec!["new".into(), "holded".into()])),
            ("city", FilterValue::Many(vec!["Hamburg".into()])),
        ]))
        .unwrap();

        for cond in &plan.conditions {
            assert_eq!(cond.op, FilterOp::In, "{} should use membership", cond.column);
        }
    }

    #[test]
    fn address_scalar_prefix_matches_both_aliases() {
        let plan =
            plan_filters(&filters(&[("lastname", FilterValue::One("Muster".into()))])).unwrap();

        assert_eq!(plan.conditions.len(), 2);
        assert_eq!(plan.conditions[0].column, "billing_o_a.lastname");
        assert_eq!(plan.conditions[1].column, "shipping_o_a.lastname");
        for cond in &plan.conditions {
            assert_eq!(cond.op, FilterOp::Prefix);
            assert_eq!(cond.values, vec!["Muster%".to_string()]);
        }
    }

    #[test]
    fn every_address_field_routes_to_both_addresses() {
        for field in ADDRESS_FIELDS {
            let plan = plan_filters(&filters(&[(field, FilterValue::One("x".into()))])).unwrap();
            assert_eq!(plan.conditions.len(), 2, "{field}");
        }
    }

    #[test]
    fn order_id_matches_increment_id() {
        let plan =
            plan_filters(&filters(&[("order_id", FilterValue::One("100000123".into()))])).unwrap();

        assert_eq!(plan.conditions[0].column, "o.increment_id");
        assert_eq!(plan.conditions[0].op, FilterOp::Eq);
    }

    #[test]
    fn document_id_filters_require_joins() {
        let plan = plan_filters(&filters(&[
            ("invoice_id", FilterValue::One("200000007".into())),
            ("creditmemo_id", FilterValue::One("300000002".into())),
        ]))
        .unwrap();

        assert_eq!(
            plan.joins.iter().copied().collect::<Vec<_>>(),
            vec![JoinTable::Invoices, JoinTable::CreditMemos]
        );
        assert!(plan.conditions.iter().any(|c| c.column == "invtbl.increment_id"));
        assert!(plan.conditions.iter().any(|c| c.column == "crmemtbl.increment_id"));
    }

    #[test]
    fn unsafe_field_names_are_rejected() {
        for field in ["1abc", "o.status", "status; drop table", "Status", ""] {
            let err = plan_filters(&filters(&[(field, FilterValue::One("x".into()))]))
                .expect_err(field);
            assert!(matches!(err, ApiError::InvalidFilterField(_)), "{field}");
        }
    }

    #[test]
    fn plan_is_deterministic() {
        let input = filters(&[
            ("status", FilterValue::One("new".into())),
            ("city", FilterValue::One("Berlin".into())),
            ("invoice_id", FilterValue::One("2".into())),
        ]);

        assert_eq!(plan_filters(&input).unwrap(), plan_filters(&input).unwrap());
    }
}
