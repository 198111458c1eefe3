//! The exported order document model.
//!
//! These are the outward-facing records serialized for the export API. They
//! contain exactly the exposed fields - internal bookkeeping columns such as
//! `order_id` on an invoice row or `store_id` on a shipment row stay in the
//! server's row types and never appear here.
//!
//! Field declaration order is the serialization order, so it is kept stable:
//! reordering fields changes the emitted JSON byte-for-byte.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::id::{CreditMemoId, CustomerId, InvoiceId, OrderId, OrderItemId, ShipmentId, StoreId};

/// A fully aggregated order, the root of one exported document.
///
/// Timestamps are store-local wall-clock strings (`YYYY-MM-DD HH:MM:SS`),
/// already converted from the persisted UTC values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderExport {
    pub entity_id: OrderId,
    pub increment_id: String,
    pub ext_order_id: Option<String>,
    pub state: Option<String>,
    pub status: Option<String>,
    pub created_at: String,
    pub updated_at: String,
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
    pub customer_dob: Option<String>,
    pub shipping_method: Option<String>,
    pub shipping_description: Option<String>,
    /// Billing address; serialized as an object even when every field is
    /// absent.
    pub billing_address: AddressExport,
    /// Shipping address; same shape as billing.
    pub shipping_address: AddressExport,
    pub payments: Vec<PaymentExport>,
    pub invoices: Vec<InvoiceExport>,
    pub creditmemos: Vec<CreditMemoExport>,
    pub shipments: Vec<ShipmentExport>,
    pub comments: Vec<CommentExport>,
    pub items: Vec<OrderItemExport>,
    /// Backoffice order detail URL, session fragments stripped.
    pub url: String,
    /// Backoffice customer detail URL.
    pub customer_url: String,
}

/// One order address (billing or shipping). All fields independently
/// nullable; a missing address serializes as an object of nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AddressExport {
    pub company: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub street: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country_id: Option<String>,
    pub telephone: Option<String>,
    pub fax: Option<String>,
    pub email: Option<String>,
}

/// A timestamped comment on an order, invoice, credit memo, or shipment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentExport {
    pub created_at: String,
    pub comment: String,
}

/// One payment row with its resolved display title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentExport {
    pub method: String,
    /// Human-readable title; empty when the method code is unknown.
    pub title: String,
}

/// One invoice with its comments and line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceExport {
    pub entity_id: InvoiceId,
    pub increment_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub grand_total: Option<Decimal>,
    pub subtotal_incl_tax: Option<Decimal>,
    pub shipping_incl_tax: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub total_qty: Option<Decimal>,
    pub state: Option<i16>,
    pub comments: Vec<CommentExport>,
    pub items: Vec<DocumentItemExport>,
}

/// One credit memo with its comments and line items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreditMemoExport {
    pub entity_id: CreditMemoId,
    pub increment_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub grand_total: Option<Decimal>,
    pub adjustment_positive: Option<Decimal>,
    pub adjustment_negative: Option<Decimal>,
    pub subtotal_incl_tax: Option<Decimal>,
    pub shipping_incl_tax: Option<Decimal>,
    pub creditmemo_status: Option<i16>,
    pub state: Option<i16>,
    pub comments: Vec<CommentExport>,
    pub items: Vec<DocumentItemExport>,
}

/// One shipment with its comments, line items, and tracking entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentExport {
    pub entity_id: ShipmentId,
    pub increment_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub comments: Vec<CommentExport>,
    pub items: Vec<DocumentItemExport>,
    pub tracking: Vec<TrackingExport>,
}

/// A line item on an invoice, credit memo, or shipment.
///
/// The three document types project slightly different monetary columns;
/// fields not selected for a given type are `None` and still serialized, so
/// every document item has one uniform shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentItemExport {
    pub product_id: Option<i64>,
    pub order_item_id: Option<OrderItemId>,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub qty: Option<Decimal>,
    pub price_incl_tax: Option<Decimal>,
    pub row_total_incl_tax: Option<Decimal>,
    pub discount_amount: Option<Decimal>,
    pub price: Option<Decimal>,
    pub row_total: Option<Decimal>,
}

/// A shipment tracking entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingExport {
    pub created_at: String,
    pub updated_at: String,
    pub track_number: Option<String>,
    pub carrier_code: Option<String>,
    pub title: Option<String>,
}

/// One order line item. Items form a tree: children of composite products
/// are nested under `items`, and only root items attach to the order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItemExport {
    pub item_id: OrderItemId,
    pub parent_item_id: Option<OrderItemId>,
    pub created_at: String,
    pub updated_at: String,
    pub product_type: Option<String>,
    pub product_options: Option<String>,
    pub sku: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub qty_ordered: Option<Decimal>,
    pub qty_canceled: Option<Decimal>,
    pub qty_refunded: Option<Decimal>,
    pub qty_invoiced: Option<Decimal>,
    pub qty_shipped: Option<Decimal>,
    pub price_incl_tax: Option<Decimal>,
    pub row_total_incl_tax: Option<Decimal>,
    pub items: Vec<OrderItemExport>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_order() -> OrderExport {
        OrderExport {
            entity_id: OrderId::new(11),
            increment_id: "100000123".into(),
            ext_order_id: None,
            state: Some("processing".into()),
            status: Some("processing".into()),
            created_at: "2020-06-01 08:00:00".into(),
            updated_at: "2020-06-01 08:00:00".into(),
            store_id: StoreId::new(1),
            store_name: Some("Default".into()),
            customer_id: Some(CustomerId::new(5)),
            ext_customer_id: None,
            order_currency_code: Some("EUR".into()),
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
            url: "https://backoffice.example/sales/order/view/order_id/11".into(),
            customer_url: "https://backoffice.example/customer/edit/id/5".into(),
        }
    }

    #[test]
    fn bare_order_serializes_with_empty_collections() {
        let json: serde_json::Value = serde_json::to_value(bare_order()).unwrap();

        for field in ["payments", "invoices", "creditmemos", "shipments", "comments", "items"] {
            assert_eq!(json[field], serde_json::json!([]), "{field} should be an empty array");
        }
    }

    #[test]
    fn addresses_serialize_as_objects() {
        let json: serde_json::Value = serde_json::to_value(bare_order()).unwrap();

        assert!(json["billing_address"].is_object());
        assert!(json["shipping_address"].is_object());
        assert_eq!(json["billing_address"]["company"], serde_json::Value::Null);
    }

    #[test]
    fn serialization_is_deterministic() {
        let a = serde_json::to_string(&bare_order()).unwrap();
        let b = serde_json::to_string(&bare_order()).unwrap();
        assert_eq!(a, b);
    }
}
