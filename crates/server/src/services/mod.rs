//! Request-scoped services for the export pipeline.
//!
//! The resolvers memoize derived lookups (store timezone, payment method
//! title) for the lifetime of one request batch. They are constructed per
//! request by the handler; nothing here is shared across requests.

pub mod admin_url;
pub mod export;
pub mod payment;
pub mod timezone;

pub use admin_url::AdminUrlBuilder;
pub use payment::PaymentTitleResolver;
pub use timezone::TimezoneResolver;
