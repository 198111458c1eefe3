//! Payment method title resolution.

use std::collections::HashMap;

use sqlx::PgPool;

use crate::db::RepositoryError;

/// Memoizing payment-method-code to display-title resolver.
///
/// Unknown codes resolve to an empty title rather than failing; retired
/// payment methods routinely survive on historical orders.
#[derive(Debug, Default)]
pub struct PaymentTitleResolver {
    cache: HashMap<String, String>,
}

impl PaymentTitleResolver {
    /// Create an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the display title for a payment method code.
    ///
    /// # Errors
    ///
    /// Returns an error only if the database query fails; unknown codes
    /// resolve to an empty string.
    pub async fn resolve(&mut self, pool: &PgPool, method: &str) -> Result<String, RepositoryError> {
        if let Some(title) = self.cache.get(method) {
            return Ok(title.clone());
        }

        let title: Option<Option<String>> =
            sqlx::query_scalar("SELECT title FROM payment_methods WHERE code = $1")
                .bind(method)
                .fetch_optional(pool)
                .await?;

        let title = title.flatten().unwrap_or_default();
        self.cache.insert(method.to_string(), title.clone());

        Ok(title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_returns_stored_titles() {
        let mut resolver = PaymentTitleResolver::new();
        resolver
            .cache
            .insert("checkmo".to_string(), "Check / Money order".to_string());

        assert_eq!(
            resolver.cache.get("checkmo").map(String::as_str),
            Some("Check / Money order")
        );
        assert_eq!(resolver.cache.get("unknown"), None);
    }
}
