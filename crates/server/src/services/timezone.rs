//! Store timezone resolution and timestamp conversion.
//!
//! Persisted timestamps are UTC; the API exposes them as wall-clock strings
//! in the owning store's configured timezone. Store lookups are memoized for
//! the lifetime of one request batch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sqlx::PgPool;

use ordergate_core::StoreId;

use crate::db::RepositoryError;

/// Format of all exposed timestamps.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Memoizing store-id to timezone resolver.
///
/// Unknown store ids and unparseable zone names resolve to the configured
/// default timezone; they are expected data-quality conditions, not errors.
#[derive(Debug)]
pub struct TimezoneResolver {
    default: Tz,
    cache: HashMap<StoreId, Tz>,
}

impl TimezoneResolver {
    /// Create a resolver with the given fallback timezone.
    #[must_use]
    pub fn new(default: Tz) -> Self {
        Self {
            default,
            cache: HashMap::new(),
        }
    }

    /// Resolve the timezone configured for a store.
    ///
    /// # Errors
    ///
    /// Returns an error only if the database query fails; missing stores
    /// fall back to the default timezone.
    pub async fn resolve(&mut self, pool: &PgPool, store_id: StoreId) -> Result<Tz, RepositoryError> {
        if let Some(tz) = self.cache.get(&store_id) {
            return Ok(*tz);
        }

        let name: Option<Option<String>> =
            sqlx::query_scalar("SELECT timezone FROM stores WHERE store_id = $1")
                .bind(store_id)
                .fetch_optional(pool)
                .await?;

        Ok(self.admit(store_id, name.flatten().as_deref()))
    }

    /// Cache the zone for a store, falling back to the default when the
    /// configured name is missing or not a known zone.
    fn admit(&mut self, store_id: StoreId, name: Option<&str>) -> Tz {
        let tz = name.and_then(|n| n.parse().ok()).unwrap_or(self.default);
        self.cache.insert(store_id, tz);
        tz
    }

    /// Convert a persisted UTC timestamp to a store-local wall-clock string.
    #[must_use]
    pub fn convert(tz: Tz, at: DateTime<Utc>) -> String {
        at.with_timezone(&tz).format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn convert_applies_dst_offset() {
        // 2020-06-01 is summer time in New York (UTC-4)
        let at = Utc.with_ymd_and_hms(2020, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            TimezoneResolver::convert(chrono_tz::America::New_York, at),
            "2020-06-01 08:00:00"
        );
    }

    #[test]
    fn convert_applies_standard_offset() {
        // 2020-01-01 is standard time in New York (UTC-5)
        let at = Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap();
        assert_eq!(
            TimezoneResolver::convert(chrono_tz::America::New_York, at),
            "2020-01-01 07:00:00"
        );
    }

    #[test]
    fn unknown_zone_name_falls_back_to_default() {
        let mut resolver = TimezoneResolver::new(chrono_tz::Europe::Berlin);

        assert_eq!(
            resolver.admit(StoreId::new(1), Some("Not/AZone")),
            chrono_tz::Europe::Berlin
        );
        assert_eq!(resolver.admit(StoreId::new(2), None), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn resolved_zone_is_cached_per_store() {
        let mut resolver = TimezoneResolver::new(chrono_tz::Europe::Berlin);
        resolver.admit(StoreId::new(1), Some("America/New_York"));

        assert_eq!(
            resolver.cache.get(&StoreId::new(1)),
            Some(&chrono_tz::America::New_York)
        );
        // A second admit for the same store is not expected, but the cache
        // holds one entry per store either way.
        assert_eq!(resolver.cache.len(), 1);
    }
}
