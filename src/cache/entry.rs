//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the value was stored
    pub stored_at: Instant,
    /// How long the value stays valid after `stored_at`
    pub ttl: Duration,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry stamped with the current time.
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Instant::now(),
            ttl,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is still valid while the elapsed time is
    /// less than or equal to its TTL, and expires only once it is strictly
    /// greater.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Checks expiry against a caller-supplied instant, so a sweep can use
    /// one `now` for the whole table.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) > self.ttl
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, or zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        let elapsed = Instant::now().saturating_duration_since(self.stored_at);
        self.ttl.saturating_sub(elapsed)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_creation() {
        let entry = CacheEntry::new("test_value", Duration::from_secs(60));

        assert_eq!(entry.value, "test_value");
        assert!(!entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new("test_value", Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_millis(101)).await;
        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("test", Duration::from_millis(500));

        // Exactly at the TTL the entry is still valid
        let at_ttl = entry.stored_at + Duration::from_millis(500);
        assert!(!entry.is_expired_at(at_ttl), "Entry should be valid at boundary");

        let past_ttl = at_ttl + Duration::from_millis(1);
        assert!(entry.is_expired_at(past_ttl), "Entry should expire past boundary");
    }

    #[test]
    fn test_zero_ttl_valid_at_store_instant() {
        let entry = CacheEntry::new(1u8, Duration::ZERO);
        assert!(!entry.is_expired_at(entry.stored_at));
    }
}
