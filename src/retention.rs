//! Local cache retention policy
//!
//! How long unused cache entries are guaranteed to survive. The policy is
//! plain configuration: nothing in this crate enforces it, the value is
//! handed to an external sweep process that deletes stale entries based on
//! their last-access time.

use crate::error::{RepoError, Result};

const DEFAULT_UNUSED_ENTRY_DAYS: u32 = 7;

/// Retention policy for the local artifact cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    unused_entry_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            unused_entry_days: DEFAULT_UNUSED_ENTRY_DAYS,
        }
    }
}

impl RetentionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimum number of days a cache entry survives since its last
    /// access. Defaults to 7.
    pub fn unused_entry_days(&self) -> u32 {
        self.unused_entry_days
    }

    /// Set the retention period in days
    ///
    /// Values below 1 are rejected and leave the stored value unchanged.
    pub fn set_unused_entry_days(&mut self, days: u32) -> Result<()> {
        if days < 1 {
            return Err(RepoError::InvalidRetention(
                "cache entries must be retained for at least one day".to_string(),
            ));
        }
        self.unused_entry_days = days;
        Ok(())
    }

    /// Used to be the target cache size in megabytes, now always 0
    #[deprecated(note = "size-based retention was replaced by unused_entry_days")]
    pub fn target_size_in_mb(&self) -> u64 {
        log::warn!(
            "RetentionPolicy::target_size_in_mb is deprecated and always returns 0; \
             use unused_entry_days instead"
        );
        0
    }

    /// Used to set the target cache size in megabytes, now has no effect
    #[deprecated(note = "size-based retention was replaced by set_unused_entry_days")]
    pub fn set_target_size_in_mb(&mut self, _target_size_in_mb: u64) {
        log::warn!(
            "RetentionPolicy::set_target_size_in_mb is deprecated and has no effect; \
             use set_unused_entry_days instead"
        );
    }
}
