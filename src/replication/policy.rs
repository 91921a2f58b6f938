//! Disabled-secret policy.

use crate::store::SecretRecord;

/// Whether `record` may be written to targets
///
/// Only an explicit `enabled = false` blocks propagation, and only while
/// `override_disabled` is off.
pub fn should_propagate(record: &SecretRecord, override_disabled: bool) -> bool {
    override_disabled || record.enabled != Some(false)
}
