//! Canonical thread identity for direct messages.

use crate::constants::{DM_PREFIX, DM_SEPARATOR};
use crate::error::{MessagingError, Result};
use crate::types::{ThreadId, UserId};

/// Derive the id of the direct thread between `a` and `b`.
///
/// The pair is sorted before joining, so the result does not depend on
/// argument order: `compute_direct_id(u1, u2) == "dm_u1_u2"`.
pub fn compute_direct_id(a: &UserId, b: &UserId) -> Result<ThreadId> {
    let [first, second] = direct_participants(a, b)?;
    Ok(ThreadId(format!(
        "{DM_PREFIX}{DM_SEPARATOR}{first}{DM_SEPARATOR}{second}"
    )))
}

/// The two participants of a direct thread, in canonical order.
pub fn direct_participants(a: &UserId, b: &UserId) -> Result<[UserId; 2]> {
    if a == b {
        return Err(MessagingError::SelfMessage);
    }
    if a < b {
        Ok([a.clone(), b.clone()])
    } else {
        Ok([b.clone(), a.clone()])
    }
}
