use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Integer key of a payload row.
///
/// Row ids share one id space across the `ndarray` and `object` tables: a
/// given id is assigned to exactly one path, whichever table its payload
/// lives in.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(i64);

impl RowId {
    /// Wrap a raw row id.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw integer, as stored in the `id` column.
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Debug for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RowId({})", self.0)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RowId> for i64 {
    fn from(id: RowId) -> Self {
        id.0
    }
}

/// The last-assigned row id.
///
/// A fresh counter holds `-1`, so the first id handed out is `0`. The value
/// only ever moves forward, one step per newly mapped path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCounter {
    last: i64,
}

impl IdCounter {
    /// Value of a counter that has not assigned any id yet.
    pub const INITIAL: i64 = -1;

    /// Create a counter that has not assigned any id.
    pub const fn new() -> Self {
        Self {
            last: Self::INITIAL,
        }
    }

    /// Restore a counter from its persisted value.
    ///
    /// Values below [`IdCounter::INITIAL`] cannot have been produced by
    /// [`IdCounter::advance`] and are rejected.
    pub fn from_last(last: i64) -> Result<Self, TypeError> {
        if last < Self::INITIAL {
            return Err(TypeError::InvalidCounter(last));
        }
        Ok(Self { last })
    }

    /// The last-assigned id, or `-1` when nothing was assigned.
    pub const fn last(&self) -> i64 {
        self.last
    }

    /// The id the next call to [`IdCounter::advance`] would return.
    pub fn peek_next(&self) -> Result<RowId, TypeError> {
        self.last
            .checked_add(1)
            .map(RowId)
            .ok_or(TypeError::CounterOverflow)
    }

    /// Assign the next id and move the counter onto it.
    pub fn advance(&mut self) -> Result<RowId, TypeError> {
        let next = self.peek_next()?;
        self.last = next.0;
        Ok(next)
    }

    /// Returns `true` if `id` could have been assigned by this counter.
    pub fn has_assigned(&self, id: RowId) -> bool {
        id.0 >= 0 && id.0 <= self.last
    }
}

impl Default for IdCounter {
    fn default() -> Self {
        Self::new()
    }
}
