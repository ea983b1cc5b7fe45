//! Partial order on markings
//!
//! Markings are compared pointwise, which only yields a partial order. The
//! standard library's [`PartialOrd`] is tied to [`PartialEq`] and cannot
//! express that two markings over different place sets are incomparable, so
//! this module defines its own [`PartialOrder`] trait.

use std::{cmp::Ordering, collections::BTreeMap, fmt};

/// Outcome of comparing `a` with `b` in a partial order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PartialOrdCompResult {
    /// Neither `a <= b` nor `b <= a`
    Incomparable,
    /// `a < b`
    LessThan,
    /// `a == b`
    Equal,
    /// `a > b`
    GreaterThan,
}

impl PartialOrdCompResult {
    /// Result of the comparison with swapped arguments
    pub fn reverse(self) -> Self {
        match self {
            PartialOrdCompResult::LessThan => PartialOrdCompResult::GreaterThan,
            PartialOrdCompResult::GreaterThan => PartialOrdCompResult::LessThan,
            res => res,
        }
    }
}

impl From<Ordering> for PartialOrdCompResult {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => PartialOrdCompResult::LessThan,
            Ordering::Equal => PartialOrdCompResult::Equal,
            Ordering::Greater => PartialOrdCompResult::GreaterThan,
        }
    }
}

impl fmt::Display for PartialOrdCompResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartialOrdCompResult::Incomparable => write!(f, "<>"),
            PartialOrdCompResult::LessThan => write!(f, "<"),
            PartialOrdCompResult::Equal => write!(f, "=="),
            PartialOrdCompResult::GreaterThan => write!(f, ">"),
        }
    }
}

/// Types with a partial order
pub trait PartialOrder {
    /// Compare `self` with `other`
    fn part_cmp(&self, other: &Self) -> PartialOrdCompResult;

    /// Check whether `self` is greater than or equal to `other`
    fn is_greater_or_equal(&self, other: &Self) -> bool {
        matches!(
            self.part_cmp(other),
            PartialOrdCompResult::Equal | PartialOrdCompResult::GreaterThan
        )
    }

    /// Check whether `self` is strictly greater than `other`
    fn is_greater(&self, other: &Self) -> bool {
        self.part_cmp(other) == PartialOrdCompResult::GreaterThan
    }
}

/// Pointwise order of maps over the same keys
///
/// `a <= b` iff both maps have the same keys and `a[k] <= b[k]` for every
/// key. Maps over different keys are incomparable.
impl<K: Ord, V: PartialOrder> PartialOrder for BTreeMap<K, V> {
    fn part_cmp(&self, other: &Self) -> PartialOrdCompResult {
        if self.len() != other.len() {
            return PartialOrdCompResult::Incomparable;
        }

        let mut below = false;
        let mut above = false;
        for (key, value) in self.iter() {
            let Some(other_value) = other.get(key) else {
                return PartialOrdCompResult::Incomparable;
            };
            match value.part_cmp(other_value) {
                PartialOrdCompResult::Incomparable => return PartialOrdCompResult::Incomparable,
                PartialOrdCompResult::LessThan => below = true,
                PartialOrdCompResult::GreaterThan => above = true,
                PartialOrdCompResult::Equal => (),
            }
            if below && above {
                return PartialOrdCompResult::Incomparable;
            }
        }

        match (below, above) {
            (true, _) => PartialOrdCompResult::LessThan,
            (_, true) => PartialOrdCompResult::GreaterThan,
            _ => PartialOrdCompResult::Equal,
        }
    }
}
