//! Process identities and the fixed ranking used for tie-breaks.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::error::RankingError;

/// Identifies a simulated process.
///
/// Backed by an `Arc<str>` so that events, messages and clocks can carry
/// their owner without copying the name. Ordering is lexicographic on
/// the name; the [`Ranking`] decides tie-breaks, not this impl.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(Arc<str>);

impl ProcessId {
    /// Create an identity from any string-like name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The identity's name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProcessId {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

impl From<String> for ProcessId {
    fn from(v: String) -> Self {
        Self(Arc::from(v))
    }
}

impl Borrow<str> for ProcessId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Fixed total order over process identities, set once at configuration.
///
/// Entries are listed highest precedence first: on equal counters, the
/// event of the identity listed earlier sorts first in ascending order.
/// Identities not in the list rank after every listed identity, and
/// among themselves lexicographically, so the order is total over all
/// identities and never depends on insertion or arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ranking {
    order: IndexSet<ProcessId>,
}

impl Ranking {
    /// A ranking with no explicit entries (pure lexicographic order).
    pub fn lexicographic() -> Self {
        Self::default()
    }

    /// Build a ranking from identities listed highest precedence first.
    ///
    /// Rejects empty names and duplicates.
    pub fn from_highest<I, T>(ids: I) -> Result<Self, RankingError>
    where
        I: IntoIterator<Item = T>,
        T: Into<ProcessId>,
    {
        let mut order = IndexSet::new();
        for id in ids {
            let id = id.into();
            if id.as_str().is_empty() {
                return Err(RankingError::EmptyIdentity);
            }
            if order.contains(&id) {
                return Err(RankingError::DuplicateRank { id });
            }
            order.insert(id);
        }
        Ok(Self { order })
    }

    /// Position of `id` in the explicit list, if present.
    pub fn rank(&self, id: &ProcessId) -> Option<usize> {
        self.order.get_index_of(id)
    }

    /// Number of explicitly ranked identities.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the ranking has no explicit entries.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Explicitly ranked identities, highest precedence first.
    pub fn iter(&self) -> impl Iterator<Item = &ProcessId> {
        self.order.iter()
    }

    /// Compare two identities under this ranking.
    ///
    /// Returns `Ordering::Less` when `a` takes precedence over `b`.
    /// Equal only when `a == b`.
    pub fn compare(&self, a: &ProcessId, b: &ProcessId) -> Ordering {
        match (self.rank(a), self.rank(b)) {
            (Some(ra), Some(rb)) => ra.cmp(&rb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }
}
