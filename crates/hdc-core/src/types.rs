//! Core domain types

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Opaque identifier of a connected device
///
/// Identifiers are only meaningful while the daemon session that reported
/// them is alive; equality is exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for DeviceId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DeviceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Set of devices seen by the daemon at one instant
///
/// Keeps the daemon's reporting order for display and for
/// `wait_for_device`, but compares as a set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceSnapshot {
    ids: Vec<DeviceId>,
}

impl DeviceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot, rejecting duplicate identifiers
    ///
    /// On a duplicate the offending id is returned.
    pub fn try_from_ids<I, T>(ids: I) -> std::result::Result<Self, DeviceId>
    where
        I: IntoIterator<Item = T>,
        T: Into<DeviceId>,
    {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for id in ids {
            let id = id.into();
            if !seen.insert(id.clone()) {
                return Err(id);
            }
            out.push(id);
        }
        Ok(Self { ids: out })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|d| d == id)
    }

    /// First device in daemon order
    pub fn first(&self) -> Option<&DeviceId> {
        self.ids.first()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceId> {
        self.ids.iter()
    }

    pub fn as_slice(&self) -> &[DeviceId] {
        &self.ids
    }

    /// Compute what changed going from `self` to `next`
    pub fn diff(&self, next: &DeviceSnapshot) -> SnapshotDiff {
        let before: HashSet<&DeviceId> = self.ids.iter().collect();
        let after: HashSet<&DeviceId> = next.ids.iter().collect();

        SnapshotDiff {
            added: next
                .ids
                .iter()
                .filter(|id| !before.contains(id))
                .cloned()
                .collect(),
            removed: self
                .ids
                .iter()
                .filter(|id| !after.contains(id))
                .cloned()
                .collect(),
        }
    }
}

impl PartialEq for DeviceSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.ids.len() == other.ids.len() && self.ids.iter().all(|id| other.ids.contains(id))
    }
}

impl Eq for DeviceSnapshot {}

impl FromIterator<DeviceId> for DeviceSnapshot {
    /// Collects ids, silently dropping repeats
    fn from_iter<I: IntoIterator<Item = DeviceId>>(iter: I) -> Self {
        let mut ids: Vec<DeviceId> = Vec::new();
        for id in iter {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Self { ids }
    }
}

impl<'a> IntoIterator for &'a DeviceSnapshot {
    type Item = &'a DeviceId;
    type IntoIter = std::slice::Iter<'a, DeviceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter()
    }
}

/// Devices that appeared and disappeared between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// In the new snapshot but not the old one
    pub added: Vec<DeviceId>,
    /// In the old snapshot but not the new one
    pub removed: Vec<DeviceId>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Continuation decision returned by streaming consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Deliver the next unit
    Continue,
    /// Close the stream and return
    Stop,
}

impl Flow {
    pub fn is_stop(self) -> bool {
        self == Flow::Stop
    }
}

impl From<bool> for Flow {
    /// `true` keeps the stream going
    fn from(keep_going: bool) -> Self {
        if keep_going {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }
}
