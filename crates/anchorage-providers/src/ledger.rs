use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Trackable,
    Anchor,
    Future,
    PointCloud,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Trackable => "trackable",
            ObjectKind::Anchor => "anchor",
            ObjectKind::Future => "future",
            ObjectKind::PointCloud => "point cloud",
        };
        f.write_str(name)
    }
}

/// Counts the references the application holds on native objects.
///
/// A release with no matching acquire is recorded as a violation instead of
/// panicking so tests can assert on it.
#[derive(Debug, Default, Clone)]
pub struct ReferenceLedger {
    counts: BTreeMap<(ObjectKind, u64), u32>,
    acquired_total: u64,
    violations: Vec<String>,
}

impl ReferenceLedger {
    pub fn acquire(&mut self, kind: ObjectKind, id: u64) {
        *self.counts.entry((kind, id)).or_insert(0) += 1;
        self.acquired_total += 1;
    }

    pub fn release(&mut self, kind: ObjectKind, id: u64) {
        match self.counts.get_mut(&(kind, id)) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.counts.remove(&(kind, id));
            }
            None => self
                .violations
                .push(format!("released {kind} {id} without holding a reference")),
        }
    }

    /// Records a violation when `id` is read with no reference held.
    pub fn observe(&mut self, kind: ObjectKind, id: u64) {
        if self.held(kind, id) == 0 {
            self.violations
                .push(format!("read {kind} {id} without holding a reference"));
        }
    }

    pub fn held(&self, kind: ObjectKind, id: u64) -> u32 {
        self.counts.get(&(kind, id)).copied().unwrap_or(0)
    }

    /// Total references currently held of `kind`.
    pub fn outstanding(&self, kind: ObjectKind) -> u32 {
        self.counts
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn acquired_total(&self) -> u64 {
        self.acquired_total
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// No references held and no invalid releases.
    pub fn is_balanced(&self) -> bool {
        self.counts.is_empty() && self.violations.is_empty()
    }
}
