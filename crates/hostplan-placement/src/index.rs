//! Target index — the candidate model inverted to target → services.
//!
//! Both levels are sorted vectors kept in order on every insert, so a
//! lookup is a binary search and there is no window in which the index is
//! queryable but unsorted.

use std::fmt;

use crate::candidate::CandidateModel;

/// A target and the services that list it as a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetEntry {
    pub target: String,
    services: Vec<String>,
}

impl TargetEntry {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            services: Vec::new(),
        }
    }

    /// Services naming this target, sorted by name.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Binary search for a service in this entry.
    pub fn lookup_service(&self, service: &str) -> Option<&str> {
        self.services
            .binary_search_by(|s| s.as_str().cmp(service))
            .ok()
            .map(|i| self.services[i].as_str())
    }

    fn insert_service(&mut self, service: &str) {
        if let Err(pos) = self.services.binary_search_by(|s| s.as_str().cmp(service)) {
            self.services.insert(pos, service.to_string());
        }
    }
}

/// Sorted target → services index derived from a [`CandidateModel`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetIndex {
    entries: Vec<TargetEntry>,
}

impl TargetIndex {
    /// Build the index from every `(service, target)` edge of the model.
    pub fn build(candidates: &CandidateModel) -> Self {
        let mut index = Self::default();
        for (service, target) in candidates.edges() {
            index.insert(target, service);
        }
        index
    }

    /// Record that `service` lists `target` as a candidate.
    pub fn insert(&mut self, target: &str, service: &str) {
        let pos = match self.position(target) {
            Ok(pos) => pos,
            Err(pos) => {
                self.entries.insert(pos, TargetEntry::new(target));
                pos
            }
        };
        self.entries[pos].insert_service(service);
    }

    /// Binary search for a target's entry.
    pub fn lookup_target(&self, target: &str) -> Option<&TargetEntry> {
        self.position(target).ok().map(|i| &self.entries[i])
    }

    /// Whether `(target, service)` is an edge of the indexed model.
    pub fn contains(&self, target: &str, service: &str) -> bool {
        self.lookup_target(target)
            .and_then(|entry| entry.lookup_service(service))
            .is_some()
    }

    /// Entries sorted by target name.
    pub fn entries(&self) -> &[TargetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, target: &str) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|e| e.target.as_str().cmp(target))
    }
}

impl fmt::Display for TargetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "target: {}", entry.target)?;
            for service in &entry.services {
                writeln!(f, "  service: {service}")?;
            }
        }
        Ok(())
    }
}
