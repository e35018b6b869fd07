//! Candidate model — which targets may host each service.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use hostplan_core::model::{load_json_file, parse_json};
use hostplan_core::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// A service and the targets eligible to host it.
///
/// Target order is the order of the source model; it carries no ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub service: String,
    #[serde(default)]
    pub targets: Vec<String>,
}

impl CandidateEntry {
    pub fn new<S: Into<String>>(
        service: impl Into<String>,
        targets: impl IntoIterator<Item = S>,
    ) -> Self {
        Self {
            service: service.into(),
            targets: targets.into_iter().map(Into::into).collect(),
        }
    }
}

/// Ordered service → candidate targets mapping. Service names are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateModel {
    entries: Vec<CandidateEntry>,
}

impl CandidateModel {
    pub fn new(entries: Vec<CandidateEntry>) -> ModelResult<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.service.as_str()) {
                return Err(ModelError::DuplicateService(entry.service.clone()));
            }
        }
        Ok(Self { entries })
    }

    /// Wrap entries already known to have unique service names.
    pub(crate) fn from_unique(entries: Vec<CandidateEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json(content: &str) -> ModelResult<Self> {
        Self::new(parse_json(content, "candidate model")?)
    }

    pub fn load(path: &Path) -> ModelResult<Self> {
        Self::new(load_json_file(path)?)
    }

    pub fn entries(&self) -> &[CandidateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a service's entry. Linear scan; models are small.
    pub fn find(&self, service: &str) -> Option<&CandidateEntry> {
        self.entries.iter().find(|e| e.service == service)
    }

    /// All `(service, target)` edges in model order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().flat_map(|e| {
            e.targets
                .iter()
                .map(move |t| (e.service.as_str(), t.as_str()))
        })
    }
}

impl fmt::Display for CandidateModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "service: {}", entry.service)?;
            for target in &entry.targets {
                writeln!(f, "  target: {target}")?;
            }
        }
        Ok(())
    }
}
