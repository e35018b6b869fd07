//! PortPool — persisted port reservations.
//!
//! Reservations live in two partitions: one shared pool (service → port)
//! and one private pool per target (service → port). Within a pool a port
//! belongs to at most one service; across private pools the same number may
//! repeat, since each target is a separate machine.
//!
//! All maps are `BTreeMap`s, so scans and the persisted JSON are ordered by
//! name and two runs over the same input render byte-identical output.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use hostplan_core::config::{DEFAULT_MAX_PORT, DEFAULT_MIN_PORT};
use hostplan_placement::{CandidateModel, TargetIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PortError, PortResult};

/// Convert any `Display` error into a `PortError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| PortError::$variant(e.to_string())
    };
}

/// Inclusive range of port numbers a pool hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortRange {
    min: u16,
    max: u16,
}

impl PortRange {
    pub fn new(min: u16, max: u16) -> PortResult<Self> {
        if min > max {
            return Err(PortError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_PORT,
            max: DEFAULT_MAX_PORT,
        }
    }
}

/// Which partition a reservation belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolKey {
    Shared,
    Private(String),
}

impl PoolKey {
    fn from_target(target: Option<&str>) -> Self {
        match target {
            Some(t) => PoolKey::Private(t.to_string()),
            None => PoolKey::Shared,
        }
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKey::Shared => f.write_str("shared"),
            PoolKey::Private(target) => write!(f, "private:{target}"),
        }
    }
}

/// A single reservation, as reported by sweeps and listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortReservation {
    pub pool: PoolKey,
    pub service: String,
    pub port: u16,
}

impl fmt::Display for PortReservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}={}", self.pool, self.service, self.port)
    }
}

/// One partition: its range and its service → port reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    min_port: u16,
    max_port: u16,
    #[serde(default)]
    reservations: BTreeMap<String, u16>,
}

impl Pool {
    fn new(range: PortRange) -> Self {
        Self {
            min_port: range.min,
            max_port: range.max,
            reservations: BTreeMap::new(),
        }
    }

    fn default_shared() -> Self {
        Self::new(PortRange::default())
    }

    pub fn range(&self) -> PortRange {
        PortRange {
            min: self.min_port,
            max: self.max_port,
        }
    }

    pub fn reservations(&self) -> &BTreeMap<String, u16> {
        &self.reservations
    }

    /// Smallest port in range not reserved in this pool.
    fn next_free(&self) -> Option<u16> {
        let used: BTreeSet<u16> = self.reservations.values().copied().collect();
        (self.min_port..=self.max_port).find(|p| !used.contains(p))
    }

    fn assign_or_reuse(&mut self, key: &PoolKey, service: &str) -> PortResult<u16> {
        if let Some(&port) = self.reservations.get(service) {
            debug!(pool = %key, service, port, "reusing port reservation");
            return Ok(port);
        }
        let port = self.next_free().ok_or_else(|| PortError::Exhausted {
            pool: key.clone(),
            service: service.to_string(),
        })?;
        self.reservations.insert(service.to_string(), port);
        debug!(pool = %key, service, port, "reserved new port");
        Ok(port)
    }

    fn validate(&self, key: &PoolKey) -> PortResult<()> {
        PortRange::new(self.min_port, self.max_port)?;
        let mut owners: BTreeMap<u16, &str> = BTreeMap::new();
        for (service, &port) in &self.reservations {
            if let Some(first) = owners.insert(port, service) {
                return Err(PortError::DuplicatePort {
                    pool: key.clone(),
                    port,
                    first: first.to_string(),
                    second: service.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Shared and per-target port reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortPool {
    #[serde(default = "Pool::default_shared")]
    shared: Pool,
    #[serde(default)]
    private: BTreeMap<String, Pool>,
}

impl Default for PortPool {
    fn default() -> Self {
        Self::new(PortRange::default())
    }
}

impl PortPool {
    /// An empty pool; private pools are created on first use with `range`.
    pub fn new(range: PortRange) -> Self {
        Self {
            shared: Pool::new(range),
            private: BTreeMap::new(),
        }
    }

    /// Parse a previously persisted pool.
    pub fn load(content: &str) -> PortResult<Self> {
        let pool: PortPool = serde_json::from_str(content).map_err(map_err!(Deserialize))?;
        pool.shared.validate(&PoolKey::Shared)?;
        for (target, private) in &pool.private {
            private.validate(&PoolKey::Private(target.clone()))?;
        }
        debug!(
            shared = pool.shared.reservations.len(),
            private_pools = pool.private.len(),
            "port pool loaded"
        );
        Ok(pool)
    }

    pub fn load_file(path: &Path) -> PortResult<Self> {
        let content = std::fs::read_to_string(path).map_err(map_err!(Read))?;
        Self::load(&content)
    }

    /// Deterministic JSON rendering: shared pool first, then private pools
    /// by target name.
    pub fn persist(&self) -> PortResult<String> {
        let mut out = serde_json::to_string_pretty(self).map_err(map_err!(Serialize))?;
        out.push('\n');
        Ok(out)
    }

    pub fn persist_file(&self, path: &Path) -> PortResult<()> {
        let content = self.persist()?;
        std::fs::write(path, content).map_err(map_err!(Write))?;
        debug!(?path, "port pool persisted");
        Ok(())
    }

    /// The range new ports are drawn from (shared pool and new private pools).
    pub fn range(&self) -> PortRange {
        self.shared.range()
    }

    /// Apply a new range to every pool. Reservations outside it are kept.
    pub fn set_range(&mut self, range: PortRange) {
        for pool in std::iter::once(&mut self.shared).chain(self.private.values_mut()) {
            pool.min_port = range.min;
            pool.max_port = range.max;
        }
    }

    pub fn shared(&self) -> &Pool {
        &self.shared
    }

    pub fn private(&self, target: &str) -> Option<&Pool> {
        self.private.get(target)
    }

    /// Return the service's port in the selected pool, reserving the
    /// smallest free one if it has none yet.
    ///
    /// `target = None` selects the shared pool. An existing reservation is
    /// always returned unchanged.
    pub fn assign_or_reuse(&mut self, target: Option<&str>, service: &str) -> PortResult<u16> {
        let key = PoolKey::from_target(target);
        match target {
            None => self.shared.assign_or_reuse(&key, service),
            Some(t) => {
                let range = self.shared.range();
                self.private
                    .entry(t.to_string())
                    .or_insert_with(|| Pool::new(range))
                    .assign_or_reuse(&key, service)
            }
        }
    }

    pub fn port_of(&self, target: Option<&str>, service: &str) -> Option<u16> {
        let pool = match target {
            None => Some(&self.shared),
            Some(t) => self.private.get(t),
        };
        pool.and_then(|p| p.reservations.get(service).copied())
    }

    /// Drop one reservation, returning its port.
    pub fn release(&mut self, target: Option<&str>, service: &str) -> Option<u16> {
        let port = match target {
            None => self.shared.reservations.remove(service),
            Some(t) => {
                let pool = self.private.get_mut(t)?;
                let port = pool.reservations.remove(service);
                if pool.reservations.is_empty() {
                    self.private.remove(t);
                }
                port
            }
        };
        if let Some(port) = port {
            debug!(pool = %PoolKey::from_target(target), service, port, "released port");
        }
        port
    }

    /// Remove reservations the candidate model no longer backs.
    ///
    /// A shared reservation survives while its service is in the model; a
    /// private one while its `(target, service)` edge is. Private pools
    /// left empty are dropped. Returns what was removed.
    pub fn clean_obsolete_reservations(
        &mut self,
        candidates: &CandidateModel,
    ) -> Vec<PortReservation> {
        let index = TargetIndex::build(candidates);
        let mut removed = Vec::new();

        self.shared.reservations.retain(|service, port| {
            let live = candidates.find(service).is_some();
            if !live {
                removed.push(PortReservation {
                    pool: PoolKey::Shared,
                    service: service.clone(),
                    port: *port,
                });
            }
            live
        });

        for (target, pool) in self.private.iter_mut() {
            pool.reservations.retain(|service, port| {
                let live = index.contains(target, service);
                if !live {
                    removed.push(PortReservation {
                        pool: PoolKey::Private(target.clone()),
                        service: service.clone(),
                        port: *port,
                    });
                }
                live
            });
        }
        self.private.retain(|_, pool| !pool.reservations.is_empty());

        for reservation in &removed {
            info!(%reservation, "removed obsolete port reservation");
        }
        removed
    }

    /// Every reservation: shared first, then private pools by target.
    pub fn reservations(&self) -> Vec<PortReservation> {
        let shared = self.shared.reservations.iter().map(|(service, &port)| PortReservation {
            pool: PoolKey::Shared,
            service: service.clone(),
            port,
        });
        let private = self.private.iter().flat_map(|(target, pool)| {
            pool.reservations.iter().map(move |(service, &port)| PortReservation {
                pool: PoolKey::Private(target.clone()),
                service: service.clone(),
                port,
            })
        });
        shared.chain(private).collect()
    }
}
