//! The port-assignment pass over a candidate model.
//!
//! Obsolete reservations are swept first so their ports can be handed to
//! services in the same run. Each service then gets a port according to
//! its port-mode property:
//! 1. `shared` — the shared pool
//! 2. `private` — the pool of its first candidate target
//! 3. anything else — not a port-bearing service, skipped

use std::collections::BTreeMap;

use hostplan_core::{Properties, Service, find_service};
use hostplan_placement::CandidateModel;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::pool::{PortPool, PortReservation};

/// Port mode declared by a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortMode {
    Shared,
    Private,
}

impl PortMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "shared" => Some(PortMode::Shared),
            "private" => Some(PortMode::Private),
            _ => None,
        }
    }
}

/// Outcome of one assignment pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortAssignment {
    /// Service → port for every service that received one.
    pub ports: BTreeMap<String, u16>,
    /// Services whose pool was exhausted or that had no target for a
    /// private port.
    #[serde(skip)]
    pub failed: Vec<String>,
    /// Reservations swept as obsolete before assigning.
    #[serde(skip)]
    pub removed: Vec<PortReservation>,
}

/// Sweep obsolete reservations, then assign or reuse a port for every
/// port-bearing service in the candidate model.
///
/// Failures for one service are logged and recorded; the pass continues
/// for the rest.
pub fn assign_ports(
    pool: &mut PortPool,
    services: &[Service],
    candidates: &CandidateModel,
    mode_property: &str,
) -> PortAssignment {
    let mut result = PortAssignment {
        removed: pool.clean_obsolete_reservations(candidates),
        ..PortAssignment::default()
    };

    for entry in candidates.entries() {
        let mode = find_service(services, &entry.service)
            .and_then(|s| s.property(mode_property))
            .and_then(PortMode::parse);

        let target = match mode {
            None => {
                debug!(service = %entry.service, "no port requested");
                continue;
            }
            Some(PortMode::Shared) => None,
            Some(PortMode::Private) => match entry.targets.first() {
                Some(target) => Some(target.as_str()),
                None => {
                    warn!(
                        service = %entry.service,
                        "service is not distributed to any target — skipping private port"
                    );
                    result.failed.push(entry.service.clone());
                    continue;
                }
            },
        };

        match pool.assign_or_reuse(target, &entry.service) {
            Ok(port) => {
                result.ports.insert(entry.service.clone(), port);
            }
            Err(e) => {
                warn!(service = %entry.service, error = %e, "port assignment failed");
                result.failed.push(entry.service.clone());
            }
        }
    }

    info!(
        assigned = result.ports.len(),
        failed = result.failed.len(),
        removed = result.removed.len(),
        "port assignment complete"
    );

    result
}
