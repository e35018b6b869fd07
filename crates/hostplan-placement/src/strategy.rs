//! Distribution strategies — reduce candidate targets to a final choice.
//!
//! Every strategy makes one pass over the services and keeps no state
//! between calls. Ties between targets always go to the lexicographically
//! smaller target name, so a fixed input always gives the same output.
//!
//! # Strategies
//!
//! - **None** — candidates pass through unchanged
//! - **Greedy** — per-target residual capacity, largest residual first
//! - **HighestBidder** — independent auction per service, highest bid wins
//! - **LowestBidder** — independent auction per service, lowest bid wins

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use hostplan_core::{Properties, Service, Target, find_service};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::candidate::{CandidateEntry, CandidateModel};

/// Allocation policy used by [`distribute`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    None,
    Greedy,
    HighestBidder,
    LowestBidder,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::None => "none",
            Strategy::Greedy => "greedy",
            Strategy::HighestBidder => "highest-bidder",
            Strategy::LowestBidder => "lowest-bidder",
        }
    }

    /// Whether the strategy reads a numeric service property.
    pub fn uses_service_property(&self) -> bool {
        matches!(self, Strategy::Greedy)
    }

    /// Whether the strategy reads a numeric target property.
    pub fn uses_target_property(&self) -> bool {
        !matches!(self, Strategy::None)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown strategy {0:?} (expected none, greedy, highest-bidder or lowest-bidder)")]
pub struct UnknownStrategy(pub String);

impl FromStr for Strategy {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => Ok(Strategy::None),
            "greedy" => Ok(Strategy::Greedy),
            "highest-bidder" => Ok(Strategy::HighestBidder),
            "lowest-bidder" => Ok(Strategy::LowestBidder),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// The targets selected for one service. Empty means unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub service: String,
    pub targets: Vec<String>,
}

/// Final service → targets mapping, in candidate-model order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Distribution {
    assignments: Vec<Assignment>,
}

impl Distribution {
    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn targets_of(&self, service: &str) -> Option<&[String]> {
        self.assignments
            .iter()
            .find(|a| a.service == service)
            .map(|a| a.targets.as_slice())
    }

    /// Services left without any target.
    pub fn unassigned(&self) -> Vec<&str> {
        self.assignments
            .iter()
            .filter(|a| a.targets.is_empty())
            .map(|a| a.service.as_str())
            .collect()
    }

    /// Reuse the final distribution as a candidate model, e.g. to feed the
    /// port allocator with the targets actually chosen.
    pub fn into_candidates(self) -> CandidateModel {
        CandidateModel::from_unique(
            self.assignments
                .into_iter()
                .map(|a| CandidateEntry {
                    service: a.service,
                    targets: a.targets,
                })
                .collect(),
        )
    }
}

/// Reduce the candidate model to a final distribution.
///
/// `service_property` names the requirement drawn from a target (Greedy);
/// `target_property` names the capacity or bid of a target. Missing or
/// non-numeric values exclude the service or target from consideration.
pub fn distribute(
    strategy: Strategy,
    services: &[Service],
    targets: &[Target],
    candidates: &CandidateModel,
    service_property: &str,
    target_property: &str,
) -> Distribution {
    let choices = match strategy {
        Strategy::None => passthrough(candidates),
        Strategy::Greedy => {
            greedy(services, targets, candidates, service_property, target_property)
        }
        Strategy::HighestBidder => auction(targets, candidates, target_property, Bid::Highest),
        Strategy::LowestBidder => auction(targets, candidates, target_property, Bid::Lowest),
    };

    let assignments: Vec<Assignment> = candidates
        .entries()
        .iter()
        .zip(choices)
        .map(|(entry, chosen)| Assignment {
            service: entry.service.clone(),
            targets: chosen.into_iter().map(str::to_string).collect(),
        })
        .collect();

    let placed = assignments.iter().filter(|a| !a.targets.is_empty()).count();
    info!(
        strategy = %strategy,
        placed,
        unassigned = assignments.len() - placed,
        "distribution computed"
    );

    Distribution { assignments }
}

#[derive(Debug, Clone, Copy)]
enum Bid {
    Highest,
    Lowest,
}

/// Numeric target property per target name; the first target of a name wins.
fn target_values<'a>(targets: &'a [Target], property: &str) -> BTreeMap<&'a str, i64> {
    let mut values = BTreeMap::new();
    for target in targets {
        if let Some(value) = target.numeric_property(property) {
            values.entry(target.name.as_str()).or_insert(value);
        } else {
            debug!(target = %target.name, property, "target lacks numeric property");
        }
    }
    values
}

/// Pick the best `(target, value)`; ties go to the smaller target name.
fn pick<'a>(scored: impl Iterator<Item = (&'a str, i64)>, bid: Bid) -> Option<(&'a str, i64)> {
    scored.min_by(|a, b| {
        let by_value = match bid {
            Bid::Highest => b.1.cmp(&a.1),
            Bid::Lowest => a.1.cmp(&b.1),
        };
        by_value.then_with(|| a.0.cmp(b.0))
    })
}

fn passthrough(candidates: &CandidateModel) -> Vec<Vec<&str>> {
    candidates
        .entries()
        .iter()
        .map(|entry| {
            if entry.targets.is_empty() {
                warn!(service = %entry.service, "service has no candidate targets");
            }
            entry.targets.iter().map(String::as_str).collect()
        })
        .collect()
}

fn greedy<'a>(
    services: &[Service],
    targets: &[Target],
    candidates: &'a CandidateModel,
    service_property: &str,
    target_property: &str,
) -> Vec<Vec<&'a str>> {
    let mut residual = target_values(targets, target_property);
    let entries = candidates.entries();

    // Largest requirement first; equal requirements keep model order and
    // services without a requirement come last.
    let mut order: Vec<(usize, Option<i64>)> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let req = find_service(services, &e.service)
                .and_then(|s| s.numeric_property(service_property));
            (i, req)
        })
        .collect();
    order.sort_by_key(|&(_, req)| Reverse(req));

    let mut choices = vec![Vec::new(); entries.len()];

    for (i, req) in order {
        let entry = &entries[i];
        if entry.targets.is_empty() {
            warn!(service = %entry.service, "service has no candidate targets");
            continue;
        }
        let Some(req) = req else {
            warn!(
                service = %entry.service,
                property = service_property,
                "service lacks numeric requirement — left unassigned"
            );
            continue;
        };

        let eligible = entry.targets.iter().filter_map(|t| {
            let left = *residual.get(t.as_str())?;
            let after = left.checked_sub(req)?;
            (after >= 0).then_some((t.as_str(), left))
        });

        match pick(eligible, Bid::Highest) {
            Some((target, left)) => {
                if let Some(r) = residual.get_mut(target) {
                    *r = left - req;
                }
                debug!(
                    service = %entry.service,
                    target,
                    requirement = req,
                    residual = left - req,
                    "greedy placement"
                );
                choices[i] = vec![target];
            }
            None => {
                warn!(
                    service = %entry.service,
                    requirement = req,
                    "no candidate target has enough residual capacity — left unassigned"
                );
            }
        }
    }

    choices
}

fn auction<'a>(
    targets: &[Target],
    candidates: &'a CandidateModel,
    target_property: &str,
    bid: Bid,
) -> Vec<Vec<&'a str>> {
    let bids = target_values(targets, target_property);

    candidates
        .entries()
        .iter()
        .map(|entry| {
            if entry.targets.is_empty() {
                warn!(service = %entry.service, "service has no candidate targets");
                return Vec::new();
            }
            let offers = entry
                .targets
                .iter()
                .filter_map(|t| bids.get(t.as_str()).map(|&v| (t.as_str(), v)));
            match pick(offers, bid) {
                Some((target, value)) => {
                    debug!(service = %entry.service, target, bid = value, "auction won");
                    vec![target]
                }
                None => {
                    warn!(
                        service = %entry.service,
                        property = target_property,
                        "no candidate target carries a bid — left unassigned"
                    );
                    Vec::new()
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostplan_core::Property;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    fn make_service(name: &str, req: Option<&str>) -> Service {
        let properties = req
            .map(|r| vec![Property::new("req", r)])
            .unwrap_or_default();
        Service::new(name, properties)
    }

    fn make_target(name: &str, cap: &str) -> Target {
        Target::new(name, vec![Property::new("cap", cap)])
    }

    fn model(entries: &[(&str, &[&str])]) -> CandidateModel {
        CandidateModel::new(
            entries
                .iter()
                .map(|(s, ts)| CandidateEntry::new(*s, ts.iter().copied()))
                .collect(),
        )
        .unwrap()
    }

    fn run(
        strategy: Strategy,
        services: &[Service],
        targets: &[Target],
        cands: &CandidateModel,
    ) -> Distribution {
        distribute(strategy, services, targets, cands, "req", "cap")
    }

    #[test]
    fn parse_strategy_names() {
        assert_eq!("greedy".parse::<Strategy>().unwrap(), Strategy::Greedy);
        assert_eq!("highest-bidder".parse::<Strategy>().unwrap(), Strategy::HighestBidder);
        assert_eq!("Lowest_Bidder".parse::<Strategy>().unwrap(), Strategy::LowestBidder);
        assert_eq!("none".parse::<Strategy>().unwrap(), Strategy::None);
        assert!("random".parse::<Strategy>().is_err());
    }

    /// Buffer that collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn warnings_from(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn none_is_identity() {
        let cands = model(&[("A", &["Y", "X"]), ("B", &[])]);
        let dist = run(Strategy::None, &[], &[], &cands);
        assert_eq!(dist.targets_of("A").unwrap(), ["Y", "X"]);
        assert_eq!(dist.unassigned(), vec!["B"]);
    }

    #[test]
    fn every_strategy_warns_for_empty_candidates() {
        let targets = vec![make_target("X", "3")];
        let cands = model(&[("lonely", &[]), ("B", &["X"])]);

        for strategy in [
            Strategy::None,
            Strategy::Greedy,
            Strategy::HighestBidder,
            Strategy::LowestBidder,
        ] {
            let services = vec![make_service("lonely", Some("1")), make_service("B", Some("1"))];
            let mut dist = Distribution::default();
            let logs = warnings_from(|| dist = run(strategy, &services, &targets, &cands));

            assert_eq!(dist.unassigned(), vec!["lonely"], "{strategy}");
            assert_eq!(logs.matches("no candidate targets").count(), 1, "{strategy}: {logs}");
            assert!(logs.contains("lonely"), "{strategy}: {logs}");
        }
    }

    #[test]
    fn greedy_places_larger_requirement_first() {
        let services = vec![make_service("A", Some("2")), make_service("B", Some("5"))];
        let targets = vec![make_target("X", "4"), make_target("Y", "6")];
        let cands = model(&[("A", &["X", "Y"]), ("B", &["X", "Y"])]);

        let dist = run(Strategy::Greedy, &services, &targets, &cands);

        assert_eq!(dist.targets_of("A").unwrap(), ["X"]);
        assert_eq!(dist.targets_of("B").unwrap(), ["Y"]);
        // Output keeps model order.
        assert_eq!(dist.assignments()[0].service, "A");
    }

    #[test]
    fn greedy_skips_targets_that_would_overflow() {
        let services = vec![make_service("A", Some("5")), make_service("B", Some("4"))];
        let targets = vec![make_target("X", "3"), make_target("Y", "8")];
        let cands = model(&[("A", &["X", "Y"]), ("B", &["X", "Y"])]);

        let dist = run(Strategy::Greedy, &services, &targets, &cands);

        // A takes Y (8 → 3); B needs 4, X and Y both hold 3.
        assert_eq!(dist.targets_of("A").unwrap(), ["Y"]);
        assert!(dist.targets_of("B").unwrap().is_empty());
        assert_eq!(dist.unassigned(), vec!["B"]);
    }

    #[test]
    fn greedy_tie_goes_to_smaller_name() {
        let services = vec![make_service("A", Some("1"))];
        let targets = vec![make_target("b", "5"), make_target("a", "5")];
        let cands = model(&[("A", &["b", "a"])]);

        let dist = run(Strategy::Greedy, &services, &targets, &cands);
        assert_eq!(dist.targets_of("A").unwrap(), ["a"]);
    }

    #[test]
    fn greedy_excludes_missing_properties() {
        let services = vec![make_service("A", None), make_service("B", Some("1"))];
        let targets = vec![make_target("X", "many"), make_target("Y", "2")];
        let cands = model(&[("A", &["Y"]), ("B", &["X", "Y", "Z"])]);

        let dist = run(Strategy::Greedy, &services, &targets, &cands);

        assert!(dist.targets_of("A").unwrap().is_empty());
        assert_eq!(dist.targets_of("B").unwrap(), ["Y"]);
    }

    #[test]
    fn greedy_service_missing_from_services_model_is_unassigned() {
        let targets = vec![make_target("X", "10")];
        let cands = model(&[("ghost", &["X"])]);

        let dist = run(Strategy::Greedy, &[], &targets, &cands);
        assert_eq!(dist.unassigned(), vec!["ghost"]);
    }

    #[test]
    fn highest_bidder_picks_max_without_consuming() {
        let targets = vec![make_target("X", "10"), make_target("Y", "20"), make_target("Z", "20")];
        let cands = model(&[("A", &["X", "Z", "Y"]), ("B", &["Y", "X"]), ("C", &["X"])]);

        let dist = run(Strategy::HighestBidder, &[], &targets, &cands);

        assert_eq!(dist.targets_of("A").unwrap(), ["Y"]);
        assert_eq!(dist.targets_of("B").unwrap(), ["Y"]);
        assert_eq!(dist.targets_of("C").unwrap(), ["X"]);
    }

    #[test]
    fn lowest_bidder_picks_min() {
        let targets = vec![make_target("X", "10"), make_target("Y", "-3"), make_target("W", "-3")];
        let cands = model(&[("A", &["X", "Y", "W"]), ("B", &["X"])]);

        let dist = run(Strategy::LowestBidder, &[], &targets, &cands);

        assert_eq!(dist.targets_of("A").unwrap(), ["W"]);
        assert_eq!(dist.targets_of("B").unwrap(), ["X"]);
    }

    #[test]
    fn bidders_leave_empty_and_unbid_services_unassigned() {
        let targets = vec![Target::new("X", vec![])];
        let cands = model(&[("A", &[]), ("B", &["X"])]);

        for strategy in [Strategy::HighestBidder, Strategy::LowestBidder] {
            let dist = run(strategy, &[], &targets, &cands);
            assert_eq!(dist.unassigned(), vec!["A", "B"]);
        }
    }

    #[test]
    fn strategies_are_deterministic() {
        let services: Vec<_> = (0..6)
            .map(|i| make_service(&format!("s{i}"), Some(&(i % 3 + 1).to_string())))
            .collect();
        let targets = vec![make_target("p", "6"), make_target("q", "6"), make_target("r", "4")];
        let cands = model(&[
            ("s0", &["p", "q", "r"]),
            ("s1", &["q", "p"]),
            ("s2", &["r", "q"]),
            ("s3", &["p", "r"]),
            ("s4", &["q", "r", "p"]),
            ("s5", &["r"]),
        ]);

        for strategy in [Strategy::Greedy, Strategy::HighestBidder, Strategy::LowestBidder] {
            let first = run(strategy, &services, &targets, &cands);
            let second = run(strategy, &services, &targets, &cands);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn distribution_converts_back_to_candidates() {
        let targets = vec![make_target("X", "1")];
        let cands = model(&[("A", &["X"]), ("B", &[])]);

        let back = run(Strategy::HighestBidder, &[], &targets, &cands).into_candidates();
        assert_eq!(back, cands);
    }

    #[test]
    fn distribution_serializes_like_candidate_model() {
        let cands = model(&[("A", &["X"])]);
        let dist = run(Strategy::None, &[], &[], &cands);
        let json = serde_json::to_string(&dist).unwrap();
        assert_eq!(json, r#"[{"service":"A","targets":["X"]}]"#);
        assert_eq!(CandidateModel::from_json(&json).unwrap(), cands);
    }
}
