use std::collections::BTreeMap;
use std::path::PathBuf;

use hostplan_core::PlanConfig;
use hostplan_core::model::load_services;
use hostplan_placement::CandidateModel;
use hostplan_ports::{PortPool, PortRange, assign_ports};
use serde::Serialize;
use tracing::info;

pub struct PortsArgs {
    pub services: PathBuf,
    pub distribution: PathBuf,
    pub state: Option<PathBuf>,
    pub min_port: Option<u16>,
    pub max_port: Option<u16>,
    pub mode_property: Option<String>,
}

/// What `hostplan ports` prints: this run's ports plus the full pool.
#[derive(Serialize)]
struct PortsReport<'a> {
    ports: &'a BTreeMap<String, u16>,
    configuration: &'a PortPool,
}

/// Range given by flags or config, if any bound was set explicitly.
fn explicit_range(config: &PlanConfig, args: &PortsArgs) -> anyhow::Result<Option<PortRange>> {
    let configured = config.ports.as_ref();
    let min = args.min_port.or(configured.and_then(|p| p.min_port));
    let max = args.max_port.or(configured.and_then(|p| p.max_port));
    if min.is_none() && max.is_none() {
        return Ok(None);
    }
    let (default_min, default_max) = config.port_range();
    Ok(Some(PortRange::new(
        min.unwrap_or(default_min),
        max.unwrap_or(default_max),
    )?))
}

/// Load the prior pool from the state file, or start empty without one.
fn open_pool(config: &PlanConfig, args: &PortsArgs) -> anyhow::Result<PortPool> {
    let range = explicit_range(config, args)?;
    let prior = match &args.state {
        Some(path) if path.exists() => Some(PortPool::load_file(path)?),
        _ => None,
    };
    Ok(match (prior, range) {
        (Some(mut pool), Some(range)) => {
            pool.set_range(range);
            pool
        }
        (Some(pool), None) => pool,
        (None, range) => PortPool::new(range.unwrap_or_default()),
    })
}

fn run(config: &PlanConfig, args: &PortsArgs) -> anyhow::Result<String> {
    let mode_property = args
        .mode_property
        .as_deref()
        .unwrap_or(config.mode_property());
    let services = load_services(&args.services)?;
    let candidates = CandidateModel::load(&args.distribution)?;
    let mut pool = open_pool(config, args)?;

    let result = assign_ports(&mut pool, &services, &candidates, mode_property);

    if let Some(path) = &args.state {
        pool.persist_file(path)?;
        info!(path = %path.display(), "port state written");
    }

    let report = PortsReport {
        ports: &result.ports,
        configuration: &pool,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

pub fn ports(config: &PlanConfig, args: &PortsArgs) -> anyhow::Result<()> {
    println!("{}", run(config, args)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostplan_core::config::PortsConfig;

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn make_args(dir: &tempfile::TempDir, candidates: &str) -> PortsArgs {
        PortsArgs {
            services: write(
                dir,
                "services.json",
                r#"[{"name": "A", "properties": [{"name": "portAssign", "value": "shared"}]},
                    {"name": "D", "properties": [{"name": "portAssign", "value": "shared"}]}]"#,
            ),
            distribution: write(dir, "candidates.json", candidates),
            state: Some(dir.path().join("ports.json")),
            min_port: Some(9000),
            max_port: Some(9002),
            mode_property: None,
        }
    }

    #[test]
    fn state_file_is_created_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let args = make_args(&dir, r#"[{"service": "A", "targets": ["X"]}]"#);

        let first = run(&PlanConfig::default(), &args).unwrap();
        assert!(args.state.as_ref().unwrap().exists());
        let second = run(&PlanConfig::default(), &args).unwrap();

        assert_eq!(first, second);
        let report: serde_json::Value = serde_json::from_str(&first).unwrap();
        assert_eq!(report["ports"]["A"], 9000);
    }

    #[test]
    fn obsolete_port_handed_to_new_service() {
        let dir = tempfile::tempdir().unwrap();
        let args = make_args(&dir, r#"[{"service": "A", "targets": ["X"]}]"#);
        run(&PlanConfig::default(), &args).unwrap();

        let args = make_args(&dir, r#"[{"service": "D", "targets": ["X"]}]"#);
        let report: serde_json::Value =
            serde_json::from_str(&run(&PlanConfig::default(), &args).unwrap()).unwrap();

        assert_eq!(report["ports"]["D"], 9000);
        assert!(report["configuration"]["shared"]["reservations"].get("A").is_none());
    }

    #[test]
    fn range_comes_from_config_when_flags_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = make_args(&dir, "[]");
        args.min_port = None;
        args.max_port = None;
        args.state = None;
        let config = PlanConfig {
            ports: Some(PortsConfig {
                min_port: Some(7000),
                max_port: Some(7010),
                mode_property: None,
            }),
            distribution: None,
        };

        let pool = open_pool(&config, &args).unwrap();
        assert_eq!(pool.range(), PortRange::new(7000, 7010).unwrap());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = make_args(&dir, "[]");
        args.min_port = Some(9100);
        assert!(open_pool(&PlanConfig::default(), &args).is_err());
    }

    #[test]
    fn malformed_state_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let args = make_args(&dir, r#"[{"service": "A", "targets": ["X"]}]"#);
        write(&dir, "ports.json", "not json");

        assert!(run(&PlanConfig::default(), &args).is_err());
    }
}
