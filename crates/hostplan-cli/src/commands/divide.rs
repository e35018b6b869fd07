use std::path::PathBuf;

use anyhow::bail;
use hostplan_core::PlanConfig;
use hostplan_core::model::{load_services, load_targets};
use hostplan_placement::{CandidateModel, Distribution, Strategy, distribute};

pub struct DivideArgs {
    pub services: PathBuf,
    pub infrastructure: PathBuf,
    pub distribution: PathBuf,
    pub strategy: Option<Strategy>,
    pub service_property: Option<String>,
    pub target_property: Option<String>,
}

/// Strategy and property names after applying flags over the config file.
#[derive(Debug, PartialEq, Eq)]
struct Resolved {
    strategy: Strategy,
    service_property: String,
    target_property: String,
}

fn resolve(config: &PlanConfig, args: &DivideArgs) -> anyhow::Result<Resolved> {
    let strategy = match (args.strategy, config.strategy()) {
        (Some(s), _) => s,
        (None, Some(name)) => name.parse()?,
        (None, None) => Strategy::None,
    };
    let service_property = args
        .service_property
        .as_deref()
        .or(config.service_property())
        .unwrap_or_default()
        .to_string();
    let target_property = args
        .target_property
        .as_deref()
        .or(config.target_property())
        .unwrap_or_default()
        .to_string();

    if strategy.uses_service_property() && service_property.is_empty() {
        bail!("strategy {strategy} needs --service-property");
    }
    if strategy.uses_target_property() && target_property.is_empty() {
        bail!("strategy {strategy} needs --target-property");
    }

    Ok(Resolved {
        strategy,
        service_property,
        target_property,
    })
}

fn run(config: &PlanConfig, args: &DivideArgs) -> anyhow::Result<Distribution> {
    let resolved = resolve(config, args)?;
    let services = load_services(&args.services)?;
    let targets = load_targets(&args.infrastructure)?;
    let candidates = CandidateModel::load(&args.distribution)?;

    Ok(distribute(
        resolved.strategy,
        &services,
        &targets,
        &candidates,
        &resolved.service_property,
        &resolved.target_property,
    ))
}

pub fn divide(config: &PlanConfig, args: &DivideArgs) -> anyhow::Result<()> {
    let distribution = run(config, args)?;
    println!("{}", serde_json::to_string_pretty(&distribution)?);
    Ok(())
}
