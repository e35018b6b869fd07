use std::path::Path;

use hostplan_placement::{CandidateModel, TargetIndex};

pub fn index(distribution: &Path) -> anyhow::Result<()> {
    let candidates = CandidateModel::load(distribution)?;
    print!("{}", TargetIndex::build(&candidates));
    Ok(())
}
