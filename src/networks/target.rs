//! Target-network updates: `target = tau * source + (1 - tau) * target`.

use tch::nn;

use crate::error::{Result, RlError};

pub fn update_target_network(
    target: &mut nn::VarStore,
    source: &nn::VarStore,
    tau: f64,
) -> Result<()> {
    if !(0.0..=1.0).contains(&tau) {
        return Err(RlError::Unsupported(format!("tau must lie in [0, 1], got {tau}")));
    }
    if tau == 1.0 {
        target.copy(source)?;
        return Ok(());
    }

    let source_variables = source.variables();
    let mut target_variables = target.variables();
    if let Some(missing) = source_variables
        .keys()
        .find(|name| !target_variables.contains_key(*name))
    {
        return Err(RlError::Unsupported(format!(
            "target network has no parameter {missing}"
        )));
    }

    tch::no_grad(|| {
        for (name, source_value) in source_variables.iter() {
            if let Some(target_value) = target_variables.get_mut(name) {
                let blended = source_value * tau + &*target_value * (1.0 - tau);
                target_value.copy_(&blended);
            }
        }
    });
    Ok(())
}

pub fn update_target_networks(
    targets: &mut [nn::VarStore],
    sources: &[nn::VarStore],
    tau: f64,
) -> Result<()> {
    if targets.len() != sources.len() {
        return Err(RlError::DimensionMismatch {
            expected: sources.len() as i64,
            actual: targets.len() as i64,
        });
    }
    for (target, source) in targets.iter_mut().zip(sources) {
        update_target_network(target, source, tau)?;
    }
    Ok(())
}
