pub mod actor_networks;
pub mod ensemble;
pub mod init;
pub mod mlp;
pub mod target;
pub mod twin_critic;
pub mod value_networks;

pub use actor_networks::VanillaActorNetwork;
pub use ensemble::ensemble_forward;
pub use init::{InitFn, init_weights, uniform_init_weights, xavier_normal};
pub use mlp::{Activation, ConvBlockConfig, MlpConfig, ResidualWrapper, conv_block, mlp_block};
pub use target::{update_target_network, update_target_networks};
pub use twin_critic::TwinCritic;
pub use value_networks::{DuelingValueNetwork, ValueNetwork, VanillaValueNetwork};

use tch::nn::{self, OptimizerConfig};

use crate::error::Result;

/// AdamW with AMSGrad, the optimizer every learner in this crate uses.
pub fn adamw(vs: &nn::VarStore, learning_rate: f64) -> Result<nn::Optimizer> {
    let optimizer = nn::AdamW {
        amsgrad: true,
        ..Default::default()
    }
    .build(vs, learning_rate)?;
    Ok(optimizer)
}
