use tch::nn::{self, ModuleT};
use tch::Tensor;

use super::mlp::{Activation, MlpConfig, mlp_block};

/// MLP whose softmax output is a distribution over discrete actions.
#[derive(Debug)]
pub struct VanillaActorNetwork {
    model: nn::SequentialT,
}

impl VanillaActorNetwork {
    pub fn new(path: &nn::Path, input_dim: i64, hidden_dims: &[i64], output_dim: i64) -> Self {
        let config = MlpConfig::new(input_dim, hidden_dims, output_dim)
            .with_last_activation(Activation::Softmax);
        Self {
            model: mlp_block(path, &config),
        }
    }
}

impl ModuleT for VanillaActorNetwork {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        self.model.forward_t(xs, train)
    }
}
