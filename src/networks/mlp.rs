use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tch::nn::{self, ModuleT};
use tch::{Kind, Tensor};

use crate::error::{Result, RlError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Tanh,
    Relu,
    LeakyRelu,
    Linear,
    Sigmoid,
    Softplus,
    Softmax,
}

impl Activation {
    pub fn apply(self, xs: &Tensor) -> Tensor {
        match self {
            Activation::Tanh => xs.tanh(),
            Activation::Relu => xs.relu(),
            Activation::LeakyRelu => xs.maximum(&(xs * 0.01)),
            Activation::Linear => xs.shallow_clone(),
            Activation::Sigmoid => xs.sigmoid(),
            // log(1 + e^x) without overflow for large x
            Activation::Softplus => xs.relu() + (-xs.abs()).exp().log1p(),
            Activation::Softmax => xs.softmax(-1, Kind::Float),
        }
    }
}

impl FromStr for Activation {
    type Err = RlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::Relu),
            "leaky_relu" => Ok(Activation::LeakyRelu),
            "linear" => Ok(Activation::Linear),
            "sigmoid" => Ok(Activation::Sigmoid),
            "softplus" => Ok(Activation::Softplus),
            "softmax" => Ok(Activation::Softmax),
            other => Err(RlError::Unsupported(format!("unknown activation {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpConfig {
    pub input_dim: i64,
    pub hidden_dims: Vec<i64>,
    pub output_dim: i64,
    pub use_batch_norm: bool,
    pub use_layer_norm: bool,
    pub hidden_activation: Activation,
    pub last_activation: Option<Activation>,
    /// Dropout is only active when the block runs with `train = true`.
    pub dropout_ratio: f64,
    pub use_skip_connections: bool,
}

impl MlpConfig {
    pub fn new(input_dim: i64, hidden_dims: &[i64], output_dim: i64) -> Self {
        Self {
            input_dim,
            hidden_dims: hidden_dims.to_vec(),
            output_dim,
            use_batch_norm: false,
            use_layer_norm: false,
            hidden_activation: Activation::Relu,
            last_activation: None,
            dropout_ratio: 0.0,
            use_skip_connections: false,
        }
    }

    pub fn with_last_activation(mut self, activation: Activation) -> Self {
        self.last_activation = Some(activation);
        self
    }
}

/// `x + f(x)` around an inner block whose input and output sizes agree.
#[derive(Debug)]
pub struct ResidualWrapper {
    inner: nn::SequentialT,
}

impl ResidualWrapper {
    pub fn new(inner: nn::SequentialT) -> Self {
        Self { inner }
    }
}

impl ModuleT for ResidualWrapper {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        xs + self.inner.forward_t(xs, train)
    }
}

fn maybe_residual(
    block: nn::SequentialT,
    in_dim: i64,
    out_dim: i64,
    use_skip_connections: bool,
) -> Box<dyn ModuleT> {
    if use_skip_connections {
        if in_dim == out_dim {
            return Box::new(ResidualWrapper::new(block));
        }
        tracing::warn!(
            in_dim,
            out_dim,
            "skip connections enabled but layer dims differ, no skip connection added"
        );
    }
    Box::new(block)
}

#[derive(Debug)]
struct LayerBlock(Box<dyn ModuleT>);

impl ModuleT for LayerBlock {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Tensor {
        self.0.forward_t(xs, train)
    }
}

/// Builds `[input] + hidden + [output]` as a stack of linear layers.
///
/// Each hidden layer is Linear, then optional LayerNorm and Dropout, the
/// hidden activation, then optional BatchNorm. The last layer is Linear with
/// an optional activation.
pub fn mlp_block(path: &nn::Path, config: &MlpConfig) -> nn::SequentialT {
    let mut dims = Vec::with_capacity(config.hidden_dims.len() + 2);
    dims.push(config.input_dim);
    dims.extend_from_slice(&config.hidden_dims);
    dims.push(config.output_dim);

    let mut layers = nn::seq_t();
    for i in 0..dims.len() - 2 {
        let (in_dim, out_dim) = (dims[i], dims[i + 1]);
        let p = path / format!("layer_{i}");
        let mut layer =
            nn::seq_t().add(nn::linear(&p / "linear", in_dim, out_dim, Default::default()));
        if config.use_layer_norm {
            layer = layer.add(nn::layer_norm(&p / "layer_norm", vec![out_dim], Default::default()));
        }
        if config.dropout_ratio > 0.0 {
            let ratio = config.dropout_ratio;
            layer = layer.add_fn_t(move |xs, train| xs.dropout(ratio, train));
        }
        let activation = config.hidden_activation;
        layer = layer.add_fn(move |xs| activation.apply(xs));
        if config.use_batch_norm {
            layer = layer.add(nn::batch_norm1d(&p / "batch_norm", out_dim, Default::default()));
        }
        layers = layers.add(LayerBlock(maybe_residual(
            layer,
            in_dim,
            out_dim,
            config.use_skip_connections,
        )));
    }

    let (in_dim, out_dim) = (dims[dims.len() - 2], dims[dims.len() - 1]);
    let p = path / "last_layer";
    let mut last_layer =
        nn::seq_t().add(nn::linear(&p / "linear", in_dim, out_dim, Default::default()));
    if let Some(activation) = config.last_activation {
        last_layer = last_layer.add_fn(move |xs| activation.apply(xs));
    }
    layers.add(LayerBlock(maybe_residual(
        last_layer,
        in_dim,
        out_dim,
        config.use_skip_connections,
    )))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvBlockConfig {
    pub input_channels_count: i64,
    pub output_channels_list: Vec<i64>,
    pub kernel_sizes: Vec<i64>,
    pub strides: Vec<i64>,
    pub paddings: Vec<i64>,
    pub use_batch_norm: bool,
}

/// Conv2d + optional BatchNorm2d + ReLU per layer.
/// Inputs are `(batch, channels, height, width)`.
pub fn conv_block(path: &nn::Path, config: &ConvBlockConfig) -> Result<nn::SequentialT> {
    let layer_count = config.output_channels_list.len();
    for list in [&config.kernel_sizes, &config.strides, &config.paddings] {
        if list.len() != layer_count {
            return Err(RlError::DimensionMismatch {
                expected: layer_count as i64,
                actual: list.len() as i64,
            });
        }
    }

    let mut layers = nn::seq_t();
    let mut in_channels = config.input_channels_count;
    for (i, &out_channels) in config.output_channels_list.iter().enumerate() {
        let p = path / format!("conv_{i}");
        let conv_config = nn::ConvConfig {
            stride: config.strides[i],
            padding: config.paddings[i],
            ..Default::default()
        };
        layers = layers.add(nn::conv2d(
            &p / "conv",
            in_channels,
            out_channels,
            config.kernel_sizes[i],
            conv_config,
        ));
        if config.use_batch_norm && in_channels > 1 {
            layers = layers.add(nn::batch_norm2d(
                &p / "batch_norm",
                out_channels,
                Default::default(),
            ));
        }
        layers = layers.add_fn(|xs| xs.relu());
        in_channels = out_channels;
    }
    Ok(layers)
}
