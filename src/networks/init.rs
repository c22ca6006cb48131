use tch::nn;

/// Initialiser applied to every linear layer of a var store.
pub type InitFn = fn(&nn::VarStore);

/// Yields `(weight, bias)` for every 2-D weight, i.e. every linear layer.
fn linear_layers(vs: &nn::VarStore) -> Vec<(tch::Tensor, Option<tch::Tensor>)> {
    let variables = vs.variables();
    let mut layers = Vec::new();
    for (name, weight) in variables.iter() {
        let Some(prefix) = name.strip_suffix("weight") else {
            continue;
        };
        if weight.dim() != 2 {
            continue;
        }
        let bias = variables
            .get(&format!("{prefix}bias"))
            .map(|b| b.shallow_clone());
        layers.push((weight.shallow_clone(), bias));
    }
    layers
}

/// Xavier-uniform weights and a constant 0.01 bias.
pub fn init_weights(vs: &nn::VarStore) {
    tch::no_grad(|| {
        for (mut weight, bias) in linear_layers(vs) {
            let size = weight.size();
            let (fan_out, fan_in) = (size[0] as f64, size[1] as f64);
            let bound = (6.0 / (fan_in + fan_out)).sqrt();
            let _ = weight.uniform_(-bound, bound);
            if let Some(mut bias) = bias {
                let _ = bias.fill_(0.01);
            }
        }
    });
}

/// Small uniform weights and biases in `[-0.001, 0.001]`.
pub fn uniform_init_weights(vs: &nn::VarStore) {
    tch::no_grad(|| {
        for (mut weight, bias) in linear_layers(vs) {
            let _ = weight.uniform_(-0.001, 0.001);
            if let Some(mut bias) = bias {
                let _ = bias.uniform_(-0.001, 0.001);
            }
        }
    });
}

/// Xavier-normal in place on one weight matrix.
pub fn xavier_normal(weight: &tch::Tensor) {
    let size = weight.size();
    let (fan_out, fan_in) = (size[0] as f64, size[1] as f64);
    let std = (2.0 / (fan_in + fan_out)).sqrt();
    let mut weight = weight.shallow_clone();
    tch::no_grad(|| {
        let _ = weight.normal_(0.0, std);
    });
}
