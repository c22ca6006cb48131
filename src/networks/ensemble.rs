use tch::nn::ModuleT;
use tch::Tensor;

use crate::error::{Result, RlError};

/// Runs model `i` on `features[:, i, :]`.
///
/// `features` is `(batch, ensemble_size, feature_dim)`; each model must
/// produce one value per row. Returns `(batch, ensemble_size)`.
pub fn ensemble_forward<M: ModuleT>(models: &[M], features: &Tensor) -> Result<Tensor> {
    let size = features.size();
    if size.len() != 3 {
        return Err(RlError::DimensionMismatch {
            expected: 3,
            actual: size.len() as i64,
        });
    }
    if size[1] != models.len() as i64 {
        return Err(RlError::DimensionMismatch {
            expected: models.len() as i64,
            actual: size[1],
        });
    }
    let batch_size = size[0];
    let values: Vec<Tensor> = models
        .iter()
        .enumerate()
        .map(|(i, model)| {
            model
                .forward_t(&features.select(1, i as i64), false)
                .view([batch_size])
        })
        .collect();
    Ok(Tensor::stack(&values, 1))
}
