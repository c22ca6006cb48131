//! Ridge regression with an intercept, updated incrementally.
//!
//! The design matrix is augmented with a leading column of ones, so a model
//! over `feature_dim` inputs keeps `feature_dim + 1` coefficients. The
//! inverse Gram matrix is maintained with Sherman–Morrison rank-one updates,
//! which also gives the confidence width `sqrt(xᵀ A⁻¹ x)` used by UCB-style
//! exploration.

use std::fmt;

use tch::nn::Module;
use tch::{Device, Kind, Tensor};

use crate::error::{Result, RlError};

pub struct LinearRegression {
    feature_dim: i64,
    l2_reg_lambda: f64,
    a: Tensor,
    a_inv: Tensor,
    b: Tensor,
    coefs: Tensor,
}

impl LinearRegression {
    pub fn new(feature_dim: i64, l2_reg_lambda: f64, device: Device) -> Result<Self> {
        if l2_reg_lambda <= 0.0 {
            return Err(RlError::Unsupported(format!(
                "l2_reg_lambda must be positive, got {l2_reg_lambda}"
            )));
        }
        let dim = feature_dim + 1;
        let options = (Kind::Float, device);
        Ok(Self {
            feature_dim,
            l2_reg_lambda,
            a: Tensor::eye(dim, options) * l2_reg_lambda,
            a_inv: Tensor::eye(dim, options) / l2_reg_lambda,
            b: Tensor::zeros([dim], options),
            coefs: Tensor::zeros([dim], options),
        })
    }

    pub fn feature_dim(&self) -> i64 {
        self.feature_dim
    }

    pub fn coefs(&self) -> &Tensor {
        &self.coefs
    }

    pub fn a(&self) -> &Tensor {
        &self.a
    }

    pub fn a_inv(&self) -> &Tensor {
        &self.a_inv
    }

    pub fn b(&self) -> &Tensor {
        &self.b
    }

    fn check_features(&self, x: &Tensor) -> Result<()> {
        let actual = x.size().last().copied().unwrap_or(0);
        if actual != self.feature_dim {
            return Err(RlError::DimensionMismatch {
                expected: self.feature_dim,
                actual,
            });
        }
        Ok(())
    }

    /// Prepends a column of ones along the last axis.
    pub fn append_ones(x: &Tensor) -> Tensor {
        let mut shape = x.size();
        if let Some(last) = shape.last_mut() {
            *last = 1;
        }
        let ones = Tensor::ones(shape.as_slice(), (x.kind(), x.device()));
        Tensor::cat(&[ones, x.shallow_clone()], -1)
    }

    /// Folds a weighted batch into the sufficient statistics.
    ///
    /// `x` is `(batch, feature_dim)`, `y` and `weight` are `(batch,)`.
    pub fn learn_batch(&mut self, x: &Tensor, y: &Tensor, weight: &Tensor) -> Result<()> {
        self.check_features(x)?;
        let device = self.a.device();
        let x = Self::append_ones(&x.detach().to_kind(Kind::Float).to_device(device));
        let y = y.detach().to_kind(Kind::Float).to_device(device).view([-1]);
        let weight = weight
            .detach()
            .to_kind(Kind::Float)
            .to_device(self.a.device())
            .view([-1]);
        let batch_size = x.size()[0];
        if y.size()[0] != batch_size || weight.size()[0] != batch_size {
            return Err(RlError::DimensionMismatch {
                expected: batch_size,
                actual: y.size()[0].min(weight.size()[0]),
            });
        }
        // The rank-one updates of A⁻¹ below only hold for w >= 0.
        if batch_size > 0 && weight.min().double_value(&[]) < 0.0 {
            return Err(RlError::Unsupported(
                "linear regression does not accept negative sample weights".into(),
            ));
        }

        let weighted_x = &x * weight.unsqueeze(1);
        self.a += weighted_x.transpose(0, 1).matmul(&x);
        self.b += weighted_x.transpose(0, 1).matmul(&y);

        for row in 0..batch_size {
            let w = weight.double_value(&[row]);
            if w == 0.0 {
                continue;
            }
            let x_row = x.get(row);
            let u = self.a_inv.mv(&x_row);
            let denominator = 1.0 + w * x_row.dot(&u).double_value(&[]);
            self.a_inv -= u.outer(&u) * (w / denominator);
        }
        self.coefs = self.a_inv.mv(&self.b);
        tracing::debug!(batch_size, "linear regression updated");
        Ok(())
    }

    /// `sqrt([1, x]ᵀ A⁻¹ [1, x])` for any leading batch shape.
    pub fn calculate_sigma(&self, x: &Tensor) -> Result<Tensor> {
        self.check_features(x)?;
        let x = Self::append_ones(&x.to_kind(Kind::Float).to_device(self.a.device()));
        let quadratic =
            (x.matmul(&self.a_inv) * &x).sum_dim_intlist(Some(&[-1i64][..]), false, Kind::Float);
        Ok(quadratic.clamp_min(0.0).sqrt())
    }

    /// Refreshes `A⁻¹` from `A` directly, discarding accumulated rounding.
    pub fn recompute_inverse(&mut self) {
        self.a_inv = self.a.inverse();
        self.coefs = self.a_inv.mv(&self.b);
    }
}

impl Module for LinearRegression {
    /// `[1, x] · coefs` over the last axis.
    fn forward(&self, xs: &Tensor) -> Tensor {
        let xs = xs.to_kind(Kind::Float).to_device(self.coefs.device());
        Self::append_ones(&xs).matmul(&self.coefs)
    }
}

impl fmt::Debug for LinearRegression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinearRegression")
            .field("feature_dim", &self.feature_dim)
            .field("l2_reg_lambda", &self.l2_reg_lambda)
            .finish()
    }
}

/// Confidence width of value estimates, per action.
pub trait UncertaintyModel {
    /// `(batch, n, d)` features to `(batch, n)` widths.
    fn sigma(&self, features: &Tensor) -> Result<Tensor>;
}

/// One regression per action, evaluated together.
#[derive(Debug)]
pub struct LinearRegressionEnsemble {
    models: Vec<LinearRegression>,
}

impl LinearRegressionEnsemble {
    pub fn new(
        ensemble_size: i64,
        feature_dim: i64,
        l2_reg_lambda: f64,
        device: Device,
    ) -> Result<Self> {
        let models = (0..ensemble_size)
            .map(|_| LinearRegression::new(feature_dim, l2_reg_lambda, device))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { models })
    }

    pub fn models(&self) -> &[LinearRegression] {
        &self.models
    }

    pub fn models_mut(&mut self) -> &mut [LinearRegression] {
        &mut self.models
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    fn check_features(&self, features: &Tensor) -> Result<()> {
        let size = features.size();
        if size.len() != 3 || size[1] != self.models.len() as i64 {
            return Err(RlError::DimensionMismatch {
                expected: self.models.len() as i64,
                actual: size.get(1).copied().unwrap_or(0),
            });
        }
        Ok(())
    }

    /// `(n, feature_dim + 1)` stacked coefficients.
    fn stacked_coefs(&self) -> Tensor {
        let coefs: Vec<Tensor> = self.models.iter().map(|m| m.coefs().shallow_clone()).collect();
        Tensor::stack(&coefs, 0)
    }

    /// Batched forward: `(batch, n, d)` features to `(batch, n)` values,
    /// model `i` scoring slice `i`.
    pub fn forward(&self, features: &Tensor) -> Result<Tensor> {
        self.check_features(features)?;
        let coefs = self.stacked_coefs();
        let features = features.to_kind(Kind::Float).to_device(coefs.device());
        let x = LinearRegression::append_ones(&features);
        Ok((x * coefs.unsqueeze(0)).sum_dim_intlist(Some(&[-1i64][..]), false, Kind::Float))
    }
}

impl UncertaintyModel for LinearRegressionEnsemble {
    fn sigma(&self, features: &Tensor) -> Result<Tensor> {
        self.check_features(features)?;
        let a_inv: Vec<Tensor> = self.models.iter().map(|m| m.a_inv().shallow_clone()).collect();
        // (n, d+1, d+1)
        let a_inv = Tensor::stack(&a_inv, 0);
        let features = features.to_kind(Kind::Float).to_device(a_inv.device());
        let x = LinearRegression::append_ones(&features);
        // (batch, n, 1, d+1) @ (n, d+1, d+1) -> (batch, n, 1, d+1)
        let projected = x.unsqueeze(2).matmul(&a_inv).squeeze_dim(2);
        let quadratic = (projected * &x).sum_dim_intlist(Some(&[-1i64][..]), false, Kind::Float);
        Ok(quadratic.clamp_min(0.0).sqrt())
    }
}
