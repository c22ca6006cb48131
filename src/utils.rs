use std::path::Path;

use tch::{Device, Tensor};

use crate::error::{Result, RlError};

pub trait ToTensor {
    fn to_tensor(&self) -> Tensor;
}

impl<const N: usize> ToTensor for [f32; N] {
    fn to_tensor(&self) -> Tensor {
        Tensor::from_slice(self)
    }
}

impl ToTensor for [f32] {
    fn to_tensor(&self) -> Tensor {
        Tensor::from_slice(self)
    }
}

impl ToTensor for Vec<f32> {
    fn to_tensor(&self) -> Tensor {
        Tensor::from_slice(self)
    }
}

impl ToTensor for Tensor {
    fn to_tensor(&self) -> Tensor {
        self.shallow_clone()
    }
}

/// CUDA when libtorch sees a GPU, otherwise CPU.
pub fn default_device() -> Device {
    Device::cuda_if_available()
}

/// Views `state` as `(batch, dim)`; a 1-D state becomes a batch of one.
pub fn as_batch(state: &Tensor) -> Tensor {
    match state.dim() {
        0 => state.view([1, 1]),
        1 => state.unsqueeze(0),
        _ => state.view([state.size()[0], -1]),
    }
}

pub fn plot_rewards(rewards: &[f32], filename: impl AsRef<Path>, title: &str) -> Result<()> {
    use plotters::prelude::*;

    let filename = filename.as_ref();
    let plot_err = |e: &dyn std::fmt::Display| RlError::Plot(e.to_string());

    let root = BitMapBackend::new(filename, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(&e))?;

    // 避免空图或全为 0
    let max_reward = rewards.iter().cloned().fold(f32::MIN, f32::max).max(1.0);
    let min_reward = rewards.iter().cloned().fold(0.0, f32::min);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 32).into_font())
        .margin(30)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..rewards.len().max(1), min_reward..max_reward)
        .map_err(|e| plot_err(&e))?;

    chart
        .configure_mesh()
        .x_desc("Episode")
        .y_desc("Total Reward")
        .axis_desc_style(("sans-serif", 22))
        .label_style(("sans-serif", 18))
        .light_line_style(&WHITE.mix(0.3))
        .draw()
        .map_err(|e| plot_err(&e))?;

    chart
        .draw_series(LineSeries::new(
            rewards.iter().enumerate().map(|(i, r)| (i, *r)),
            &BLUE,
        ))
        .map_err(|e| plot_err(&e))?
        .label("Reward")
        .legend(|(x, y)| PathElement::new([(x, y), (x + 20, y)], &BLUE));

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .label_font(("sans-serif", 18))
        .draw()
        .map_err(|e| plot_err(&e))?;

    root.present().map_err(|e| plot_err(&e))?;
    tracing::info!(path = %filename.display(), "saved training plot");
    Ok(())
}
