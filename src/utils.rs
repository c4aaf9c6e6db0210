use std::path::Path;

use tch::{Tensor, nn};

use crate::error::{Error, Result};

pub trait ToTensor {
    /// Builds a batch of one: `[1, ..shape]`.
    fn to_tensor(&self, shape: &[usize]) -> Tensor;
}

impl ToTensor for [f32] {
    fn to_tensor(&self, shape: &[usize]) -> Tensor {
        let dims: Vec<i64> = std::iter::once(1)
            .chain(shape.iter().map(|&d| d as i64))
            .collect();
        Tensor::from_slice(self).view(dims.as_slice())
    }
}

/// Polyak averaging: θ′ ← τθ + (1 − τ)θ′ for every variable of `target`.
pub fn soft_update(target: &nn::VarStore, source: &nn::VarStore, tau: f64) -> Result<()> {
    let source_vars = source.variables();
    tch::no_grad(|| -> Result<()> {
        for (name, mut target_var) in target.variables() {
            let source_var = source_vars
                .get(&name)
                .ok_or_else(|| Error::MissingVariable(name.clone()))?;
            let mixed = source_var * tau + &target_var * (1.0 - tau);
            target_var.copy_(&mixed);
        }
        Ok(())
    })
}

pub fn plot_rewards(rewards: &[f32], filename: &Path, title: &str) -> Result<()> {
    use plotters::prelude::*;

    let plot_err = |e: &dyn std::fmt::Display| Error::Plot(e.to_string());

    let root = BitMapBackend::new(filename, (800, 600)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_err(&e))?;

    // 奖励可能为负，按实际范围作图
    let min_reward = rewards.iter().cloned().fold(f32::MAX, f32::min).min(0.0);
    let max_reward = rewards.iter().cloned().fold(f32::MIN, f32::max).max(min_reward + 1.0);

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
    log::info!("Saved training plot to {}", filename.display());
    Ok(())
}
