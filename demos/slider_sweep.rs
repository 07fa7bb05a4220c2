//! Simulated slider session
//!
//! Sweeps the measurement duration and window position the way a user would,
//! then prints the confound-controlled regression and a JSON snapshot of the
//! last result.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example slider_sweep -- flowspec.toml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use flowspec::prelude::*;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => EngineConfig::from_file(&path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::interactive(),
    };

    let mut store = ParameterStore::new();
    let mut pipeline = Pipeline::new(config);
    let mut last = None;

    info!("Sweeping duration and window position...");
    for step in 0..=20 {
        let x = step as f64 / 20.0;
        store.set_duration(0.1 + 0.8 * x);
        let state = store.set_window(0.15 + 0.7 * (1.0 - x), store.state().window_size_norm);

        let update = pipeline
            .run_and_record(&state)
            .context("Pipeline run failed")?;
        let fit = if update.result.fit.is_fallback() {
            "fallback"
        } else {
            "fitted"
        };
        info!(
            "  dt = {:.2}  window = [{:.2}, {:.2}]  T_eff = {:.3} GeV ({})",
            state.delta_t_norm,
            update.result.t_start,
            update.result.t_end,
            update.result.t_eff(),
            fit
        );
        last = Some(update);
    }

    let summary = pipeline.regression();
    info!(
        "Regression ({:?}, {} samples, {} fallbacks skipped):",
        summary.status, summary.samples, summary.skipped
    );
    info!("  beta_dt        = {:+.4}", summary.beta_delta_t);
    info!("  beta_expansion = {:+.4}", summary.beta_expansion);
    info!("  intercept      = {:.4}", summary.intercept);
    info!("  residual       = {:.4}", summary.residual);
    info!("{}", pipeline.stats());

    if let Some(update) = last {
        let json = update.result.to_json().context("Failed to serialize result")?;
        println!("{json}");
    }

    Ok(())
}
