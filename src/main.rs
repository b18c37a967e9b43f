// src/main.rs

use exprart::{
    config::{Config, CONFIG},
    raster::PpmSink,
    synth::Synthesizer,
};

// Logging
use anyhow::Context;
use log::{info, warn};

/// Main entry point for the `exprart` batch renderer.
///
/// Usage: `exprart [config.json]`. Without an argument the file named by
/// `EXPRART_CONFIG` is used, or the built-in defaults.
fn main() -> anyhow::Result<()> {
    // Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting exprart...");

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).context("Failed to load configuration")?,
        None => CONFIG.clone(),
    };
    info!("Configuration: {:?}", config);

    let mut synthesizer =
        Synthesizer::new(&config).context("Failed to initialize synthesizer")?;
    let mut sink = PpmSink::new(&config.output.directory);

    let report = synthesizer.run_batch(&config.output, &mut sink)?;
    if report.failed > 0 {
        warn!("{} image(s) failed to render", report.failed);
    }
    info!(
        "Wrote {} image(s) to {}",
        report.written,
        config.output.directory.display()
    );
    Ok(())
}
