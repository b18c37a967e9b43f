// src/config.rs

//! Defines the configuration structures for `exprart`.
//!
//! Every section derives `Deserialize` with `#[serde(default)]`, so a JSON
//! config file only needs the keys it wants to override. Defaults reproduce
//! the classic batch: 100 images of 301×301 pixels, continuation probability
//! 0.925, written as `test0.ppm`, `test1.ppm`, ... in the working directory.

use crate::compiler::Dialect;
use crate::expr::generator::{
    DEFAULT_CONTINUATION_PROBABILITY, DEFAULT_MAX_DEPTH, DEFAULT_MAX_TERMS, MAX_DEPTH_LIMIT,
};
use crate::sampler::{DEFAULT_PIXELS_PER_UNIT, MAX_PIXELS_PER_UNIT};
use anyhow::{ensure, Context, Result};
use log::{info, warn};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "EXPRART_CONFIG";

/// Configuration loaded from `EXPRART_CONFIG`, or defaults.
pub static CONFIG: Lazy<Config> = Lazy::new(Config::load_or_default);

// --- Top-Level Configuration Structure ---

/// Complete configuration for a synthesis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Expression generation settings.
    pub generation: GenerationConfig,
    /// Sampling resolution and parallelism.
    pub render: RenderConfig,
    /// Batch size and file naming.
    pub output: OutputConfig,
    /// Seed for the random source. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Token layout and product rule used by the compiler and interpreter.
    pub dialect: Dialect,
}

// --- Generation Configuration ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Probability that the root of an expression is compound. Squared at
    /// every level of nesting.
    pub continuation_probability: f64,
    /// Nesting depth at which generation is forced to a terminal.
    pub max_depth: usize,
    /// Unary terms per expression before generation is forced to terminals.
    pub max_terms: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            continuation_probability: DEFAULT_CONTINUATION_PROBABILITY,
            max_depth: DEFAULT_MAX_DEPTH,
            max_terms: DEFAULT_MAX_TERMS,
        }
    }
}

// --- Render Configuration ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pixels between 0 and 1 on either axis; the grid side is `2 * ppu + 1`.
    pub pixels_per_unit: u32,
    /// Row stripes rendered concurrently per channel.
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            pixels_per_unit: DEFAULT_PIXELS_PER_UNIT,
            threads: 1,
        }
    }
}

// --- Output Configuration ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of images per batch.
    pub count: usize,
    /// Directory receiving the images.
    pub directory: PathBuf,
    /// File name prefix; the image index is appended.
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            count: 100,
            directory: PathBuf::from("."),
            prefix: "test".to_string(),
        }
    }
}

impl Config {
    /// Parses a JSON document. Missing keys take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text).context("Failed to parse config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates the JSON config file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Config::from_json(&text).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Loads the file named by `EXPRART_CONFIG`, falling back to defaults.
    pub fn load_or_default() -> Self {
        let Ok(path) = std::env::var(CONFIG_PATH_ENV) else {
            info!("{} not set, using default configuration", CONFIG_PATH_ENV);
            return Config::default();
        };
        match Config::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path);
                config
            }
            Err(e) => {
                warn!("{:#}. Using default configuration.", e);
                Config::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let p = self.generation.continuation_probability;
        ensure!(
            (0.0..1.0).contains(&p),
            "continuation_probability must be within [0, 1), got {}",
            p
        );
        ensure!(
            self.generation.max_depth <= MAX_DEPTH_LIMIT,
            "max_depth must be at most {}, got {}",
            MAX_DEPTH_LIMIT,
            self.generation.max_depth
        );
        ensure!(
            (1..=MAX_PIXELS_PER_UNIT).contains(&self.render.pixels_per_unit),
            "pixels_per_unit must be within 1..={}, got {}",
            MAX_PIXELS_PER_UNIT,
            self.render.pixels_per_unit
        );
        ensure!(self.render.threads >= 1, "threads must be at least 1");
        ensure!(
            !self.output.prefix.contains(&['/', '\\'][..]),
            "output prefix {:?} must not contain path separators",
            self.output.prefix
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests;
