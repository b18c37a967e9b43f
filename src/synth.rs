// src/synth.rs

//! Ties the pipeline together: generate, compile, render, persist.
//!
//! A `Synthesizer` owns the random source, so a fixed seed reproduces the
//! same expressions, programs and planes run after run.

use crate::compiler::{ensure_single_root, Compiler, Program};
use crate::config::{Config, OutputConfig};
use crate::expr::{Expr, ExprGenerator};
use crate::raster::RasterSink;
use crate::sampler::{ChannelPlane, Channel, GridGeometry, Sampler};
use anyhow::{Context, Result};
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// One finished image and everything that produced it, red first.
#[derive(Debug, Clone)]
pub struct Artwork {
    pub expressions: [Expr; 3],
    pub programs: [Program; 3],
    pub planes: [ChannelPlane; 3],
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub written: usize,
    pub failed: usize,
}

pub struct Synthesizer {
    rng: StdRng,
    continuation_probability: f64,
    max_depth: usize,
    max_terms: usize,
    compiler: Compiler,
    sampler: Sampler,
}

impl Synthesizer {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => {
                info!("Seeding random source with {}", seed);
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };
        let geometry = GridGeometry::new(config.render.pixels_per_unit)?;
        Ok(Synthesizer {
            rng,
            continuation_probability: config.generation.continuation_probability,
            max_depth: config.generation.max_depth,
            max_terms: config.generation.max_terms,
            compiler: Compiler::new(config.dialect),
            sampler: Sampler::new(geometry).with_threads(config.render.threads),
        })
    }

    /// Generates and compiles one expression per channel.
    pub fn compose(&mut self) -> Result<([Expr; 3], [Program; 3])> {
        let probability = self.continuation_probability;
        let mut generator = ExprGenerator::new(&mut self.rng)
            .with_max_depth(self.max_depth)
            .with_max_terms(self.max_terms);
        let expressions = Channel::ALL.map(|channel| {
            let expr = generator.generate(probability);
            info!("{}: {}", channel, expr);
            expr
        });

        let programs = expressions.each_ref().map(|expr| self.compiler.compile(expr));
        for (channel, program) in Channel::ALL.iter().zip(&programs) {
            ensure_single_root(program)
                .with_context(|| format!("compiling {} channel", channel))?;
            debug!("{} program: {}", channel, program);
        }
        Ok((expressions, programs))
    }

    /// Produces one image.
    pub fn synthesize_one(&mut self) -> Result<Artwork> {
        let (expressions, programs) = self.compose()?;
        let planes = self.sampler.render(&programs)?;
        Ok(Artwork {
            expressions,
            programs,
            planes,
        })
    }

    /// Produces `output.count` images named `<prefix><index>` into `sink`.
    ///
    /// A failed render is logged and skipped; a sink failure ends the batch.
    pub fn run_batch(
        &mut self,
        output: &OutputConfig,
        sink: &mut dyn RasterSink,
    ) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        for index in 0..output.count {
            let name = format!("{}{}", output.prefix, index);
            info!("Synthesizing {} ({}/{})", name, index + 1, output.count);
            match self.synthesize_one() {
                Ok(artwork) => {
                    sink.persist(&name, &artwork.planes)
                        .with_context(|| format!("Failed to persist {}", name))?;
                    report.written += 1;
                }
                Err(e) => {
                    error!("Render of {} failed: {:#}", name, e);
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }
}
