// src/sampler.rs

//! Samples compiled channel programs over a square pixel grid.
//!
//! Pixel `(row, col)` maps to `x = (col - ppu) / ppu` and
//! `y = -(row - ppu) / ppu`, so the grid spans [-1, 1] on both axes with
//! row 0 at the top (`y = 1`). Each scalar result becomes an 8-bit intensity
//! via `round(z * 127.5 + 127.5)` clamped to [0, 255].
//!
//! Channels never share mutable state. Within a channel the plane can be cut
//! into contiguous row stripes rendered on scoped threads; each worker owns
//! its own `Vm` and a disjoint slice of the output.

use crate::compiler::Program;
use crate::vm::Vm;
use anyhow::{bail, ensure, Context, Result};
use log::{debug, trace};
use std::fmt;
use std::thread;

/// Default sampling resolution, giving a 301×301 grid.
pub const DEFAULT_PIXELS_PER_UNIT: u32 = 150;

/// Largest accepted sampling resolution, an 8193×8193 grid.
pub const MAX_PIXELS_PER_UNIT: u32 = 4096;

/// One of the three output channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        };
        f.write_str(name)
    }
}

/// Maps an interpreter result to an 8-bit intensity. NaN maps to 0.
pub fn intensity(z: f64) -> u8 {
    if z.is_nan() {
        return 0;
    }
    (z * 127.5 + 127.5).round().clamp(0.0, 255.0) as u8
}

/// Pixel grid to sample-space mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridGeometry {
    pixels_per_unit: u32,
}

impl GridGeometry {
    pub fn new(pixels_per_unit: u32) -> Result<Self> {
        ensure!(
            (1..=MAX_PIXELS_PER_UNIT).contains(&pixels_per_unit),
            "pixels_per_unit must be within 1..={}, got {}",
            MAX_PIXELS_PER_UNIT,
            pixels_per_unit
        );
        Ok(GridGeometry { pixels_per_unit })
    }

    pub fn pixels_per_unit(&self) -> u32 {
        self.pixels_per_unit
    }

    /// Side length of the square grid: `2 * ppu + 1`.
    pub fn side(&self) -> usize {
        2 * self.pixels_per_unit as usize + 1
    }

    /// Sample point `(x, y)` for the pixel at `(row, col)`.
    pub fn sample_point(&self, row: usize, col: usize) -> (f64, f64) {
        let ppu = self.pixels_per_unit as f64;
        let x = (col as f64 - ppu) / ppu;
        let y = -(row as f64 - ppu) / ppu;
        (x, y)
    }
}

/// A square, row-major grid of 8-bit intensities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelPlane {
    side: usize,
    data: Vec<u8>,
}

impl ChannelPlane {
    pub fn new(side: usize) -> Self {
        ChannelPlane {
            side,
            data: vec![0; side * side],
        }
    }

    /// Wraps row-major `data`, which must hold exactly `side * side` bytes.
    pub fn from_data(side: usize, data: Vec<u8>) -> Result<Self> {
        let len = side
            .checked_mul(side)
            .with_context(|| format!("plane of side {} is too large", side))?;
        ensure!(
            data.len() == len,
            "plane of side {} needs {} bytes, got {}",
            side,
            len,
            data.len()
        );
        Ok(ChannelPlane { side, data })
    }

    pub fn side(&self) -> usize {
        self.side
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row < self.side && col < self.side {
            self.data.get(row * self.side + col).copied()
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Renders channel planes at a fixed resolution.
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    geometry: GridGeometry,
    threads: usize,
}

impl Sampler {
    pub fn new(geometry: GridGeometry) -> Self {
        Sampler {
            geometry,
            threads: 1,
        }
    }

    /// Number of row stripes rendered concurrently. `1` renders in place.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    /// Renders all three channels, red first.
    pub fn render(&self, programs: &[Program; 3]) -> Result<[ChannelPlane; 3]> {
        let [red, green, blue] = programs;
        Ok([
            self.render_channel(red)
                .with_context(|| format!("rendering {} channel", Channel::Red))?,
            self.render_channel(green)
                .with_context(|| format!("rendering {} channel", Channel::Green))?,
            self.render_channel(blue)
                .with_context(|| format!("rendering {} channel", Channel::Blue))?,
        ])
    }

    /// Evaluates `program` at every pixel of the grid.
    pub fn render_channel(&self, program: &Program) -> Result<ChannelPlane> {
        let side = self.geometry.side();
        let mut plane = ChannelPlane::new(side);
        let threads = self.threads.min(side);

        if threads <= 1 {
            self.render_rows(program, 0, &mut plane.data)?;
            return Ok(plane);
        }

        let rows_per_stripe = side.div_ceil(threads);
        debug!(
            "rendering {}x{} plane in stripes of {} rows on {} threads",
            side, side, rows_per_stripe, threads
        );
        thread::scope(|scope| -> Result<()> {
            let workers: Vec<_> = plane
                .data
                .chunks_mut(rows_per_stripe * side)
                .enumerate()
                .map(|(stripe, pixels)| {
                    scope.spawn(move || self.render_rows(program, stripe * rows_per_stripe, pixels))
                })
                .collect();
            for worker in workers {
                match worker.join() {
                    Ok(result) => result?,
                    Err(_) => bail!("render worker panicked"),
                }
            }
            Ok(())
        })?;
        Ok(plane)
    }

    /// Fills `pixels`, whose first row is grid row `first_row`.
    fn render_rows(&self, program: &Program, first_row: usize, pixels: &mut [u8]) -> Result<()> {
        let side = self.geometry.side();
        let mut vm = Vm::new();
        for (offset, row_pixels) in pixels.chunks_mut(side).enumerate() {
            let row = first_row + offset;
            for (col, pixel) in row_pixels.iter_mut().enumerate() {
                let (x, y) = self.geometry.sample_point(row, col);
                let z = vm
                    .evaluate(program, x, y)
                    .with_context(|| format!("evaluating pixel (row {}, col {})", row, col))?;
                *pixel = intensity(z);
            }
        }
        trace!("rendered rows {}..{}", first_row, first_row + pixels.len() / side.max(1));
        Ok(())
    }
}

/// Renders three channel programs at `pixels_per_unit`, sequentially.
pub fn render(programs: &[Program; 3], pixels_per_unit: u32) -> Result<[ChannelPlane; 3]> {
    Sampler::new(GridGeometry::new(pixels_per_unit)?).render(programs)
}
