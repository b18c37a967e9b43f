// src/raster.rs

//! Raster sinks: where finished channel planes go.
//!
//! The sampler's contract ends at three equally sized intensity planes. A
//! `RasterSink` combines them into one RGB image and persists it. `PpmSink`
//! writes binary PPM (P6) files; `MemorySink` keeps images in memory.

use crate::sampler::ChannelPlane;
use anyhow::{ensure, Context, Result};
use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Consumer of finished RGB channel planes.
pub trait RasterSink {
    /// Combines `planes` (red, green, blue) into one image called `name`.
    fn persist(&mut self, name: &str, planes: &[ChannelPlane; 3]) -> Result<()>;
}

/// Interleaves three planes into `side * side * 3` RGB bytes.
pub fn interleave(planes: &[ChannelPlane; 3]) -> Result<(usize, Vec<u8>)> {
    let [red, green, blue] = planes;
    let side = red.side();
    ensure!(
        green.side() == side && blue.side() == side,
        "channel planes differ in size: {}, {}, {}",
        red.side(),
        green.side(),
        blue.side()
    );

    let mut rgb = Vec::with_capacity(side * side * 3);
    for ((&r, &g), &b) in red
        .as_slice()
        .iter()
        .zip(green.as_slice())
        .zip(blue.as_slice())
    {
        rgb.extend_from_slice(&[r, g, b]);
    }
    Ok((side, rgb))
}

/// Writes `planes` as a binary PPM image.
pub fn write_ppm<W: Write>(writer: &mut W, planes: &[ChannelPlane; 3]) -> Result<()> {
    let (side, rgb) = interleave(planes)?;
    // P6: binary RGB, max value 255
    writeln!(writer, "P6")?;
    writeln!(writer, "{} {}", side, side)?;
    writeln!(writer, "255")?;
    writer.write_all(&rgb)?;
    Ok(())
}

/// Writes each image to `<directory>/<name>.ppm`.
#[derive(Debug, Clone)]
pub struct PpmSink {
    directory: PathBuf,
}

impl PpmSink {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        PpmSink {
            directory: directory.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.ppm", name))
    }
}

impl RasterSink for PpmSink {
    fn persist(&mut self, name: &str, planes: &[ChannelPlane; 3]) -> Result<()> {
        fs::create_dir_all(&self.directory).with_context(|| {
            format!("Failed to create output directory {}", self.directory.display())
        })?;
        let path = self.path_for(name);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write_ppm(&mut writer, planes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
        info!("Wrote {}", path.display());
        Ok(())
    }
}

/// An interleaved RGB image held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbImage {
    pub name: String,
    pub side: usize,
    pub rgb: Vec<u8>,
}

/// Collects images in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub images: Vec<RgbImage>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RasterSink for MemorySink {
    fn persist(&mut self, name: &str, planes: &[ChannelPlane; 3]) -> Result<()> {
        let (side, rgb) = interleave(planes)?;
        self.images.push(RgbImage {
            name: name.to_string(),
            side,
            rgb,
        });
        Ok(())
    }
}
