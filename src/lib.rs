//! Exprart library crate.
//!
//! Builds random per-channel expressions, flattens them into bracket-token
//! programs and samples those programs over a square grid to produce RGB
//! intensity planes.

pub mod compiler;
pub mod config;
pub mod expr;
pub mod raster;
pub mod sampler;
pub mod synth;
pub mod vm;
