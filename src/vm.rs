// src/vm.rs

//! Frame-stack interpreter for compiled programs.
//!
//! The machine keeps one frame per open bracket. Coordinates and transformed
//! values accumulate in the current frame; a closing bracket reduces the
//! frame to one scalar and hands it to the frame below. A well-formed program
//! leaves exactly one value in the root frame.

use crate::compiler::{Dialect, Program, Token};
use crate::expr::{UnaryOp, Variable};
use anyhow::{bail, ensure, Context, Result};
use std::f64::consts::PI;

/// Stand-in for non-positive `ln` arguments.
pub const LN_EPSILON: f64 = 1e-7;

/// Applies a unary transform. `ln` of a non-positive value uses `LN_EPSILON`.
pub fn apply_unary(op: UnaryOp, value: f64) -> f64 {
    match op {
        UnaryOp::Sin => (PI * value).sin(),
        UnaryOp::Cos => (PI * value).cos(),
        UnaryOp::Tan => (PI * value).tan(),
        UnaryOp::Ln => {
            let value = if value <= 0.0 { LN_EPSILON } else { value };
            value.ln()
        }
    }
}

#[derive(Debug, Default)]
struct Frame {
    values: Vec<f64>,
    /// `*` markers seen but not yet applied.
    pending_products: usize,
}

impl Frame {
    fn clear(&mut self) {
        self.values.clear();
        self.pending_products = 0;
    }
}

/// Reusable interpreter state.
///
/// Frames are recycled between evaluations, so one `Vm` per worker thread
/// evaluates a whole plane without allocating per pixel.
#[derive(Debug, Default)]
pub struct Vm {
    frames: Vec<Frame>,
    spare: Vec<Frame>,
}

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluates `program` at the sample point `(x, y)`.
    pub fn evaluate(&mut self, program: &Program, x: f64, y: f64) -> Result<f64> {
        self.reset();
        let dialect = program.dialect();

        for (pos, token) in program.tokens().iter().enumerate() {
            match *token {
                Token::Open => {
                    let frame = self.spare.pop().unwrap_or_default();
                    self.frames.push(frame);
                }
                Token::Var(var) => {
                    let value = match var {
                        Variable::X => x,
                        Variable::Y => y,
                    };
                    self.current()?.values.push(value);
                }
                Token::Unary(op) => {
                    let last = self.current()?.values.last_mut().with_context(|| {
                        format!("'{}' at token {} has no value to transform", op.tag(), pos)
                    })?;
                    *last = apply_unary(op, *last);
                }
                Token::Mul => {
                    ensure!(self.frames.len() > 1, "'*' at token {} lies outside any frame", pos);
                    let frame = self.current()?;
                    match dialect {
                        Dialect::Standard => {
                            // Each marker sits right after the sibling it joins.
                            ensure!(
                                frame.values.len() == frame.pending_products + 1,
                                "misplaced '*' at token {}: frame holds {} value(s) and {} earlier marker(s)",
                                pos,
                                frame.values.len(),
                                frame.pending_products
                            );
                            frame.pending_products += 1;
                        }
                        Dialect::Legacy => combine_front(frame, pos)?,
                    }
                }
                Token::Close => {
                    ensure!(self.frames.len() > 1, "unmatched ')' at token {}", pos);
                    let Some(mut frame) = self.frames.pop() else {
                        bail!("frame stack underflow at token {}", pos);
                    };
                    let value = reduce(&frame, dialect, pos);
                    frame.clear();
                    self.spare.push(frame);
                    self.current()?.values.push(value?);
                }
            }
        }

        ensure!(
            self.frames.len() == 1,
            "{} frame(s) left open at end of program",
            self.frames.len().saturating_sub(1)
        );
        match self.current()?.values.as_slice() {
            [value] => Ok(*value),
            values => bail!(
                "program resolved to {} values instead of one",
                values.len()
            ),
        }
    }

    fn reset(&mut self) {
        for mut frame in self.frames.drain(..) {
            frame.clear();
            self.spare.push(frame);
        }
        let root = self.spare.pop().unwrap_or_default();
        self.frames.push(root);
    }

    fn current(&mut self) -> Result<&mut Frame> {
        self.frames.last_mut().context("frame stack underflow")
    }
}

/// Legacy `*`: pop the front value and multiply it into the new front.
fn combine_front(frame: &mut Frame, pos: usize) -> Result<()> {
    ensure!(
        frame.values.len() >= 2,
        "'*' at token {} needs two values, frame holds {}",
        pos,
        frame.values.len()
    );
    let first = frame.values.remove(0);
    frame.values[0] *= first;
    Ok(())
}

/// Reduces a closing frame to one scalar.
fn reduce(frame: &Frame, dialect: Dialect, pos: usize) -> Result<f64> {
    let Some((&first, rest)) = frame.values.split_first() else {
        bail!("empty frame closed at token {}", pos);
    };
    match dialect {
        Dialect::Standard => {
            ensure!(
                frame.pending_products == rest.len(),
                "frame closed at token {} has {} values but {} '*' markers",
                pos,
                frame.values.len(),
                frame.pending_products
            );
            Ok(rest.iter().fold(first, |product, value| product * value))
        }
        // Markers were applied as they arrived; whatever is left past the
        // front value is dropped.
        Dialect::Legacy => Ok(first),
    }
}

/// Evaluates `program` with a throwaway machine.
pub fn evaluate(program: &Program, x: f64, y: f64) -> Result<f64> {
    Vm::new().evaluate(program, x, y)
}
