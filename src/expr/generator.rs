// src/expr/generator.rs

//! Random expression generation.
//!
//! Each compound level squares the continuation probability for its children,
//! so expected depth stays small and generation terminates with probability 1.
//! A depth cap and a term budget bound the work even when the probability is
//! close to 1.

use super::{Expr, Term, UnaryOp, Variable};
use log::trace;
use rand::Rng;

/// Continuation probability used for each channel unless configured otherwise.
pub const DEFAULT_CONTINUATION_PROBABILITY: f64 = 0.925;

/// Depth at which generation is forced to a terminal.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Largest accepted depth cap.
pub const MAX_DEPTH_LIMIT: usize = 256;

/// Unary terms one expression may hold before every open branch is forced
/// to a terminal.
pub const DEFAULT_MAX_TERMS: usize = 1 << 16;

/// Number of equally likely compound shapes: four unary wrappers plus three
/// product families.
const COMPOUND_CHOICES: u32 = 7;

/// Product families, keyed by the leading op. Each lists its partner choices.
const PRODUCT_FAMILIES: [(UnaryOp, [UnaryOp; 3]); 3] = [
    (UnaryOp::Sin, [UnaryOp::Sin, UnaryOp::Cos, UnaryOp::Tan]),
    (UnaryOp::Cos, [UnaryOp::Cos, UnaryOp::Sin, UnaryOp::Tan]),
    (UnaryOp::Tan, [UnaryOp::Tan, UnaryOp::Sin, UnaryOp::Cos]),
];

/// Expression generator over a borrowed random source.
pub struct ExprGenerator<'a, R> {
    rng: &'a mut R,
    max_depth: usize,
    max_terms: usize,
    terms_left: usize,
}

impl<'a, R: Rng> ExprGenerator<'a, R> {
    pub fn new(rng: &'a mut R) -> Self {
        Self {
            rng,
            max_depth: DEFAULT_MAX_DEPTH,
            max_terms: DEFAULT_MAX_TERMS,
            terms_left: DEFAULT_MAX_TERMS,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_terms(mut self, max_terms: usize) -> Self {
        self.max_terms = max_terms;
        self
    }

    /// Generates one expression.
    ///
    /// With probability `continuation_probability` the root is compound
    /// (a unary wrapper or a two-term product); otherwise it is `x` or `y`.
    pub fn generate(&mut self, continuation_probability: f64) -> Expr {
        self.terms_left = self.max_terms;
        let expr = self.generate_at(continuation_probability, 0);
        trace!("generated expression of depth {}: {}", expr.depth(), expr);
        expr
    }

    fn generate_at(&mut self, probability: f64, depth: usize) -> Expr {
        if depth >= self.max_depth
            || self.terms_left == 0
            || self.rng.gen::<f64>() >= probability
        {
            return self.terminal();
        }

        let child_probability = probability * probability;
        let choice = self.rng.gen_range(0..COMPOUND_CHOICES) as usize;
        match UnaryOp::ALL.get(choice) {
            Some(&op) => {
                self.terms_left -= 1;
                let arg = self.generate_at(child_probability, depth + 1);
                Expr::Unary(Term::new(op, arg))
            }
            None if self.terms_left < 2 => self.terminal(),
            None => {
                self.terms_left -= 2;
                let (leader, partners) = PRODUCT_FAMILIES[choice - UnaryOp::ALL.len()];
                let partner = partners[self.rng.gen_range(0..partners.len())];
                let first = self.generate_at(child_probability, depth + 1);
                let second = self.generate_at(child_probability, depth + 1);
                Expr::Product(vec![Term::new(leader, first), Term::new(partner, second)])
            }
        }
    }

    fn terminal(&mut self) -> Expr {
        Expr::Var(Variable::ALL[self.rng.gen_range(0..Variable::ALL.len())])
    }
}
