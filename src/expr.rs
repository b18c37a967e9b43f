// src/expr.rs

//! Expression data model for the per-channel grammar.
//!
//! Expressions are written in a nested-bracket text form such as
//! `s(x)*c(t(y))`: a one-letter tag wraps a bracketed argument, and `*` joins
//! sibling terms at the same nesting level. The tree form here is what the
//! generator builds and what the compiler flattens; `Display` and `FromStr`
//! convert between the tree and the text.

pub mod generator;

use anyhow::{bail, ensure, Context, Result};
use std::fmt;
use std::str::FromStr;

pub use generator::ExprGenerator;

/// A terminal sample coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variable {
    X,
    Y,
}

impl Variable {
    pub const ALL: [Variable; 2] = [Variable::X, Variable::Y];

    pub fn tag(self) -> char {
        match self {
            Variable::X => 'x',
            Variable::Y => 'y',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'x' => Some(Variable::X),
            'y' => Some(Variable::Y),
            _ => None,
        }
    }
}

/// One of the four unary transforms. Trigonometric ops scale their input by π.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Sin,
    Cos,
    Tan,
    Ln,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 4] = [UnaryOp::Sin, UnaryOp::Cos, UnaryOp::Tan, UnaryOp::Ln];

    pub fn tag(self) -> char {
        match self {
            UnaryOp::Sin => 's',
            UnaryOp::Cos => 'c',
            UnaryOp::Tan => 't',
            UnaryOp::Ln => 'l',
        }
    }

    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            's' => Some(UnaryOp::Sin),
            'c' => Some(UnaryOp::Cos),
            't' => Some(UnaryOp::Tan),
            'l' => Some(UnaryOp::Ln),
            _ => None,
        }
    }
}

/// A tagged, bracketed argument: `s(...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub op: UnaryOp,
    pub arg: Box<Expr>,
}

impl Term {
    pub fn new(op: UnaryOp, arg: Expr) -> Self {
        Term {
            op,
            arg: Box::new(arg),
        }
    }
}

/// A generated channel expression.
///
/// `Product` holds two or more terms; a lone term is `Unary`. Build products
/// from untrusted term lists with [`Expr::product`], which checks this.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Var(Variable),
    Unary(Term),
    Product(Vec<Term>),
}

impl Expr {
    /// Joins `terms` into a product of two or more siblings.
    pub fn product(terms: Vec<Term>) -> Result<Self> {
        ensure!(
            terms.len() >= 2,
            "a product needs at least two terms, got {}",
            terms.len()
        );
        Ok(Expr::Product(terms))
    }

    /// Nesting depth: terminals are 0, each tag level adds one.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Var(_) => 0,
            Expr::Unary(term) => 1 + term.arg.depth(),
            Expr::Product(terms) => 1 + terms.iter().map(|t| t.arg.depth()).max().unwrap_or(0),
        }
    }

    /// Total number of unary terms in the tree.
    pub fn term_count(&self) -> usize {
        match self {
            Expr::Var(_) => 0,
            Expr::Unary(term) => 1 + term.arg.term_count(),
            Expr::Product(terms) => terms.iter().map(|t| 1 + t.arg.term_count()).sum(),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.op.tag(), self.arg)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(v) => write!(f, "{}", v.tag()),
            Expr::Unary(term) => write!(f, "{}", term),
            Expr::Product(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 {
                        f.write_str("*")?;
                    }
                    write!(f, "{}", term)?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Expr {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        parse_at(text, 0)
    }
}

/// Parses `text`, which starts at byte `offset` of the full input.
fn parse_at(text: &str, offset: usize) -> Result<Expr> {
    let mut chars = text.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if let Some(var) = Variable::from_tag(c) {
            return Ok(Expr::Var(var));
        }
    }

    let mut terms = split_siblings(text, offset)?
        .into_iter()
        .map(|(start, sibling)| parse_term(sibling, start))
        .collect::<Result<Vec<_>>>()?;

    if terms.len() == 1 {
        if let Some(term) = terms.pop() {
            return Ok(Expr::Unary(term));
        }
    }
    Expr::product(terms)
}

/// Splits `text` on top-level `*` markers.
///
/// A counter of unmatched `(` tracks nesting; a sibling is complete when the
/// counter is back to zero and a `*` (or the end of input) is reached.
fn split_siblings(text: &str, offset: usize) -> Result<Vec<(usize, &str)>> {
    let mut siblings = Vec::new();
    let mut open_brackets = 0usize;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        match c {
            '(' => open_brackets += 1,
            ')' => {
                if open_brackets == 0 {
                    bail!("unmatched ')' at offset {}", offset + i);
                }
                open_brackets -= 1;
            }
            '*' if open_brackets == 0 => {
                siblings.push((offset + start, &text[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    ensure!(
        open_brackets == 0,
        "{} unclosed '(' in expression at offset {}",
        open_brackets,
        offset
    );
    siblings.push((offset + start, &text[start..]));
    Ok(siblings)
}

fn parse_term(text: &str, offset: usize) -> Result<Term> {
    let tag = text
        .chars()
        .next()
        .with_context(|| format!("empty term at offset {}", offset))?;
    let op = UnaryOp::from_tag(tag)
        .with_context(|| format!("unknown tag {:?} at offset {}", tag, offset))?;

    let bracketed = &text[tag.len_utf8()..];
    ensure!(
        bracketed.starts_with('('),
        "tag {:?} at offset {} is not followed by '('",
        tag,
        offset
    );
    let close = matching_close(bracketed)
        .with_context(|| format!("unclosed argument for tag {:?} at offset {}", tag, offset))?;
    ensure!(
        close == bracketed.len() - 1,
        "unexpected input after argument of tag {:?} at offset {}",
        tag,
        offset + tag.len_utf8() + close + 1
    );

    let arg = &bracketed[1..close];
    ensure!(
        !arg.is_empty(),
        "empty argument for tag {:?} at offset {}",
        tag,
        offset
    );
    let arg = parse_at(arg, offset + tag.len_utf8() + 1)?;
    Ok(Term::new(op, arg))
}

/// Byte index of the `)` matching the `(` at index 0.
fn matching_close(text: &str) -> Option<usize> {
    let mut open_brackets = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            '(' => open_brackets += 1,
            ')' => {
                open_brackets = open_brackets.checked_sub(1)?;
                if open_brackets == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
