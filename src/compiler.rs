// src/compiler.rs

//! Flattens expressions into bracket-token programs.
//!
//! A `Program` is the depth-first linearization of an `Expr`: every frame is
//! wrapped in `(` `)`, a unary tag follows the value it transforms, and `*`
//! markers record how many sibling values a frame multiplies together. The
//! same program is evaluated once per pixel by the `vm` without re-walking the
//! expression tree.

use crate::expr::{Expr, Term, UnaryOp, Variable};
use anyhow::{bail, ensure, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single program symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Open,
    Close,
    Var(Variable),
    Unary(UnaryOp),
    Mul,
}

impl Token {
    pub fn as_char(self) -> char {
        match self {
            Token::Open => '(',
            Token::Close => ')',
            Token::Var(v) => v.tag(),
            Token::Unary(op) => op.tag(),
            Token::Mul => '*',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '(' => Some(Token::Open),
            ')' => Some(Token::Close),
            '*' => Some(Token::Mul),
            _ => Variable::from_tag(c)
                .map(Token::Var)
                .or_else(|| UnaryOp::from_tag(c).map(Token::Unary)),
        }
    }
}

/// Token layout and `*` reduction rule.
///
/// `Standard` places a `*` between adjacent siblings and multiplies every
/// value of a frame when it closes. `Legacy` reproduces the historical token
/// streams: all of a frame's `*` markers trail its last sibling, and each one
/// is applied on the spot by popping the front value into the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Standard,
    Legacy,
}

/// A compiled, read-only token sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    tokens: Vec<Token>,
    dialect: Dialect,
}

impl Program {
    /// Wraps `tokens`, rejecting sequences whose brackets do not balance.
    pub fn new(tokens: Vec<Token>, dialect: Dialect) -> Result<Self> {
        let mut open_brackets = 0usize;
        for (pos, token) in tokens.iter().enumerate() {
            match token {
                Token::Open => open_brackets += 1,
                Token::Close => {
                    open_brackets = open_brackets
                        .checked_sub(1)
                        .with_context(|| format!("unmatched ')' at token {}", pos))?;
                }
                _ => {}
            }
        }
        ensure!(
            open_brackets == 0,
            "{} unclosed '(' at end of program",
            open_brackets
        );
        Ok(Program { tokens, dialect })
    }

    /// Parses a token string in the given dialect.
    pub fn parse(text: &str, dialect: Dialect) -> Result<Self> {
        let tokens = text
            .char_indices()
            .filter(|(_, c)| !c.is_whitespace())
            .map(|(i, c)| {
                Token::from_char(c)
                    .with_context(|| format!("invalid program symbol {:?} at offset {}", c, i))
            })
            .collect::<Result<Vec<_>>>()?;
        Program::new(tokens, dialect)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Count of `(` minus count of `)`.
    pub fn bracket_balance(&self) -> isize {
        self.tokens.iter().fold(0, |balance, token| match token {
            Token::Open => balance + 1,
            Token::Close => balance - 1,
            _ => balance,
        })
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{}", token.as_char())?;
        }
        Ok(())
    }
}

impl FromStr for Program {
    type Err = anyhow::Error;

    fn from_str(text: &str) -> Result<Self> {
        Program::parse(text, Dialect::Standard)
    }
}

/// Compiles expressions into programs of one dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compiler {
    dialect: Dialect,
}

impl Compiler {
    pub fn new(dialect: Dialect) -> Self {
        Compiler { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn compile(&self, expr: &Expr) -> Program {
        let mut tokens = Vec::new();
        self.emit(expr, &mut tokens);
        debug!("compiled {} into {} tokens", expr, tokens.len());
        Program {
            tokens,
            dialect: self.dialect,
        }
    }

    /// Parses the nested-bracket text of an expression and compiles it.
    pub fn compile_str(&self, text: &str) -> Result<Program> {
        let expr: Expr = text
            .parse()
            .with_context(|| format!("malformed expression {:?}", text))?;
        Ok(self.compile(&expr))
    }

    fn emit(&self, expr: &Expr, out: &mut Vec<Token>) {
        match expr {
            Expr::Var(v) => out.extend([Token::Open, Token::Var(*v), Token::Close]),
            Expr::Unary(term) => {
                out.push(Token::Open);
                self.emit_term(term, out);
                out.push(Token::Close);
            }
            Expr::Product(terms) => {
                out.push(Token::Open);
                for (i, term) in terms.iter().enumerate() {
                    if i > 0 && self.dialect == Dialect::Standard {
                        out.push(Token::Mul);
                    }
                    self.emit_term(term, out);
                }
                if self.dialect == Dialect::Legacy {
                    let markers = terms.len().saturating_sub(1);
                    out.extend(std::iter::repeat(Token::Mul).take(markers));
                }
                out.push(Token::Close);
            }
        }
    }

    /// Siblings share their parent's frame: the argument, then the tag.
    fn emit_term(&self, term: &Term, out: &mut Vec<Token>) {
        self.emit(&term.arg, out);
        out.push(Token::Unary(term.op));
    }
}

/// Compiles `expr` in the standard dialect.
pub fn compile(expr: &Expr) -> Program {
    Compiler::default().compile(expr)
}

/// Checks that `program` is one outermost frame with nothing outside it.
pub fn ensure_single_root(program: &Program) -> Result<()> {
    let tokens = program.tokens();
    ensure!(!tokens.is_empty(), "empty program");
    let mut open_brackets = 0usize;
    for (pos, token) in tokens.iter().enumerate() {
        match token {
            Token::Open => open_brackets += 1,
            Token::Close => open_brackets = open_brackets.saturating_sub(1),
            _ if open_brackets == 0 => bail!("token at {} lies outside the root frame", pos),
            _ => {}
        }
        if open_brackets == 0 && pos + 1 != tokens.len() {
            bail!("root frame closes early at token {}", pos);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
