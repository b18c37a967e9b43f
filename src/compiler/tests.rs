// src/compiler/tests.rs

use super::*;
use crate::expr::ExprGenerator;
use rand::rngs::StdRng;
use rand::SeedableRng;
use test_log::test;

fn compile_text(text: &str, dialect: Dialect) -> String {
    Compiler::new(dialect)
        .compile_str(text)
        .unwrap_or_else(|e| panic!("{:?} failed to compile: {:#}", text, e))
        .to_string()
}

// --- Layout ---

#[test]
fn test_terminal_is_its_own_frame() {
    assert_eq!(compile_text("x", Dialect::Standard), "(x)");
    assert_eq!(compile_text("y", Dialect::Standard), "(y)");
}

#[test]
fn test_unary_tag_follows_its_argument() {
    assert_eq!(compile_text("s(x)", Dialect::Standard), "((x)s)");
    assert_eq!(compile_text("l(c(y))", Dialect::Standard), "(((y)c)l)");
}

#[test]
fn test_single_terminal_argument_emits_no_marker() {
    let program = compile_text("t(x)", Dialect::Standard);
    assert!(!program.contains('*'));
    let program = compile_text("t(x)", Dialect::Legacy);
    assert!(!program.contains('*'));
}

#[test]
fn test_standard_product_places_marker_between_siblings() {
    assert_eq!(compile_text("s(x)*c(y)", Dialect::Standard), "((x)s*(y)c)");
    assert_eq!(
        compile_text("l(s(x)*t(y))", Dialect::Standard),
        "(((x)s*(y)t)l)"
    );
    assert_eq!(
        compile_text("s(x)*c(y)*t(x)", Dialect::Standard),
        "((x)s*(y)c*(x)t)"
    );
}

#[test]
fn test_legacy_product_trails_markers() {
    assert_eq!(compile_text("s(x)*c(y)", Dialect::Legacy), "((x)s(y)c*)");
    assert_eq!(
        compile_text("s(x)*c(y)*t(x)", Dialect::Legacy),
        "((x)s(y)c(x)t**)"
    );
}

#[test]
fn test_compile_tree_matches_compile_text() {
    let expr: Expr = "c(s(x)*t(l(y)))".parse().unwrap();
    let from_tree = compile(&expr);
    let from_text = Compiler::default().compile_str("c(s(x)*t(l(y)))").unwrap();
    assert_eq!(from_tree, from_text);
    assert_eq!(from_tree.dialect(), Dialect::Standard);
}

#[test]
fn test_compile_str_rejects_malformed_expression() {
    let compiler = Compiler::default();
    for text in ["s(x", "s(x))", "s(x)*", "k(y)", ""] {
        let err = compiler.compile_str(text).unwrap_err();
        assert!(format!("{:#}", err).contains("malformed expression"));
    }
}

// --- Program text ---

#[test]
fn test_program_round_trips_through_text() {
    let program: Program = "((x)s*((y)t)c)".parse().unwrap();
    assert_eq!(program.len(), 14);
    assert_eq!(program.to_string(), "((x)s*((y)t)c)");
    assert_eq!(program.tokens()[0], Token::Open);
    assert_eq!(program.tokens()[2], Token::Var(Variable::X));
    assert_eq!(program.tokens()[4], Token::Unary(UnaryOp::Sin));
    assert_eq!(program.tokens()[5], Token::Mul);
}

#[test]
fn test_program_parse_ignores_whitespace() {
    let program = Program::parse("( ( x ) s )", Dialect::Legacy).unwrap();
    assert_eq!(program.to_string(), "((x)s)");
    assert_eq!(program.dialect(), Dialect::Legacy);
}

#[test]
fn test_program_rejects_unknown_symbols_and_imbalance() {
    assert!("((x)q)".parse::<Program>().is_err());
    assert!("((x)s".parse::<Program>().is_err());
    assert!("(x))(".parse::<Program>().is_err());
    assert!(Program::new(vec![Token::Close, Token::Open], Dialect::Standard).is_err());
}

#[test]
fn test_single_root_check() {
    assert!(ensure_single_root(&"((x)s*(y)c)".parse().unwrap()).is_ok());
    assert!(ensure_single_root(&"(x)(y)".parse().unwrap()).is_err());
    assert!(ensure_single_root(&"(x)s".parse().unwrap()).is_err());
    assert!(ensure_single_root(&"".parse().unwrap()).is_err());
}

// --- Structure of generated programs ---

#[test]
fn test_generated_programs_are_balanced_single_roots() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut generator = ExprGenerator::new(&mut rng);
    for dialect in [Dialect::Standard, Dialect::Legacy] {
        let compiler = Compiler::new(dialect);
        for probability in [0.0, 0.5, 0.925, 0.999999] {
            for _ in 0..50 {
                let expr = generator.generate(probability);
                let program = compiler.compile(&expr);
                assert_eq!(program.bracket_balance(), 0, "{}", program);
                ensure_single_root(&program).unwrap();

                let markers = program.tokens().iter().filter(|t| **t == Token::Mul).count();
                let extra_siblings = expr.term_count() - count_tag_frames(&expr);
                assert_eq!(markers, extra_siblings, "{} -> {}", expr, program);
            }
        }
    }
}

/// Frames opened by tags; a frame with n siblings carries n - 1 markers.
fn count_tag_frames(expr: &Expr) -> usize {
    match expr {
        Expr::Var(_) => 0,
        Expr::Unary(term) => 1 + count_tag_frames(&term.arg),
        Expr::Product(terms) => 1 + terms.iter().map(|t| count_tag_frames(&t.arg)).sum::<usize>(),
    }
}
