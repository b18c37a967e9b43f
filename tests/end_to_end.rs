//! End-to-end checks of the generate → compile → evaluate → sample pipeline
//! through the public library API.

use exprart::compiler::{Compiler, Dialect, Program};
use exprart::expr::{Expr, ExprGenerator};
use exprart::sampler::{intensity, render, GridGeometry};
use exprart::vm::Vm;
use rand::rngs::StdRng;
use rand::SeedableRng;

const SAMPLE_POINTS: [(f64, f64); 5] = [(-1.0, 1.0), (0.0, 0.0), (0.5, 0.5), (0.3, -0.7), (1.0, -1.0)];

#[test_log::test]
fn generated_expressions_compile_and_evaluate_to_one_finite_scalar() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut generator = ExprGenerator::new(&mut rng);
    let compiler = Compiler::default();
    let mut vm = Vm::new();
    let mut checked = 0;

    for probability in [0.0, 0.5, 0.925, 0.999999] {
        for _ in 0..250 {
            let expr = generator.generate(probability);
            let program = compiler.compile(&expr);
            assert_eq!(program.bracket_balance(), 0, "{}", program);

            let reparsed: Expr = expr.to_string().parse().unwrap();
            assert_eq!(compiler.compile(&reparsed), program);

            for &(x, y) in &SAMPLE_POINTS {
                let value = vm
                    .evaluate(&program, x, y)
                    .unwrap_or_else(|e| panic!("{} at ({}, {}): {:#}", program, x, y, e));
                assert!(value.is_finite(), "{} at ({}, {}) = {}", expr, x, y, value);
            }
            checked += 1;
        }
    }
    assert_eq!(checked, 1000);
}

#[test_log::test]
fn seeded_pipeline_is_bit_identical_across_runs() {
    let run = |seed: u64| {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut generator = ExprGenerator::new(&mut rng);
        let compiler = Compiler::new(Dialect::Standard);
        let programs: [Program; 3] =
            std::array::from_fn(|_| compiler.compile(&generator.generate(0.925)));
        render(&programs, 12).unwrap()
    };
    assert_eq!(run(31), run(31));
}

#[test_log::test]
fn default_grid_corners_and_centre() {
    let geometry = GridGeometry::new(150).unwrap();
    assert_eq!(geometry.side(), 301);
    assert_eq!(geometry.sample_point(0, 0), (-1.0, 1.0));
    assert_eq!(geometry.sample_point(150, 150), (0.0, 0.0));
    assert_eq!(geometry.sample_point(300, 300), (1.0, -1.0));

    let planes = render(
        &["(x)".parse().unwrap(), "(y)".parse().unwrap(), "((x)s)".parse().unwrap()],
        150,
    )
    .unwrap();
    assert_eq!(planes[0].get(0, 0), Some(intensity(-1.0)));
    assert_eq!(planes[1].get(0, 0), Some(255));
    assert_eq!(planes[0].get(150, 150), Some(128));
    assert_eq!(planes[1].get(300, 300), Some(0));
}
