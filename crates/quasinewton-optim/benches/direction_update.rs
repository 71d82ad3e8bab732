//! Benchmarks for the L-BFGS direction update.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quasinewton_core::prelude::*;
use quasinewton_optim::{Lbfgs, LbfgsConfig, LbfgsHistory};

/// f(x) = sum_i (i + 1) x_i^2
#[derive(Debug)]
struct DiagonalQuadratic {
    dim: usize,
}

impl FirstOrderFunction<f64> for DiagonalQuadratic {
    fn evaluate(&self, x: &DVector<f64>, gradient: Option<&mut DVector<f64>>) -> Result<f64> {
        if let Some(g) = gradient {
            for i in 0..self.dim {
                g[i] = 2.0 * (i + 1) as f64 * x[i];
            }
        }
        Ok((0..self.dim).map(|i| (i + 1) as f64 * x[i] * x[i]).sum())
    }

    fn num_parameters(&self) -> usize {
        self.dim
    }
}

/// Fills `history` with pairs from the Hessian diag(2, 4, ..., 2n).
fn full_history(dim: usize, memory_size: usize) -> LbfgsHistory<f64> {
    let mut history = LbfgsHistory::new(dim, memory_size, f64::SECANT_TOLERANCE);
    for k in 0..memory_size {
        let delta_x = DVector::from_fn(dim, |i, _| ((i + k) % 7) as f64 - 2.5);
        let delta_gradient = DVector::from_fn(dim, |i, _| 2.0 * (i + 1) as f64 * delta_x[i]);
        let dot = delta_x.dot(&delta_gradient);
        if let Some(mut slot) = history.acquire_write_slot(dot) {
            slot.delta_x.copy_from(&delta_x);
            slot.delta_gradient.copy_from(&delta_gradient);
            *slot.delta_x_dot_delta_gradient = dot;
        }
    }
    history
}

fn benchmark_two_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_loop_direction");

    for &dim in &[10, 100, 1000] {
        for &memory_size in &[5, 20] {
            let mut history = full_history(dim, memory_size);
            let gradient = DVector::from_fn(dim, |i, _| 1.0 + (i % 3) as f64);
            let mut direction = DVector::zeros(dim);

            group.bench_with_input(
                BenchmarkId::new(format!("m={}", memory_size), dim),
                &dim,
                |b, _| {
                    b.iter(|| {
                        let mut scale = 1.0;
                        two_loop_direction(
                            &DirectionRequest::first(black_box(&gradient), true),
                            &mut history,
                            &mut scale,
                            &mut direction,
                        )
                    })
                },
            );
        }
    }

    group.finish();
}

fn benchmark_driver_iterations(c: &mut Criterion) {
    let mut group = c.benchmark_group("lbfgs_driver");

    for &dim in &[10, 100] {
        let problem = GradientProblem::new(Box::new(DiagonalQuadratic { dim }));
        let evaluator = GradientProblemEvaluator::new(&problem);
        let options = EvaluateOptions::default();

        group.bench_with_input(BenchmarkId::new("fixed_step", dim), &dim, |b, &dim| {
            b.iter(|| {
                let mut lbfgs = Lbfgs::for_evaluator(LbfgsConfig::new().with_memory_size(10), &evaluator)
                    .expect("valid configuration");
                let mut x = DVector::from_element(dim, 1.0);
                let mut gradient = DVector::zeros(dim);
                let mut direction = DVector::zeros(dim);
                let mut step_size = None;

                for _ in 0..20 {
                    evaluator
                        .evaluate(&options, &x, None, Some(&mut gradient), None)
                        .expect("quadratic evaluates everywhere");
                    if lbfgs
                        .next_direction(&evaluator, &gradient, step_size, &mut direction)
                        .is_err()
                    {
                        break;
                    }
                    x.axpy(0.01, &direction, 1.0);
                    step_size = Some(0.01);
                }
                black_box(x)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_two_loop, benchmark_driver_iterations);
criterion_main!(benches);
