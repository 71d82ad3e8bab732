//! Property tests for the two-loop recursion.

use proptest::prelude::*;
use quasinewton_core::prelude::*;

const DIM: usize = 3;

/// Bounded history that appends until full and then rejects.
#[derive(Debug)]
struct AppendOnlyHistory {
    delta_x: DMatrix<f64>,
    delta_gradient: DMatrix<f64>,
    dots: Vec<f64>,
}

impl AppendOnlyHistory {
    fn new(capacity: usize) -> Self {
        Self {
            delta_x: DMatrix::zeros(DIM, capacity),
            delta_gradient: DMatrix::zeros(DIM, capacity),
            dots: Vec::with_capacity(capacity),
        }
    }
}

impl CurvatureHistory<f64> for AppendOnlyHistory {
    fn len(&self) -> usize {
        self.dots.len()
    }

    // Accepts any curvature; the recursion must do the filtering.
    fn acquire_write_slot(&mut self, _dot: f64) -> Option<WriteSlot<'_, f64>> {
        let col = self.dots.len();
        if col == self.delta_x.ncols() {
            return None;
        }
        self.dots.push(0.0);
        Some(WriteSlot {
            delta_x: self.delta_x.column_mut(col),
            delta_gradient: self.delta_gradient.column_mut(col),
            delta_x_dot_delta_gradient: &mut self.dots[col],
        })
    }

    fn acquire_read_slot(&self, index: usize) -> Option<ReadSlot<'_, f64>> {
        Some(ReadSlot {
            delta_x: self.delta_x.column(index),
            delta_gradient: self.delta_gradient.column(index),
            delta_x_dot_delta_gradient: *self.dots.get(index)?,
        })
    }
}

fn vector() -> impl Strategy<Value = DVector<f64>> {
    prop::collection::vec(-10.0..10.0f64, DIM).prop_map(DVector::from_vec)
}

proptest! {
    #[test]
    fn prop_non_positive_curvature_is_never_stored(
        steps in prop::collection::vec((vector(), 0.01..2.0f64, vector(), vector()), 1..8),
    ) {
        let mut history = AppendOnlyHistory::new(16);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(DIM);

        for (previous_direction, step_size, previous_gradient, gradient) in &steps {
            let request = DirectionRequest::after_step(
                PreviousIterate {
                    search_direction: previous_direction,
                    step_size: *step_size,
                    gradient: previous_gradient,
                },
                gradient,
                true,
            );
            let _ = two_loop_direction(&request, &mut history, &mut scale, &mut direction);
            prop_assert!(history.dots.iter().all(|dot| *dot > 0.0));
            prop_assert!(scale > 0.0);
        }
    }

    #[test]
    fn prop_successful_direction_descends(
        steps in prop::collection::vec((vector(), 0.01..2.0f64, vector(), vector()), 1..8),
    ) {
        let mut history = AppendOnlyHistory::new(16);
        let mut scale = 1.0;
        let mut direction = DVector::zeros(DIM);

        for (previous_direction, step_size, previous_gradient, gradient) in &steps {
            let request = DirectionRequest::after_step(
                PreviousIterate {
                    search_direction: previous_direction,
                    step_size: *step_size,
                    gradient: previous_gradient,
                },
                gradient,
                true,
            );
            if let Ok(dot) = two_loop_direction(&request, &mut history, &mut scale, &mut direction) {
                prop_assert!(dot < 0.0);
                prop_assert_eq!(dot, direction.dot(gradient));
            }
        }
    }

    #[test]
    fn prop_empty_history_is_scaled_steepest_descent(
        gradient in vector(),
        scale in 0.1..10.0f64,
    ) {
        prop_assume!(gradient.norm_squared() > 0.0);
        let mut history = AppendOnlyHistory::new(4);
        let mut scale_cell = scale;
        let mut direction = DVector::zeros(DIM);

        let dot = two_loop_direction(
            &DirectionRequest::first(&gradient, true),
            &mut history,
            &mut scale_cell,
            &mut direction,
        ).unwrap();

        prop_assert_eq!(direction, -(&gradient * scale));
        prop_assert!(dot < 0.0);
        prop_assert_eq!(scale_cell, scale);
    }
}
