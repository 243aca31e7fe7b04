//! Derivative-free root finding for systems of scalar equations.
//!
//! Each iteration takes the Newton direction of the finite-difference
//! Jacobian and scales it by a step length found with a one-dimensional
//! search on the sum of squared residuals.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::linear;
use crate::traits::{BoxedFunction, ScalarFunction};

const LINE_SEARCH_PRECISION: f64 = 1e-6;
const LINE_SEARCH_START: f64 = 1.0;
const LINE_SEARCH_INITIAL_STEP: f64 = 0.5;
const BRACKET_GROWTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewtonSettings {
    /// Stop once the infinity norm of the Newton direction drops below this.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for NewtonSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewtonSolution {
    pub state: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Infinity norm of the last Newton direction.
    pub step_norm: f64,
    pub discrepancy: f64,
}

/// Result of a line search along a fixed direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMinimum {
    /// Step length returned by the refinement.
    pub step: f64,
    /// First doubled trial at which the discrepancy stopped decreasing.
    pub bracket: f64,
}

/// A square system of residual equations `f_i(x) = 0`.
pub struct EquationSystem<'a> {
    functions: Vec<BoxedFunction<'a>>,
}

impl<'a> EquationSystem<'a> {
    /// `functions` must vanish at the solution; their count fixes the arity.
    pub fn new(functions: Vec<BoxedFunction<'a>>) -> Self {
        Self { functions }
    }

    pub fn dimension(&self) -> usize {
        self.functions.len()
    }

    /// Sum of squared residuals at `x`.
    pub fn discrepancy(&self, x: &[f64]) -> f64 {
        self.functions
            .iter()
            .map(|f| {
                let q = f.calculate(x);
                q * q
            })
            .sum()
    }

    /// Discrepancy at `x0 + t * d`.
    pub fn discrepancy_along(&self, x0: &[f64], d: &[f64], t: f64) -> Result<f64> {
        self.check_ray(x0, d)?;
        Ok(self.ray_discrepancy(x0, d, t))
    }

    fn ray_discrepancy(&self, x0: &[f64], d: &[f64], t: f64) -> f64 {
        let x: Vec<f64> = x0.iter().zip(d).map(|(xi, di)| xi + t * di).collect();
        self.discrepancy(&x)
    }

    fn check_ray(&self, x0: &[f64], d: &[f64]) -> Result<()> {
        let dim = self.dimension();
        for got in [x0.len(), d.len()] {
            if got != dim {
                return Err(SolverError::DimensionMismatch { expected: dim, got });
            }
        }
        Ok(())
    }

    /// Solves `J(x) dx = -F(x)` with the finite-difference Jacobian.
    pub fn newton_direction(&self, x: &[f64]) -> Result<Vec<f64>> {
        let dim = self.dimension();
        let mut jacobian = DMatrix::zeros(dim, dim);
        let mut rhs = DVector::zeros(dim);
        for (i, f) in self.functions.iter().enumerate() {
            rhs[i] = -f.calculate(x);
            let row = f.gradient(x);
            if row.len() != dim {
                return Err(SolverError::DimensionMismatch {
                    expected: dim,
                    got: row.len(),
                });
            }
            for (j, value) in row.into_iter().enumerate() {
                jacobian[(i, j)] = value;
            }
        }
        let delta = linear::solve(jacobian, rhs)?;
        Ok(delta.iter().copied().collect())
    }

    /// Finds a step length `t` that locally minimizes the discrepancy on the
    /// ray `x + t * d`.
    pub fn line_minimum(&self, x: &[f64], d: &[f64]) -> Result<LineMinimum> {
        self.check_ray(x, d)?;
        let bracket = self.bracket(x, d);
        let along = |t: &[f64]| self.ray_discrepancy(x, d, t[0]);
        let step = gradient_descent(
            &along,
            LINE_SEARCH_START,
            LINE_SEARCH_INITIAL_STEP,
            LINE_SEARCH_PRECISION,
        );
        Ok(LineMinimum { step, bracket })
    }

    fn bracket(&self, x: &[f64], d: &[f64]) -> f64 {
        let mut best = self
            .discrepancy(x)
            .min(self.ray_discrepancy(x, d, LINE_SEARCH_START));
        let mut r = LINE_SEARCH_START;
        loop {
            r *= BRACKET_GROWTH;
            let dr = self.ray_discrepancy(x, d, r);
            best = best.min(dr);
            // Also exits on NaN once the ray overflows.
            if !(dr <= best) {
                return r;
            }
        }
    }

    /// Damped Newton iteration from `x0`.
    ///
    /// Runs until the Newton direction is shorter than `settings.tolerance`
    /// in the infinity norm or the iteration budget is spent. Running out of
    /// iterations is not an error: the last iterate comes back with
    /// `converged == false`.
    pub fn solve(&self, x0: &[f64], settings: NewtonSettings) -> Result<NewtonSolution> {
        let dim = self.dimension();
        if x0.len() != dim {
            return Err(SolverError::DimensionMismatch {
                expected: dim,
                got: x0.len(),
            });
        }

        let mut x = x0.to_vec();
        let mut iterations = 0;
        let mut step_norm = f64::INFINITY;
        let mut converged = false;
        while iterations < settings.max_iterations {
            let dx = self.newton_direction(&x)?;
            let k = self.line_minimum(&x, &dx)?.step;
            for i in 0..dim {
                x[i] += k * dx[i];
            }
            iterations += 1;
            step_norm = infinity_norm(&dx);
            if step_norm < settings.tolerance {
                converged = true;
                break;
            }
        }

        let discrepancy = self.discrepancy(&x);
        Ok(NewtonSolution {
            state: x,
            iterations,
            converged,
            step_norm,
            discrepancy,
        })
    }
}

/// Minimizes a function of one variable by step-halving descent.
///
/// The derivative sign at the current best point picks the direction. A
/// trial point that strictly improves on the best value is accepted and the
/// derivative is re-estimated there; otherwise the step is halved. Returns
/// once the step is no larger than `precision`.
///
/// `f` is evaluated on one-element slices.
pub fn gradient_descent(
    f: &impl ScalarFunction,
    x0: f64,
    initial_step: f64,
    precision: f64,
) -> f64 {
    let mut x = x0;
    let mut min = f.calculate(&[x]);
    let mut derivative = f.gradient(&[x])[0];
    let mut step = initial_step;
    while step > precision {
        let trial = if derivative < 0.0 { x + step } else { x - step };
        let value = f.calculate(&[trial]);
        if value < min {
            min = value;
            x = trial;
            derivative = f.gradient(&[x])[0];
        } else {
            step /= 2.0;
        }
    }
    x
}

/// Largest absolute component. NaN in the first slot is kept, so a NaN
/// direction never passes a tolerance check.
pub fn infinity_norm(v: &[f64]) -> f64 {
    let Some(first) = v.first() else {
        return 0.0;
    };
    let mut norm = first.abs();
    for value in &v[1..] {
        if value.abs() > norm {
            norm = value.abs();
        }
    }
    norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::boxed;

    fn linear_system(a: [[f64; 3]; 3], b: [f64; 3]) -> EquationSystem<'static> {
        let functions = (0..3)
            .map(move |i| {
                boxed(move |x: &[f64]| {
                    a[i][0] * x[0] + a[i][1] * x[1] + a[i][2] * x[2] - b[i]
                })
            })
            .collect();
        EquationSystem::new(functions)
    }

    #[test]
    fn gradient_descent_finds_parabola_minimum() {
        let f = |t: &[f64]| (t[0] - 3.0) * (t[0] - 3.0);
        let t = gradient_descent(&f, 0.0, 1.0, 1e-6);
        assert!((t - 3.0).abs() < 1e-6, "got {t}");
    }

    #[test]
    fn gradient_descent_stays_put_when_nothing_improves() {
        let f = |_: &[f64]| 1.0;
        let t = gradient_descent(&f, 0.25, 0.5, 1e-3);
        assert_eq!(t, 0.25);
    }

    #[test]
    fn discrepancy_sums_squares() {
        let system = EquationSystem::new(vec![
            boxed(|x: &[f64]| x[0] - 1.0),
            boxed(|x: &[f64]| x[1] + 2.0),
        ]);
        assert_eq!(system.discrepancy(&[0.0, 0.0]), 5.0);
        assert_eq!(system.discrepancy(&[1.0, -2.0]), 0.0);
        assert_eq!(system.discrepancy_along(&[0.0, 0.0], &[1.0, -2.0], 1.0), Ok(0.0));
        assert_eq!(system.discrepancy_along(&[0.0, 0.0], &[1.0, -2.0], 0.5), Ok(1.25));
    }

    #[test]
    fn ray_operations_reject_short_slices() {
        let system = EquationSystem::new(vec![
            boxed(|x: &[f64]| x[0] - 1.0),
            boxed(|x: &[f64]| x[1] + 2.0),
        ]);
        assert_eq!(
            system.discrepancy_along(&[0.0], &[1.0, -2.0], 1.0),
            Err(SolverError::DimensionMismatch { expected: 2, got: 1 })
        );
        assert_eq!(
            system.discrepancy_along(&[0.0, 0.0], &[1.0], 1.0),
            Err(SolverError::DimensionMismatch { expected: 2, got: 1 })
        );
        let err = system
            .line_minimum(&[0.0, 0.0], &[])
            .expect_err("empty direction should be rejected");
        assert_eq!(err, SolverError::DimensionMismatch { expected: 2, got: 0 });
    }

    #[test]
    fn newton_direction_is_exact_for_linear_residuals() {
        let system = EquationSystem::new(vec![
            boxed(|x: &[f64]| 2.0 * x[0] + x[1] - 3.0),
            boxed(|x: &[f64]| x[0] + 3.0 * x[1] - 5.0),
        ]);
        let dx = system.newton_direction(&[0.0, 0.0]).expect("direction");
        assert!((dx[0] - 0.8).abs() < 1e-8);
        assert!((dx[1] - 1.4).abs() < 1e-8);
    }

    #[test]
    fn line_minimum_takes_full_newton_step_on_linear_problem() {
        let system = EquationSystem::new(vec![boxed(|x: &[f64]| x[0] - 4.0)]);
        let search = system
            .line_minimum(&[0.0], &[4.0])
            .expect("line search");
        assert!((search.step - 1.0).abs() < 1e-6);
        assert_eq!(search.bracket, 2.0);
    }

    #[test]
    fn solve_converges_on_linear_system_in_few_iterations() {
        let a = [[3.0, 1.0, 0.0], [1.0, 4.0, 2.0], [0.0, 2.0, 5.0]];
        let expected = [1.0, -2.0, 0.5];
        let mut b = [0.0; 3];
        for i in 0..3 {
            b[i] = (0..3).map(|j| a[i][j] * expected[j]).sum();
        }
        let system = linear_system(a, b);

        let solution = system
            .solve(&[0.0, 0.0, 0.0], NewtonSettings::default())
            .expect("solve should succeed");

        assert!(solution.converged);
        assert!(solution.iterations <= 3, "took {} iterations", solution.iterations);
        for (x, e) in solution.state.iter().zip(expected) {
            assert!((x - e).abs() < 1e-6, "got {:?}", solution.state);
        }
        assert!(solution.discrepancy < 1e-12);
    }

    #[test]
    fn solve_finds_root_of_nonlinear_system() {
        let system = EquationSystem::new(vec![
            boxed(|x: &[f64]| x[0] * x[0] + x[1] * x[1] - 4.0),
            boxed(|x: &[f64]| x[0] - x[1]),
        ]);
        let solution = system
            .solve(&[1.0, 0.5], NewtonSettings::default())
            .expect("solve should succeed");
        let root = std::f64::consts::SQRT_2;
        assert!(solution.converged);
        assert!((solution.state[0] - root).abs() < 1e-6);
        assert!((solution.state[1] - root).abs() < 1e-6);
    }

    #[test]
    fn solve_returns_last_iterate_when_budget_runs_out() {
        let system = EquationSystem::new(vec![boxed(|x: &[f64]| x[0] * x[0] - 2.0)]);
        let settings = NewtonSettings {
            tolerance: 1e-6,
            max_iterations: 1,
        };
        let solution = system.solve(&[10.0], settings).expect("solve should succeed");
        assert_eq!(solution.iterations, 1);
        assert!(!solution.converged);
        assert!(solution.state[0] < 10.0);
    }

    #[test]
    fn solve_rejects_wrong_initial_guess_length() {
        let system = EquationSystem::new(vec![boxed(|x: &[f64]| x[0])]);
        let err = system
            .solve(&[0.0, 1.0], NewtonSettings::default())
            .expect_err("length mismatch");
        assert_eq!(err, SolverError::DimensionMismatch { expected: 1, got: 2 });
    }

    #[test]
    fn solve_surfaces_singular_jacobian() {
        let system = EquationSystem::new(vec![
            boxed(|x: &[f64]| x[0] + x[1]),
            boxed(|x: &[f64]| 2.0 * (x[0] + x[1])),
        ]);
        let err = system
            .solve(&[0.0, 0.0], NewtonSettings::default())
            .expect_err("dependent equations have no Newton direction");
        assert!(matches!(err, SolverError::SingularMatrix { .. }));
    }

    #[test]
    fn infinity_norm_picks_largest_magnitude() {
        assert_eq!(infinity_norm(&[1.0, -3.0, 2.0]), 3.0);
        assert_eq!(infinity_norm(&[]), 0.0);
        assert!(infinity_norm(&[f64::NAN, 5.0]).is_nan());
    }
}
