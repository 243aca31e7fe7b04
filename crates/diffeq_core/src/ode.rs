//! ODE systems assembled from scalar right-hand-side functions.

use std::fmt;
use std::ops::Index;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SolverError};
use crate::solvers::{AdamsBashforth4, ExplicitEuler, ImplicitEuler, RK4};
use crate::traits::{BoxedFunction, DynamicalSystem, Steppable};

/// Fixed-step integration method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    ExplicitEuler,
    ImplicitEuler,
    ExplicitRungeKutta,
    ExplicitAdamsBashforth,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::ExplicitEuler,
        Method::ImplicitEuler,
        Method::ExplicitRungeKutta,
        Method::ExplicitAdamsBashforth,
    ];

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Method::ExplicitEuler => "Explicit Euler method",
            Method::ImplicitEuler => "Implicit Euler method",
            Method::ExplicitRungeKutta => "Explicit 4th-order Runge-Kutta method",
            Method::ExplicitAdamsBashforth => "Explicit 4th-order Adams-Bashforth method",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Method {
    type Err = SolverError;

    /// Accepts the viewer's command spellings, case-insensitively:
    /// `expliciteuler` or `explicit_euler`, and so on.
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "expliciteuler" | "explicit_euler" => Ok(Method::ExplicitEuler),
            "impliciteuler" | "implicit_euler" => Ok(Method::ImplicitEuler),
            "explicitrungekutta" | "explicit_runge_kutta" => Ok(Method::ExplicitRungeKutta),
            "explicitadamsbashforth"
            | "explicit_adams_bashforth"
            | "explicitadamsbashfort"
            | "explicit_adams_bashfort" => Ok(Method::ExplicitAdamsBashforth),
            _ => Err(SolverError::UnknownMethod(s.to_string())),
        }
    }
}

/// States produced by a solve, one per completed step, time slot dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    dimension: usize,
    states: Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            states: Vec::new(),
        }
    }

    pub fn with_capacity(dimension: usize, steps: usize) -> Self {
        Self {
            dimension,
            states: Vec::with_capacity(steps),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[f64]> {
        self.states.get(index).map(Vec::as_slice)
    }

    pub fn last(&self) -> Option<&[f64]> {
        self.states.last().map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.states.iter().map(Vec::as_slice)
    }

    /// Records the dynamical part of a full state.
    fn push_state(&mut self, state: &[f64]) {
        self.states.push(state[..self.dimension].to_vec());
    }

    /// Keeps at most `points` states, sampled every `len / points` steps
    /// starting from the first.
    pub fn decimate(&self, points: usize) -> Trajectory {
        let points = points.min(self.len());
        if points == 0 {
            return Trajectory::new(self.dimension);
        }
        let stride = self.len() / points;
        Trajectory {
            dimension: self.dimension,
            states: self
                .states
                .iter()
                .step_by(stride)
                .take(points)
                .cloned()
                .collect(),
        }
    }

    pub fn into_states(self) -> Vec<Vec<f64>> {
        self.states
    }
}

impl Index<usize> for Trajectory {
    type Output = [f64];

    fn index(&self, index: usize) -> &[f64] {
        &self.states[index]
    }
}

/// `dx_i/dt = f_i(x, t)` for `i < n`, evaluated on states `[x_0 .. x_{n-1}, t]`.
pub struct DifferentialEquationSystem<'a> {
    functions: Vec<BoxedFunction<'a>>,
}

impl<'a> DifferentialEquationSystem<'a> {
    pub fn new(functions: Vec<BoxedFunction<'a>>) -> Self {
        Self { functions }
    }

    /// Integrates from `x0` (state values followed by the initial time) for
    /// `steps` steps of size `dt`.
    ///
    /// `dt` is not validated: zero or negative steps give a frozen or
    /// time-reversed trajectory, and non-finite values propagate.
    pub fn solve(&self, method: Method, x0: &[f64], dt: f64, steps: usize) -> Result<Trajectory> {
        let dim = self.dimension();
        match method {
            Method::ExplicitEuler => self.integrate(ExplicitEuler::new(dim), x0, dt, steps),
            Method::ImplicitEuler => self.integrate(ImplicitEuler::new(dim), x0, dt, steps),
            Method::ExplicitRungeKutta => self.integrate(RK4::new(dim), x0, dt, steps),
            Method::ExplicitAdamsBashforth => {
                self.integrate(AdamsBashforth4::new(dim), x0, dt, steps)
            }
        }
    }

    fn integrate(
        &self,
        mut stepper: impl Steppable,
        x0: &[f64],
        dt: f64,
        steps: usize,
    ) -> Result<Trajectory> {
        let dim = self.dimension();
        if x0.len() != dim + 1 {
            return Err(SolverError::DimensionMismatch {
                expected: dim + 1,
                got: x0.len(),
            });
        }

        let mut state = x0.to_vec();
        let mut trajectory = Trajectory::with_capacity(dim, steps);
        for _ in 0..steps {
            stepper.step(self, &mut state, dt)?;
            trajectory.push_state(&state);
        }
        Ok(trajectory)
    }
}

impl DynamicalSystem for DifferentialEquationSystem<'_> {
    fn dimension(&self) -> usize {
        self.functions.len()
    }

    fn component(&self, index: usize, x: &[f64]) -> f64 {
        self.functions[index].calculate(x)
    }
}
