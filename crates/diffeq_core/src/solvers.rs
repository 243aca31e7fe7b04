use std::collections::VecDeque;

use crate::equation_system::{EquationSystem, NewtonSettings};
use crate::error::{Result, SolverError};
use crate::traits::{boxed, BoxedFunction, DynamicalSystem, Steppable};

fn check_state(system: &impl DynamicalSystem, state: &[f64]) -> Result<usize> {
    let dim = system.dimension();
    if state.len() != dim + 1 {
        return Err(SolverError::DimensionMismatch {
            expected: dim + 1,
            got: state.len(),
        });
    }
    Ok(dim)
}

/// Forward Euler: `x += f(x, t) dt`.
pub struct ExplicitEuler {
    dx: Vec<f64>,
}

impl ExplicitEuler {
    pub fn new(dim: usize) -> Self {
        Self { dx: vec![0.0; dim] }
    }
}

impl Steppable for ExplicitEuler {
    fn step(&mut self, system: &impl DynamicalSystem, state: &mut [f64], dt: f64) -> Result<()> {
        let dim = check_state(system, state)?;
        system.apply(state, &mut self.dx);
        for i in 0..dim {
            state[i] += self.dx[i] * dt;
        }
        state[dim] += dt;
        Ok(())
    }
}

/// Backward Euler.
///
/// Each step solves `dx - f(x + dx, t) dt = 0` for the increment `dx` with
/// [`EquationSystem`], starting from the explicit Euler increment. Time inside
/// the residuals stays at the start-of-step value.
pub struct ImplicitEuler {
    settings: NewtonSettings,
    guess: Vec<f64>,
}

impl ImplicitEuler {
    pub fn new(dim: usize) -> Self {
        Self::with_settings(dim, NewtonSettings::default())
    }

    pub fn with_settings(dim: usize, settings: NewtonSettings) -> Self {
        Self {
            settings,
            guess: vec![0.0; dim],
        }
    }
}

/// Builds the backward-Euler residuals around an immutable snapshot of the
/// start-of-step state.
fn increment_residuals<'a, S: DynamicalSystem>(
    system: &'a S,
    frozen: &'a [f64],
    dt: f64,
) -> Vec<BoxedFunction<'a>> {
    let dim = system.dimension();
    (0..dim)
        .map(move |j| {
            boxed(move |dx: &[f64]| {
                let mut arg = frozen.to_vec();
                for k in 0..dim {
                    arg[k] += dx[k];
                }
                dx[j] - system.component(j, &arg) * dt
            })
        })
        .collect()
}

impl Steppable for ImplicitEuler {
    fn step(&mut self, system: &impl DynamicalSystem, state: &mut [f64], dt: f64) -> Result<()> {
        let dim = check_state(system, state)?;
        self.guess.resize(dim, 0.0);
        system.apply(state, &mut self.guess);
        for value in self.guess.iter_mut() {
            *value *= dt;
        }

        let frozen = state.to_vec();
        let equations = EquationSystem::new(increment_residuals(system, &frozen, dt));
        let solution = equations.solve(&self.guess, self.settings)?;

        for i in 0..dim {
            state[i] += solution.state[i];
        }
        state[dim] += dt;
        Ok(())
    }
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4 {
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    tmp: Vec<f64>,
}

impl RK4 {
    pub fn new(dim: usize) -> Self {
        Self {
            k1: vec![0.0; dim],
            k2: vec![0.0; dim],
            k3: vec![0.0; dim],
            k4: vec![0.0; dim],
            tmp: vec![0.0; dim + 1],
        }
    }
}

impl Steppable for RK4 {
    fn step(&mut self, system: &impl DynamicalSystem, state: &mut [f64], dt: f64) -> Result<()> {
        let dim = check_state(system, state)?;
        let t0 = state[dim];

        // k1 = f(t, y)
        system.apply(state, &mut self.k1);

        // k2 = f(t + dt/2, y + k1*dt/2)
        for i in 0..dim {
            self.tmp[i] = state[i] + self.k1[i] * dt / 2.0;
        }
        self.tmp[dim] = t0 + dt / 2.0;
        system.apply(&self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + k2*dt/2)
        for i in 0..dim {
            self.tmp[i] = state[i] + self.k2[i] * dt / 2.0;
        }
        self.tmp[dim] = t0 + dt / 2.0;
        system.apply(&self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + k3*dt)
        for i in 0..dim {
            self.tmp[i] = state[i] + self.k3[i] * dt;
        }
        self.tmp[dim] = t0 + dt;
        system.apply(&self.tmp, &mut self.k4);

        // y_next = y + dt * (k1 + 2k2 + 2k3 + k4) / 6
        for i in 0..dim {
            state[i] += dt * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]) / 6.0;
        }

        state[dim] = t0 + dt;
        Ok(())
    }
}

/// Number of derivative evaluations the multistep formula consumes.
const ADAMS_HISTORY: usize = 4;

/// Four-step explicit Adams-Bashforth stepper.
///
/// The first three steps are taken with [`RK4`]. The derivative at each of
/// those points is recorded at time `t0 + k dt`, and from then on
///
/// `x += (f[n-3] - 5 f[n-2] + 19 f[n-1] + 9 f[n]) dt / 24`
///
/// with the derivative window sliding by one per step. A stepper instance
/// carries history, so use a fresh one per trajectory.
pub struct AdamsBashforth4 {
    bootstrap: RK4,
    history: VecDeque<Vec<f64>>,
    origin: f64,
    bootstrap_steps: usize,
}

impl AdamsBashforth4 {
    pub fn new(dim: usize) -> Self {
        Self {
            bootstrap: RK4::new(dim),
            history: VecDeque::with_capacity(ADAMS_HISTORY),
            origin: 0.0,
            bootstrap_steps: 0,
        }
    }

    fn record(&mut self, system: &impl DynamicalSystem, point: &[f64]) {
        let mut derivative = vec![0.0; system.dimension()];
        system.apply(point, &mut derivative);
        if self.history.len() == ADAMS_HISTORY {
            self.history.pop_front();
        }
        self.history.push_back(derivative);
    }
}

impl Steppable for AdamsBashforth4 {
    fn step(&mut self, system: &impl DynamicalSystem, state: &mut [f64], dt: f64) -> Result<()> {
        let dim = check_state(system, state)?;

        if self.history.is_empty() {
            self.origin = state[dim];
            self.record(system, state);
        }

        if self.bootstrap_steps < ADAMS_HISTORY - 1 {
            self.bootstrap.step(system, state, dt)?;
            self.bootstrap_steps += 1;

            let mut snapshot = state.to_vec();
            snapshot[dim] = self.origin + self.bootstrap_steps as f64 * dt;
            self.record(system, &snapshot);
            if self.bootstrap_steps == ADAMS_HISTORY - 1 {
                // The multistep phase continues from the recorded time stamp.
                state[dim] = snapshot[dim];
            }
            return Ok(());
        }

        let f = &self.history;
        for i in 0..dim {
            state[i] += (f[0][i] - 5.0 * f[1][i] + 19.0 * f[2][i] + 9.0 * f[3][i]) * dt / 24.0;
        }
        state[dim] += dt;
        self.record(system, state);
        Ok(())
    }
}
