//! Ready-made systems and the Lorenz run used by the attractor viewer.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ode::{DifferentialEquationSystem, Method, Trajectory};
use crate::traits::boxed;

/// `x0' = x1`, `x1' = -x0`. Starting from `(0, 1)` at `t = 0` the exact
/// solution is `(sin t, cos t)`.
pub fn harmonic_oscillator() -> DifferentialEquationSystem<'static> {
    DifferentialEquationSystem::new(vec![
        boxed(|x: &[f64]| x[1]),
        boxed(|x: &[f64]| -x[0]),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LorenzParameters {
    pub r: f64,
    pub b: f64,
    pub sigma: f64,
}

impl Default for LorenzParameters {
    fn default() -> Self {
        Self {
            r: 24.0,
            b: 8.0 / 3.0,
            sigma: 10.0,
        }
    }
}

/// The Lorenz system over `(x, y, z, t)`.
pub fn lorenz(params: LorenzParameters) -> DifferentialEquationSystem<'static> {
    let LorenzParameters { r, b, sigma } = params;
    DifferentialEquationSystem::new(vec![
        boxed(move |x: &[f64]| sigma * (x[1] - x[0])),
        boxed(move |x: &[f64]| -x[0] * x[2] + r * x[0] - x[1]),
        boxed(move |x: &[f64]| x[0] * x[1] - b * x[2]),
    ])
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub method: Method,
    pub dt: f64,
    pub iterations: usize,
    /// Number of states kept for display.
    pub points: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            method: Method::ExplicitEuler,
            dt: 1e-3,
            iterations: 100_000,
            points: 10_000,
        }
    }
}

/// Integrates the Lorenz system from `initial` at `t = 0` and thins the
/// result down to `settings.points` evenly spaced states.
///
/// `points` larger than `iterations` is clamped rather than rejected.
pub fn simulate_lorenz(
    params: LorenzParameters,
    settings: SimulationSettings,
    initial: [f64; 3],
) -> Result<Trajectory> {
    if settings.iterations == 0 {
        bail!("iterations must be greater than zero.");
    }
    if settings.points == 0 {
        bail!("points must be greater than zero.");
    }
    let points = settings.points.min(settings.iterations);

    let system = lorenz(params);
    let x0 = [initial[0], initial[1], initial[2], 0.0];
    let trajectory = system
        .solve(settings.method, &x0, settings.dt, settings.iterations)
        .with_context(|| format!("Failed to integrate Lorenz system ({}).", settings.method))?;
    Ok(trajectory.decimate(points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DynamicalSystem;

    #[test]
    fn oscillator_preset_follows_sine_and_cosine() {
        let trajectory = harmonic_oscillator()
            .solve(Method::ExplicitRungeKutta, &[0.0, 1.0, 0.0], 0.01, 100)
            .expect("solve");
        let last = trajectory.last().expect("non-empty");
        assert!((last[0] - 1.0_f64.sin()).abs() < 1e-8);
        assert!((last[1] - 1.0_f64.cos()).abs() < 1e-8);
    }

    #[test]
    fn lorenz_vector_field_matches_equations() {
        let system = lorenz(LorenzParameters::default());
        assert_eq!(system.dimension(), 3);
        let mut out = [0.0; 3];
        system.apply(&[1.0, 2.0, 3.0, 0.0], &mut out);
        assert_eq!(out[0], 10.0);
        assert_eq!(out[1], -3.0 + 24.0 - 2.0);
        assert_eq!(out[2], 2.0 - (8.0 / 3.0) * 3.0);
    }

    #[test]
    fn lorenz_origin_is_an_equilibrium() {
        let system = lorenz(LorenzParameters::default());
        for method in Method::ALL {
            let trajectory = system
                .solve(method, &[0.0, 0.0, 0.0, 0.0], 1e-2, 20)
                .expect("solve");
            assert!(trajectory.iter().all(|s| s.iter().all(|v| *v == 0.0)));
        }
    }

    #[test]
    fn simulate_lorenz_decimates_to_requested_points() {
        let settings = SimulationSettings {
            method: Method::ExplicitRungeKutta,
            dt: 1e-3,
            iterations: 1_000,
            points: 100,
        };
        let trajectory = simulate_lorenz(LorenzParameters::default(), settings, [0.1, 0.2, 0.3])
            .expect("simulation should succeed");
        assert_eq!(trajectory.len(), 100);
        assert_eq!(trajectory.dimension(), 3);
        assert!(trajectory.iter().flatten().all(|v| v.is_finite()));
    }

    #[test]
    fn simulate_lorenz_clamps_points_to_iterations() {
        let settings = SimulationSettings {
            iterations: 10,
            points: 1_000,
            ..SimulationSettings::default()
        };
        let trajectory = simulate_lorenz(LorenzParameters::default(), settings, [1.0, 1.0, 1.0])
            .expect("simulation should succeed");
        assert_eq!(trajectory.len(), 10);
    }

    #[test]
    fn simulate_lorenz_rejects_empty_runs() {
        let settings = SimulationSettings {
            iterations: 0,
            ..SimulationSettings::default()
        };
        let err = simulate_lorenz(LorenzParameters::default(), settings, [1.0, 1.0, 1.0])
            .expect_err("zero iterations should fail");
        assert!(format!("{err}").contains("iterations must be greater than zero"));
    }
}
