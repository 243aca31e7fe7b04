pub mod equation_system;
pub mod error;
pub mod linear;
pub mod ode;
pub mod presets;
pub mod solvers;
/// The `diffeq_core` crate integrates first-order ODE systems whose right-hand
/// sides are plain scalar functions of the state vector `[x_0 .. x_{n-1}, t]`.
/// Every derivative it needs is taken numerically.
///
/// Key components:
/// - **Traits**: `ScalarFunction` (with finite-difference gradient), `DynamicalSystem`, `Steppable`.
/// - **Linear**: Gaussian elimination with partial pivoting.
/// - **Equation System**: Newton direction plus line search for `F(x) = 0`.
/// - **Solvers**: Explicit/implicit Euler, RK4 and 4-step Adams-Bashforth steppers.
/// - **ODE**: `DifferentialEquationSystem::solve`, the entry point for callers.
pub mod traits;

pub use equation_system::{EquationSystem, NewtonSettings, NewtonSolution};
pub use error::{Result, SolverError};
pub use ode::{DifferentialEquationSystem, Method, Trajectory};
pub use traits::{boxed, BoxedFunction, DynamicalSystem, ScalarFunction, Steppable};
