use crate::error::Result;

/// Forward-difference step shared by every numerical derivative in the crate.
pub const FINITE_DIFFERENCE_STEP: f64 = 1e-6;

/// A scalar function of a state vector.
///
/// Implementations must behave as pure functions for the duration of a solve:
/// the steppers and the Newton solver evaluate the same point several times
/// and expect identical answers.
pub trait ScalarFunction {
    /// Evaluates the function at `x`.
    fn calculate(&self, x: &[f64]) -> f64;

    /// Numerical gradient by one-sided forward differences.
    ///
    /// `gradient[i] = (f(x + h e_i) - f(x)) / h` with `h = 1e-6`. Costs
    /// `x.len() + 1` evaluations of [`ScalarFunction::calculate`].
    fn gradient(&self, x: &[f64]) -> Vec<f64> {
        let y = self.calculate(x);
        let mut shifted = x.to_vec();
        let mut out = Vec::with_capacity(x.len());
        for i in 0..x.len() {
            shifted[i] += FINITE_DIFFERENCE_STEP;
            out.push((self.calculate(&shifted) - y) / FINITE_DIFFERENCE_STEP);
            shifted[i] = x[i];
        }
        out
    }
}

impl<F> ScalarFunction for F
where
    F: Fn(&[f64]) -> f64,
{
    fn calculate(&self, x: &[f64]) -> f64 {
        self(x)
    }
}

/// Owned, type-erased scalar function.
pub type BoxedFunction<'a> = Box<dyn ScalarFunction + 'a>;

/// Boxes a scalar function (usually a closure) for use in a system.
pub fn boxed<'a>(function: impl ScalarFunction + 'a) -> BoxedFunction<'a> {
    Box::new(function)
}

/// Represents the right-hand side of an ODE system `dx/dt = f(x, t)`.
///
/// States passed to a system carry time in their last slot, so `x` has
/// `dimension() + 1` entries.
pub trait DynamicalSystem {
    /// Returns the number of dynamical variables (time excluded).
    fn dimension(&self) -> usize;

    /// Evaluates the `index`-th component of the vector field.
    fn component(&self, index: usize, x: &[f64]) -> f64;

    /// Evaluates every component into `out`.
    fn apply(&self, x: &[f64], out: &mut [f64]) {
        for (index, value) in out.iter_mut().enumerate() {
            *value = self.component(index, x);
        }
    }
}

/// A trait for solvers that can step a system forward.
pub trait Steppable {
    /// Performs one step of size dt.
    /// state: dynamical variables followed by time (both updated after step)
    fn step(&mut self, system: &impl DynamicalSystem, state: &mut [f64], dt: f64) -> Result<()>;
}
