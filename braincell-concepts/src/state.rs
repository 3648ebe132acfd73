use crate::CalcError;

/// Mathematical abstraction similar to the well-known `axpy` method.
///
/// Solvers combine increments with states via `dx.xapy(dt, &x)` which evaluates to
/// $dx\cdot dt + x$.
pub trait Xapy<F> {
    /// Calculates `self * a + y`.
    fn xapy(&self, a: F, y: &Self) -> Self;
}

impl<F, X> Xapy<F> for X
where
    X: for<'a> core::ops::Add<&'a X, Output = X>,
    for<'a> &'a X: core::ops::Mul<F, Output = X>,
{
    fn xapy(&self, a: F, y: &Self) -> Self {
        self * a + y
    }
}

/// Flat view of all components of a state.
///
/// Exponential integrators treat every component of a state on its own and thus require
/// access to the individual entries.
pub trait StateVector<F> {
    /// Immutable view of all components.
    fn as_slice(&self) -> &[F];
    /// Mutable view of all components.
    fn as_mut_slice(&mut self) -> &mut [F];
    /// Number of components of the state.
    fn n_components(&self) -> usize {
        self.as_slice().len()
    }
}

macro_rules! impl_state_vector_float {
    ($($float:ty),+) => {
        $(
            impl StateVector<$float> for $float {
                fn as_slice(&self) -> &[$float] {
                    core::slice::from_ref(self)
                }

                fn as_mut_slice(&mut self) -> &mut [$float] {
                    core::slice::from_mut(self)
                }
            }
        )+
    }
}

impl_state_vector_float!(f32, f64);

impl<F> StateVector<F> for Vec<F> {
    fn as_slice(&self) -> &[F] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [F] {
        self
    }
}

impl<F, const N: usize> StateVector<F> for [F; N] {
    fn as_slice(&self) -> &[F] {
        self
    }

    fn as_mut_slice(&mut self) -> &mut [F] {
        self
    }
}

impl<F> StateVector<F> for nalgebra::DVector<F>
where
    F: nalgebra::Scalar,
{
    fn as_slice(&self) -> &[F] {
        nalgebra::Matrix::as_slice(self)
    }

    fn as_mut_slice(&mut self) -> &mut [F] {
        nalgebra::Matrix::as_mut_slice(self)
    }
}

impl<F, const D: usize> StateVector<F> for nalgebra::SVector<F, D>
where
    F: nalgebra::Scalar,
{
    fn as_slice(&self) -> &[F] {
        nalgebra::Matrix::as_slice(self)
    }

    fn as_mut_slice(&mut self) -> &mut [F] {
        nalgebra::Matrix::as_mut_slice(self)
    }
}

/// Setter and Getter for the values which are integrated over time.
pub trait DiffEqState<S> {
    /// Obtains the current state.
    fn get_state(&self) -> S;
    /// Sets the current state.
    fn set_state(&mut self, state: S);
}

/// A system of ordinary differential equations $\dot{y} = f(t, y)$.
///
/// Solvers evaluate the right-hand side at intermediate states.
/// Implementors should thus always use the given argument instead of relying on values
/// obtained via `self`.
pub trait DiffEqModule<S, F = f64>: DiffEqState<S> {
    /// Calculates the time derivative $f(t, y)$ for the given state.
    fn calculate_derivative(&self, t: F, state: &S) -> Result<S, CalcError>;

    /// Calculates the derivative together with the diagonal of the jacobian
    /// $\partial f_i/\partial y_i$.
    ///
    /// The default implementation uses forward finite differences and thus evaluates the
    /// derivative once per component. Models which know their linearization analytically should
    /// override this method.
    fn calculate_linearization(&self, t: F, state: &S) -> Result<(S, S), CalcError>
    where
        S: StateVector<F> + Clone,
        F: num::Float,
    {
        let derivative = self.calculate_derivative(t, state)?;
        let mut diagonal = derivative.clone();
        let mut perturbed = state.clone();
        for i in 0..state.n_components() {
            let yi = state.as_slice()[i];
            let h = F::epsilon().sqrt() * yi.abs().max(F::one());
            perturbed.as_mut_slice()[i] = yi + h;
            let dperturbed = self.calculate_derivative(t, &perturbed)?;
            diagonal.as_mut_slice()[i] =
                (dperturbed.as_slice()[i] - derivative.as_slice()[i]) / h;
            perturbed.as_mut_slice()[i] = yi;
        }
        Ok((derivative, diagonal))
    }

    /// Executed before every integration step.
    fn pre_integral(&mut self) -> Result<(), CalcError> {
        Ok(())
    }

    /// Executed after every integration step.
    ///
    /// This is the place to project values back into their admissible range.
    fn post_integral(&mut self) -> Result<(), CalcError> {
        Ok(())
    }
}
