//! Helpers shared by all channels with Hodgkin-Huxley type gating variables.
//!
//! A gating variable $x$ obeys
//! \\begin{equation}
//!     \frac{dx}{dt} = \phi\left(\alpha(V)(1-x) - \beta(V)x\right)
//! \\end{equation}
//! which relaxes to $x_\infty = \alpha/(\alpha+\beta)$ with time constant
//! $\tau = 1/(\phi(\alpha+\beta))$.

/// Numerically stable evaluation of $(e^x - 1)/x$.
///
/// Many rate functions contain expressions like $x/(1-e^{-x})$ which are removable
/// singularities. They are rewritten in terms of this function.
/// ```
/// # use braincell_building_blocks::channels::exprel;
/// assert_eq!(exprel(0.0), 1.0);
/// assert!((exprel(1.0) - (1f64.exp() - 1.0)).abs() < 1e-12);
/// ```
pub fn exprel(x: f64) -> f64 {
    if x.abs() < 1e-5 {
        1.0 + x / 2.0 + x * x / 6.0
    } else {
        x.exp_m1() / x
    }
}

/// Temperature factor $q_{10}^{(T - T_{ref})/10}$.
pub fn temperature_factor(q10: f64, temperature: f64, reference: f64) -> f64 {
    q10.powf((temperature - reference) / 10.0)
}

/// Steady state $\alpha/(\alpha+\beta)$ of a gating variable.
pub fn steady_state(alpha: f64, beta: f64) -> f64 {
    alpha / (alpha + beta)
}

/// Time constant $1/(\phi(\alpha+\beta))$ (ms) of a gating variable.
pub fn time_constant(alpha: f64, beta: f64, phi: f64) -> f64 {
    1.0 / (phi * (alpha + beta))
}

/// Derivative of a gating variable together with the diagonal entry of its jacobian.
#[inline]
pub fn relax(alpha: f64, beta: f64, phi: f64, x: f64) -> (f64, f64) {
    (
        phi * (alpha * (1.0 - x) - beta * x),
        -phi * (alpha + beta),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exprel_is_continuous_around_zero() {
        for x in [-1e-4_f64, -1e-5, -1e-6, 1e-6, 1e-5, 1e-4] {
            let naive = x.exp_m1() / x;
            approx::assert_relative_eq!(exprel(x), naive, max_relative = 1e-9);
        }
    }

    #[test]
    fn relaxation_reaches_steady_state() {
        let (alpha, beta, phi) = (0.3, 0.7, 2.0);
        let x_inf = steady_state(alpha, beta);
        let (dx, decay) = relax(alpha, beta, phi, x_inf);
        approx::assert_abs_diff_eq!(dx, 0.0, epsilon = 1e-15);
        approx::assert_abs_diff_eq!(-1.0 / decay, time_constant(alpha, beta, phi));
    }
}
