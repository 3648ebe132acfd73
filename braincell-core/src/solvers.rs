//! Numerical schemes which advance a [DiffEqModule] in time.
//!
//! Every [Solver] performs one step of size $\Delta t$ of the system
//! \\begin{equation}
//!     \frac{dy}{dt} = f(t, y).
//! \\end{equation}
//! Explicit Runge-Kutta methods are described by their [ButcherTableau] while the exponential
//! methods use the linearization of $f$ around the current state.

use braincell_concepts::{CalcError, DiffEqModule, SolverError, StateVector, Xapy};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Coefficients of an explicit Runge-Kutta method.
///
/// The stages are computed by
/// \\begin{align}
///     k_i &= f\left(t + c_i\Delta t, y + \Delta t\sum_{j<i}a_{ij}k_j\right)\\\\
///     y_{n+1} &= y_n + \Delta t\sum_i b_i k_i.
/// \\end{align}
#[derive(Clone, Copy, Debug)]
pub struct ButcherTableau {
    /// Lower triangular part of the matrix $a_{ij}$. Row $i$ has exactly $i$ entries.
    pub a: &'static [&'static [f64]],
    /// Weights $b_i$
    pub b: &'static [f64],
    /// Nodes $c_i$
    pub c: &'static [f64],
}

const EULER: ButcherTableau = ButcherTableau {
    a: &[&[]],
    b: &[1.0],
    c: &[0.0],
};

const MIDPOINT: ButcherTableau = ButcherTableau {
    a: &[&[], &[0.5]],
    b: &[0.0, 1.0],
    c: &[0.0, 0.5],
};

const HEUN2: ButcherTableau = ButcherTableau {
    a: &[&[], &[1.0]],
    b: &[0.5, 0.5],
    c: &[0.0, 1.0],
};

const RALSTON2: ButcherTableau = ButcherTableau {
    a: &[&[], &[2.0 / 3.0]],
    b: &[0.25, 0.75],
    c: &[0.0, 2.0 / 3.0],
};

const RK3: ButcherTableau = ButcherTableau {
    a: &[&[], &[0.5], &[-1.0, 2.0]],
    b: &[1.0 / 6.0, 2.0 / 3.0, 1.0 / 6.0],
    c: &[0.0, 0.5, 1.0],
};

const HEUN3: ButcherTableau = ButcherTableau {
    a: &[&[], &[1.0 / 3.0], &[0.0, 2.0 / 3.0]],
    b: &[0.25, 0.0, 0.75],
    c: &[0.0, 1.0 / 3.0, 2.0 / 3.0],
};

const SSPRK3: ButcherTableau = ButcherTableau {
    a: &[&[], &[1.0], &[0.25, 0.25]],
    b: &[1.0 / 6.0, 1.0 / 6.0, 2.0 / 3.0],
    c: &[0.0, 1.0, 0.5],
};

const RK4: ButcherTableau = ButcherTableau {
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    c: &[0.0, 0.5, 0.5, 1.0],
};

// Ralston's fourth order method with minimal truncation error
const RALSTON4: ButcherTableau = ButcherTableau {
    a: &[
        &[],
        &[0.4],
        &[0.2969776092477536, 0.15875964497103556],
        &[0.21810038822592054, -3.050965148692931, 3.83286476046701],
    ],
    b: &[
        0.1747602822626904,
        -0.551480662878733,
        1.2055355993965235,
        0.17118478121951902,
    ],
    c: &[0.0, 0.4, 0.4557372542187894, 1.0],
};

/// Numerical integration scheme.
///
/// Solvers can be selected by their name.
/// ```
/// # use braincell_core::solvers::Solver;
/// let solver: Solver = "rk4".parse()?;
/// assert_eq!(solver, Solver::Rk4);
/// assert_eq!(solver.to_string(), "rk4");
/// assert!("rk5".parse::<Solver>().is_err());
/// # Ok::<(), braincell_concepts::SolverError>(())
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Hash, Serialize)]
pub enum Solver {
    /// Explicit Euler method
    #[serde(rename = "euler")]
    Euler,
    /// Explicit midpoint method
    #[serde(rename = "midpoint", alias = "rk2")]
    Midpoint,
    /// Heun's second order method
    #[serde(rename = "heun2")]
    Heun2,
    /// Ralston's second order method
    #[serde(rename = "ralston2")]
    Ralston2,
    /// Kutta's third order method
    #[serde(rename = "rk3")]
    Rk3,
    /// Heun's third order method
    #[serde(rename = "heun3")]
    Heun3,
    /// Strong stability preserving third order method
    #[serde(rename = "ssprk3")]
    SspRk3,
    /// Classical fourth order Runge-Kutta method
    #[serde(rename = "rk4")]
    Rk4,
    /// Ralston's fourth order method
    #[serde(rename = "ralston4")]
    Ralston4,
    /// Exponential Euler method with the full jacobian
    #[serde(rename = "exp_euler")]
    ExpEuler,
    /// Exponential Euler method which treats every component independently
    #[default]
    #[serde(rename = "ind_exp_euler")]
    IndExpEuler,
}

impl Solver {
    /// All available solvers
    pub const ALL: [Solver; 11] = [
        Solver::Euler,
        Solver::Midpoint,
        Solver::Heun2,
        Solver::Ralston2,
        Solver::Rk3,
        Solver::Heun3,
        Solver::SspRk3,
        Solver::Rk4,
        Solver::Ralston4,
        Solver::ExpEuler,
        Solver::IndExpEuler,
    ];

    /// Name by which the solver can be selected
    pub fn name(&self) -> &'static str {
        match self {
            Solver::Euler => "euler",
            Solver::Midpoint => "midpoint",
            Solver::Heun2 => "heun2",
            Solver::Ralston2 => "ralston2",
            Solver::Rk3 => "rk3",
            Solver::Heun3 => "heun3",
            Solver::SspRk3 => "ssprk3",
            Solver::Rk4 => "rk4",
            Solver::Ralston4 => "ralston4",
            Solver::ExpEuler => "exp_euler",
            Solver::IndExpEuler => "ind_exp_euler",
        }
    }

    /// Coefficients of explicit Runge-Kutta methods or [None] for exponential integrators.
    pub fn tableau(&self) -> Option<&'static ButcherTableau> {
        match self {
            Solver::Euler => Some(&EULER),
            Solver::Midpoint => Some(&MIDPOINT),
            Solver::Heun2 => Some(&HEUN2),
            Solver::Ralston2 => Some(&RALSTON2),
            Solver::Rk3 => Some(&RK3),
            Solver::Heun3 => Some(&HEUN3),
            Solver::SspRk3 => Some(&SSPRK3),
            Solver::Rk4 => Some(&RK4),
            Solver::Ralston4 => Some(&RALSTON4),
            Solver::ExpEuler | Solver::IndExpEuler => None,
        }
    }

    /// Convergence order of the method for general problems.
    pub fn order(&self) -> usize {
        match self {
            Solver::Euler | Solver::ExpEuler | Solver::IndExpEuler => 1,
            Solver::Midpoint | Solver::Heun2 | Solver::Ralston2 => 2,
            Solver::Rk3 | Solver::Heun3 | Solver::SspRk3 => 3,
            Solver::Rk4 | Solver::Ralston4 => 4,
        }
    }

    /// Calculates the state after one step without modifying the module.
    pub fn integrate<M, S>(&self, module: &M, t: f64, dt: f64, state: &S) -> Result<S, CalcError>
    where
        M: DiffEqModule<S>,
        S: StateVector<f64> + Xapy<f64> + Clone,
    {
        match self {
            Solver::ExpEuler => exponential_euler(module, t, dt, state),
            Solver::IndExpEuler => independent_exponential_euler(module, t, dt, state),
            _ => match self.tableau() {
                Some(tableau) => explicit_runge_kutta(module, tableau, t, dt, state),
                None => Err(SolverError(format!("solver {self} has no tableau")).into()),
            },
        }
    }

    /// Advances the module by one step of size `dt`.
    ///
    /// The [pre_integral](DiffEqModule::pre_integral) and
    /// [post_integral](DiffEqModule::post_integral) hooks are executed before and after the
    /// integration.
    /// If the new state contains non-finite values, the module keeps its old state and an error
    /// is returned.
    #[cfg_attr(feature = "tracing", instrument(skip_all))]
    pub fn step<M, S>(&self, module: &mut M, t: f64, dt: f64) -> Result<(), CalcError>
    where
        M: DiffEqModule<S>,
        S: StateVector<f64> + Xapy<f64> + Clone,
    {
        module.pre_integral()?;
        let state = module.get_state();
        let new_state = self.integrate(module, t, dt, &state)?;
        if let Some(i) = new_state.as_slice().iter().position(|x| !x.is_finite()) {
            return Err(CalcError(format!(
                "solver {self} produced non-finite value {} in component {i} at t={t}",
                new_state.as_slice()[i]
            )));
        }
        module.set_state(new_state);
        module.post_integral()
    }
}

impl core::fmt::Display for Solver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl core::str::FromStr for Solver {
    type Err = SolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "euler" => Ok(Solver::Euler),
            "midpoint" | "rk2" => Ok(Solver::Midpoint),
            "heun2" => Ok(Solver::Heun2),
            "ralston2" => Ok(Solver::Ralston2),
            "rk3" => Ok(Solver::Rk3),
            "heun3" => Ok(Solver::Heun3),
            "ssprk3" => Ok(Solver::SspRk3),
            "rk4" => Ok(Solver::Rk4),
            "ralston4" => Ok(Solver::Ralston4),
            "exp_euler" => Ok(Solver::ExpEuler),
            "ind_exp_euler" => Ok(Solver::IndExpEuler),
            _ => Err(SolverError(format!(
                "unknown solver {s}, expected one of {}",
                Solver::ALL.map(|solver| solver.name()).join(", ")
            ))),
        }
    }
}

fn explicit_runge_kutta<M, S>(
    module: &M,
    tableau: &ButcherTableau,
    t: f64,
    dt: f64,
    state: &S,
) -> Result<S, CalcError>
where
    M: DiffEqModule<S>,
    S: Xapy<f64> + Clone,
{
    let mut stages: Vec<S> = Vec::with_capacity(tableau.b.len());
    for (row, c) in tableau.a.iter().zip(tableau.c.iter()) {
        let mut intermediate = state.clone();
        for (a, k) in row.iter().zip(stages.iter()) {
            if *a != 0.0 {
                intermediate = k.xapy(dt * a, &intermediate);
            }
        }
        stages.push(module.calculate_derivative(t + c * dt, &intermediate)?);
    }
    let mut new_state = state.clone();
    for (b, k) in tableau.b.iter().zip(stages.iter()) {
        if *b != 0.0 {
            new_state = k.xapy(dt * b, &new_state);
        }
    }
    Ok(new_state)
}

/// $\varphi_1(z) = (e^z - 1)/z$ with $\varphi_1(0)=1$
fn phi_1(z: f64) -> f64 {
    if z == 0.0 {
        1.0
    } else {
        z.exp_m1() / z
    }
}

// y_i + dt φ1(dt J_ii) f_i is exact whenever f_i is linear in y_i
fn independent_exponential_euler<M, S>(
    module: &M,
    t: f64,
    dt: f64,
    state: &S,
) -> Result<S, CalcError>
where
    M: DiffEqModule<S>,
    S: StateVector<f64> + Clone,
{
    let (derivative, diagonal) = module.calculate_linearization(t, state)?;
    let mut new_state = state.clone();
    for ((y, f), d) in new_state
        .as_mut_slice()
        .iter_mut()
        .zip(derivative.as_slice())
        .zip(diagonal.as_slice())
    {
        *y += dt * phi_1(dt * d) * f;
    }
    Ok(new_state)
}

fn exponential_euler<M, S>(module: &M, t: f64, dt: f64, state: &S) -> Result<S, CalcError>
where
    M: DiffEqModule<S>,
    S: StateVector<f64> + Clone,
{
    let n = state.n_components();
    let (derivative, diagonal) = module.calculate_linearization(t, state)?;

    // Augmented matrix [[dt J, dt f], [0, 0]] whose exponential contains dt φ1(dt J) f in its
    // last column
    let mut augmented = nalgebra::DMatrix::<f64>::zeros(n + 1, n + 1);
    let mut perturbed = state.clone();
    for j in 0..n {
        let yj = state.as_slice()[j];
        let h = f64::EPSILON.sqrt() * yj.abs().max(1.0);
        perturbed.as_mut_slice()[j] = yj + h;
        let column = module.calculate_derivative(t, &perturbed)?;
        perturbed.as_mut_slice()[j] = yj;
        for i in 0..n {
            augmented[(i, j)] = if i == j {
                dt * diagonal.as_slice()[i]
            } else {
                dt * (column.as_slice()[i] - derivative.as_slice()[i]) / h
            };
        }
        augmented[(j, n)] = dt * derivative.as_slice()[j];
    }
    if augmented.iter().any(|x| !x.is_finite()) {
        return Err(CalcError(format!(
            "linearization at t={t} contains non-finite values"
        )));
    }
    let propagator = augmented.exp();

    let mut new_state = state.clone();
    for (i, y) in new_state.as_mut_slice().iter_mut().enumerate() {
        *y += propagator[(i, n)];
    }
    Ok(new_state)
}
