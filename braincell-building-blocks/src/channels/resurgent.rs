use braincell_concepts::{CalcError, Channel, IonInfo, IonKind};

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

/// Number of states of the [NaRsg] Markov scheme
const N_STATES: usize = 13;

const C1: usize = 0;
const O: usize = 5;
const B: usize = 6;
const I1: usize = 7;
const I6: usize = 12;

/// Resurgent sodium channel of cerebellar Purkinje cells (Raman & Bean 2001).
///
/// A Markov scheme with closed states $C_1,\dots,C_5$, the open state $O$, the blocked state
/// $B$ and inactivated states $I_1,\dots,I_6$.
/// Upon repolarization, the blocking particle leaves $B$ through $O$ which produces the
/// resurgent current
/// \\begin{equation}
///     I = g_{max} O (E_{Na} - V).
/// \\end{equation}
/// All 13 occupancies are stored as gating variables and always sum up to one.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NaRsg {
    /// Maximal conductance density (mS/cm²)
    pub g_max: f64,
    /// Temperature factor of all rates
    pub phi: f64,
}

impl Default for NaRsg {
    fn default() -> Self {
        Self {
            g_max: 15.0,
            phi: 1.0,
        }
    }
}

impl NaRsg {
    /// Rates are measured at 22 °C and scaled with $Q_{10}=3$.
    pub fn at_temperature(celsius: f64) -> Self {
        Self {
            phi: 3f64.powf((celsius - 22.0) / 10.0),
            ..Self::default()
        }
    }

    /// All transitions `(from, to, rate)` at the given potential (mV).
    fn transitions(&self, v: f64) -> Vec<(usize, usize, f64)> {
        let (alpha, beta, gamma, delta) = (150.0, 3.0, 150.0, 40.0);
        let (epsilon, zeta) = (1.75, 0.03);
        let (c_on, c_off, o_on, o_off): (f64, f64, f64, f64) = (0.005, 0.5, 0.75, 0.005);
        let a_fac = (o_on / c_on).powf(0.25);
        let b_fac = (o_off / c_off).powf(0.25);
        // Activation is voltage dependent, O <-> C5 and I6 <-> I5 are not.
        let up = (v / 20.0).exp();
        let down = (v / -20.0).exp();
        let unblock = (v / -25.0).exp();

        let mut transitions = Vec::with_capacity(32);
        for k in 0..4 {
            let (forward, backward) = ((4 - k) as f64, (k + 1) as f64);
            transitions.push((C1 + k, C1 + k + 1, forward * alpha * up));
            transitions.push((C1 + k + 1, C1 + k, backward * beta * down));
            transitions.push((I1 + k, I1 + k + 1, forward * alpha * a_fac * up));
            transitions.push((I1 + k + 1, I1 + k, backward * beta * b_fac * down));
        }
        for k in 0..5 {
            transitions.push((C1 + k, I1 + k, c_on * a_fac.powi(k as i32)));
            transitions.push((I1 + k, C1 + k, c_off * b_fac.powi(k as i32)));
        }
        transitions.extend([
            (C1 + 4, O, gamma),
            (O, C1 + 4, delta),
            (I1 + 4, I6, gamma),
            (I6, I1 + 4, delta),
            (O, B, epsilon),
            (B, O, zeta * unblock),
            (O, I6, o_on),
            (I6, O, o_off),
        ]);
        transitions
            .into_iter()
            .map(|(from, to, rate)| (from, to, self.phi * rate))
            .collect()
    }
}

impl Channel for NaRsg {
    fn name(&self) -> &str {
        "NaRsg"
    }

    fn ions(&self) -> &[IonKind] {
        &[IonKind::Sodium]
    }

    fn n_gates(&self) -> usize {
        N_STATES
    }

    /// Stationary distribution of the Markov scheme.
    fn steady_state(&self, v: f64, _: &[IonInfo], gates: &mut [f64]) -> Result<(), CalcError> {
        let mut generator = SMatrix::<f64, N_STATES, N_STATES>::zeros();
        for (from, to, rate) in self.transitions(v) {
            generator[(to, from)] += rate;
            generator[(from, from)] -= rate;
        }
        // The occupancies sum up to one instead of the redundant last balance equation
        generator.row_mut(N_STATES - 1).fill(1.0);
        let mut rhs = SVector::<f64, N_STATES>::zeros();
        rhs[N_STATES - 1] = 1.0;
        let occupancy = generator.lu().solve(&rhs).ok_or_else(|| {
            CalcError(format!("no stationary distribution of NaRsg at V={v}"))
        })?;
        gates.copy_from_slice(occupancy.as_slice());
        self.normalize_gates(gates);
        Ok(())
    }

    fn calculate_gate_increment(
        &self,
        v: f64,
        _: &[IonInfo],
        gates: &[f64],
        dgates: &mut [f64],
        decay: &mut [f64],
    ) -> Result<(), CalcError> {
        dgates.fill(0.0);
        decay.fill(0.0);
        for (from, to, rate) in self.transitions(v) {
            let flux = rate * gates[from];
            dgates[from] -= flux;
            dgates[to] += flux;
            decay[from] -= rate;
        }
        Ok(())
    }

    fn current(&self, v: f64, ions: &[IonInfo], gates: &[f64]) -> f64 {
        self.g_max * gates[O] * (ions[0].reversal - v)
    }

    fn conductance(&self, _: f64, _: &[IonInfo], gates: &[f64]) -> f64 {
        self.g_max * gates[O]
    }

    /// Clamps occupancies to be non-negative and rescales them to sum up to one.
    fn normalize_gates(&self, gates: &mut [f64]) {
        gates.iter_mut().for_each(|g| *g = g.max(0.0));
        let total: f64 = gates.iter().sum();
        gates.iter_mut().for_each(|g| *g /= total + 1e-12);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sodium() -> [IonInfo; 1] {
        [IonInfo {
            concentration: 0.0400811,
            reversal: 50.0,
        }]
    }

    #[test]
    fn steady_state_is_stationary() -> Result<(), CalcError> {
        let channel = NaRsg::default();
        for v in [-90.0, -65.0, -30.0, 0.0, 30.0] {
            let mut gates = [0.0; N_STATES];
            channel.steady_state(v, &sodium(), &mut gates)?;
            approx::assert_abs_diff_eq!(gates.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
            assert!(gates.iter().all(|g| *g >= 0.0));
            let mut dgates = [0.0; N_STATES];
            let mut decay = [0.0; N_STATES];
            channel.calculate_gate_increment(v, &sodium(), &gates, &mut dgates, &mut decay)?;
            for dg in dgates {
                approx::assert_abs_diff_eq!(dg, 0.0, epsilon = 1e-9);
            }
            assert!(decay.iter().all(|d| *d < 0.0));
        }
        Ok(())
    }

    #[test]
    fn transitions_conserve_probability() -> Result<(), CalcError> {
        let channel = NaRsg::at_temperature(30.0);
        let mut gates = [0.0; N_STATES];
        gates.iter_mut().enumerate().for_each(|(i, g)| *g = (i + 1) as f64 / 91.0);
        let mut dgates = [0.0; N_STATES];
        let mut decay = [0.0; N_STATES];
        for v in [-80.0, -20.0, 40.0] {
            channel.calculate_gate_increment(v, &sodium(), &gates, &mut dgates, &mut decay)?;
            approx::assert_abs_diff_eq!(dgates.iter().sum::<f64>(), 0.0, epsilon = 1e-9);
        }
        Ok(())
    }

    #[test]
    fn normalization_projects_onto_simplex() {
        let channel = NaRsg::default();
        let mut gates = [0.1; N_STATES];
        gates[B] = -0.05;
        gates[I6] = 0.4;
        channel.normalize_gates(&mut gates);
        assert_eq!(gates[B], 0.0);
        approx::assert_abs_diff_eq!(gates.iter().sum::<f64>(), 1.0, epsilon = 1e-10);
        approx::assert_relative_eq!(gates[I6], 4.0 * gates[O], max_relative = 1e-12);
    }

    #[test]
    fn depolarization_opens_then_blocks() -> Result<(), CalcError> {
        let channel = NaRsg::default();
        let mut rest = [0.0; N_STATES];
        let mut depolarized = [0.0; N_STATES];
        channel.steady_state(-90.0, &sodium(), &mut rest)?;
        channel.steady_state(0.0, &sodium(), &mut depolarized)?;
        // Channels accumulate in the blocked and inactivated states when held depolarized
        assert!(depolarized[B] > rest[B]);
        assert!(depolarized[I6] > rest[I6]);
        approx::assert_abs_diff_eq!(
            channel.current(-90.0, &sodium(), &rest),
            15.0 * rest[O] * 140.0,
            epsilon = 1e-12
        );
        Ok(())
    }
}
