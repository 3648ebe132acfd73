use braincell_concepts::{IonInfo, IonKind};

use serde::{Deserialize, Serialize};

use super::{exprel, GatedChannel};

/// Delayed rectifier potassium channel of the squid giant axon (Hodgkin & Huxley 1952).
///
/// \\begin{equation}
///     I = g_{max} p^4 (E_K - V)
/// \\end{equation}
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct KHH1952 {
    /// Maximal conductance density (mS/cm²)
    pub g_max: f64,
    /// Shift of the activation curve $V_{sh}$ (mV)
    pub v_sh: f64,
    /// Temperature factor of all rates
    pub phi: f64,
}

impl Default for KHH1952 {
    fn default() -> Self {
        Self {
            g_max: 36.0,
            v_sh: -45.0,
            phi: 1.0,
        }
    }
}

impl GatedChannel for KHH1952 {
    const NAME: &'static str = "KHH1952";
    const IONS: &'static [IonKind] = &[IonKind::Potassium];
    const N_GATES: usize = 1;

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn phi(&self) -> f64 {
        self.phi
    }

    fn rates(&self, v: f64, _: &[IonInfo], _: usize) -> (f64, f64) {
        let x = v - self.v_sh;
        (
            0.1 / exprel(-(x + 10.0) / 10.0),
            0.125 * (-(x + 20.0) / 80.0).exp(),
        )
    }

    fn open_probability(&self, gates: &[f64]) -> f64 {
        gates[0].powi(4)
    }
}

/// Delayed rectifier potassium channel of Traub & Miles (1991).
///
/// \\begin{equation}
///     I = g_{max} p^4 (E_K - V)
/// \\end{equation}
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct KTM1991 {
    /// Maximal conductance density (mS/cm²)
    pub g_max: f64,
    /// Shift of the activation curve $V_{sh}$ (mV)
    pub v_sh: f64,
    /// Temperature factor of all rates
    pub phi: f64,
}

impl Default for KTM1991 {
    fn default() -> Self {
        Self {
            g_max: 10.0,
            v_sh: -60.0,
            phi: 1.0,
        }
    }
}

impl GatedChannel for KTM1991 {
    const NAME: &'static str = "KTM1991";
    const IONS: &'static [IonKind] = &[IonKind::Potassium];
    const N_GATES: usize = 1;

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn phi(&self) -> f64 {
        self.phi
    }

    fn rates(&self, v: f64, _: &[IonInfo], _: usize) -> (f64, f64) {
        let x = v - self.v_sh;
        (
            0.16 / exprel((15.0 - x) / 5.0),
            0.5 * ((10.0 - x) / 40.0).exp(),
        )
    }

    fn open_probability(&self, gates: &[f64]) -> f64 {
        gates[0].powi(4)
    }
}

super::impl_gated_channel!(KHH1952, KTM1991);

#[cfg(test)]
mod test {
    use super::*;
    use braincell_concepts::{CalcError, Channel};

    fn potassium() -> [IonInfo; 1] {
        [IonInfo {
            concentration: 0.0400811,
            reversal: -77.0,
        }]
    }

    #[test]
    fn steady_states_are_fixed_points() {
        let ions = potassium();
        crate::channels::test::assert_steady_state_is_fixed_point(&KHH1952::default(), &ions);
        crate::channels::test::assert_steady_state_is_fixed_point(&KTM1991::default(), &ions);
    }

    #[test]
    fn classic_hh_resting_gate() -> Result<(), CalcError> {
        let channel = KHH1952::default();
        let mut gates = [0.0];
        channel.steady_state(-65.0, &potassium(), &mut gates)?;
        approx::assert_abs_diff_eq!(gates[0], 0.3177, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn current_is_outward_above_reversal() {
        let channel = KTM1991::default();
        let i = channel.current(-50.0, &potassium(), &[1.0]);
        approx::assert_abs_diff_eq!(i, -270.0);
    }

    #[test]
    fn activation_increases_with_depolarization() -> Result<(), CalcError> {
        let channel = KTM1991::default();
        let ions = potassium();
        let mut low = [0.0];
        let mut high = [0.0];
        channel.steady_state(-80.0, &ions, &mut low)?;
        channel.steady_state(0.0, &ions, &mut high)?;
        assert!(low[0] < high[0]);
        Ok(())
    }
}
