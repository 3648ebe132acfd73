use braincell_concepts::{IonInfo, IonKind};

use serde::{Deserialize, Serialize};

use super::{exprel, temperature_factor, GatedChannel};

macro_rules! define_sodium_channel {
    ($(($name: ident, $g_max: expr, $v_sh: expr, $descr: expr)),+) => {
        $(
            #[doc = $descr]
            ///
            /// The current is carried by sodium ions and given by
            /// \\begin{equation}
            ///     I = g_{max} p^3 q (E_{Na} - V).
            /// \\end{equation}
            /// All rate functions are evaluated at the shifted potential $V - V_{sh}$.
            #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
            pub struct $name {
                /// Maximal conductance density (mS/cm²)
                pub g_max: f64,
                /// Shift of the activation curves $V_{sh}$ (mV)
                pub v_sh: f64,
                /// Temperature factor of all rates
                pub phi: f64,
            }

            impl Default for $name {
                fn default() -> Self {
                    Self {
                        g_max: $g_max,
                        v_sh: $v_sh,
                        phi: 1.0,
                    }
                }
            }
        )+
    }
}

define_sodium_channel!(
    (
        NaHH1952,
        120.0,
        -45.0,
        "Sodium channel of the squid giant axon (Hodgkin & Huxley 1952)."
    ),
    (
        NaTM1991,
        120.0,
        -63.0,
        "Sodium channel of thalamocortical neurons (Traub & Miles 1991)."
    )
);

impl GatedChannel for NaHH1952 {
    const NAME: &'static str = "NaHH1952";
    const IONS: &'static [IonKind] = &[IonKind::Sodium];
    const N_GATES: usize = 2;

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn phi(&self) -> f64 {
        self.phi
    }

    fn rates(&self, v: f64, _: &[IonInfo], gate: usize) -> (f64, f64) {
        let x = v - self.v_sh;
        match gate {
            0 => (
                1.0 / exprel(-(x - 5.0) / 10.0),
                4.0 * (-(x + 20.0) / 18.0).exp(),
            ),
            _ => (
                0.07 * (-(x + 20.0) / 20.0).exp(),
                1.0 / (1.0 + (-(x - 10.0) / 10.0).exp()),
            ),
        }
    }

    fn open_probability(&self, gates: &[f64]) -> f64 {
        gates[0].powi(3) * gates[1]
    }
}

impl GatedChannel for NaTM1991 {
    const NAME: &'static str = "NaTM1991";
    const IONS: &'static [IonKind] = &[IonKind::Sodium];
    const N_GATES: usize = 2;

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn phi(&self) -> f64 {
        self.phi
    }

    fn rates(&self, v: f64, _: &[IonInfo], gate: usize) -> (f64, f64) {
        let x = v - self.v_sh;
        match gate {
            0 => (
                1.28 / exprel((13.0 - x) / 4.0),
                1.4 / exprel((x - 40.0) / 5.0),
            ),
            _ => (
                0.128 * ((17.0 - x) / 18.0).exp(),
                4.0 / (1.0 + (-(x - 40.0) / 5.0).exp()),
            ),
        }
    }

    fn open_probability(&self, gates: &[f64]) -> f64 {
        gates[0].powi(3) * gates[1]
    }
}

/// Sodium channel of cortical pyramidal neurons (Bazhenov et al. 2002).
///
/// Identical in structure to [NaTM1991] but with temperature dependent rates
/// $\phi = 3^{(T - 36)/10}$.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NaBa2002 {
    /// Maximal conductance density (mS/cm²)
    pub g_max: f64,
    /// Shift of the activation curves $V_{sh}$ (mV)
    pub v_sh: f64,
    /// Temperature (°C)
    pub temperature: f64,
}

impl Default for NaBa2002 {
    fn default() -> Self {
        Self {
            g_max: 90.0,
            v_sh: -50.0,
            temperature: 36.0,
        }
    }
}

impl GatedChannel for NaBa2002 {
    const NAME: &'static str = "NaBa2002";
    const IONS: &'static [IonKind] = &[IonKind::Sodium];
    const N_GATES: usize = 2;

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn phi(&self) -> f64 {
        temperature_factor(3.0, self.temperature, 36.0)
    }

    fn rates(&self, v: f64, _: &[IonInfo], gate: usize) -> (f64, f64) {
        let x = v - self.v_sh;
        match gate {
            0 => (
                1.28 / exprel(-(x - 13.0) / 4.0),
                1.4 / exprel((x - 40.0) / 5.0),
            ),
            _ => (
                0.128 * (-(x - 17.0) / 18.0).exp(),
                4.0 / (1.0 + (-(x - 40.0) / 5.0).exp()),
            ),
        }
    }

    fn open_probability(&self, gates: &[f64]) -> f64 {
        gates[0].powi(3) * gates[1]
    }
}

super::impl_gated_channel!(NaHH1952, NaTM1991, NaBa2002);

#[cfg(test)]
mod test {
    use super::*;
    use braincell_concepts::Channel;

    fn sodium() -> [IonInfo; 1] {
        [IonInfo {
            concentration: 0.0400811,
            reversal: 50.0,
        }]
    }

    #[test]
    fn steady_states_are_fixed_points() {
        let ions = sodium();
        crate::channels::test::assert_steady_state_is_fixed_point(&NaHH1952::default(), &ions);
        crate::channels::test::assert_steady_state_is_fixed_point(&NaTM1991::default(), &ions);
        crate::channels::test::assert_steady_state_is_fixed_point(&NaBa2002::default(), &ions);
    }

    #[test]
    fn classic_hh_resting_gates() -> Result<(), braincell_concepts::CalcError> {
        // The default shift reproduces the textbook values at rest
        let channel = NaHH1952::default();
        let mut gates = [0.0; 2];
        channel.steady_state(-65.0, &sodium(), &mut gates)?;
        approx::assert_abs_diff_eq!(gates[0], 0.0529, epsilon = 1e-3);
        approx::assert_abs_diff_eq!(gates[1], 0.5961, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn rates_are_finite_at_singularities() {
        let channel = NaHH1952::default();
        // alpha_p has a removable singularity at x = 5
        let (alpha, _) = channel.rates(channel.v_sh + 5.0, &[], 0);
        approx::assert_abs_diff_eq!(alpha, 1.0, epsilon = 1e-9);
        let channel = NaTM1991::default();
        let (_, beta) = channel.rates(channel.v_sh + 40.0, &[], 0);
        approx::assert_abs_diff_eq!(beta, 1.4, epsilon = 1e-9);
    }

    #[test]
    fn current_is_inward_below_reversal() {
        let channel = NaTM1991::default();
        let ions = sodium();
        let i = channel.current(-20.0, &ions, &[0.5, 0.5]);
        approx::assert_abs_diff_eq!(i, 120.0 * 0.125 * 0.5 * 70.0);
        approx::assert_abs_diff_eq!(channel.conductance(-20.0, &ions, &[0.5, 0.5]), 7.5);
    }

    #[test]
    fn temperature_speeds_up_kinetics() {
        let cold = NaBa2002::default();
        let warm = NaBa2002 {
            temperature: 46.0,
            ..Default::default()
        };
        assert_eq!(cold.phi(), 1.0);
        approx::assert_abs_diff_eq!(warm.phi(), 3.0);
    }
}
