use braincell_concepts::{IonInfo, IonKind};

use serde::{Deserialize, Serialize};

use super::{exprel, temperature_factor, GatedChannel};

/// High-threshold calcium channel (Reuveni et al. 1993).
///
/// \\begin{equation}
///     I = g_{max} m^2 h (E_{Ca} - V)
/// \\end{equation}
/// Rates are scaled by $\phi = 2.3^{(T - 23)/10}$.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CaHVA {
    /// Maximal conductance density (mS/cm²)
    pub g_max: f64,
    /// Temperature (°C)
    pub temperature: f64,
}

impl Default for CaHVA {
    fn default() -> Self {
        Self {
            g_max: 1.0,
            temperature: 36.0,
        }
    }
}

impl GatedChannel for CaHVA {
    const NAME: &'static str = "CaHVA";
    const IONS: &'static [IonKind] = &[IonKind::Calcium];
    const N_GATES: usize = 2;

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn phi(&self) -> f64 {
        temperature_factor(2.3, self.temperature, 23.0)
    }

    fn rates(&self, v: f64, _: &[IonInfo], gate: usize) -> (f64, f64) {
        match gate {
            0 => (
                0.055 * 3.8 / exprel((-27.0 - v) / 3.8),
                0.94 * ((-75.0 - v) / 17.0).exp(),
            ),
            _ => (
                0.000457 * ((-13.0 - v) / 50.0).exp(),
                0.0065 / (((-v - 15.0) / 28.0).exp() + 1.0),
            ),
        }
    }

    fn open_probability(&self, gates: &[f64]) -> f64 {
        gates[0].powi(2) * gates[1]
    }
}

super::impl_gated_channel!(CaHVA);
