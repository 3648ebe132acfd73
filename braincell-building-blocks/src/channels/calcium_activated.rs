use braincell_concepts::{IonInfo, IonKind};

use serde::{Deserialize, Serialize};

use super::GatedChannel;

/// Calcium-dependent potassium channel responsible for the slow afterhyperpolarization
/// (Destexhe et al. 1994).
///
/// The current flows through potassium while its single gate is opened by intracellular
/// calcium
/// \\begin{align}
///     \frac{dp}{dt} &= \phi\left(\alpha C_{Ca}^2 (1 - p) - \beta p\right)\\\\
///     I &= g_{max} p^2 (E_K - V).
/// \\end{align}
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct KCaAhp {
    /// Maximal conductance density (mS/cm²)
    pub g_max: f64,
    /// Binding rate $\alpha$ (1/(ms mM²))
    pub alpha: f64,
    /// Unbinding rate $\beta$ (1/ms)
    pub beta: f64,
    /// Temperature factor of all rates
    pub phi: f64,
}

impl Default for KCaAhp {
    fn default() -> Self {
        Self {
            g_max: 10.0,
            alpha: 48.0,
            beta: 0.09,
            phi: 1.0,
        }
    }
}

impl GatedChannel for KCaAhp {
    const NAME: &'static str = "KCaAhp";
    const IONS: &'static [IonKind] = &[IonKind::Potassium, IonKind::Calcium];
    const N_GATES: usize = 1;

    fn g_max(&self) -> f64 {
        self.g_max
    }

    fn phi(&self) -> f64 {
        self.phi
    }

    fn rates(&self, _: f64, ions: &[IonInfo], _: usize) -> (f64, f64) {
        let c = ions[1].concentration;
        (self.alpha * c * c, self.beta)
    }

    fn open_probability(&self, gates: &[f64]) -> f64 {
        gates[0].powi(2)
    }
}

super::impl_gated_channel!(KCaAhp);
