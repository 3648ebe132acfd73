use braincell_concepts::{CalcError, Ion, IonInfo, IonKind};

use serde::{Deserialize, Serialize};

use crate::units::{FARADAY, UM_TO_CM};

/// Dynamic calcium pool in a thin shell below the membrane.
///
/// The intracellular concentration is driven by the inward calcium current and decays towards
/// its resting value
/// \\begin{equation}
///     \frac{dC}{dt} = \max\left(\frac{I_{Ca}}{2 F d}, 0\right) + \frac{C_{rest} - C}{\tau}
/// \\end{equation}
/// where $d$ is the depth of the shell.
/// The reversal potential follows from the [Nernst equation](super::nernst_potential).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CalciumDetailed {
    /// Depth of the shell $d$ (µm)
    pub depth: f64,
    /// Decay time constant $\tau$ (ms)
    pub tau: f64,
    /// Resting concentration $C_{rest}$ (mM)
    pub c_rest: f64,
    /// Extracellular concentration (mM)
    pub c_out: f64,
    /// Concentration at initialization (mM)
    pub c_initial: f64,
    /// Temperature (°C)
    pub temperature: f64,
}

impl Default for CalciumDetailed {
    fn default() -> Self {
        Self {
            depth: 0.5,
            tau: 5.0,
            c_rest: 2.4e-4,
            c_out: 2.0,
            c_initial: 2.4e-4,
            temperature: 36.0,
        }
    }
}

impl CalciumDetailed {
    /// Concentration increase (mM/ms) per inward current density (µA/cm²).
    fn current_to_flux(&self) -> f64 {
        // µA/cm² / (C/mol * cm) = 1e-6 mol/(s cm³) = 1e-3 mM/ms
        1e-3 / (2.0 * FARADAY * self.depth * UM_TO_CM)
    }
}

impl Ion for CalciumDetailed {
    fn kind(&self) -> IonKind {
        IonKind::Calcium
    }

    fn n_states(&self) -> usize {
        1
    }

    fn initial_states(&self, states: &mut [f64]) {
        states[0] = self.c_initial;
    }

    fn info(&self, states: &[f64]) -> Result<IonInfo, CalcError> {
        let concentration = states[0];
        let reversal = super::nernst_potential(
            IonKind::Calcium.valence(),
            concentration,
            self.c_out,
            self.temperature,
        )?;
        Ok(IonInfo {
            concentration,
            reversal,
        })
    }

    fn calculate_increment(
        &self,
        _v: f64,
        ion_current: f64,
        states: &[f64],
        dstates: &mut [f64],
        decay: &mut [f64],
    ) -> Result<(), CalcError> {
        let drive = (self.current_to_flux() * ion_current).max(0.0);
        dstates[0] = drive + (self.c_rest - states[0]) / self.tau;
        decay[0] = -1.0 / self.tau;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resting_reversal_matches_fixed_calcium() -> Result<(), CalcError> {
        let ca = CalciumDetailed::default();
        let mut states = [0.0];
        ca.initial_states(&mut states);
        let info = ca.info(&states)?;
        approx::assert_abs_diff_eq!(info.reversal, 120.0, epsilon = 1.0);
        Ok(())
    }

    #[test]
    fn inward_current_raises_concentration() -> Result<(), CalcError> {
        let ca = CalciumDetailed::default();
        let states = [ca.c_rest];
        let (mut dstates, mut decay) = ([0.0], [0.0]);
        ca.calculate_increment(-20.0, 5.0, &states, &mut dstates, &mut decay)?;
        assert!(dstates[0] > 0.0);
        // Outward current is rectified
        ca.calculate_increment(-20.0, -5.0, &states, &mut dstates, &mut decay)?;
        assert_eq!(dstates[0], 0.0);
        assert_eq!(decay[0], -0.2);
        Ok(())
    }
}
