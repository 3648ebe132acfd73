use braincell_concepts::{CalcError, Channel, IonInfo, IonKind};

use serde::{Deserialize, Serialize};

/// Passive leak current $I = g_{max}(E - V)$.
///
/// This channel is not attached to any ion species and has no gating variables.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Leak {
    /// Conductance density (mS/cm²)
    pub g_max: f64,
    /// Reversal potential (mV)
    pub reversal: f64,
}

impl Default for Leak {
    fn default() -> Self {
        Self {
            g_max: 0.1,
            reversal: -70.0,
        }
    }
}

impl Channel for Leak {
    fn name(&self) -> &str {
        "Leak"
    }

    fn ions(&self) -> &[IonKind] {
        &[]
    }

    fn n_gates(&self) -> usize {
        0
    }

    fn steady_state(&self, _: f64, _: &[IonInfo], _: &mut [f64]) -> Result<(), CalcError> {
        Ok(())
    }

    fn calculate_gate_increment(
        &self,
        _: f64,
        _: &[IonInfo],
        _: &[f64],
        _: &mut [f64],
        _: &mut [f64],
    ) -> Result<(), CalcError> {
        Ok(())
    }

    fn current(&self, v: f64, _: &[IonInfo], _: &[f64]) -> f64 {
        self.g_max * (self.reversal - v)
    }

    fn conductance(&self, _: f64, _: &[IonInfo], _: &[f64]) -> f64 {
        self.g_max
    }
}
