use serde::{Deserialize, Serialize};

use crate::CalcError;

/// Ion species which can be present inside a compartment.
#[derive(Clone, Copy, Debug, Deserialize, Hash, PartialEq, Eq, Ord, PartialOrd, Serialize)]
pub enum IonKind {
    /// Na⁺
    Sodium,
    /// K⁺
    Potassium,
    /// Ca²⁺
    Calcium,
}

impl IonKind {
    /// Charge number of the ion.
    pub fn valence(&self) -> i32 {
        match self {
            IonKind::Sodium => 1,
            IonKind::Potassium => 1,
            IonKind::Calcium => 2,
        }
    }
}

impl core::fmt::Display for IonKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IonKind::Sodium => write!(f, "Sodium"),
            IonKind::Potassium => write!(f, "Potassium"),
            IonKind::Calcium => write!(f, "Calcium"),
        }
    }
}

/// Snapshot of an ion pool which is handed to channels.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct IonInfo {
    /// Intracellular concentration (mM)
    pub concentration: f64,
    /// Reversal potential (mV)
    pub reversal: f64,
}

/// Pool of one ion species inside a compartment.
///
/// Fixed ions do not contribute any state variables while dynamic ones integrate their
/// concentration depending on the currents of all channels rooted on them.
pub trait Ion {
    /// The species of this pool.
    fn kind(&self) -> IonKind;

    /// Number of state variables contributed to the compartment.
    fn n_states(&self) -> usize;

    /// Writes the initial values of all state variables.
    fn initial_states(&self, states: &mut [f64]);

    /// Calculates concentration and reversal potential from the given states.
    fn info(&self, states: &[f64]) -> Result<IonInfo, CalcError>;

    /// Calculates the increment of the state variables.
    ///
    /// The `ion_current` (µA/cm², positive inward) is the summed current of all channels whose
    /// root ion is this pool.
    /// The diagonal of the jacobian is written into `decay`.
    fn calculate_increment(
        &self,
        v: f64,
        ion_current: f64,
        states: &[f64],
        dstates: &mut [f64],
        decay: &mut [f64],
    ) -> Result<(), CalcError>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn valences() {
        assert_eq!(IonKind::Sodium.valence(), 1);
        assert_eq!(IonKind::Potassium.valence(), 1);
        assert_eq!(IonKind::Calcium.valence(), 2);
    }
}
