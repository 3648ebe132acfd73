use braincell_concepts::{CalcError, Ion, IonInfo, IonKind};

use serde::{Deserialize, Serialize};

macro_rules! define_fixed_ion {
    ($(($name: ident, $kind: expr, $reversal: expr, $concentration: expr, $descr: expr)),+) => {
        $(
            #[doc = $descr]
            ///
            /// This pool has no dynamics. It holds a fixed reversal potential $E$ and
            /// concentration $C$ and thus contributes no state variables.
            #[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
            pub struct $name {
                /// Reversal potential $E$ (mV)
                pub reversal: f64,
                /// Intracellular concentration $C$ (mM)
                pub concentration: f64,
            }

            impl Default for $name {
                fn default() -> Self {
                    Self {
                        reversal: $reversal,
                        concentration: $concentration,
                    }
                }
            }

            impl $name {
                /// Construct a new pool with given reversal potential (mV) and default
                /// concentration.
                pub fn with_reversal(reversal: f64) -> Self {
                    Self {
                        reversal,
                        ..Default::default()
                    }
                }
            }

            impl Ion for $name {
                fn kind(&self) -> IonKind {
                    $kind
                }

                fn n_states(&self) -> usize {
                    0
                }

                fn initial_states(&self, _states: &mut [f64]) {}

                fn info(&self, _states: &[f64]) -> Result<IonInfo, CalcError> {
                    Ok(IonInfo {
                        concentration: self.concentration,
                        reversal: self.reversal,
                    })
                }

                fn calculate_increment(
                    &self,
                    _v: f64,
                    _ion_current: f64,
                    _states: &[f64],
                    _dstates: &mut [f64],
                    _decay: &mut [f64],
                ) -> Result<(), CalcError> {
                    Ok(())
                }
            }
        )+
    }
}

define_fixed_ion!(
    (
        SodiumFixed,
        IonKind::Sodium,
        50.0,
        0.0400811,
        "Sodium pool with fixed reversal potential and concentration."
    ),
    (
        PotassiumFixed,
        IonKind::Potassium,
        -95.0,
        0.0400811,
        "Potassium pool with fixed reversal potential and concentration."
    ),
    (
        CalciumFixed,
        IonKind::Calcium,
        120.0,
        2.4e-4,
        "Calcium pool with fixed reversal potential and concentration."
    )
);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() -> Result<(), CalcError> {
        let k = PotassiumFixed::default();
        assert_eq!(k.kind(), IonKind::Potassium);
        assert_eq!(k.n_states(), 0);
        assert_eq!(k.info(&[])?.reversal, -95.0);
        let na = SodiumFixed::with_reversal(55.0);
        assert_eq!(na.info(&[])?.reversal, 55.0);
        assert_eq!(na.info(&[])?.concentration, 0.0400811);
        Ok(())
    }
}
