//! Pools of ion species with fixed or dynamic concentrations.

use braincell_concepts::{CalcError, Ion, IonInfo, IonKind};

use serde::{Deserialize, Serialize};

use crate::units::{celsius_to_kelvin, FARADAY, GAS_CONSTANT, VOLT};

mod calcium;
mod fixed;

pub use calcium::*;
pub use fixed::*;

/// Reversal potential (mV) of an ion species given by the Nernst equation
/// \\begin{equation}
///     E = \frac{RT}{zF}\ln\frac{C_{out}}{C_{in}}.
/// \\end{equation}
///
/// ```
/// # use braincell_building_blocks::ions::nernst_potential;
/// let e = nernst_potential(1, 10.0, 10.0, 36.0).unwrap();
/// assert_eq!(e, 0.0);
/// ```
pub fn nernst_potential(
    valence: i32,
    c_in: f64,
    c_out: f64,
    temperature: f64,
) -> Result<f64, CalcError> {
    if c_in <= 0.0 || c_out <= 0.0 {
        return Err(CalcError(format!(
            "Nernst potential requires positive concentrations but got c_in={c_in} c_out={c_out}"
        )));
    }
    let t = celsius_to_kelvin(temperature);
    Ok(VOLT * GAS_CONSTANT * t / (valence as f64 * FARADAY) * (c_out / c_in).ln())
}

/// Collection of all ion pools provided by this crate.
///
/// Compartments are generic over their ions. This enum allows mixing different pools inside one
/// compartment while remaining serializable.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum IonModel {
    /// See [SodiumFixed]
    SodiumFixed(SodiumFixed),
    /// See [PotassiumFixed]
    PotassiumFixed(PotassiumFixed),
    /// See [CalciumFixed]
    CalciumFixed(CalciumFixed),
    /// See [CalciumDetailed]
    CalciumDetailed(CalciumDetailed),
}

macro_rules! impl_ion_model {
    ($($variant: ident),+) => {
        $(
            impl From<$variant> for IonModel {
                fn from(ion: $variant) -> Self {
                    IonModel::$variant(ion)
                }
            }
        )+

        impl Ion for IonModel {
            fn kind(&self) -> IonKind {
                match self {
                    $(IonModel::$variant(ion) => ion.kind(),)+
                }
            }

            fn n_states(&self) -> usize {
                match self {
                    $(IonModel::$variant(ion) => ion.n_states(),)+
                }
            }

            fn initial_states(&self, states: &mut [f64]) {
                match self {
                    $(IonModel::$variant(ion) => ion.initial_states(states),)+
                }
            }

            fn info(&self, states: &[f64]) -> Result<IonInfo, CalcError> {
                match self {
                    $(IonModel::$variant(ion) => ion.info(states),)+
                }
            }

            fn calculate_increment(
                &self,
                v: f64,
                ion_current: f64,
                states: &[f64],
                dstates: &mut [f64],
                decay: &mut [f64],
            ) -> Result<(), CalcError> {
                match self {
                    $(IonModel::$variant(ion) => {
                        ion.calculate_increment(v, ion_current, states, dstates, decay)
                    })+
                }
            }
        }
    }
}

impl_ion_model!(SodiumFixed, PotassiumFixed, CalciumFixed, CalciumDetailed);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nernst_rejects_empty_pools() {
        assert!(nernst_potential(2, 0.0, 2.0, 36.0).is_err());
        assert!(nernst_potential(2, 1e-4, -1.0, 36.0).is_err());
    }

    #[test]
    fn nernst_potassium() -> Result<(), CalcError> {
        // Typical mammalian values
        let e = nernst_potential(1, 140.0, 5.0, 37.0)?;
        approx::assert_abs_diff_eq!(e, -89.0, epsilon = 0.5);
        Ok(())
    }

    #[test]
    fn model_delegates() -> Result<(), CalcError> {
        let ion: IonModel = CalciumDetailed::default().into();
        assert_eq!(ion.kind(), IonKind::Calcium);
        assert_eq!(ion.n_states(), 1);
        let ion: IonModel = SodiumFixed::default().into();
        assert_eq!(ion.info(&[])?.reversal, 50.0);
        Ok(())
    }

    #[test]
    fn serialize_ion_kind() {
        use serde_test::{assert_tokens, Token};
        assert_tokens(
            &IonKind::Calcium,
            &[Token::UnitVariant {
                name: "IonKind",
                variant: "Calcium",
            }],
        );
    }
}
