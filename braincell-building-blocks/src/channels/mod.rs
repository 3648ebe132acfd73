//! Ion channels and the gating kinetics they are built from.
//!
//! All channels with Hodgkin-Huxley type gating implement [GatedChannel] which only requires
//! the opening and closing rates of each gate.
//! The [Channel](braincell_concepts::Channel) trait is then derived from these rates.
//! Markov schemes such as [NaRsg] implement the trait directly.

mod calcium;
mod calcium_activated;
mod gating;
mod leak;
mod model;
mod potassium;
mod resurgent;
mod sodium;

pub use calcium::*;
pub use calcium_activated::*;
pub use gating::*;
pub use leak::*;
pub use model::*;
pub use potassium::*;
pub use resurgent::*;
pub use sodium::*;

use braincell_concepts::{IonInfo, IonKind};

/// Channel built from independent gating variables which open with rate $\alpha$ and close
/// with rate $\beta$.
///
/// The current is given by
/// \\begin{equation}
///     I = g_{max} P(x_1, \dots, x_n) (E - V)
/// \\end{equation}
/// where $P$ is the [open probability](GatedChannel::open_probability) and $E$ the reversal
/// potential of the root ion.
pub trait GatedChannel {
    /// Identifier of the parameter set
    const NAME: &'static str;
    /// Ion species in the order in which they are passed to [GatedChannel::rates]
    const IONS: &'static [IonKind];
    /// Number of gating variables
    const N_GATES: usize;

    /// Maximal conductance density (mS/cm²)
    fn g_max(&self) -> f64;

    /// Temperature factor $\phi$ which multiplies all rates
    fn phi(&self) -> f64;

    /// Opening and closing rates $(\alpha, \beta)$ (1/ms) of the gate with given index.
    fn rates(&self, v: f64, ions: &[IonInfo], gate: usize) -> (f64, f64);

    /// Fraction of open channels.
    fn open_probability(&self, gates: &[f64]) -> f64;
}

macro_rules! impl_gated_channel {
    ($($name: ident),+) => {
        $(
            impl braincell_concepts::Channel for $name {
                fn name(&self) -> &str {
                    <Self as $crate::channels::GatedChannel>::NAME
                }

                fn ions(&self) -> &[braincell_concepts::IonKind] {
                    <Self as $crate::channels::GatedChannel>::IONS
                }

                fn n_gates(&self) -> usize {
                    <Self as $crate::channels::GatedChannel>::N_GATES
                }

                fn steady_state(
                    &self,
                    v: f64,
                    ions: &[braincell_concepts::IonInfo],
                    gates: &mut [f64],
                ) -> Result<(), braincell_concepts::CalcError> {
                    for (i, gate) in gates.iter_mut().enumerate() {
                        let (alpha, beta) = $crate::channels::GatedChannel::rates(self, v, ions, i);
                        *gate = $crate::channels::steady_state(alpha, beta);
                    }
                    Ok(())
                }

                fn calculate_gate_increment(
                    &self,
                    v: f64,
                    ions: &[braincell_concepts::IonInfo],
                    gates: &[f64],
                    dgates: &mut [f64],
                    decay: &mut [f64],
                ) -> Result<(), braincell_concepts::CalcError> {
                    let phi = $crate::channels::GatedChannel::phi(self);
                    for (i, x) in gates.iter().enumerate() {
                        let (alpha, beta) = $crate::channels::GatedChannel::rates(self, v, ions, i);
                        (dgates[i], decay[i]) = $crate::channels::relax(alpha, beta, phi, *x);
                    }
                    Ok(())
                }

                fn current(&self, v: f64, ions: &[braincell_concepts::IonInfo], gates: &[f64]) -> f64 {
                    <Self as braincell_concepts::Channel>::conductance(self, v, ions, gates)
                        * (ions[0].reversal - v)
                }

                fn conductance(
                    &self,
                    _v: f64,
                    _ions: &[braincell_concepts::IonInfo],
                    gates: &[f64],
                ) -> f64 {
                    use $crate::channels::GatedChannel;
                    self.g_max() * self.open_probability(gates)
                }
            }
        )+
    }
}

pub(crate) use impl_gated_channel;
