use braincell_concepts::{CalcError, Channel, IonInfo, IonKind};

use serde::{Deserialize, Serialize};

use super::*;

/// Collection of all channels provided by this crate.
///
/// Allows to combine heterogeneous channels inside one
/// [Membrane](crate::compartments::Membrane) while keeping it serializable.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[allow(missing_docs)]
pub enum ChannelModel {
    Leak(Leak),
    NaHH1952(NaHH1952),
    NaTM1991(NaTM1991),
    NaBa2002(NaBa2002),
    NaRsg(NaRsg),
    KHH1952(KHH1952),
    KTM1991(KTM1991),
    CaHVA(CaHVA),
    KCaAhp(KCaAhp),
}

macro_rules! impl_channel_model {
    ($($variant: ident),+) => {
        $(
            impl From<$variant> for ChannelModel {
                fn from(channel: $variant) -> Self {
                    ChannelModel::$variant(channel)
                }
            }
        )+

        impl Channel for ChannelModel {
            fn name(&self) -> &str {
                match self {
                    $(ChannelModel::$variant(c) => c.name(),)+
                }
            }

            fn ions(&self) -> &[IonKind] {
                match self {
                    $(ChannelModel::$variant(c) => c.ions(),)+
                }
            }

            fn n_gates(&self) -> usize {
                match self {
                    $(ChannelModel::$variant(c) => c.n_gates(),)+
                }
            }

            fn steady_state(
                &self,
                v: f64,
                ions: &[IonInfo],
                gates: &mut [f64],
            ) -> Result<(), CalcError> {
                match self {
                    $(ChannelModel::$variant(c) => c.steady_state(v, ions, gates),)+
                }
            }

            fn calculate_gate_increment(
                &self,
                v: f64,
                ions: &[IonInfo],
                gates: &[f64],
                dgates: &mut [f64],
                decay: &mut [f64],
            ) -> Result<(), CalcError> {
                match self {
                    $(ChannelModel::$variant(c) => {
                        c.calculate_gate_increment(v, ions, gates, dgates, decay)
                    })+
                }
            }

            fn current(&self, v: f64, ions: &[IonInfo], gates: &[f64]) -> f64 {
                match self {
                    $(ChannelModel::$variant(c) => c.current(v, ions, gates),)+
                }
            }

            fn conductance(&self, v: f64, ions: &[IonInfo], gates: &[f64]) -> f64 {
                match self {
                    $(ChannelModel::$variant(c) => c.conductance(v, ions, gates),)+
                }
            }

            fn normalize_gates(&self, gates: &mut [f64]) {
                match self {
                    $(ChannelModel::$variant(c) => c.normalize_gates(gates),)+
                }
            }
        }
    }
}

impl_channel_model!(
    Leak, NaHH1952, NaTM1991, NaBa2002, NaRsg, KHH1952, KTM1991, CaHVA, KCaAhp
);
