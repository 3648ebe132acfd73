use braincell_concepts::{
    CalcError, Channel, CompositionError, HierarchyError, Ion, IonInfo, SetupError,
};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Position of every ion and channel inside the flat state of a [Membrane].
///
/// Ion states come first in the order in which ions were given, followed by the gating
/// variables of all channels in their order.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct StateLayout {
    /// Start of the states of every ion. Contains one additional entry marking the end.
    pub ion_offsets: Vec<usize>,
    /// Start of the gates of every channel. Contains one additional entry marking the end.
    pub channel_offsets: Vec<usize>,
    /// Indices of the ions which every channel requires, root ion first.
    pub channel_ions: Vec<Vec<usize>>,
}

impl StateLayout {
    /// Total number of state variables.
    pub fn n_states(&self) -> usize {
        self.channel_offsets.last().copied().unwrap_or(0)
    }

    /// Range of the states of the ion with given index.
    pub fn ion_range(&self, index: usize) -> core::ops::Range<usize> {
        self.ion_offsets[index]..self.ion_offsets[index + 1]
    }

    /// Range of the gates of the channel with given index.
    pub fn channel_range(&self, index: usize) -> core::ops::Range<usize> {
        self.channel_offsets[index]..self.channel_offsets[index + 1]
    }
}

/// Total current through the membrane together with its sensitivity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MembraneCurrents {
    /// Summed current density of all channels (µA/cm²), positive if inward
    pub current: f64,
    /// Summed effective conductance $-\partial I/\partial V$ (mS/cm²)
    pub conductance: f64,
}

/// Composition of ion pools and channels sharing one patch of membrane.
///
/// The membrane owns no state. It knows how the states of all its ions and channels are laid out
/// (see [StateLayout]) and calculates their increments.
///
/// ```
/// # use braincell_building_blocks::prelude::*;
/// let membrane = Membrane::new(
///     vec![IonModel::from(SodiumFixed::default()), PotassiumFixed::default().into()],
///     vec![ChannelModel::from(NaHH1952::default()), KHH1952::default().into(), Leak::default().into()],
/// )?;
/// // Two sodium gates and one potassium gate
/// assert_eq!(membrane.n_states(), 3);
/// # Ok::<(), braincell_concepts::CompositionError>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Membrane<Ch, I> {
    ions: Vec<I>,
    channels: Vec<Ch>,
    layout: StateLayout,
}

impl<Ch, I> Membrane<Ch, I>
where
    Ch: Channel,
    I: Ion,
{
    /// Composes the given ions and channels.
    ///
    /// Fails if an ion species was given twice or if a channel requires an ion species which is
    /// not present.
    pub fn new(ions: Vec<I>, channels: Vec<Ch>) -> Result<Self, CompositionError> {
        if let Some(kind) = ions.iter().map(|ion| ion.kind()).duplicates().next() {
            return Err(SetupError(format!("ion {kind} was specified more than once")).into());
        }
        let mut ion_offsets = vec![0];
        for ion in ions.iter() {
            ion_offsets.push(ion_offsets[ion_offsets.len() - 1] + ion.n_states());
        }
        let mut channel_offsets = vec![ion_offsets[ion_offsets.len() - 1]];
        let mut channel_ions = Vec::with_capacity(channels.len());
        for channel in channels.iter() {
            let indices = channel
                .ions()
                .iter()
                .map(|kind| {
                    ions.iter().position(|ion| ion.kind() == *kind).ok_or_else(|| {
                        HierarchyError(format!(
                            "channel {} requires ion {kind} which is not present",
                            channel.name()
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            channel_ions.push(indices);
            channel_offsets.push(channel_offsets[channel_offsets.len() - 1] + channel.n_gates());
        }
        Ok(Self {
            ions,
            channels,
            layout: StateLayout {
                ion_offsets,
                channel_offsets,
                channel_ions,
            },
        })
    }

    /// All ion pools
    pub fn ions(&self) -> &[I] {
        &self.ions
    }

    /// All channels
    pub fn channels(&self) -> &[Ch] {
        &self.channels
    }

    /// Layout of the states
    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Total number of state variables of ions and channels.
    pub fn n_states(&self) -> usize {
        self.layout.n_states()
    }

    /// Concentrations and reversal potentials of all ions for the given states.
    pub fn ion_infos(&self, states: &[f64]) -> Result<Vec<IonInfo>, CalcError> {
        self.ions
            .iter()
            .enumerate()
            .map(|(i, ion)| ion.info(&states[self.layout.ion_range(i)]))
            .collect()
    }

    fn channel_infos(&self, infos: &[IonInfo], channel: usize) -> Vec<IonInfo> {
        self.layout.channel_ions[channel]
            .iter()
            .map(|&i| infos[i])
            .collect()
    }

    /// Writes the initial state into `states`.
    ///
    /// Ions are initialized first. Afterwards every channel is set to its steady state at the
    /// given potential with the initial ion concentrations.
    pub fn initial_state(&self, v: f64, states: &mut [f64]) -> Result<(), CalcError> {
        for (i, ion) in self.ions.iter().enumerate() {
            ion.initial_states(&mut states[self.layout.ion_range(i)]);
        }
        let infos = self.ion_infos(states)?;
        for (i, channel) in self.channels.iter().enumerate() {
            let ions = self.channel_infos(&infos, i);
            channel.steady_state(v, &ions, &mut states[self.layout.channel_range(i)])?;
        }
        Ok(())
    }

    /// Calculates the increments of all states together with the total membrane current.
    ///
    /// The current of every channel is attributed to its root ion which then updates its
    /// concentration accordingly.
    /// The diagonal of the jacobian with respect to every state is written into `decay`.
    pub fn calculate_increment(
        &self,
        v: f64,
        states: &[f64],
        dstates: &mut [f64],
        decay: &mut [f64],
    ) -> Result<MembraneCurrents, CalcError> {
        let infos = self.ion_infos(states)?;
        let mut ion_currents = vec![0.0; self.ions.len()];
        let mut total = MembraneCurrents::default();
        for (i, channel) in self.channels.iter().enumerate() {
            let range = self.layout.channel_range(i);
            let ions = self.channel_infos(&infos, i);
            let gates = &states[range.clone()];
            let current = channel.current(v, &ions, gates);
            total.current += current;
            total.conductance += channel.conductance(v, &ions, gates);
            if let Some(&root) = self.layout.channel_ions[i].first() {
                ion_currents[root] += current;
            }
            channel.calculate_gate_increment(
                v,
                &ions,
                gates,
                &mut dstates[range.clone()],
                &mut decay[range],
            )?;
        }
        for (i, ion) in self.ions.iter().enumerate() {
            let range = self.layout.ion_range(i);
            ion.calculate_increment(
                v,
                ion_currents[i],
                &states[range.clone()],
                &mut dstates[range.clone()],
                &mut decay[range],
            )?;
        }
        Ok(total)
    }

    /// Projects all gating variables back into their admissible range.
    pub fn normalize(&self, states: &mut [f64]) {
        for (i, channel) in self.channels.iter().enumerate() {
            channel.normalize_gates(&mut states[self.layout.channel_range(i)]);
        }
    }

    /// Current density (µA/cm²) of every channel for the given states.
    pub fn channel_currents(&self, v: f64, states: &[f64]) -> Result<Vec<f64>, CalcError> {
        let infos = self.ion_infos(states)?;
        Ok(self
            .channels
            .iter()
            .enumerate()
            .map(|(i, channel)| {
                let ions = self.channel_infos(&infos, i);
                channel.current(v, &ions, &states[self.layout.channel_range(i)])
            })
            .collect())
    }
}
