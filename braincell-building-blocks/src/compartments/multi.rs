use std::collections::BTreeMap;

use braincell_concepts::{
    CalcError, Channel, DiffEqModule, DiffEqState, IndexError, Ion, Neuron, SetupError,
};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::{CompartmentGeometry, Membrane, Morphology};
use crate::units::{current_to_density, UM2_TO_CM2};

/// Axial coupling between two neighbouring compartments.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
struct AxialCoupling {
    child: usize,
    parent: usize,
    /// Conductance divided by the area of the child (mS/cm²)
    to_child: f64,
    /// Conductance divided by the area of the parent (mS/cm²)
    to_parent: f64,
}

/// Spatially extended neuron composed of electrically coupled compartments.
///
/// The potential of compartment $i$ follows
/// \\begin{equation}
///     C_{m,i}\frac{dV_i}{dt} = I_{ext,i} + \sum_{ch} I_{ch,i}
///         + \sum_{j\sim i} \frac{g_{ij}}{A_i}(V_j - V_i)
/// \\end{equation}
/// where $g_{ij}$ is the axial conductance between neighbouring compartments.
/// The state contains all potentials $(V_0,\dots,V_{n-1})$ followed by the membrane states of
/// every compartment in order.
/// Compartment 0 is the root of the [Morphology] and is used to detect spikes.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MultiCompartment<Ch, I> {
    geometry: Vec<CompartmentGeometry>,
    membranes: Vec<Membrane<Ch, I>>,
    couplings: Vec<AxialCoupling>,
    offsets: Vec<usize>,
    /// External current density of every compartment (µA/cm²)
    pub external_currents: Vec<f64>,
    /// Spike threshold at the root compartment (mV)
    pub v_th: f64,
    /// Potential (mV) at which all compartments are initialized
    pub v_initial: f64,
    state: DVector<f64>,
}

impl<Ch, I> MultiCompartment<Ch, I>
where
    Ch: Channel + Clone,
    I: Ion + Clone,
{
    /// Discretizes the morphology and assigns the membrane given for each section name.
    ///
    /// Every section needs a matching entry in `membranes`.
    pub fn new(
        morphology: &Morphology,
        membranes: &BTreeMap<String, Membrane<Ch, I>>,
    ) -> Result<Self, SetupError> {
        let names: Vec<_> = morphology.section_names().collect();
        let geometry = morphology.compartments()?;
        let membranes = geometry
            .iter()
            .map(|g| {
                membranes.get(names[g.section]).cloned().ok_or_else(|| {
                    SetupError(format!("no membrane given for section {}", names[g.section]))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let couplings = geometry
            .iter()
            .enumerate()
            .filter_map(|(child, g)| g.parent.map(|parent| (child, parent)))
            .map(|(child, parent)| {
                let resistance =
                    geometry[child].half_resistance() + geometry[parent].half_resistance();
                let g = 1.0 / resistance;
                AxialCoupling {
                    child,
                    parent,
                    // S / cm² = 1e3 mS/cm²
                    to_child: 1e3 * g / (geometry[child].area * UM2_TO_CM2),
                    to_parent: 1e3 * g / (geometry[parent].area * UM2_TO_CM2),
                }
            })
            .collect();

        let n = geometry.len();
        let mut offsets = vec![n];
        for m in membranes.iter() {
            offsets.push(offsets[offsets.len() - 1] + m.n_states());
        }
        let mut cell = Self {
            external_currents: vec![0.0; n],
            state: DVector::zeros(offsets[offsets.len() - 1]),
            geometry,
            membranes,
            couplings,
            offsets,
            v_th: 0.0,
            v_initial: -65.0,
        };
        cell.reset_state()?;
        Ok(cell)
    }

    /// Sets the spike threshold (mV).
    pub fn with_threshold(self, v_th: f64) -> Self {
        Self { v_th, ..self }
    }

    /// Changes the initial potential and resets the state accordingly.
    pub fn with_initial_potential(mut self, v_initial: f64) -> Result<Self, CalcError> {
        self.v_initial = v_initial;
        self.reset_state()?;
        Ok(self)
    }

    /// Sets all potentials to their initial value and ions and channels to their initial state.
    pub fn reset_state(&mut self) -> Result<(), CalcError> {
        for i in 0..self.geometry.len() {
            self.state[i] = self.v_initial;
            let range = self.offsets[i]..self.offsets[i + 1];
            self.membranes[i].initial_state(self.v_initial, &mut self.state.as_mut_slice()[range])?;
        }
        Ok(())
    }

    /// Number of compartments
    pub fn n_compartments(&self) -> usize {
        self.geometry.len()
    }

    /// Geometry of every compartment
    pub fn geometry(&self) -> &[CompartmentGeometry] {
        &self.geometry
    }

    /// Membrane potentials (mV) of all compartments.
    pub fn potentials(&self) -> &[f64] {
        &self.state.as_slice()[..self.geometry.len()]
    }

    /// Injects a point current (nA) into the given compartment.
    pub fn inject_current(&mut self, compartment: usize, current: f64) -> Result<(), IndexError> {
        let area = self
            .geometry
            .get(compartment)
            .ok_or_else(|| {
                IndexError(format!(
                    "compartment {compartment} does not exist in cell with {} compartments",
                    self.geometry.len()
                ))
            })?
            .area;
        self.external_currents[compartment] = current_to_density(current, area);
        Ok(())
    }

    fn increment(&self, state: &DVector<f64>) -> Result<(DVector<f64>, DVector<f64>), CalcError> {
        let n = self.geometry.len();
        let mut dstate = DVector::zeros(state.len());
        let mut decay = DVector::zeros(state.len());
        for i in 0..n {
            let range = self.offsets[i]..self.offsets[i + 1];
            let currents = self.membranes[i].calculate_increment(
                state[i],
                &state.as_slice()[range.clone()],
                &mut dstate.as_mut_slice()[range.clone()],
                &mut decay.as_mut_slice()[range],
            )?;
            dstate[i] = self.external_currents[i] + currents.current;
            decay[i] = -currents.conductance;
        }
        for c in self.couplings.iter() {
            let dv = state[c.parent] - state[c.child];
            dstate[c.child] += c.to_child * dv;
            dstate[c.parent] -= c.to_parent * dv;
            decay[c.child] -= c.to_child;
            decay[c.parent] -= c.to_parent;
        }
        for i in 0..n {
            dstate[i] /= self.geometry[i].c_m;
            decay[i] /= self.geometry[i].c_m;
        }
        Ok((dstate, decay))
    }
}

impl<Ch, I> DiffEqState<DVector<f64>> for MultiCompartment<Ch, I> {
    fn get_state(&self) -> DVector<f64> {
        self.state.clone()
    }

    fn set_state(&mut self, state: DVector<f64>) {
        self.state = state;
    }
}

impl<Ch, I> DiffEqModule<DVector<f64>> for MultiCompartment<Ch, I>
where
    Ch: Channel + Clone,
    I: Ion + Clone,
{
    fn calculate_derivative(&self, _t: f64, state: &DVector<f64>) -> Result<DVector<f64>, CalcError> {
        Ok(self.increment(state)?.0)
    }

    fn calculate_linearization(
        &self,
        _t: f64,
        state: &DVector<f64>,
    ) -> Result<(DVector<f64>, DVector<f64>), CalcError> {
        self.increment(state)
    }

    fn post_integral(&mut self) -> Result<(), CalcError> {
        for (i, membrane) in self.membranes.iter().enumerate() {
            let range = self.offsets[i]..self.offsets[i + 1];
            membrane.normalize(&mut self.state.as_mut_slice()[range]);
        }
        Ok(())
    }
}

impl<Ch, I> Neuron for MultiCompartment<Ch, I> {
    fn membrane_potential(&self) -> f64 {
        self.state[0]
    }

    fn spike_threshold(&self) -> f64 {
        self.v_th
    }

    fn set_external_current(&mut self, current: f64) {
        self.external_currents[0] = current;
    }

    fn external_current(&self) -> f64 {
        self.external_currents[0]
    }
}
