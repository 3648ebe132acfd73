use braincell_concepts::{CalcError, Channel, DiffEqModule, DiffEqState, Ion, Neuron};

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use super::Membrane;
use crate::channels::{ChannelModel, KHH1952, Leak, NaHH1952};
use crate::ions::{IonModel, PotassiumFixed, SodiumFixed};
use crate::units::current_to_density;

/// Isopotential neuron consisting of a single patch of membrane.
///
/// The state is given by $(V, s_1, \dots, s_n)$ where the $s_i$ are the states of the
/// [Membrane].
/// The potential follows
/// \\begin{equation}
///     C_m\frac{dV}{dt} = I_{ext} + \sum_{ch} I_{ch}.
/// \\end{equation}
///
/// ```
/// # use braincell_building_blocks::prelude::*;
/// # use braincell_concepts::{DiffEqState, Neuron};
/// let mut neuron = SingleCompartment::hodgkin_huxley()?;
/// assert_eq!(neuron.membrane_potential(), -65.0);
/// neuron.set_external_current(10.0);
/// assert_eq!(neuron.get_state().len(), 4);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SingleCompartment<Ch = ChannelModel, I = IonModel> {
    /// Composition of ions and channels
    pub membrane: Membrane<Ch, I>,
    /// Specific membrane capacitance (µF/cm²)
    pub c_m: f64,
    /// Membrane area (µm²) which is only used to convert point currents
    pub area: f64,
    /// Spike threshold (mV)
    pub v_th: f64,
    /// Potential (mV) at which the compartment is initialized
    pub v_initial: f64,
    /// External current density (µA/cm²)
    pub external_current: f64,
    state: DVector<f64>,
}

impl<Ch, I> SingleCompartment<Ch, I>
where
    Ch: Channel,
    I: Ion,
{
    /// Constructs a new compartment with all channels at their steady state at -65 mV.
    pub fn new(c_m: f64, membrane: Membrane<Ch, I>) -> Result<Self, CalcError> {
        let mut compartment = Self {
            state: DVector::zeros(1 + membrane.n_states()),
            membrane,
            c_m,
            area: 1e6 / core::f64::consts::PI,
            v_th: 0.0,
            v_initial: -65.0,
            external_current: 0.0,
        };
        compartment.reset_state()?;
        Ok(compartment)
    }

    /// Sets the spike threshold (mV).
    pub fn with_threshold(self, v_th: f64) -> Self {
        Self { v_th, ..self }
    }

    /// Sets the membrane area (µm²).
    pub fn with_area(self, area: f64) -> Self {
        Self { area, ..self }
    }

    /// Changes the initial potential and resets the state accordingly.
    pub fn with_initial_potential(mut self, v_initial: f64) -> Result<Self, CalcError> {
        self.v_initial = v_initial;
        self.reset_state()?;
        Ok(self)
    }

    /// Sets the potential to its initial value and all ions and channels to their initial state.
    pub fn reset_state(&mut self) -> Result<(), CalcError> {
        self.state[0] = self.v_initial;
        self.membrane
            .initial_state(self.v_initial, &mut self.state.as_mut_slice()[1..])
    }

    /// Sets the external current from a point current (nA) injected into the compartment.
    pub fn inject_current(&mut self, current: f64) {
        self.external_current = current_to_density(current, self.area);
    }

    /// Current density (µA/cm²) of every channel at the current state.
    pub fn channel_currents(&self) -> Result<Vec<f64>, CalcError> {
        self.membrane
            .channel_currents(self.state[0], &self.state.as_slice()[1..])
    }

    fn increment(
        &self,
        state: &DVector<f64>,
    ) -> Result<(DVector<f64>, DVector<f64>), CalcError> {
        let n = state.len();
        let mut dstate = DVector::zeros(n);
        let mut decay = DVector::zeros(n);
        let v = state[0];
        let currents = self.membrane.calculate_increment(
            v,
            &state.as_slice()[1..],
            &mut dstate.as_mut_slice()[1..],
            &mut decay.as_mut_slice()[1..],
        )?;
        dstate[0] = (self.external_current + currents.current) / self.c_m;
        decay[0] = -currents.conductance / self.c_m;
        Ok((dstate, decay))
    }
}

impl SingleCompartment {
    /// The classic squid giant axon of Hodgkin & Huxley (1952) with resting potential -65 mV.
    pub fn hodgkin_huxley() -> Result<Self, Box<dyn std::error::Error>> {
        let membrane = Membrane::new(
            vec![
                SodiumFixed::with_reversal(50.0).into(),
                PotassiumFixed::with_reversal(-77.0).into(),
            ],
            vec![
                NaHH1952::default().into(),
                KHH1952::default().into(),
                Leak {
                    g_max: 0.3,
                    reversal: -54.387,
                }
                .into(),
            ],
        )?;
        Ok(Self::new(1.0, membrane)?)
    }
}

impl<Ch, I> DiffEqState<DVector<f64>> for SingleCompartment<Ch, I> {
    fn get_state(&self) -> DVector<f64> {
        self.state.clone()
    }

    fn set_state(&mut self, state: DVector<f64>) {
        self.state = state;
    }
}

impl<Ch, I> DiffEqModule<DVector<f64>> for SingleCompartment<Ch, I>
where
    Ch: Channel,
    I: Ion,
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
        self.membrane.normalize(&mut self.state.as_mut_slice()[1..]);
        Ok(())
    }
}

impl<Ch, I> Neuron for SingleCompartment<Ch, I> {
    fn membrane_potential(&self) -> f64 {
        self.state[0]
    }

    fn spike_threshold(&self) -> f64 {
        self.v_th
    }

    fn set_external_current(&mut self, current: f64) {
        self.external_current = current;
    }

    fn external_current(&self) -> f64 {
        self.external_current
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resting_state_is_almost_stationary() -> Result<(), Box<dyn std::error::Error>> {
        let neuron = SingleCompartment::hodgkin_huxley()?;
        let derivative = neuron.calculate_derivative(0.0, &neuron.get_state())?;
        assert!(derivative[0].abs() < 1e-2);
        for d in derivative.iter().skip(1) {
            approx::assert_abs_diff_eq!(*d, 0.0, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn analytic_linearization_matches_finite_differences() -> Result<(), Box<dyn std::error::Error>>
    {
        let mut neuron = SingleCompartment::hodgkin_huxley()?;
        neuron.set_external_current(5.0);
        let mut state = neuron.get_state();
        state[0] = -50.0;
        let (_, decay) = neuron.calculate_linearization(0.0, &state)?;
        // Evaluate the default finite difference approximation for comparison
        let f0 = neuron.calculate_derivative(0.0, &state)?;
        for i in 0..state.len() {
            let h = 1e-6;
            let mut perturbed = state.clone();
            perturbed[i] += h;
            let f1 = neuron.calculate_derivative(0.0, &perturbed)?;
            approx::assert_abs_diff_eq!(decay[i], (f1[i] - f0[i]) / h, epsilon = 1e-3);
        }
        Ok(())
    }

    #[test]
    fn depolarizing_current_raises_potential() -> Result<(), Box<dyn std::error::Error>> {
        let mut neuron = SingleCompartment::hodgkin_huxley()?;
        let d_rest = neuron.calculate_derivative(0.0, &neuron.get_state())?[0];
        neuron.set_external_current(10.0);
        let d_stim = neuron.calculate_derivative(0.0, &neuron.get_state())?[0];
        approx::assert_abs_diff_eq!(d_stim - d_rest, 10.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn inject_point_current() -> Result<(), Box<dyn std::error::Error>> {
        let mut neuron = SingleCompartment::hodgkin_huxley()?.with_area(1e5);
        neuron.inject_current(2.0);
        approx::assert_abs_diff_eq!(neuron.external_current(), 2.0, epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn post_integral_normalizes_gates() -> Result<(), Box<dyn std::error::Error>> {
        let mut neuron = SingleCompartment::hodgkin_huxley()?;
        let mut state = neuron.get_state();
        state[1] = 1.1;
        state[3] = -0.1;
        neuron.set_state(state);
        neuron.post_integral()?;
        assert_eq!(neuron.get_state()[1], 1.0);
        assert_eq!(neuron.get_state()[3], 0.0);
        Ok(())
    }

    #[test]
    fn reset_with_new_initial_potential() -> Result<(), Box<dyn std::error::Error>> {
        let neuron = SingleCompartment::hodgkin_huxley()?
            .with_threshold(-10.0)
            .with_initial_potential(-70.0)?;
        assert_eq!(neuron.membrane_potential(), -70.0);
        assert_eq!(neuron.spike_threshold(), -10.0);
        Ok(())
    }
}
