/// Observable quantities of a neuron which are used to connect it to others.
///
/// Networks read the membrane potential to detect spikes and write the external current in order
/// to deliver synaptic input and stimuli.
pub trait Neuron {
    /// Membrane potential (mV) of the compartment at which spikes are detected.
    fn membrane_potential(&self) -> f64;

    /// Potential (mV) which has to be crossed from below to emit a spike.
    fn spike_threshold(&self) -> f64;

    /// Sets the external current density (µA/cm²) which acts until it is set again.
    fn set_external_current(&mut self, current: f64);

    /// The currently applied external current density (µA/cm²).
    fn external_current(&self) -> f64;
}

/// Detects an upward crossing of the threshold between two consecutive potentials.
///
/// ```
/// # use braincell_concepts::threshold_crossed;
/// assert!(threshold_crossed(-1.0, 0.5, 0.0));
/// assert!(threshold_crossed(-1.0, 0.0, 0.0));
/// assert!(!threshold_crossed(0.0, 1.0, 0.0));
/// ```
pub fn threshold_crossed(v_previous: f64, v_current: f64, threshold: f64) -> bool {
    v_previous < threshold && threshold <= v_current
}
