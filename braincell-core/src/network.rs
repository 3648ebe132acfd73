//! Populations of neurons which exchange spikes via delayed synaptic events.
//!
//! A [Network] advances all of its neurons in parallel.
//! After every step, spikes are detected as upward crossings of the
//! [spike threshold](Neuron::spike_threshold) and scheduled for delivery to all postsynaptic
//! neurons of every [Projection].
//! Spikes of one step are always processed in ascending order of the emitting neuron such that
//! results do not depend on the number of threads.

use braincell_concepts::{
    threshold_crossed, CalcError, DiffEqModule, DiffEqState, IndexError, Neuron, SetupError,
    StateVector, Xapy,
};
use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::errors::SimulationError;
use crate::solvers::Solver;

/// Dynamics of the postsynaptic response to one incoming spike.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub enum Synapse {
    /// The synaptic current density (µA/cm²) jumps by the weight and decays exponentially with
    /// time constant `tau` (ms).
    Current {
        /// Decay time (ms)
        tau: f64,
    },
    /// The synaptic conductance density (mS/cm²) jumps by the weight and decays exponentially.
    /// The resulting current is $g(E_{rev} - V)$.
    Conductance {
        /// Decay time (ms)
        tau: f64,
        /// Reversal potential (mV)
        e_rev: f64,
    },
    /// The weight is applied as current density (µA/cm²) only during the step of delivery.
    Delta,
}

impl Synapse {
    fn validate(&self) -> Result<(), SetupError> {
        match self {
            Synapse::Current { tau } | Synapse::Conductance { tau, .. } if *tau <= 0.0 => Err(
                SetupError(format!("synaptic time constant must be positive but is {tau}")),
            ),
            _ => Ok(()),
        }
    }
}

/// Directed connection between two neurons of a [Network].
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Connection {
    /// Index of the presynaptic neuron
    pub pre: usize,
    /// Index of the postsynaptic neuron
    pub post: usize,
    /// Strength of the connection in units of the [Synapse]
    pub weight: f64,
    /// Transmission delay (ms)
    pub delay: f64,
}

/// A set of [Connection]s which all share the same [Synapse] type.
///
/// ```
/// # use braincell_core::network::{Projection, Synapse};
/// let projection = Projection::all_to_all(3, 3, 0.1, 1.0, Synapse::Delta, false);
/// assert_eq!(projection.connections.len(), 6);
/// let p1 = Projection::fixed_probability(50, 50, 0.1, 0.1, 1.0, Synapse::Delta, 42)?;
/// let p2 = Projection::fixed_probability(50, 50, 0.1, 0.1, 1.0, Synapse::Delta, 42)?;
/// assert_eq!(p1, p2);
/// # Ok::<(), braincell_concepts::SetupError>(())
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Projection {
    /// All individual connections
    pub connections: Vec<Connection>,
    /// Response to incoming spikes
    pub synapse: Synapse,
}

impl Projection {
    /// Projection from explicitly given connections.
    pub fn new(connections: Vec<Connection>, synapse: Synapse) -> Self {
        Self {
            connections,
            synapse,
        }
    }

    /// Connects neuron $i$ with neuron $i$ for every $i<n$.
    pub fn one_to_one(n: usize, weight: f64, delay: f64, synapse: Synapse) -> Self {
        let connections = (0..n)
            .map(|i| Connection {
                pre: i,
                post: i,
                weight,
                delay,
            })
            .collect();
        Self::new(connections, synapse)
    }

    /// Connects every presynaptic with every postsynaptic neuron.
    ///
    /// Connections of a neuron with itself are only created if `allow_self_connections` is set.
    pub fn all_to_all(
        n_pre: usize,
        n_post: usize,
        weight: f64,
        delay: f64,
        synapse: Synapse,
        allow_self_connections: bool,
    ) -> Self {
        let connections = itertools::iproduct!(0..n_pre, 0..n_post)
            .filter(|(pre, post)| allow_self_connections || pre != post)
            .map(|(pre, post)| Connection {
                pre,
                post,
                weight,
                delay,
            })
            .collect();
        Self::new(connections, synapse)
    }

    /// Creates every possible connection with the given probability.
    ///
    /// Self connections are excluded.
    /// The same seed always yields the same connections.
    pub fn fixed_probability(
        n_pre: usize,
        n_post: usize,
        probability: f64,
        weight: f64,
        delay: f64,
        synapse: Synapse,
        seed: u64,
    ) -> Result<Self, SetupError> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(SetupError(format!(
                "connection probability {probability} must lie in the interval [0, 1]"
            )));
        }
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(seed);
        let connections = itertools::iproduct!(0..n_pre, 0..n_post)
            .filter(|(pre, post)| pre != post)
            .filter(|_| rng.gen_bool(probability))
            .map(|(pre, post)| Connection {
                pre,
                post,
                weight,
                delay,
            })
            .collect();
        Ok(Self::new(connections, synapse))
    }
}

/// A [Projection] together with its pending events and synaptic state.
#[derive(Clone, Debug, Deserialize, Serialize)]
struct ProjectionState {
    projection: Projection,
    /// Indices of outgoing connections of every presynaptic neuron
    outgoing: Vec<Vec<usize>>,
    /// Number of steps after which a spike arrives
    delay_steps: Vec<usize>,
    /// Ring buffer of increments which are delivered at a given step
    pending: Vec<Vec<f64>>,
    /// Current or conductance of every postsynaptic neuron
    value: Vec<f64>,
}

impl ProjectionState {
    fn new(projection: Projection, n_neurons: usize, dt: f64) -> Result<Self, SimulationError> {
        projection.synapse.validate()?;
        let mut outgoing = vec![Vec::new(); n_neurons];
        let mut delay_steps = Vec::with_capacity(projection.connections.len());
        for (index, c) in projection.connections.iter().enumerate() {
            if c.pre >= n_neurons || c.post >= n_neurons {
                return Err(IndexError(format!(
                    "connection {} -> {} is out of range for network with {n_neurons} neurons",
                    c.pre, c.post
                ))
                .into());
            }
            if !c.delay.is_finite() || c.delay < 0.0 {
                return Err(SetupError(format!(
                    "delay {} of connection {} -> {} must be finite and non-negative",
                    c.delay, c.pre, c.post
                ))
                .into());
            }
            outgoing[c.pre].push(index);
            delay_steps.push(((c.delay / dt).round() as usize).max(1));
        }
        let ring_size = delay_steps.iter().copied().max().unwrap_or(1) + 1;
        Ok(Self {
            projection,
            outgoing,
            delay_steps,
            pending: vec![vec![0.0; n_neurons]; ring_size],
            value: vec![0.0; n_neurons],
        })
    }

    /// Synaptic values after the events of this iteration have arrived.
    fn delivered(&self, iteration: usize) -> Vec<f64> {
        let pending = &self.pending[iteration % self.pending.len()];
        match self.projection.synapse {
            Synapse::Delta => pending.clone(),
            _ => self
                .value
                .iter()
                .zip(pending.iter())
                .map(|(v, p)| v + p)
                .collect(),
        }
    }

    /// Consumes the delivered events, schedules new spikes and lets the synapses decay.
    fn commit(&mut self, iteration: usize, delivered: Vec<f64>, spikes: &[usize], dt: f64) {
        let slot = iteration % self.pending.len();
        self.pending[slot].iter_mut().for_each(|p| *p = 0.0);
        self.value = delivered;
        self.schedule(iteration, spikes);
        self.decay(dt);
    }

    fn schedule(&mut self, iteration: usize, spikes: &[usize]) {
        let ring_size = self.pending.len();
        for &pre in spikes {
            for &index in self.outgoing[pre].iter() {
                let c = &self.projection.connections[index];
                let slot = (iteration + self.delay_steps[index]) % ring_size;
                self.pending[slot][c.post] += c.weight;
            }
        }
    }

    fn decay(&mut self, dt: f64) {
        match self.projection.synapse {
            Synapse::Current { tau } | Synapse::Conductance { tau, .. } => {
                let factor = (-dt / tau).exp();
                self.value.iter_mut().for_each(|v| *v *= factor);
            }
            Synapse::Delta => self.value.iter_mut().for_each(|v| *v = 0.0),
        }
    }
}

/// Population of neurons with recurrent [Projection]s.
///
/// ```
/// # use braincell_building_blocks::prelude::*;
/// # use braincell_core::network::*;
/// # use braincell_core::solvers::Solver;
/// let neurons = vec![SingleCompartment::hodgkin_huxley()?; 2];
/// let mut network = Network::new(neurons, 0.01)?;
/// network.add_projection(Projection::one_to_one(2, 0.5, 1.0, Synapse::Delta))?;
/// let spikes = network.step(Solver::IndExpEuler, 0.0, &|_, _| 0.0)?;
/// assert!(spikes.is_empty());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Network<C> {
    neurons: Vec<C>,
    projections: Vec<ProjectionState>,
    dt: f64,
    iteration: usize,
}

impl<C> Network<C> {
    /// Constructs a network without any connections which is advanced with the time step `dt`
    /// (ms).
    pub fn new(neurons: Vec<C>, dt: f64) -> Result<Self, SetupError> {
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(SetupError(format!(
                "time step of network must be positive and finite but is {dt}"
            )));
        }
        Ok(Self {
            neurons,
            projections: Vec::new(),
            dt,
            iteration: 0,
        })
    }

    /// Adds a projection after checking that all indices refer to existing neurons.
    ///
    /// Indices out of range yield an [IndexError](SimulationError::IndexError) while invalid
    /// delays or time constants yield a [SetupError](SimulationError::SetupError).
    pub fn add_projection(&mut self, projection: Projection) -> Result<(), SimulationError> {
        let state = ProjectionState::new(projection, self.neurons.len(), self.dt)?;
        self.projections.push(state);
        Ok(())
    }

    /// All neurons of the network
    pub fn neurons(&self) -> &[C] {
        &self.neurons
    }

    /// Mutable access to the neurons, for example to change parameters between runs.
    pub fn neurons_mut(&mut self) -> &mut [C] {
        &mut self.neurons
    }

    /// Consumes the network and returns all neurons.
    pub fn into_neurons(self) -> Vec<C> {
        self.neurons
    }

    /// Number of neurons
    pub fn n_neurons(&self) -> usize {
        self.neurons.len()
    }

    /// All projections in the order in which they were added
    pub fn projections(&self) -> impl Iterator<Item = &Projection> {
        self.projections.iter().map(|p| &p.projection)
    }

    /// The fixed time step (ms)
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of steps which have been performed
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Number of steps after which a spike is delivered for a given delay (ms).
    pub fn delay_steps(&self, delay: f64) -> usize {
        ((delay / self.dt).round() as usize).max(1)
    }

    /// Advances all neurons by one step and returns the indices of neurons which spiked.
    ///
    /// The external current of neuron $i$ is set to `stimulus(t, i)` plus all synaptic
    /// currents before the step is performed.
    /// If any neuron fails, every neuron gets back its previous state and external current and
    /// no events are consumed, so the network stays at its current iteration.
    #[cfg_attr(feature = "tracing", instrument(skip_all))]
    pub fn step<S, F>(
        &mut self,
        solver: Solver,
        t: f64,
        stimulus: &F,
    ) -> Result<Vec<usize>, CalcError>
    where
        C: DiffEqModule<S> + Neuron + Send,
        S: StateVector<f64> + Xapy<f64> + Clone + Send,
        F: Fn(f64, usize) -> f64 + Sync,
    {
        let n = self.neurons.len();
        let dt = self.dt;
        let iteration = self.iteration;

        // I_syn = I_fixed + Σ g E_rev - Σ g V
        let delivered: Vec<Vec<f64>> = self
            .projections
            .iter()
            .map(|projection| projection.delivered(iteration))
            .collect();
        let mut fixed = vec![0.0; n];
        let mut g_rev = vec![0.0; n];
        let mut g_total = vec![0.0; n];
        for (projection, values) in self.projections.iter().zip(delivered.iter()) {
            match projection.projection.synapse {
                Synapse::Current { .. } | Synapse::Delta => {
                    for (f, v) in fixed.iter_mut().zip(values.iter()) {
                        *f += v;
                    }
                }
                Synapse::Conductance { e_rev, .. } => {
                    for i in 0..n {
                        g_rev[i] += values[i] * e_rev;
                        g_total[i] += values[i];
                    }
                }
            }
        }

        let outcomes: Vec<(S, f64, Result<bool, CalcError>)> = self
            .neurons
            .par_iter_mut()
            .enumerate()
            .map(|(i, neuron)| {
                let previous_state = <C as DiffEqState<S>>::get_state(neuron);
                let previous_current = neuron.external_current();
                let v_previous = neuron.membrane_potential();
                let input = stimulus(t, i) + fixed[i] + g_rev[i] - g_total[i] * v_previous;
                neuron.set_external_current(input);
                let crossed = solver.step::<C, S>(neuron, t, dt).map(|()| {
                    threshold_crossed(
                        v_previous,
                        neuron.membrane_potential(),
                        neuron.spike_threshold(),
                    )
                });
                (previous_state, previous_current, crossed)
            })
            .collect();

        let mut spikes = Vec::new();
        let mut error = None;
        let mut previous = Vec::with_capacity(n);
        for (i, (state, current, crossed)) in outcomes.into_iter().enumerate() {
            match crossed {
                Ok(true) => spikes.push(i),
                Ok(false) => (),
                Err(e) => {
                    error.get_or_insert(e);
                }
            }
            previous.push((state, current));
        }
        if let Some(error) = error {
            self.neurons
                .par_iter_mut()
                .zip(previous.into_par_iter())
                .for_each(|(neuron, (state, current))| {
                    <C as DiffEqState<S>>::set_state(neuron, state);
                    neuron.set_external_current(current);
                });
            #[cfg(feature = "tracing")]
            tracing::debug!(iteration, "network step rolled back: {error}");
            return Err(error);
        }

        for (projection, values) in self.projections.iter_mut().zip(delivered) {
            projection.commit(iteration, values, &spikes, dt);
        }
        #[cfg(feature = "tracing")]
        if !spikes.is_empty() {
            tracing::trace!(iteration, n_spikes = spikes.len(), "spikes");
        }
        self.iteration += 1;
        Ok(spikes)
    }
}
