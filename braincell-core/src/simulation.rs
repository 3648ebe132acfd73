//! Run a [Network] over time, record traces and collect spikes.

use std::collections::{BTreeMap, HashMap};

use braincell_concepts::{DiffEqModule, Neuron, StateVector, TimeError, Xapy};
use kdam::BarExt;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::errors::SimulationError;
use crate::network::Network;
use crate::solvers::Solver;
use crate::storage::{
    StorageBuilder, StorageError, StorageInterfaceLoad, StorageInterfaceStore, StorageManager,
    StorageOption,
};
use crate::time::{progress_bar, TimeEvent, TimeStepper};

/// Specify settings surrounding execution and storage
///
/// ```
/// # use braincell_core::simulation::Settings;
/// # use braincell_core::solvers::Solver;
/// # use braincell_core::time::FixedStepsize;
/// let settings = Settings::<FixedStepsize<f64>>::from_ron_str(
///     "(
///         n_threads: 2,
///         time: (
///             dt: 0.01,
///             t0: 0.0,
///             record_iterations: [0, 100],
///             current_time: 0.0,
///             current_iteration: 0,
///             maximum_iterations: 100,
///         ),
///         solver: rk4,
///         storage: (
///             location: \"out\",
///             priority: ([Memory]),
///             suffix: \"\",
///             add_date: false,
///             date: \"\",
///         ),
///         show_progressbar: false,
///     )",
/// )?;
/// assert_eq!(settings.solver, Solver::Rk4);
/// assert_eq!(settings.n_threads.get(), 2);
/// # Ok::<(), braincell_core::storage::StorageError>(())
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Settings<T> {
    /// Number of threads used for executing simulation in parallel
    pub n_threads: core::num::NonZeroUsize,
    /// Specify how time is advanced during the simulation
    pub time: T,
    /// Numerical scheme which advances every neuron
    #[serde(default)]
    pub solver: Solver,
    /// Define storage properties
    pub storage: StorageBuilder,
    /// Determines if progress bar should be shown during execution
    #[serde(default)]
    pub show_progressbar: bool,
}

impl<T> Settings<T> {
    /// Single threaded execution with the default [Solver] which keeps results in memory.
    pub fn new(time: T) -> Self {
        Self {
            n_threads: core::num::NonZeroUsize::MIN,
            time,
            solver: Solver::default(),
            storage: StorageBuilder::new().priority([StorageOption::Memory]),
            show_progressbar: false,
        }
    }

    /// Reads settings from a [ron](https://github.com/ron-rs/ron) string.
    pub fn from_ron_str(input: &str) -> Result<Self, StorageError>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(ron::de::from_str(input)?)
    }

    /// Reads settings from a json string.
    pub fn from_json_str(input: &str) -> Result<Self, StorageError>
    where
        T: serde::de::DeserializeOwned,
    {
        Ok(serde_json::from_str(input)?)
    }

    /// Writes the settings as pretty [ron](https://github.com/ron-rs/ron) string.
    pub fn to_ron_string(&self) -> Result<String, StorageError>
    where
        T: Serialize,
    {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }
}

/// Snapshot of one neuron at a recorded iteration
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct NeuronRecord {
    /// Simulation time (ms)
    pub time: f64,
    /// Membrane potential (mV) at the spike detecting compartment
    pub potential: f64,
    /// External current density (µA/cm²) applied during the last step
    pub external_current: f64,
}

/// A spike emitted by a neuron
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Spike {
    /// Time at the end of the step in which the threshold was crossed (ms)
    pub time: f64,
    /// Index of the neuron
    pub neuron: usize,
}

/// Output of [run_simulation]
pub struct SimulationResult<C> {
    /// The network in its final state
    pub network: Network<C>,
    /// All spikes ordered by time and then by neuron index
    pub spikes: Vec<Spike>,
    /// Recorded traces of every neuron indexed by neuron index
    pub storage: StorageManager<usize, NeuronRecord>,
}

impl<C> SimulationResult<C> {
    /// Number of spikes of every neuron
    pub fn spike_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.network.n_neurons()];
        for spike in self.spikes.iter() {
            counts[spike.neuron] += 1;
        }
        counts
    }

    /// Spike times of a single neuron
    pub fn spike_times(&self, neuron: usize) -> Vec<f64> {
        self.spikes
            .iter()
            .filter(|s| s.neuron == neuron)
            .map(|s| s.time)
            .collect()
    }

    /// Recorded history of one neuron ordered by iteration
    pub fn trace(&self, neuron: usize) -> Result<BTreeMap<u64, NeuronRecord>, StorageError> {
        self.storage.load_element_history(&neuron)
    }

    /// Recorded histories of all neurons
    pub fn traces(&self) -> Result<HashMap<usize, BTreeMap<u64, NeuronRecord>>, StorageError> {
        self.storage.load_all_element_histories()
    }
}

fn store_records<C>(
    storage: &StorageManager<usize, NeuronRecord>,
    network: &Network<C>,
    iteration: usize,
    time: f64,
) -> Result<(), StorageError>
where
    C: Neuron,
{
    let records: Vec<_> = network
        .neurons()
        .iter()
        .map(|n| NeuronRecord {
            time,
            potential: n.membrane_potential(),
            external_current: n.external_current(),
        })
        .collect();
    let ids: Vec<usize> = (0..records.len()).collect();
    storage.store_batch_elements(iteration as u64, ids.iter().zip(records.iter()))
}

/// Advances the network until the time stepper is exhausted.
///
/// In every step, neuron $i$ receives the external current `stimulus(t, i)` (µA/cm²) in addition
/// to its synaptic input.
/// Whenever the time stepper emits a [TimeEvent::Record], a [NeuronRecord] of every neuron is
/// written to all storage options given in the [Settings].
/// The time increment of the stepper has to agree with [Network::dt].
#[cfg_attr(feature = "tracing", instrument(skip_all))]
pub fn run_simulation<C, S, T, F>(
    mut network: Network<C>,
    stimulus: F,
    settings: &Settings<T>,
) -> Result<SimulationResult<C>, SimulationError>
where
    C: DiffEqModule<S> + Neuron + Send,
    S: StateVector<f64> + Xapy<f64> + Clone + Send,
    T: TimeStepper<f64> + Clone,
    F: Fn(f64, usize) -> f64 + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.n_threads.get())
        .build()?;
    let storage = StorageManager::open_or_create(settings.storage.clone().init(), 0)?;
    let mut time_stepper = settings.time.clone();
    let mut bar = match settings.show_progressbar {
        true => Some(time_stepper.initialize_bar()?),
        false => None,
    };
    #[cfg(feature = "tracing")]
    tracing::info!(
        n_neurons = network.n_neurons(),
        n_steps = time_stepper.n_steps(),
        n_threads = settings.n_threads.get(),
        solver = settings.solver.name(),
        "starting simulation"
    );

    let initial = time_stepper.initial_time_point();
    if initial.event == Some(TimeEvent::Record) {
        store_records(&storage, &network, initial.iteration, initial.time)?;
    }
    let solver = settings.solver;
    let mut t = initial.time;
    let mut spikes = Vec::new();
    while let Some(next) = time_stepper.advance()? {
        if (next.increment - network.dt()).abs() > 1e-9 * network.dt() {
            return Err(TimeError(format!(
                "time increment {} does not agree with time step {} of network",
                next.increment,
                network.dt()
            ))
            .into());
        }
        let new_spikes = pool.install(|| network.step(solver, t, &stimulus))?;
        spikes.extend(new_spikes.into_iter().map(|neuron| Spike {
            time: next.time,
            neuron,
        }));
        t = next.time;
        if next.event == Some(TimeEvent::Record) {
            #[cfg(feature = "tracing")]
            tracing::debug!(iteration = next.iteration, time = next.time, "recording");
            store_records(&storage, &network, next.iteration, next.time)?;
        }
        if let Some(bar) = bar.as_mut() {
            time_stepper.update_bar(bar)?;
        }
    }
    #[cfg(feature = "tracing")]
    tracing::info!(n_spikes = spikes.len(), "finished simulation");
    Ok(SimulationResult {
        network,
        spikes,
        storage,
    })
}

/// Calls `f` for every step index in `0..n_steps` and collects its results.
///
/// Stops at the first error.
///
/// ```
/// # use braincell_core::simulation::for_loop;
/// let squares = for_loop(5, false, |i| Ok::<_, braincell_core::SimulationError>(i * i))?;
/// assert_eq!(squares, vec![0, 1, 4, 9, 16]);
/// # Ok::<(), braincell_core::SimulationError>(())
/// ```
pub fn for_loop<R, E, F>(n_steps: usize, show_progressbar: bool, mut f: F) -> Result<Vec<R>, E>
where
    F: FnMut(usize) -> Result<R, E>,
    E: From<TimeError> + From<std::io::Error>,
{
    let mut bar = match show_progressbar {
        true => Some(progress_bar(n_steps)?),
        false => None,
    };
    let mut results = Vec::with_capacity(n_steps);
    for i in 0..n_steps {
        results.push(f(i)?);
        if let Some(bar) = bar.as_mut() {
            bar.update(1)?;
        }
    }
    Ok(results)
}
