use braincell::prelude::*;

use clap::{Parser, Subcommand};
use kdam::BarExt;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// SIMULATION SPECIFIC CODE

#[derive(Clone, Debug, Eq, Deserialize, PartialEq, Serialize)]
struct SimSettings {
    n_neurons: usize,
    n_threads: std::num::NonZeroUsize,
    solver: Solver,
    n_steps: usize,
    /// Multiple of 0.001 ms
    dt: usize,
}

fn population(n_neurons: usize, seed: u64) -> Result<Vec<SingleCompartment>, SimulationError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n_neurons)
        .map(|_| -> Result<SingleCompartment, SimulationError> {
            let neuron = SingleCompartment::hodgkin_huxley()
                .map_err(|e| SetupError(format!("{e}")))?;
            Ok(neuron.with_initial_potential(rng.gen_range(-70.0..-60.0))?)
        })
        .collect()
}

fn run_population(sim_settings: &SimSettings) -> Result<Vec<usize>, SimulationError> {
    let n = sim_settings.n_neurons;
    let dt = sim_settings.dt as f64 * 0.001;

    let mut network = Network::new(population(n, 1)?, dt)?;
    network.add_projection(Projection::fixed_probability(
        n,
        n,
        (20.0 / n as f64).min(1.0),
        0.05,
        1.0,
        Synapse::Conductance {
            tau: 5.0,
            e_rev: 0.0,
        },
        2,
    )?)?;

    let time = FixedStepsize::from_save_steps(0.0, dt, sim_settings.n_steps, sim_settings.n_steps)?;
    let settings = Settings {
        n_threads: sim_settings.n_threads,
        time,
        solver: sim_settings.solver,
        storage: StorageBuilder::new().priority([]),
        show_progressbar: false,
    };
    let result = run_simulation(network, |_, i| 5.0 + (i % 10) as f64, &settings)?;
    Ok(result.spike_counts())
}

impl CLIArgs {
    fn create_kdam_bar(
        &self,
        init_fmt_string: impl Into<String>,
        total: usize,
    ) -> Option<kdam::Bar> {
        if self.no_output {
            None
        } else {
            Some(kdam::tqdm!(
                desc = init_fmt_string,
                total = total,
                position = 0
            ))
        }
    }

    fn set_description_and_update(
        progress_bar: &mut Option<kdam::Bar>,
        desc: impl Into<String>,
        update: Option<usize>,
    ) {
        if let Some(bar) = progress_bar.as_mut() {
            bar.set_description(desc);
            if let Some(steps) = update {
                if let Err(e) = bar.update(steps) {
                    println!("Progressbar could not be updated with error: {e}");
                }
            }
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct BenchmarkResult {
    simulation_settings: SimSettings,
    times: Vec<u128>,
}

fn run_sim(
    args: &CLIArgs,
    settings: Vec<SimSettings>,
    formatter: impl Fn(&SimSettings, usize) -> String,
    save_prefix: &str,
) -> Result<Vec<BenchmarkResult>, Box<dyn std::error::Error>> {
    let mut samples = vec![];
    let mut progress_bar = args.create_kdam_bar("", settings.len() * args.sample_size);
    for setting in settings.into_iter() {
        let res = match BenchmarkResult::try_read_from_file(args, &setting, save_prefix) {
            Ok(Some(r)) if !args.overwrite => {
                // Loading previous runs
                CLIArgs::set_description_and_update(
                    &mut progress_bar,
                    formatter(&setting, args.sample_size),
                    Some(args.sample_size),
                );
                r
            }
            _ => {
                // Do warm-up run before main
                if let Some(bar) = progress_bar.as_mut() {
                    bar.set_description("Doing Warmup");
                }
                std::hint::black_box(run_population(&setting)?);

                // Do main benchmark run
                let mut times = vec![];
                for n_sample in 0..args.sample_size {
                    let now = std::time::Instant::now();
                    std::hint::black_box(run_population(&setting)?);
                    let t = now.elapsed().as_nanos();
                    times.push(t);
                    CLIArgs::set_description_and_update(
                        &mut progress_bar,
                        formatter(&setting, n_sample),
                        Some(1),
                    );
                }
                let br = BenchmarkResult {
                    simulation_settings: setting,
                    times,
                };
                if !args.no_save {
                    if let Err(e) = br.store_to_file(args, save_prefix) {
                        println!("Storing to file failed with error: {e}");
                    }
                }
                br
            }
        };
        samples.push(res);
    }
    Ok(samples)
}

fn solver_comparison(
    args: &CLIArgs,
    solvers: &[Solver],
    n_neurons: usize,
) -> Result<Vec<BenchmarkResult>, Box<dyn std::error::Error>> {
    let simulation_settings = solvers
        .iter()
        .map(|solver| SimSettings {
            n_neurons,
            n_threads: std::num::NonZeroUsize::MIN,
            solver: *solver,
            n_steps: 10_000,
            dt: 10,
        })
        .collect();
    run_sim(
        args,
        simulation_settings,
        |setting: &SimSettings, n_sample: usize| {
            format!("Solver: {} Sample: {}", setting.solver, n_sample + 1)
        },
        "solvers",
    )
}

fn population_size_scaling(
    args: &CLIArgs,
    sizes: &[usize],
    n_threads: usize,
) -> Result<Vec<BenchmarkResult>, Box<dyn std::error::Error>> {
    let n_threads: std::num::NonZeroUsize = n_threads.try_into()?;
    let simulation_settings = sizes
        .iter()
        .map(|n_neurons| SimSettings {
            n_neurons: *n_neurons,
            n_threads,
            solver: Solver::IndExpEuler,
            n_steps: 2_000,
            dt: 25,
        })
        .collect();
    run_sim(
        args,
        simulation_settings,
        |setting: &SimSettings, n_sample: usize| {
            format!("Neurons: {} Sample: {}", setting.n_neurons, n_sample + 1)
        },
        "population-size",
    )
}

fn thread_scaling(
    args: &CLIArgs,
    threads: &[usize],
) -> Result<Vec<BenchmarkResult>, Box<dyn std::error::Error>> {
    let simulation_settings = threads
        .iter()
        .map(|n_threads| -> Result<SimSettings, std::num::TryFromIntError> {
            Ok(SimSettings {
                n_neurons: 2_000,
                n_threads: (*n_threads).try_into()?,
                solver: Solver::IndExpEuler,
                n_steps: 1_000,
                dt: 25,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    run_sim(
        args,
        simulation_settings,
        |setting: &SimSettings, n_sample: usize| {
            format!("Threads: {} Sample: {}", setting.n_threads, n_sample + 1)
        },
        "thread-scaling",
    )
}

impl BenchmarkResult {
    fn get_next_index_value(
        storage_path: &std::path::Path,
    ) -> Result<u32, Box<dyn std::error::Error>> {
        let mut index = 0;
        for globresult in glob::glob(&format!("{}/*.json", storage_path.to_string_lossy()))? {
            let res = globresult?;
            if let Some(file_stem) = res.file_stem() {
                let new_index: u32 = file_stem.to_string_lossy().parse()?;
                index = new_index.max(index);
            }
        }
        Ok(index + 1)
    }

    fn get_storage_path(
        args: &CLIArgs,
        save_prefix: impl Into<std::path::PathBuf>,
    ) -> std::path::PathBuf {
        args.get_storage_base_path().join(save_prefix.into())
    }

    fn get_file_path(
        args: &CLIArgs,
        save_prefix: impl Into<std::path::PathBuf>,
    ) -> Result<std::path::PathBuf, Box<dyn std::error::Error>> {
        let storage_path = Self::get_storage_path(args, save_prefix);
        std::fs::create_dir_all(&storage_path)?;
        let index = Self::get_next_index_value(&storage_path)?;
        Ok(storage_path.join(format!("{index:010}.json")))
    }

    fn store_to_file(
        &self,
        args: &CLIArgs,
        save_prefix: impl Into<std::path::PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let file_path = Self::get_file_path(args, save_prefix)?;
        let buffer = std::fs::File::create(file_path)?;
        serde_json::to_writer(buffer, self)?;
        Ok(())
    }

    fn try_read_from_file(
        args: &CLIArgs,
        sim_settings: &SimSettings,
        save_prefix: impl Into<std::path::PathBuf>,
    ) -> Result<Option<Self>, Box<dyn std::error::Error>> {
        let storage_path = Self::get_storage_path(args, save_prefix);
        // Get names of all files in this directory which end on json
        for file_path in glob::glob(&format!("{}/*.json", storage_path.to_string_lossy()))?.flatten()
        {
            let file = std::fs::File::open(&file_path)?;
            let reader = std::io::BufReader::new(file);
            match serde_json::from_reader::<_, BenchmarkResult>(reader) {
                Ok(u) => {
                    if &u.simulation_settings == sim_settings {
                        return Ok(Some(u));
                    }
                }
                Err(e) => println!(
                    "\
                    File {} might not be matching storage format.\
                    Encountered error {e}",
                    file_path.to_string_lossy()
                ),
            }
        }
        Ok(None)
    }
}

#[derive(Subcommand, Debug)]
enum SubCommand {
    /// Compare all given solvers on the same population
    Solvers {
        /// Names of the solvers such as rk4 or ind_exp_euler
        solvers: Vec<Solver>,
        #[arg(short = 'N', long, default_value_t = 100)]
        n_neurons: usize,
    },
    /// Thread scaling benchmark
    Threads {
        /// List of thread configurations to benchmark
        threads: Vec<usize>,
    },
    /// Population size scaling benchmark
    PopSize {
        /// List of population sizes to benchmark
        sizes: Vec<usize>,
        #[arg(short, default_value_t = 1)]
        n_threads: usize,
    },
}

/// Benchmark a recurrent population of Hodgkin-Huxley neurons
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CLIArgs {
    /// Name of the current runs such as name of the device to be benchmarked
    #[arg(required = true)]
    name: String,

    /// Output directory of benchmark results
    #[arg(short, long, default_value_t = format!("benchmark_results"))]
    output_directory: String,

    #[command(subcommand)]
    commands: Option<SubCommand>,

    /// Number of samples to be generated for each measurement
    #[arg(short, long, default_value_t = 5)]
    sample_size: usize,

    /// Do not save results. This takes priority against the overwrite settings.
    #[arg(long, default_value_t = false)]
    no_save: bool,

    /// Rerun measurements even if previous results exist
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Disables output
    #[arg(long, default_value_t = false)]
    no_output: bool,
}

impl CLIArgs {
    fn get_storage_base_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.output_directory).join(&self.name)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CLIArgs::parse();
    if !args.no_output {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    if let Some(command) = &args.commands {
        if !args.no_output {
            println!("Generating Results for device {}", args.name);
        }
        let results = match command {
            SubCommand::Solvers { solvers, n_neurons } => {
                solver_comparison(&args, solvers, *n_neurons)?
            }
            SubCommand::Threads { threads } => thread_scaling(&args, threads)?,
            SubCommand::PopSize { sizes, n_threads } => {
                population_size_scaling(&args, sizes, *n_threads)?
            }
        };
        if !args.no_output {
            for result in results {
                let mean = result.times.iter().sum::<u128>() as f64
                    / result.times.len().max(1) as f64
                    * 1e-6;
                println!("{:?}: {mean:.3} ms", result.simulation_settings);
            }
        }
    }
    Ok(())
}
