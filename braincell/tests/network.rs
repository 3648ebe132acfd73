use braincell::prelude::*;

fn hodgkin_huxley_population(n: usize) -> Result<Vec<SingleCompartment>, Box<dyn std::error::Error>> {
    Ok(vec![SingleCompartment::hodgkin_huxley()?; n])
}

#[test]
fn synaptic_input_arrives_after_delay() -> Result<(), Box<dyn std::error::Error>> {
    let dt = 0.01;
    let delay = 1.234;
    let mut network = Network::new(hodgkin_huxley_population(2)?, dt)?;
    network.add_projection(Projection::new(
        vec![Connection {
            pre: 0,
            post: 1,
            weight: 30.0,
            delay,
        }],
        Synapse::Current { tau: 2.0 },
    ))?;
    let delay_steps = network.delay_steps(delay);
    assert_eq!(delay_steps, 123);

    let settings = Settings::new(FixedStepsize::from_save_steps(0.0, dt, 2_000, 1)?);
    let result = run_simulation(
        network,
        |_, i| match i {
            0 => 10.0,
            _ => 0.0,
        },
        &settings,
    )?;

    let first_spike = result.spike_times(0)[0];
    let spike_iteration = (first_spike / dt).round() as u64;
    let trace = result.trace(1)?;
    let first_input = trace
        .iter()
        .find(|(_, record)| record.external_current != 0.0)
        .map(|(iteration, _)| *iteration)
        .ok_or("neuron 1 never received input")?;
    assert_eq!(first_input, spike_iteration + delay_steps as u64);
    approx::assert_abs_diff_eq!(trace[&first_input].external_current, 30.0);

    // The excitatory input makes the second neuron fire after the first one
    let second_spike = result.spike_times(1)[0];
    assert!(second_spike > first_spike + delay);
    Ok(())
}

#[test]
fn fixed_probability_is_reproducible() -> Result<(), SetupError> {
    let synapse = Synapse::Conductance {
        tau: 5.0,
        e_rev: 0.0,
    };
    let p1 = Projection::fixed_probability(40, 40, 0.2, 0.05, 1.0, synapse, 7)?;
    let p2 = Projection::fixed_probability(40, 40, 0.2, 0.05, 1.0, synapse, 7)?;
    let p3 = Projection::fixed_probability(40, 40, 0.2, 0.05, 1.0, synapse, 8)?;
    assert_eq!(p1, p2);
    assert_ne!(p1, p3);
    assert!(p1.connections.iter().all(|c| c.pre != c.post));
    // 40*39 candidates with p=0.2
    assert!((200..420).contains(&p1.connections.len()));
    assert!(Projection::fixed_probability(4, 4, 1.5, 0.05, 1.0, synapse, 7).is_err());
    Ok(())
}

fn recurrent_run(
    n_threads: usize,
) -> Result<SimulationResult<SingleCompartment>, Box<dyn std::error::Error>> {
    let n = 20;
    let dt = 0.025;
    let mut network = Network::new(hodgkin_huxley_population(n)?, dt)?;
    network.add_projection(Projection::fixed_probability(
        n,
        n,
        0.2,
        0.1,
        1.0,
        Synapse::Conductance {
            tau: 5.0,
            e_rev: 0.0,
        },
        3,
    )?)?;
    network.add_projection(Projection::fixed_probability(
        n,
        n,
        0.1,
        0.2,
        2.0,
        Synapse::Conductance {
            tau: 10.0,
            e_rev: -80.0,
        },
        4,
    )?)?;
    let mut settings = Settings::new(FixedStepsize::from_save_steps(0.0, dt, 2_000, 20)?);
    settings.n_threads = n_threads.try_into()?;
    settings.solver = Solver::Rk4;
    Ok(run_simulation(
        network,
        |t, i| if t > 5.0 { 6.0 + 0.3 * i as f64 } else { 0.0 },
        &settings,
    )?)
}

#[test]
fn results_do_not_depend_on_thread_count() -> Result<(), Box<dyn std::error::Error>> {
    let single = recurrent_run(1)?;
    let parallel = recurrent_run(4)?;
    assert!(!single.spikes.is_empty());
    assert_eq!(single.spikes, parallel.spikes);
    assert_eq!(single.traces()?, parallel.traces()?);
    // Spikes are ordered by time and then by neuron
    for pair in single.spikes.windows(2) {
        assert!(
            pair[0].time < pair[1].time
                || (pair[0].time == pair[1].time && pair[0].neuron < pair[1].neuron)
        );
    }
    Ok(())
}

#[test]
fn out_of_range_connections_are_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut network = Network::new(hodgkin_huxley_population(3)?, 0.01)?;
    let err = network
        .add_projection(Projection::one_to_one(4, 1.0, 1.0, Synapse::Delta))
        .unwrap_err();
    assert!(matches!(err, SimulationError::IndexError(_)));
    let err = network
        .add_projection(Projection::one_to_one(3, 1.0, 1.0, Synapse::Current { tau: 0.0 }))
        .unwrap_err();
    assert!(matches!(err, SimulationError::SetupError(_)));
    assert_eq!(network.projections().count(), 0);
    Ok(())
}
