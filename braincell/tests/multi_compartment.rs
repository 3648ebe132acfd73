use std::collections::BTreeMap;

use braincell::prelude::*;
use nalgebra::DVector;

const G_LEAK: f64 = 0.1;
const E_LEAK: f64 = -65.0;

fn passive_membrane() -> Result<Membrane<ChannelModel, IonModel>, CompositionError> {
    Membrane::new(
        vec![],
        vec![Leak {
            g_max: G_LEAK,
            reversal: E_LEAK,
        }
        .into()],
    )
}

fn soma_and_dendrite(
    soma: Membrane<ChannelModel, IonModel>,
    dendrite: Membrane<ChannelModel, IonModel>,
) -> Result<MultiCompartment<ChannelModel, IonModel>, SetupError> {
    let mut morphology = Morphology::new();
    morphology.add_section("soma", Section::new(20.0, 20.0, 1))?;
    morphology.add_section("dend", Section::new(100.0, 2.0, 1))?;
    morphology.connect("dend", "soma", 1.0)?;
    let membranes = BTreeMap::from([("soma".to_owned(), soma), ("dend".to_owned(), dendrite)]);
    MultiCompartment::new(&morphology, &membranes)
}

#[test]
fn passive_cell_is_a_voltage_divider() -> Result<(), Box<dyn std::error::Error>> {
    let mut cell = soma_and_dendrite(passive_membrane()?, passive_membrane()?)?;
    let injected = 0.01;
    cell.inject_current(1, injected)?;

    // Conductances in µS, current in nA and potentials in mV
    let geometry = cell.geometry();
    let leak: Vec<_> = geometry
        .iter()
        .map(|g| 1e3 * G_LEAK * g.area * units::UM2_TO_CM2)
        .collect();
    let axial = 1e6 / (geometry[0].half_resistance() + geometry[1].half_resistance());
    let u_dend = injected / (leak[1] + axial - axial * axial / (leak[0] + axial));
    let u_soma = axial / (leak[0] + axial) * u_dend;

    let dt = 0.025;
    for solver in [Solver::Rk4, Solver::ExpEuler] {
        let mut cell = cell.clone();
        for i in 0..12_000 {
            solver.step::<_, DVector<f64>>(&mut cell, i as f64 * dt, dt)?;
        }
        let potentials = cell.potentials();
        assert!(potentials[0] > E_LEAK);
        assert!(potentials[1] > potentials[0]);
        approx::assert_relative_eq!(potentials[1] - E_LEAK, u_dend, max_relative = 1e-6);
        approx::assert_relative_eq!(potentials[0] - E_LEAK, u_soma, max_relative = 1e-6);
    }
    Ok(())
}

fn hodgkin_huxley_membrane() -> Result<Membrane<ChannelModel, IonModel>, CompositionError> {
    Membrane::new(
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
    )
}

#[test]
fn somatic_spikes_depolarize_dendrite() -> Result<(), Box<dyn std::error::Error>> {
    let cell = soma_and_dendrite(hodgkin_huxley_membrane()?, passive_membrane()?)?;
    let network = Network::new(vec![cell], 0.01)?;
    let settings = Settings::new(FixedStepsize::from_save_steps(0.0, 0.01, 3_000, 10)?);
    let result = run_simulation(network, |_, _| 15.0, &settings)?;
    assert!(result.spike_counts()[0] > 0);

    let cell = &result.network.neurons()[0];
    let trace = result.trace(0)?;
    let peak = trace
        .values()
        .map(|r| r.potential)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(peak > 0.0);
    assert!(cell.potentials().iter().all(|v| v.is_finite()));
    Ok(())
}

#[test]
fn soma_added_last_is_still_the_first_compartment() -> Result<(), Box<dyn std::error::Error>> {
    let mut morphology = Morphology::new();
    morphology.add_section("dend", Section::new(100.0, 2.0, 3))?;
    morphology.add_section("soma", Section::new(20.0, 20.0, 1))?;
    morphology.connect("dend", "soma", 1.0)?;
    let membranes = BTreeMap::from([
        ("soma".to_owned(), hodgkin_huxley_membrane()?),
        ("dend".to_owned(), passive_membrane()?),
    ]);
    let cell = MultiCompartment::new(&morphology, &membranes)?;
    let geometry = cell.geometry();
    assert_eq!(geometry[0].parent, None);
    approx::assert_abs_diff_eq!(geometry[0].diameter, 20.0);
    assert_eq!(geometry[1].parent, Some(0));

    // Stimulus and spike detection act on the soma, not on the passive dendrite
    let network = Network::new(vec![cell], 0.01)?;
    let settings = Settings::new(FixedStepsize::from_save_steps(0.0, 0.01, 3_000, 10)?);
    let result = run_simulation(network, |_, _| 20.0, &settings)?;
    assert!(result.spike_counts()[0] > 0);
    Ok(())
}

#[test]
fn d_lambda_rule_yields_odd_compartment_counts() -> Result<(), SetupError> {
    let mut morphology = Morphology::new();
    morphology.add_section("soma", Section::new(20.0, 20.0, 1))?;
    morphology.add_section("apical", Section::new(600.0, 3.0, 1))?;
    morphology.add_section("basal", Section::new(150.0, 1.0, 1))?;
    morphology.connect("apical", "soma", 0.0)?;
    morphology.connect("basal", "soma", 1.0)?;
    morphology.set_ncomp_by_d_lambda(100.0, 0.1)?;
    let counts: Vec<_> = ["soma", "apical", "basal"]
        .into_iter()
        .map(|name| morphology.section(name).map(|s| s.n_compartments))
        .collect::<Result<_, _>>()?;
    for n in counts.iter() {
        assert!(*n >= 1);
        assert_eq!(n % 2, 1);
    }
    assert!(counts[1] > counts[2]);
    assert_eq!(morphology.compartments()?.len(), counts.iter().sum::<usize>());
    Ok(())
}
