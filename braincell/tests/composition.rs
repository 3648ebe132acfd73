use braincell::prelude::*;

#[test]
fn unknown_solver_is_rejected() {
    let err = "runge_kutta_7".parse::<Solver>().unwrap_err();
    let message = format!("{err}");
    assert!(message.contains("runge_kutta_7"));
    for solver in Solver::ALL {
        assert!(message.contains(solver.name()), "{message}");
    }
    let err: SimulationError = CalcError::from(err).into();
    assert!(matches!(err, SimulationError::CalcError(_)));
}

#[test]
fn solver_names_round_trip() {
    for solver in Solver::ALL {
        assert_eq!(solver.name().parse::<Solver>().unwrap(), solver);
        assert_eq!(format!("{solver}"), solver.name());
    }
}

#[test]
fn duplicate_ions_are_rejected() {
    let result: Result<Membrane<ChannelModel, IonModel>, _> = Membrane::new(
        vec![
            SodiumFixed::with_reversal(50.0).into(),
            SodiumFixed::with_reversal(55.0).into(),
        ],
        vec![NaHH1952::default().into()],
    );
    assert!(matches!(result, Err(CompositionError::Setup(_))));
}

#[test]
fn missing_ions_are_rejected() {
    let result: Result<Membrane<ChannelModel, IonModel>, _> = Membrane::new(
        vec![SodiumFixed::with_reversal(50.0).into()],
        vec![NaHH1952::default().into(), KHH1952::default().into()],
    );
    match result {
        Err(CompositionError::Hierarchy(e)) => assert!(format!("{e}").contains("KHH1952")),
        other => panic!("expected hierarchy error but got {other:?}"),
    }
}

#[test]
fn mixed_ion_channel_requires_both_ions() -> Result<(), Box<dyn std::error::Error>> {
    // KCaAhp carries potassium but is gated by calcium
    let only_potassium: Result<Membrane<ChannelModel, IonModel>, _> = Membrane::new(
        vec![PotassiumFixed::with_reversal(-90.0).into()],
        vec![KCaAhp::default().into()],
    );
    assert!(matches!(only_potassium, Err(CompositionError::Hierarchy(_))));

    let membrane: Membrane<ChannelModel, IonModel> = Membrane::new(
        vec![
            PotassiumFixed::with_reversal(-90.0).into(),
            CalciumDetailed::default().into(),
        ],
        vec![
            KCaAhp::default().into(),
            CaHVA::default().into(),
            Leak::default().into(),
        ],
    )?;
    let mut neuron = SingleCompartment::new(1.0, membrane)?;
    let dt = 0.025;
    neuron.set_external_current(5.0);
    for i in 0..400 {
        Solver::IndExpEuler.step::<_, nalgebra::DVector<f64>>(&mut neuron, i as f64 * dt, dt)?;
    }
    assert!(neuron.membrane_potential().is_finite());
    Ok(())
}

#[test]
fn composition_errors_convert_to_simulation_errors() {
    let err = Membrane::<ChannelModel, IonModel>::new(vec![], vec![KHH1952::default().into()])
        .unwrap_err();
    let err: SimulationError = SetupError::from(err).into();
    assert!(matches!(err, SimulationError::SetupError(_)));
}

#[test]
fn markov_channel_keeps_occupancies_normalized() -> Result<(), Box<dyn std::error::Error>> {
    let membrane: Membrane<ChannelModel, IonModel> = Membrane::new(
        vec![
            SodiumFixed::with_reversal(50.0).into(),
            PotassiumFixed::with_reversal(-77.0).into(),
        ],
        vec![
            NaRsg::default().into(),
            KHH1952::default().into(),
            Leak::default().into(),
        ],
    )?;
    let mut neuron = SingleCompartment::new(1.0, membrane)?;
    let dt = 0.01;
    for i in 0..1_000 {
        Solver::IndExpEuler.step::<_, nalgebra::DVector<f64>>(&mut neuron, i as f64 * dt, dt)?;
        // [V, 13 occupancies of NaRsg, 1 gate of KHH1952]
        let state = neuron.get_state();
        let occupancies = &state.as_slice()[1..14];
        assert!(occupancies.iter().all(|p| *p >= 0.0));
        approx::assert_abs_diff_eq!(occupancies.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
    }
    assert!((-100.0..0.0).contains(&neuron.membrane_potential()));
    Ok(())
}
